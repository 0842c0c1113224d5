//! file-by-file comparison of two snapshot listings
//!
//! absence is data here: a path missing on the other side counts as
//! changed, never as an error.

use std::collections::HashMap;

use crate::error::Result;
use crate::viewer::{FileContent, FileListing, FileMeta, SnapshotView, TreeCache};

/// one left-side entry with its comparison state
#[derive(Clone, Debug)]
pub struct FileDiff {
    pub meta: FileMeta,
    pub changed: bool,
}

/// derived comparison of two snapshots, never persisted
#[derive(Clone, Debug, Default)]
pub struct DiffResult {
    files: Vec<FileDiff>,
    index: HashMap<String, usize>,
    deleted: Vec<FileDiff>,
    deleted_index: HashMap<String, usize>,
}

impl DiffResult {
    /// left-side entries in display order, comparison state attached
    pub fn files(&self) -> &[FileDiff] {
        &self.files
    }

    /// look up a left-side entry by relative path
    pub fn get(&self, short: &str) -> Option<&FileDiff> {
        self.index.get(short).map(|&i| &self.files[i])
    }

    /// is this left-side path (or subtree) changed
    pub fn is_changed(&self, short: &str) -> bool {
        self.get(short).map(|d| d.changed).unwrap_or(false)
    }

    /// right-only entries ("deleted relative to left"), closed under
    /// ancestors, in right-listing order
    pub fn deleted(&self) -> &[FileDiff] {
        &self.deleted
    }

    pub fn deleted_contains(&self, short: &str) -> bool {
        self.deleted_index.contains_key(short)
    }

    fn push_deleted(&mut self, meta: FileMeta) {
        if self.deleted_index.contains_key(&meta.short) {
            return;
        }
        self.deleted_index
            .insert(meta.short.clone(), self.deleted.len());
        self.deleted.push(FileDiff {
            meta,
            changed: true,
        });
    }
}

/// ancestor directory prefixes of a path, outermost first
fn ancestors(short: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    for (i, byte) in short.bytes().enumerate() {
        if byte == b'/' {
            prefixes.push(short[..i].to_string());
        }
    }
    prefixes
}

/// compare two listings file-by-file
///
/// every left path is marked changed when its checksum differs from the
/// right side's (absence counts as a mismatch), ancestor directories of
/// changed entries are marked changed at every depth, and right-only paths
/// form the deleted set together with all their ancestors.
pub fn diff_listings(left: &FileListing, right: &FileListing) -> DiffResult {
    let mut result = DiffResult::default();

    for meta in left.iter() {
        let changed = match right.get(&meta.short) {
            Some(counterpart) => counterpart.checksum != meta.checksum,
            None => true,
        };
        result.index.insert(meta.short.clone(), result.files.len());
        result.files.push(FileDiff {
            meta: meta.clone(),
            changed,
        });
    }

    // mark every ancestor directory of a changed entry, at every depth
    let changed_shorts: Vec<String> = result
        .files
        .iter()
        .filter(|d| d.changed)
        .map(|d| d.meta.short.clone())
        .collect();
    for short in changed_shorts {
        for prefix in ancestors(&short) {
            if let Some(&i) = result.index.get(&prefix) {
                result.files[i].changed = true;
            }
        }
    }

    // right-only paths are "deleted relative to left", closed under
    // ancestors so a ui can render the removed subtree
    for meta in right.iter() {
        if left.contains(&meta.short) {
            continue;
        }
        for prefix in ancestors(&meta.short) {
            if let Some(ancestor) = right.get(&prefix) {
                result.push_deleted(ancestor.clone());
            }
        }
        result.push_deleted(meta.clone());
    }

    result
}

/// a pair of snapshots being compared, plus the selected file pair
pub struct DiffView {
    pub left: SnapshotView,
    pub right: SnapshotView,
    selected_left: Option<FileMeta>,
    selected_right: Option<FileMeta>,
}

impl DiffView {
    pub fn new(left: SnapshotView, right: SnapshotView) -> Self {
        Self {
            left,
            right,
            selected_left: None,
            selected_right: None,
        }
    }

    /// extract both sides
    pub fn extract(&self) -> Result<()> {
        self.left.extract()?;
        self.right.extract()
    }

    /// remove both extracted trees
    pub fn cleanup(&self) -> Result<()> {
        self.left.cleanup()?;
        self.right.cleanup()
    }

    pub fn is_extracted(&self) -> bool {
        self.left.is_extracted() && self.right.is_extracted()
    }

    /// select the file pair to compare
    ///
    /// no key falls back to the left side's default file. when the left
    /// side is a single-file package the right selection is forced to that
    /// side's sole entry regardless of the requested key. returns whether
    /// both sides resolved.
    pub fn select(&mut self, cache: &TreeCache, locale: &str, key: Option<&str>) -> bool {
        let left_files = cache.files(&self.left, locale);
        let right_files = cache.files(&self.right, locale);

        let left_key = key
            .map(|k| k.to_string())
            .or_else(|| self.left.default_key(&left_files));
        let right_key = if self.left.is_single_file() {
            self.right.default_key(&right_files)
        } else {
            left_key.clone()
        };

        self.selected_left = left_key.and_then(|k| left_files.get(&k).cloned());
        self.selected_right = right_key.and_then(|k| right_files.get(&k).cloned());

        self.selected_left.is_some() && self.selected_right.is_some()
    }

    pub fn selected_left(&self) -> Option<&FileMeta> {
        self.selected_left.as_ref()
    }

    pub fn selected_right(&self) -> Option<&FileMeta> {
        self.selected_right.as_ref()
    }

    /// a pair is diffable only if neither side is binary and neither side
    /// is a directory
    pub fn is_diffable(&self) -> bool {
        let (left, right) = match (&self.selected_left, &self.selected_right) {
            (Some(left), Some(right)) => (left, right),
            _ => return false,
        };

        for meta in [left, right] {
            if meta.category.is_binary() || meta.directory {
                return false;
            }
        }
        true
    }

    /// read both selected files for a textual diff
    pub fn read_files(&self) -> (Option<FileContent>, Option<FileContent>) {
        (
            self.selected_left.as_ref().map(|m| self.left.read_file(m)),
            self.selected_right
                .as_ref()
                .map(|m| self.right.read_file(m)),
        )
    }

    /// compare the two listings
    ///
    /// single-file packages have no meaningful deleted tree, so a
    /// single-file right side yields an empty deleted set.
    pub fn files(&self, cache: &TreeCache, locale: &str) -> DiffResult {
        let left_files = cache.files(&self.left, locale);
        let right_files = cache.files(&self.right, locale);

        let mut result = diff_listings(&left_files, &right_files);
        if self.right.is_single_file() {
            result.deleted.clear();
            result.deleted_index.clear();
        }
        result
    }
}
