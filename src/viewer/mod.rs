//! extracted snapshot views
//!
//! a `SnapshotView` materializes one commit (or an in-flight upload) on
//! local ephemeral storage and serves an ordered path -> metadata listing
//! over it. listings are memoized per (snapshot identity, locale) in a
//! `TreeCache` because served urls embed the active locale.

mod cache;

pub use cache::TreeCache;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::classify::{self, Blacklist, FileCategory};
use crate::config::StoreConfig;
use crate::error::{IoResultExt, Result};
use crate::extract::extract;
use crate::hash::ContentHasher;

/// manifest filenames preferred as the default selection, in order
const DEFAULT_MANIFESTS: &[&str] = &["install.rdf", "manifest.json", "package.json"];

/// knobs for viewing extracted snapshots
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    /// maximum file size served before degrading to a diagnostic
    pub read_limit: u64,
    /// age after which an extraction-in-progress marker is ignored
    pub marker_ttl: Duration,
    /// binary-detection blacklist from the package validator
    pub blacklist: Blacklist,
}

impl ViewerOptions {
    /// derive viewer options from the store configuration
    pub fn from_config(config: &StoreConfig, blacklist: Blacklist) -> Self {
        Self {
            read_limit: config.read_limit,
            marker_ttl: Duration::from_secs(config.marker_ttl_secs),
            blacklist,
        }
    }
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default(), Blacklist::default())
    }
}

/// everything needed to serve one file of a snapshot
#[derive(Clone, Debug)]
pub struct FileMeta {
    /// path relative to the snapshot root
    pub short: String,
    /// final path component
    pub filename: String,
    /// number of path separators in `short`
    pub depth: usize,
    pub directory: bool,
    pub category: FileCategory,
    pub size: u64,
    /// modification time, unix seconds
    pub modified: i64,
    /// content hash hex, empty for directories
    pub checksum: String,
    pub mimetype: &'static str,
    pub syntax: &'static str,
    /// file-view url embedding snapshot identity and locale
    pub view_url: String,
    /// raw-serve url embedding snapshot identity and locale
    pub serve_url: String,
}

/// ordered mapping of relative path -> metadata for one snapshot
///
/// iteration order is the display order: at every level directories come
/// first (each immediately followed by its own contents), then files, both
/// groups sorted lexicographically.
#[derive(Clone, Debug, Default)]
pub struct FileListing {
    entries: Vec<FileMeta>,
    index: HashMap<String, usize>,
}

impl FileListing {
    pub fn empty() -> Self {
        Self::default()
    }

    fn push(&mut self, meta: FileMeta) {
        self.index.insert(meta.short.clone(), self.entries.len());
        self.entries.push(meta);
    }

    /// look up by relative path
    pub fn get(&self, short: &str) -> Option<&FileMeta> {
        self.index.get(short).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, short: &str) -> bool {
        self.index.contains_key(short)
    }

    /// entries in display order
    pub fn entries(&self) -> &[FileMeta] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileMeta> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&FileMeta> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// result of reading one file for display
///
/// degraded reads (size limit, decode problems, vanished file) return an
/// empty or lossy body with a diagnostic attached; they are not errors.
#[derive(Clone, Debug)]
pub struct FileContent {
    pub body: String,
    pub diagnostic: Option<String>,
}

impl FileContent {
    fn ok(body: String) -> Self {
        Self {
            body,
            diagnostic: None,
        }
    }

    fn degraded(body: String, diagnostic: impl Into<String>) -> Self {
        Self {
            body,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// a snapshot materialized on local ephemeral storage
pub struct SnapshotView {
    snapshot_id: String,
    archive: PathBuf,
    dest: PathBuf,
    single_file: bool,
    options: ViewerOptions,
}

impl SnapshotView {
    /// `single_file` marks bare single-file package kinds (e.g. a search
    /// engine definition), which changes diff pair selection
    pub fn new(
        snapshot_id: impl Into<String>,
        archive: impl Into<PathBuf>,
        dest_root: &Path,
        single_file: bool,
        options: ViewerOptions,
    ) -> Self {
        let snapshot_id = snapshot_id.into();
        let dest = dest_root.join(&snapshot_id);
        Self {
            snapshot_id,
            archive: archive.into(),
            dest,
            single_file,
            options,
        }
    }

    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn is_single_file(&self) -> bool {
        self.single_file
    }

    /// extract the archive into this view's destination
    ///
    /// the in-progress marker is set for the duration so racing readers see
    /// "not ready" instead of a half-written tree. callers re-extracting an
    /// existing snapshot must invalidate the `TreeCache` afterwards.
    pub fn extract(&self) -> Result<()> {
        self.set_marker()?;
        let result = extract(&self.archive, &self.dest);
        self.clear_marker();
        result
    }

    /// remove the extracted tree
    pub fn cleanup(&self) -> Result<()> {
        if self.dest.exists() {
            fs::remove_dir_all(&self.dest).with_path(&self.dest)?;
        }
        Ok(())
    }

    /// ready to serve: extracted on disk and no fresh in-progress marker
    pub fn is_extracted(&self) -> bool {
        self.dest.exists() && !self.marker_fresh()
    }

    fn marker_path(&self) -> PathBuf {
        let mut name = self
            .dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".extracting");
        self.dest.with_file_name(name)
    }

    fn set_marker(&self) -> Result<()> {
        let path = self.marker_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        fs::write(&path, b"").with_path(&path)?;
        Ok(())
    }

    fn clear_marker(&self) {
        let _ = fs::remove_file(self.marker_path());
    }

    /// the marker is advisory and time-boxed: a stale one (e.g. from a
    /// crashed worker) stops hiding the tree after the ttl
    fn marker_fresh(&self) -> bool {
        let age = fs::metadata(self.marker_path())
            .and_then(|m| m.modified())
            .and_then(|t| {
                SystemTime::now()
                    .duration_since(t)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            });
        match age {
            Ok(age) => age < self.options.marker_ttl,
            Err(_) => false,
        }
    }

    /// build the ordered listing for this snapshot
    ///
    /// degrades to an empty listing when the snapshot is not ready or the
    /// tree vanishes mid-walk (cleanup jobs race tree building).
    pub fn build_listing(&self, locale: &str) -> FileListing {
        if !self.is_extracted() {
            return FileListing::empty();
        }
        self.walk_listing(locale).unwrap_or_else(|_| FileListing::empty())
    }

    fn walk_listing(&self, locale: &str) -> Result<FileListing> {
        let mut paths = Vec::new();
        collect_ordered(&self.dest, &mut paths)?;

        let mut listing = FileListing::empty();
        for full in paths {
            let short = full
                .strip_prefix(&self.dest)
                .unwrap_or(&full)
                .to_string_lossy()
                .into_owned();
            listing.push(self.file_meta(short, &full, locale)?);
        }
        Ok(listing)
    }

    fn file_meta(&self, short: String, full: &Path, locale: &str) -> Result<FileMeta> {
        let meta = fs::symlink_metadata(full).with_path(full)?;
        let directory = meta.is_dir();

        let filename = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let depth = short.matches('/').count();
        let mimetype = classify::mime_for(&filename);

        let (checksum, prefix) = if directory {
            (String::new(), Vec::new())
        } else {
            hash_and_prefix(full)?
        };

        let category = if directory {
            FileCategory::Text
        } else {
            classify::classify(&self.options.blacklist, &filename, mimetype, &prefix)
        };

        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Ok(FileMeta {
            filename: filename.clone(),
            depth,
            directory,
            category,
            size: meta.len(),
            modified,
            checksum,
            mimetype,
            syntax: classify::syntax_for(&filename),
            view_url: format!(
                "/files/{}/file/{}?lang={}",
                self.snapshot_id, short, locale
            ),
            serve_url: format!(
                "/files/{}/serve/{}?lang={}",
                self.snapshot_id, short, locale
            ),
            short,
        })
    }

    /// pick the default file when the caller selects nothing
    pub fn default_key(&self, listing: &FileListing) -> Option<String> {
        for manifest in DEFAULT_MANIFESTS {
            if listing.contains(manifest) {
                return Some(manifest.to_string());
            }
        }
        listing.first().map(|meta| meta.short.clone())
    }

    /// read one file for display, degrading instead of failing
    pub fn read_file(&self, meta: &FileMeta) -> FileContent {
        if meta.size > self.options.read_limit {
            return FileContent::degraded(
                String::new(),
                format!(
                    "File size is over the limit of {} bytes.",
                    self.options.read_limit
                ),
            );
        }

        let full = self.dest.join(&meta.short);
        let bytes = match fs::read(&full) {
            Ok(bytes) => bytes,
            Err(_) => {
                return FileContent::degraded(String::new(), "That file no longer exists.")
            }
        };

        decode_text(&bytes)
    }
}

/// collect paths depth-first: sorted directories first, each immediately
/// followed by its own contents, then sorted files
fn collect_ordered(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_path(dir)? {
        let entry = entry.with_path(dir)?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else {
            files.push(path);
        }
    }

    dirs.sort();
    files.sort();

    for sub in dirs {
        out.push(sub.clone());
        collect_ordered(&sub, out)?;
    }
    out.extend(files);

    Ok(())
}

/// hash a file's content, keeping the first bytes for magic sniffing
fn hash_and_prefix(path: &Path) -> Result<(String, Vec<u8>)> {
    let mut file = File::open(path).with_path(path)?;
    let mut hasher = ContentHasher::new();
    let mut prefix = Vec::with_capacity(4);

    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).with_path(path)?;
        if n == 0 {
            break;
        }
        if prefix.len() < 4 {
            let take = (4 - prefix.len()).min(n);
            prefix.extend_from_slice(&buf[..take]);
        }
        hasher.update(&buf[..n]);
    }

    Ok((hasher.finalize().to_hex(), prefix))
}

/// decode bytes for display: utf-16 via byte-order-mark, utf-8 otherwise,
/// degrading to lossy decoding with a diagnostic
fn decode_text(bytes: &[u8]) -> FileContent {
    if bytes.starts_with(&[0xff, 0xfe]) || bytes.starts_with(&[0xfe, 0xff]) {
        let big_endian = bytes[0] == 0xfe;
        let payload = &bytes[2..];

        let mut units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| {
                if big_endian {
                    u16::from_be_bytes([pair[0], pair[1]])
                } else {
                    u16::from_le_bytes([pair[0], pair[1]])
                }
            })
            .collect();
        let odd_tail = payload.len() % 2 != 0;
        if odd_tail {
            units.push(u16::from(payload[payload.len() - 1]));
        }

        return match String::from_utf16(&units) {
            Ok(body) if !odd_tail => FileContent::ok(body),
            _ => FileContent::degraded(
                String::from_utf16_lossy(&units),
                "Problems decoding utf-16.",
            ),
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(body) => FileContent::ok(body.to_string()),
        Err(_) => FileContent::degraded(
            String::from_utf8_lossy(bytes).into_owned(),
            "Problems decoding utf-8.",
        ),
    }
}
