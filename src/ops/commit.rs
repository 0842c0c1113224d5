//! the archive-to-commit pipeline
//!
//! each run stages into its own uniquely named working tree attached to the
//! repository, so concurrent uploads never trample each other's files. the
//! only shared mutation point is the branch advance, which is a
//! compare-and-swap retried against the new tip on conflict.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::branches::{advance_branch, branch_tip};
use crate::error::{Error, IoResultExt, Result};
use crate::extract::extract;
use crate::hash::Hash;
use crate::object::{read_commit, write_blob, write_commit, write_tree};
use crate::repo::Repository;
use crate::store::Store;
use crate::types::{Channel, Commit, EntryKind, PackageKind, Tree, TreeEntry};

/// message on every pipeline-produced commit
pub const COMMIT_MESSAGE: &str = "Create new version";

/// an isolated, disposable working tree attached to a repository
///
/// removed unconditionally on drop, extraction failure included.
pub struct Worktree<'a> {
    path: PathBuf,
    _repo: &'a Repository,
}

impl<'a> Worktree<'a> {
    /// create a uniquely named working tree under the repository's arena
    pub fn create(repo: &'a Repository) -> Result<Self> {
        let path = repo
            .worktrees_path()
            .join(uuid::Uuid::new_v4().to_string());
        fs::create_dir_all(&path).with_path(&path)?;
        Ok(Self { path, _repo: repo })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// remove everything staged in the file area
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.path).with_path(&self.path)? {
            let entry = entry.with_path(&self.path)?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path).with_path(&path)?;
            } else {
                fs::remove_file(&path).with_path(&path)?;
            }
        }
        Ok(())
    }
}

impl Drop for Worktree<'_> {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// extract an uploaded archive and commit it onto the channel's branch
///
/// returns the new tip, or the unchanged tip when the staged tree is
/// identical to it. lost compare-and-swap races are retried with a
/// re-parented commit up to the configured bound, so concurrent commits to
/// one channel chain parent -> child instead of losing updates.
pub fn commit_package(
    store: &Store,
    archive: &Path,
    entity_id: u64,
    kind: PackageKind,
    channel: Channel,
) -> Result<Hash> {
    let repo = store.open_or_create(entity_id, kind)?;

    let worktree = Worktree::create(&repo)?;
    worktree.clear()?;
    extract(archive, worktree.path())?;

    tracing::debug!(
        entity = entity_id,
        channel = %channel,
        files = count_files(worktree.path()),
        "staging extracted package"
    );
    let tree_hash = stage_tree(&repo, worktree.path())?;

    let author = store.config().signature();
    let mut attempts = 0;
    loop {
        let tip = branch_tip(&repo, channel)?;
        let tip_commit = read_commit(&repo, &tip)?;

        if tip_commit.tree == tree_hash {
            tracing::debug!(entity = entity_id, channel = %channel, tip = %tip, "tree unchanged, no-op commit");
            return Ok(tip);
        }

        let commit = Commit::new(tree_hash, vec![tip], author.clone(), COMMIT_MESSAGE);
        let commit_hash = write_commit(&repo, &commit)?;

        match advance_branch(&repo, channel, &tip, &commit_hash) {
            Ok(()) => {
                tracing::info!(entity = entity_id, channel = %channel, commit = %commit_hash, "committed package");
                return Ok(commit_hash);
            }
            Err(Error::ConcurrencyConflict { .. })
                if attempts < store.config().max_advance_retries =>
            {
                // someone advanced the tip first: re-read and re-parent.
                // the orphaned commit object is unreferenced and harmless.
                attempts += 1;
                tracing::debug!(entity = entity_id, channel = %channel, attempt = attempts, "branch advanced concurrently, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// store a directory as tree objects, bottom-up
fn stage_tree(repo: &Repository, dir: &Path) -> Result<Hash> {
    let mut dir_entries: Vec<_> = fs::read_dir(dir)
        .with_path(dir)?
        .collect::<std::io::Result<Vec<_>>>()
        .with_path(dir)?;
    dir_entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut entries = Vec::new();
    for entry in dir_entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let kind = if path.is_dir() {
            let subtree = stage_tree(repo, &path)?;
            EntryKind::directory(subtree)
        } else {
            let content = fs::read(&path).with_path(&path)?;
            let hash = write_blob(repo, &content)?;
            EntryKind::file(hash, content.len() as u64)
        };

        entries.push(TreeEntry::new(name, kind));
    }

    let tree = Tree::new(entries)?;
    write_tree(repo, &tree)
}

/// count files in a directory (for progress reporting)
fn count_files(path: &Path) -> usize {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
