//! streaming committed file content to the search indexer
//!
//! one lazy pass over a commit's tree; constructing the iterator again
//! restarts the export (the object graph is immutable). a blob that fails
//! to read is skipped and reported, never aborting the whole export.

use crate::classify;
use crate::error::Result;
use crate::hash::Hash;
use crate::object::{read_blob, read_commit, read_tree};
use crate::repo::Repository;
use crate::types::{EntryKind, Tree};

/// one indexable file of a commit
#[derive(Clone, Debug)]
pub struct BlobRecord {
    /// path relative to the package root
    pub path: String,
    pub content: Vec<u8>,
    pub size: u64,
    /// commit the blob belongs to
    pub commit: Hash,
    /// owning entity id
    pub entity_id: u64,
    /// syntax-label language guess for the indexer
    pub language: &'static str,
}

/// a blob that could not be read during an export
#[derive(Clone, Debug)]
pub struct SkippedBlob {
    pub path: String,
    pub reason: String,
}

struct Frame {
    prefix: String,
    tree: Tree,
    next: usize,
}

/// lazy depth-first pass over a commit's blobs
pub struct BlobIterator<'a> {
    repo: &'a Repository,
    commit: Hash,
    stack: Vec<Frame>,
    skipped: Vec<SkippedBlob>,
}

/// start an export over a commit's file tree
pub fn iter_blobs<'a>(repo: &'a Repository, commit: &Hash) -> Result<BlobIterator<'a>> {
    let commit_obj = read_commit(repo, commit)?;
    let tree = read_tree(repo, &commit_obj.tree)?;

    Ok(BlobIterator {
        repo,
        commit: *commit,
        stack: vec![Frame {
            prefix: String::new(),
            tree,
            next: 0,
        }],
        skipped: Vec::new(),
    })
}

impl BlobIterator<'_> {
    /// blobs skipped so far because they failed to read
    pub fn skipped(&self) -> &[SkippedBlob] {
        &self.skipped
    }

    fn skip(&mut self, path: String, reason: String) {
        tracing::warn!(path = %path, reason = %reason, commit = %self.commit, "skipping unreadable blob");
        self.skipped.push(SkippedBlob { path, reason });
    }
}

impl Iterator for BlobIterator<'_> {
    type Item = BlobRecord;

    fn next(&mut self) -> Option<BlobRecord> {
        loop {
            // drop exhausted frames
            match self.stack.last() {
                None => return None,
                Some(frame) if frame.next >= frame.tree.len() => {
                    self.stack.pop();
                    continue;
                }
                Some(_) => {}
            }

            let frame = self.stack.last_mut()?;
            let entry = frame.tree.entries()[frame.next].clone();
            frame.next += 1;
            let path = if frame.prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", frame.prefix, entry.name)
            };

            match entry.kind {
                EntryKind::Directory { hash } => match read_tree(self.repo, &hash) {
                    Ok(tree) => self.stack.push(Frame {
                        prefix: path,
                        tree,
                        next: 0,
                    }),
                    Err(e) => self.skip(path, e.to_string()),
                },
                EntryKind::File { hash, size } => match read_blob(self.repo, &hash) {
                    Ok(content) => {
                        return Some(BlobRecord {
                            language: classify::syntax_for(&entry.name),
                            path,
                            content,
                            size,
                            commit: self.commit,
                            entity_id: self.repo.entity_id(),
                        })
                    }
                    Err(e) => self.skip(path, e.to_string()),
                },
            }
        }
    }
}
