use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::hash::{compute_content_hash, Hash};
use crate::repo::Repository;

/// write a blob to the object store
///
/// returns the content hash; identical content across versions
/// deduplicates to one stored object.
pub fn write_blob(repo: &Repository, content: &[u8]) -> Result<Hash> {
    let hash = compute_content_hash(content);
    super::write_object_bytes(repo, &repo.blobs_path(), &hash, content)?;
    Ok(hash)
}

/// get the filesystem path to a blob
pub fn blob_path(repo: &Repository, hash: &Hash) -> PathBuf {
    super::object_path(&repo.blobs_path(), hash)
}

/// check if a blob exists in the object store
pub fn blob_exists(repo: &Repository, hash: &Hash) -> bool {
    blob_path(repo, hash).exists()
}

/// read blob content
pub fn read_blob(repo: &Repository, hash: &Hash) -> Result<Vec<u8>> {
    let path = blob_path(repo, hash);
    fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ObjectNotFound(*hash)
        } else {
            Error::Io { path, source: e }
        }
    })
}
