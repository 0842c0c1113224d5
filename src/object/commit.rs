use std::path::PathBuf;

use crate::error::Result;
use crate::hash::Hash;
use crate::repo::Repository;
use crate::types::Commit;

/// write a commit to the object store
pub fn write_commit(repo: &Repository, commit: &Commit) -> Result<Hash> {
    super::write_compressed(repo, &repo.commits_path(), commit)
}

/// read a commit from the object store
pub fn read_commit(repo: &Repository, hash: &Hash) -> Result<Commit> {
    super::read_compressed(&repo.commits_path(), hash)
}

/// get the filesystem path to a commit object
pub fn commit_path(repo: &Repository, hash: &Hash) -> PathBuf {
    super::object_path(&repo.commits_path(), hash)
}

/// check if a commit exists in the object store
pub fn commit_exists(repo: &Repository, hash: &Hash) -> bool {
    commit_path(repo, hash).exists()
}
