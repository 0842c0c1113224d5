use std::path::PathBuf;

use crate::error::Result;
use crate::hash::Hash;
use crate::repo::Repository;
use crate::types::Tree;

/// write a tree to the object store
pub fn write_tree(repo: &Repository, tree: &Tree) -> Result<Hash> {
    super::write_compressed(repo, &repo.trees_path(), tree)
}

/// read a tree from the object store
pub fn read_tree(repo: &Repository, hash: &Hash) -> Result<Tree> {
    super::read_compressed(&repo.trees_path(), hash)
}

/// get the filesystem path to a tree object
pub fn tree_path(repo: &Repository, hash: &Hash) -> PathBuf {
    super::object_path(&repo.trees_path(), hash)
}

/// check if a tree exists in the object store
pub fn tree_exists(repo: &Repository, hash: &Hash) -> bool {
    tree_path(repo, hash).exists()
}
