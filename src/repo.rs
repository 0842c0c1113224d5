use std::fs::File;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::config::RepoConfig;
use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::object::{write_commit, write_tree};
use crate::types::{Commit, PackageKind, Signature, Tree};

/// message on the empty root commit every branch descends from
pub const ROOT_COMMIT_MESSAGE: &str = "Initializing repository";

/// one entity's versioned object store for a single package kind
pub struct Repository {
    path: PathBuf,
    config: RepoConfig,
}

impl Repository {
    /// initialize a fresh repository with an empty root commit
    ///
    /// callers must hold the creation lock for the path; use
    /// `Store::open_or_create` rather than calling this directly.
    pub(crate) fn create(
        path: &Path,
        entity_id: u64,
        package_kind: PackageKind,
        author: &Signature,
    ) -> Result<Self> {
        for sub in [
            "objects/blobs",
            "objects/trees",
            "objects/commits",
            "branches",
            "worktrees",
            "locks",
            "tmp",
        ] {
            std::fs::create_dir_all(path.join(sub)).map_err(|source| Error::RepositoryInit {
                path: path.to_path_buf(),
                source,
            })?;
        }

        // the root commit gives every channel branch a deterministic
        // ancestor before any package is committed
        let mut repo = Self {
            path: path.to_path_buf(),
            config: RepoConfig::new(entity_id, package_kind, Hash::ZERO),
        };
        let tree_hash = write_tree(&repo, &Tree::empty())?;
        let root = write_commit(
            &repo,
            &Commit::new(tree_hash, vec![], author.clone(), ROOT_COMMIT_MESSAGE),
        )?;
        repo.config.root_commit = root;

        // config.toml lands last: its presence marks a fully initialized
        // repository
        repo.config.save(&repo.config_path())?;

        Ok(repo)
    }

    /// open an existing repository
    pub fn open(path: &Path) -> Result<Self> {
        let config_path = path.join("config.toml");
        if !config_path.exists() {
            return Err(Error::NoRepository(path.to_path_buf()));
        }

        let config = RepoConfig::load(&config_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// repository root path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// owning entity id
    pub fn entity_id(&self) -> u64 {
        self.config.entity_id
    }

    /// which upload stream this repository stores
    pub fn package_kind(&self) -> PackageKind {
        self.config.package_kind
    }

    /// the empty root commit written at initialization
    pub fn root_commit(&self) -> Hash {
        self.config.root_commit
    }

    /// path to config.toml
    pub fn config_path(&self) -> PathBuf {
        self.path.join("config.toml")
    }

    /// path to blobs directory
    pub fn blobs_path(&self) -> PathBuf {
        self.path.join("objects/blobs")
    }

    /// path to trees directory
    pub fn trees_path(&self) -> PathBuf {
        self.path.join("objects/trees")
    }

    /// path to commits directory
    pub fn commits_path(&self) -> PathBuf {
        self.path.join("objects/commits")
    }

    /// path to branch pointers
    pub fn branches_path(&self) -> PathBuf {
        self.path.join("branches")
    }

    /// path to the isolated working tree arena
    pub fn worktrees_path(&self) -> PathBuf {
        self.path.join("worktrees")
    }

    /// path to lock files
    pub fn locks_path(&self) -> PathBuf {
        self.path.join("locks")
    }

    /// path to tmp directory (for atomic writes)
    pub fn tmp_path(&self) -> PathBuf {
        self.path.join("tmp")
    }
}

/// exclusive advisory lock on a path, released on drop
///
/// flock-based so it serializes across worker processes, not just threads.
pub struct PathLock {
    #[allow(dead_code)]
    flock: Flock<File>,
}

impl PathLock {
    /// block until the lock is held
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = File::create(path).with_path(path)?;
        let flock = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|_| Error::Lock(path.to_path_buf()))?;
        Ok(Self { flock })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn robot() -> Signature {
        Signature::new("Add-ons Robot", "robot@example.com")
    }

    #[test]
    fn test_repository_create() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("1/package");

        let repo = Repository::create(&repo_path, 1, PackageKind::Package, &robot()).unwrap();

        assert!(repo_path.join("objects/blobs").is_dir());
        assert!(repo_path.join("objects/trees").is_dir());
        assert!(repo_path.join("objects/commits").is_dir());
        assert!(repo_path.join("branches").is_dir());
        assert!(repo_path.join("worktrees").is_dir());
        assert!(repo_path.join("tmp").is_dir());
        assert!(repo_path.join("config.toml").is_file());

        assert_eq!(repo.entity_id(), 1);
        assert_ne!(repo.root_commit(), Hash::ZERO);
    }

    #[test]
    fn test_repository_root_commit_is_empty() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("1/package");

        let repo = Repository::create(&repo_path, 1, PackageKind::Package, &robot()).unwrap();

        let root = crate::object::read_commit(&repo, &repo.root_commit()).unwrap();
        assert!(root.is_root());
        assert_eq!(root.message, ROOT_COMMIT_MESSAGE);

        let tree = crate::object::read_tree(&repo, &root.tree).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_repository_open() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("7/source");

        let created = Repository::create(&repo_path, 7, PackageKind::Source, &robot()).unwrap();
        let opened = Repository::open(&repo_path).unwrap();

        assert_eq!(opened.path(), repo_path);
        assert_eq!(opened.entity_id(), 7);
        assert_eq!(opened.package_kind(), PackageKind::Source);
        assert_eq!(opened.root_commit(), created.root_commit());
    }

    #[test]
    fn test_repository_open_not_found() {
        let dir = tempdir().unwrap();
        let result = Repository::open(&dir.path().join("nonexistent"));
        assert!(matches!(result, Err(Error::NoRepository(_))));
    }

    #[test]
    fn test_path_lock_blocks_concurrent_holder() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");

        let held = PathLock::acquire(&lock_path).unwrap();

        // a second acquisition from another thread must wait for the drop
        let path = lock_path.clone();
        let handle = std::thread::spawn(move || {
            let _second = PathLock::acquire(&path).unwrap();
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(held);
        handle.join().unwrap();
    }
}
