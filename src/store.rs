use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::repo::{PathLock, Repository};
use crate::types::PackageKind;

/// the store owning one repository per (entity, package kind)
///
/// repositories live at `<storage-root>/<entity-id>/<package-kind>/`; this
/// layout is part of the operational contract.
pub struct Store {
    root: PathBuf,
    config: StoreConfig,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// storage root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// store-wide configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// deterministic repository path for an entity and package kind
    pub fn repository_path(&self, entity_id: u64, kind: PackageKind) -> PathBuf {
        self.root.join(entity_id.to_string()).join(kind.dir_name())
    }

    /// open the entity's repository, creating it on first use
    ///
    /// creation is serialized by an exclusive lock on the entity directory
    /// so concurrent first use produces exactly one root commit; an
    /// existing repository is reopened without touching its history.
    pub fn open_or_create(&self, entity_id: u64, kind: PackageKind) -> Result<Repository> {
        let path = self.repository_path(entity_id, kind);

        // fast path: already initialized
        if path.join("config.toml").exists() {
            return Repository::open(&path);
        }

        let entity_dir = self.root.join(entity_id.to_string());
        fs::create_dir_all(&entity_dir).map_err(|source| Error::RepositoryInit {
            path: path.clone(),
            source,
        })?;

        let lock_path = entity_dir.join(format!(".{}.lock", kind.dir_name()));
        let _lock = PathLock::acquire(&lock_path)?;

        // re-check under the lock: another worker may have won the race
        if path.join("config.toml").exists() {
            return Repository::open(&path);
        }

        Repository::create(&path, entity_id, kind, &self.config.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branches;
    use crate::types::Channel;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("storage"), StoreConfig::default());
        (dir, store)
    }

    #[test]
    fn test_repository_path_layout() {
        let (_dir, store) = test_store();

        let path = store.repository_path(42, PackageKind::Package);
        assert!(path.ends_with("42/package"));

        let path = store.repository_path(42, PackageKind::Source);
        assert!(path.ends_with("42/source"));
    }

    #[test]
    fn test_open_or_create_initializes_once() {
        let (_dir, store) = test_store();

        let repo1 = store.open_or_create(1, PackageKind::Package).unwrap();
        let repo2 = store.open_or_create(1, PackageKind::Package).unwrap();

        // same path, same root commit: the second call reopened rather
        // than re-initialized
        assert_eq!(repo1.path(), repo2.path());
        assert_eq!(repo1.root_commit(), repo2.root_commit());
    }

    #[test]
    fn test_open_or_create_distinct_kinds() {
        let (_dir, store) = test_store();

        let pkg = store.open_or_create(1, PackageKind::Package).unwrap();
        let src = store.open_or_create(1, PackageKind::Source).unwrap();

        assert_ne!(pkg.path(), src.path());
    }

    #[test]
    fn test_open_preserves_branch_state() {
        let (_dir, store) = test_store();

        let repo = store.open_or_create(3, PackageKind::Package).unwrap();
        let tip = branches::branch_tip(&repo, Channel::Listed).unwrap();
        assert_eq!(tip, repo.root_commit());

        // reopening must not reset the branch
        let reopened = store.open_or_create(3, PackageKind::Package).unwrap();
        let tip_again = branches::branch_tip(&reopened, Channel::Listed).unwrap();
        assert_eq!(tip, tip_again);
    }

    #[test]
    fn test_concurrent_first_use_single_root_commit() {
        let (_dir, store) = test_store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store
                    .open_or_create(9, PackageKind::Package)
                    .unwrap()
                    .root_commit()
            }));
        }

        let roots: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(roots.windows(2).all(|w| w[0] == w[1]));
    }
}
