//! channel branch pointers
//!
//! a branch is a file under `branches/` holding a commit hash. advancing a
//! branch is a compare-and-swap under a per-branch file lock, so two
//! pipelines racing on the same channel serialize into parent -> child
//! order instead of one overwriting the other's tip.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::repo::{PathLock, Repository};
use crate::types::Channel;

/// get filesystem path for a channel's branch pointer
pub fn branch_path(repo: &Repository, channel: Channel) -> PathBuf {
    repo.branches_path().join(channel.branch_name())
}

/// check if a branch exists
pub fn branch_exists(repo: &Repository, channel: Channel) -> bool {
    branch_path(repo, channel).exists()
}

/// read a branch pointer
pub fn read_branch(repo: &Repository, channel: Channel) -> Result<Hash> {
    let path = branch_path(repo, channel);

    let content = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::BranchNotFound(channel.branch_name().to_string())
        } else {
            Error::Io {
                path: path.clone(),
                source: e,
            }
        }
    })?;

    Hash::from_hex(content.trim())
}

/// current tip of a channel's branch
///
/// branches are created lazily, pointing at the repository's root commit.
pub fn branch_tip(repo: &Repository, channel: Channel) -> Result<Hash> {
    match read_branch(repo, channel) {
        Ok(hash) => Ok(hash),
        Err(Error::BranchNotFound(_)) => {
            let _lock = branch_lock(repo, channel)?;

            // another worker may have created it while we waited
            match read_branch(repo, channel) {
                Ok(hash) => Ok(hash),
                Err(Error::BranchNotFound(_)) => {
                    let root = repo.root_commit();
                    write_branch(repo, channel, &root)?;
                    Ok(root)
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// advance a branch from `expected` to `new`
///
/// fails with `ConcurrencyConflict` when the tip no longer matches
/// `expected`; the caller re-reads the tip and retries with a re-parented
/// commit.
pub fn advance_branch(
    repo: &Repository,
    channel: Channel,
    expected: &Hash,
    new: &Hash,
) -> Result<()> {
    let _lock = branch_lock(repo, channel)?;

    let current = match read_branch(repo, channel) {
        Ok(hash) => hash,
        Err(Error::BranchNotFound(_)) => repo.root_commit(),
        Err(e) => return Err(e),
    };

    if current != *expected {
        return Err(Error::ConcurrencyConflict {
            branch: channel.branch_name().to_string(),
        });
    }

    write_branch(repo, channel, new)
}

/// write a branch pointer (create or overwrite)
///
/// callers race unless they hold the branch lock; use `advance_branch` for
/// anything past the lazy initial write.
fn write_branch(repo: &Repository, channel: Channel, hash: &Hash) -> Result<()> {
    let path = branch_path(repo, channel);

    // atomic write: temp -> fsync -> rename
    let tmp_path = repo.tmp_path().join(uuid::Uuid::new_v4().to_string());
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        writeln!(tmp_file, "{}", hash.to_hex()).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }

    fs::rename(&tmp_path, &path).with_path(&path)?;

    // fsync parent directory
    let dir = File::open(repo.branches_path()).with_path(repo.branches_path())?;
    dir.sync_all().with_path(repo.branches_path())?;

    Ok(())
}

/// exclusive per-branch lock shared by tip creation and advance
fn branch_lock(repo: &Repository, channel: Channel) -> Result<PathLock> {
    let lock_path = repo
        .locks_path()
        .join(format!("{}.lock", channel.branch_name()));
    PathLock::acquire(&lock_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageKind, Signature};
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("1/package");
        let repo = Repository::create(
            &repo_path,
            1,
            PackageKind::Package,
            &Signature::new("robot", "robot@example.com"),
        )
        .unwrap();
        (dir, repo)
    }

    fn fake_hash(fill: u8) -> Hash {
        Hash::from_bytes([fill; 32])
    }

    #[test]
    fn test_branch_created_lazily_at_root() {
        let (_dir, repo) = test_repo();

        assert!(!branch_exists(&repo, Channel::Listed));

        let tip = branch_tip(&repo, Channel::Listed).unwrap();
        assert_eq!(tip, repo.root_commit());
        assert!(branch_exists(&repo, Channel::Listed));

        // unlisted is still untouched
        assert!(!branch_exists(&repo, Channel::Unlisted));
    }

    #[test]
    fn test_read_missing_branch() {
        let (_dir, repo) = test_repo();

        let result = read_branch(&repo, Channel::Unlisted);
        assert!(matches!(result, Err(Error::BranchNotFound(_))));
    }

    #[test]
    fn test_advance_branch() {
        let (_dir, repo) = test_repo();

        let root = branch_tip(&repo, Channel::Listed).unwrap();
        let next = fake_hash(0x11);

        advance_branch(&repo, Channel::Listed, &root, &next).unwrap();
        assert_eq!(read_branch(&repo, Channel::Listed).unwrap(), next);
    }

    #[test]
    fn test_advance_from_unborn_branch() {
        let (_dir, repo) = test_repo();

        // branch file does not exist yet; the implicit tip is the root
        let next = fake_hash(0x22);
        advance_branch(&repo, Channel::Unlisted, &repo.root_commit(), &next).unwrap();
        assert_eq!(read_branch(&repo, Channel::Unlisted).unwrap(), next);
    }

    #[test]
    fn test_advance_with_stale_expected_conflicts() {
        let (_dir, repo) = test_repo();

        let root = branch_tip(&repo, Channel::Listed).unwrap();
        let first = fake_hash(0x33);
        advance_branch(&repo, Channel::Listed, &root, &first).unwrap();

        // a second advance still expecting the root has lost the race
        let second = fake_hash(0x44);
        let result = advance_branch(&repo, Channel::Listed, &root, &second);

        assert!(matches!(result, Err(Error::ConcurrencyConflict { .. })));
        assert_eq!(read_branch(&repo, Channel::Listed).unwrap(), first);
    }

    #[test]
    fn test_branch_names_are_fixed() {
        let (_dir, repo) = test_repo();

        assert!(branch_path(&repo, Channel::Listed).ends_with("branches/listed"));
        assert!(branch_path(&repo, Channel::Unlisted).ends_with("branches/unlisted"));
    }
}
