use crate::branches::branch_tip;
use crate::error::Result;
use crate::hash::Hash;
use crate::object::read_commit;
use crate::repo::Repository;
use crate::types::{Channel, Commit};

/// commit with its hash for history output
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub hash: Hash,
    pub commit: Commit,
}

/// walk a channel's history from its tip to the root commit, newest first
///
/// pipeline history is linear (one parent per commit), so this follows
/// first parents only.
pub fn history(
    repo: &Repository,
    channel: Channel,
    max_count: Option<usize>,
) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    let mut cursor = Some(branch_tip(repo, channel)?);

    while let Some(hash) = cursor {
        if let Some(max) = max_count {
            if entries.len() >= max {
                break;
            }
        }

        let commit = read_commit(repo, &hash)?;
        cursor = commit.parents.first().copied();
        entries.push(LogEntry { hash, commit });
    }

    Ok(entries)
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "commit {}", self.hash)?;
        writeln!(f, "Author: {}", self.commit.author)?;
        writeln!(f, "Date:   {} (unix)", self.commit.timestamp)?;
        writeln!(f)?;
        for line in self.commit.message.lines() {
            writeln!(f, "    {}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::ops::commit_package;
    use crate::store::Store;
    use crate::types::PackageKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_history_newest_first() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("storage"), StoreConfig::default());

        let v1 = dir.path().join("v1.xml");
        fs::write(&v1, "<v1/>").unwrap();
        let v2 = dir.path().join("v2.xml");
        fs::write(&v2, "<v2/>").unwrap();

        let first =
            commit_package(&store, &v1, 1, PackageKind::Package, Channel::Listed).unwrap();
        let second =
            commit_package(&store, &v2, 1, PackageKind::Package, Channel::Listed).unwrap();

        let repo = store.open_or_create(1, PackageKind::Package).unwrap();
        let entries = history(&repo, Channel::Listed, None).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].hash, second);
        assert_eq!(entries[1].hash, first);
        assert!(entries[2].commit.is_root());
    }

    #[test]
    fn test_history_unborn_branch_has_root() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("storage"), StoreConfig::default());

        let repo = store.open_or_create(1, PackageKind::Package).unwrap();
        let entries = history(&repo, Channel::Unlisted, None).unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].commit.is_root());
    }

    #[test]
    fn test_history_max_count() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("storage"), StoreConfig::default());

        let v1 = dir.path().join("v1.xml");
        fs::write(&v1, "<v1/>").unwrap();
        commit_package(&store, &v1, 1, PackageKind::Package, Channel::Listed).unwrap();

        let repo = store.open_or_create(1, PackageKind::Package).unwrap();
        let entries = history(&repo, Channel::Listed, Some(1)).unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!entries[0].commit.is_root());
    }

    #[test]
    fn test_log_entry_display() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("storage"), StoreConfig::default());

        let repo = store.open_or_create(1, PackageKind::Package).unwrap();
        let entries = history(&repo, Channel::Listed, None).unwrap();

        let rendered = format!("{}", entries[0]);
        assert!(rendered.contains("commit "));
        assert!(rendered.contains("Add-ons Robot"));
        assert!(rendered.contains("Initializing repository"));
    }
}
