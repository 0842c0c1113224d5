use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};
use crate::hash::Hash;
use crate::types::{PackageKind, Signature};

/// store-wide configuration
///
/// the committing identity is the automated pipeline, never a human actor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// author name used for every commit written by the pipeline
    pub author_name: String,
    /// author email used for every commit written by the pipeline
    pub author_email: String,
    /// maximum file size served by the viewer before degrading to a
    /// size-limit diagnostic
    pub read_limit: u64,
    /// seconds after which an extraction-in-progress marker is considered
    /// stale and ignored
    pub marker_ttl_secs: u64,
    /// bounded retries when a branch advance loses the compare-and-swap race
    pub max_advance_retries: u32,
}

impl StoreConfig {
    /// load config from a toml file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: StoreConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to a toml file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    /// signature of the automated committer
    pub fn signature(&self) -> Signature {
        Signature::new(&self.author_name, &self.author_email)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            author_name: "Add-ons Robot".to_string(),
            author_email: "addons-automation@example.com".to_string(),
            read_limit: 1024 * 1024,
            marker_ttl_secs: 300,
            max_advance_retries: 3,
        }
    }
}

/// per-repository configuration stored in config.toml
///
/// its presence distinguishes an initialized repository from a bare
/// directory, so open-or-create never re-initializes existing history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoConfig {
    /// owning entity id
    pub entity_id: u64,
    /// which upload stream this repository stores
    pub package_kind: PackageKind,
    /// the empty root commit every channel branch descends from
    pub root_commit: Hash,
}

impl RepoConfig {
    pub fn new(entity_id: u64, package_kind: PackageKind, root_commit: Hash) -> Self {
        Self {
            entity_id,
            package_kind,
            root_commit,
        }
    }

    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: RepoConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.read_limit, 1024 * 1024);
        assert_eq!(config.max_advance_retries, 3);
        assert!(config.author_name.contains("Robot"));
    }

    #[test]
    fn test_store_config_toml_roundtrip() {
        let config = StoreConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: StoreConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.author_name, parsed.author_name);
        assert_eq!(config.author_email, parsed.author_email);
        assert_eq!(config.read_limit, parsed.read_limit);
        assert_eq!(config.marker_ttl_secs, parsed.marker_ttl_secs);
    }

    #[test]
    fn test_store_config_signature() {
        let config = StoreConfig::default();
        let sig = config.signature();
        assert_eq!(sig.name, config.author_name);
        assert_eq!(sig.email, config.author_email);
    }

    #[test]
    fn test_repo_config_roundtrip() {
        let config = RepoConfig::new(42, PackageKind::Package, Hash::ZERO);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: RepoConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.entity_id, 42);
        assert_eq!(parsed.package_kind, PackageKind::Package);
        assert_eq!(parsed.root_commit, Hash::ZERO);
    }

    #[test]
    fn test_repo_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = RepoConfig::new(7, PackageKind::Source, Hash::ZERO);
        config.save(&path).unwrap();

        let loaded = RepoConfig::load(&path).unwrap();
        assert_eq!(loaded.entity_id, 7);
        assert_eq!(loaded.package_kind, PackageKind::Source);
    }
}
