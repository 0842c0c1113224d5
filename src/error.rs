use std::path::PathBuf;

use crate::Hash;

/// error type for silo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("repository not found at {0}")]
    NoRepository(PathBuf),

    #[error("failed to initialize repository at {path}: {source}")]
    RepositoryInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch {branch} advanced concurrently")]
    ConcurrencyConflict { branch: String },

    #[error("object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("corrupt object: hash mismatch for {0}")]
    CorruptObject(Hash),

    #[error("path not found in tree: {0}")]
    PathNotFound(String),

    #[error("invalid tree entry name: {0}")]
    InvalidEntryName(String),

    #[error("duplicate tree entry name: {0}")]
    DuplicateEntryName(String),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("failed to lock {0}")]
    Lock(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cbor serialization error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("cbor deserialization error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
