use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::Hash;

/// author identity attached to a commit
///
/// always the configured pipeline robot, never a human actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// a commit object pointing to a tree with metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// root tree hash
    pub tree: Hash,
    /// parent commit hashes (empty for the root commit, 1 otherwise)
    pub parents: Vec<Hash>,
    /// author identity
    pub author: Signature,
    /// unix timestamp (seconds since epoch)
    pub timestamp: i64,
    /// commit message
    pub message: String,
}

impl Commit {
    /// create a new commit
    pub fn new(
        tree: Hash,
        parents: Vec<Hash>,
        author: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parents,
            author,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
            message: message.into(),
        }
    }

    /// create a new commit with explicit timestamp
    pub fn with_timestamp(
        tree: Hash,
        parents: Vec<Hash>,
        author: Signature,
        timestamp: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parents,
            author,
            timestamp,
            message: message.into(),
        }
    }

    /// is this the root commit (no parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}
