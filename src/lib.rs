//! silo - versioned snapshot store for package archives
//!
//! the version-content core of an add-on registry: successive uploaded
//! archives belonging to a logical entity become immutable,
//! content-addressed snapshots in a per-entity repository, from which any
//! two snapshots can be diffed file-by-file and whose contents stream to a
//! search indexer.
//!
//! # Core concepts
//!
//! - **Blob**: one file's content, addressed by its SHA-256 hash
//! - **Tree**: a serialized directory structure (CBOR + zstd)
//! - **Commit**: a snapshot of a tree with metadata (CBOR + zstd)
//! - **Channel**: listed/unlisted release track, each a branch of history
//! - **Worktree**: an isolated, disposable checkout staging one commit
//!
//! # Example usage
//!
//! ```no_run
//! use silo::{ops, Channel, PackageKind, Store, StoreConfig};
//! use std::path::Path;
//!
//! let store = Store::new("/var/lib/silo", StoreConfig::default());
//!
//! // turn an uploaded archive into a commit on the entity's listed branch
//! let tip = ops::commit_package(
//!     &store,
//!     Path::new("/uploads/addon-1.2.xpi"),
//!     42,
//!     PackageKind::Package,
//!     Channel::Listed,
//! ).unwrap();
//!
//! // stream the committed blobs to the indexer
//! let repo = store.open_or_create(42, PackageKind::Package).unwrap();
//! for blob in ops::iter_blobs(&repo, &tip).unwrap() {
//!     println!("{} ({} bytes)", blob.path, blob.size);
//! }
//! ```

mod config;
mod error;
mod hash;
mod repo;
mod store;

pub mod branches;
pub mod classify;
pub mod extract;
pub mod object;
pub mod ops;
pub mod types;
pub mod viewer;

pub use config::{RepoConfig, StoreConfig};
pub use error::{Error, Result};
pub use hash::{compute_content_hash, ContentHasher, Hash};
pub use repo::{PathLock, Repository};
pub use store::Store;
pub use types::{Channel, Commit, EntryKind, PackageKind, Signature, Tree, TreeEntry};
