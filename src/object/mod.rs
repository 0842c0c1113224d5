//! on-disk object storage
//!
//! blobs hold raw file content addressed by its hash; trees and commits are
//! CBOR serialized, zstd compressed, and addressed by the hash of the
//! compressed bytes. all writes are atomic (temp, fsync, rename) and
//! deduplicate by hash.

mod blob;
mod commit;
mod tree;

pub use blob::{blob_exists, blob_path, read_blob, write_blob};
pub use commit::{commit_exists, commit_path, read_commit, write_commit};
pub use tree::{read_tree, tree_exists, tree_path, write_tree};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::repo::Repository;

/// zstd level for tree and commit objects: fast, reasonable ratio
const COMPRESSION_LEVEL: i32 = 3;

/// serialize, compress and store an object, returning its hash
fn write_compressed<T: Serialize>(repo: &Repository, base: &Path, value: &T) -> Result<Hash> {
    let mut cbor_bytes = Vec::new();
    ciborium::into_writer(value, &mut cbor_bytes)?;

    let compressed = zstd::encode_all(&cbor_bytes[..], COMPRESSION_LEVEL).map_err(|e| Error::Io {
        path: PathBuf::from("<zstd>"),
        source: e,
    })?;

    // the hash covers the compressed bytes
    let hash = Hash::from_bytes(Sha256::digest(&compressed).into());
    write_object_bytes(repo, base, &hash, &compressed)?;

    Ok(hash)
}

/// load, verify, decompress and deserialize an object
fn read_compressed<T: DeserializeOwned>(base: &Path, hash: &Hash) -> Result<T> {
    let path = object_path(base, hash);

    let compressed = fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ObjectNotFound(*hash)
        } else {
            Error::Io {
                path: path.clone(),
                source: e,
            }
        }
    })?;

    let actual_hash = Hash::from_bytes(Sha256::digest(&compressed).into());
    if actual_hash != *hash {
        return Err(Error::CorruptObject(*hash));
    }

    let cbor_bytes = zstd::decode_all(&compressed[..]).map_err(|e| Error::Io {
        path: path.clone(),
        source: e,
    })?;

    let value: T = ciborium::from_reader(&cbor_bytes[..])?;
    Ok(value)
}

/// store raw object bytes under their hash, atomically and with dedup
fn write_object_bytes(repo: &Repository, base: &Path, hash: &Hash, bytes: &[u8]) -> Result<()> {
    let (dir, file) = hash.to_path_components();
    let object_dir = base.join(&dir);
    let object_path = object_dir.join(&file);

    // dedup: identical content is already stored
    if object_path.exists() {
        return Ok(());
    }

    fs::create_dir_all(&object_dir).with_path(&object_dir)?;

    // atomic write: temp -> fsync -> rename
    let tmp_path = repo.tmp_path().join(uuid::Uuid::new_v4().to_string());
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        tmp_file.write_all(bytes).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }

    fs::rename(&tmp_path, &object_path).with_path(&object_path)?;
    fsync_dir(&object_dir)?;

    Ok(())
}

/// filesystem path of an object under a base directory
fn object_path(base: &Path, hash: &Hash) -> PathBuf {
    let (dir, file) = hash.to_path_components();
    base.join(dir).join(file)
}

/// fsync a directory
fn fsync_dir(path: &Path) -> Result<()> {
    let dir = File::open(path).with_path(path)?;
    dir.sync_all().with_path(path)?;
    Ok(())
}
