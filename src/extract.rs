//! archive extraction into ephemeral working directories
//!
//! handles the two package shapes the registry accepts: a bare single-file
//! package (e.g. an opensearch definition) and a zip-family archive.
//! extraction only ever writes below the destination directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Error, IoResultExt, Result};

/// extensions treated as zip-family archives
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "xpi", "jar", "crx"];

/// zip local file header magic
const ZIP_MAGIC: &[u8] = b"PK";

/// extract a package into `dest`
///
/// `dest` and its parents are created idempotently. single-file packages
/// are copied verbatim under their original filename; archives expand
/// preserving their internal directory structure. entries escaping `dest`
/// fail the whole extraction.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_path(dest)?;

    let result = if is_archive_package(archive)? {
        extract_archive(archive, dest)
    } else {
        copy_single_file(archive, dest)
    };

    if let Err(ref err) = result {
        tracing::error!(archive = %archive.display(), error = %err, "extraction failed");
    }
    result
}

/// is this a zip-family archive, by extension or magic number
fn is_archive_package(archive: &Path) -> Result<bool> {
    let ext = archive
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if let Some(ext) = ext {
        if ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(true);
        }
    }

    let mut prefix = [0u8; 2];
    let mut file = File::open(archive).with_path(archive)?;
    let n = file.read(&mut prefix).with_path(archive)?;
    Ok(n == 2 && prefix == *ZIP_MAGIC)
}

/// copy a bare single-file package into the destination
fn copy_single_file(archive: &Path, dest: &Path) -> Result<()> {
    let filename = archive
        .file_name()
        .ok_or_else(|| extraction_error(archive, "package has no filename"))?;
    fs::copy(archive, dest.join(filename)).with_path(archive)?;
    Ok(())
}

/// fully expand a zip archive into the destination
fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_path(archive)?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| extraction_error(archive, e.to_string()))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| extraction_error(archive, e.to_string()))?;

        // enclosed_name rejects absolute paths and parent-dir traversal
        let relative = entry.enclosed_name().ok_or_else(|| {
            extraction_error(
                archive,
                format!("entry escapes destination: {}", entry.name()),
            )
        })?;
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).with_path(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        let mut outfile = File::create(&outpath).with_path(&outpath)?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| extraction_error(archive, e.to_string()))?;
    }

    Ok(())
}

fn extraction_error(archive: &Path, reason: impl Into<String>) -> Error {
    Error::Extraction {
        archive: archive.to_path_buf(),
        reason: reason.into(),
    }
}
