//! # Bundle Archives
//!
//! Builds the zip archive served by the bundle pull endpoints: one
//! `<app_name>.apk` entry per application.
//!
//! The archive is spooled to an anonymous temporary file, never held in
//! memory. Entries are stored uncompressed since APKs are already zip
//! files. Each artifact's digest is recomputed while it is copied, so a
//! corrupted object fails the bundle instead of shipping silently.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use heleus_core::{AppName, ContentDigest, ContentHasher};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppError;

const COPY_BUF: usize = 64 * 1024;

/// One artifact to include in a bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub app: AppName,
    pub digest: ContentDigest,
    pub path: PathBuf,
}

/// A finished archive, rewound and ready to stream.
#[derive(Debug)]
pub struct BundleFile {
    pub file: File,
    pub size_bytes: u64,
    pub entries: usize,
}

/// Write `entries` into a fresh zip archive. Blocking.
pub fn write_bundle(entries: &[BundleEntry]) -> Result<BundleFile, AppError> {
    let spool = tempfile::tempfile()
        .map_err(|e| AppError::Internal(format!("cannot create bundle spool: {e}")))?;
    let mut zip = ZipWriter::new(spool);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);

    let mut buf = vec![0u8; COPY_BUF];
    for entry in entries {
        let mut source = File::open(&entry.path).map_err(|e| {
            AppError::Internal(format!(
                "artifact {} for {} is unreadable: {e}",
                entry.digest, entry.app
            ))
        })?;
        zip.start_file(entry.app.artifact_filename(), options)
            .map_err(zip_error)?;

        let mut hasher = ContentHasher::new();
        loop {
            let n = source.read(&mut buf).map_err(io_error)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            zip.write_all(&buf[..n]).map_err(io_error)?;
        }
        let actual = hasher.finalize();
        if actual != entry.digest {
            return Err(AppError::Internal(format!(
                "integrity violation bundling {}: stored as {} but hashes to {actual}",
                entry.app, entry.digest
            )));
        }
    }

    let mut file = zip.finish().map_err(zip_error)?;
    let size_bytes = file.seek(SeekFrom::End(0)).map_err(io_error)?;
    file.seek(SeekFrom::Start(0)).map_err(io_error)?;
    Ok(BundleFile {
        file,
        size_bytes,
        entries: entries.len(),
    })
}

fn zip_error(err: zip::result::ZipError) -> AppError {
    AppError::Internal(format!("bundle archive error: {err}"))
}

fn io_error(err: std::io::Error) -> AppError {
    AppError::Internal(format!("bundle I/O error: {err}"))
}
