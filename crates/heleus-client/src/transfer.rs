//! Download plumbing: response bodies streamed to disk and bundle extraction.
//!
//! Every file is written under a `.part` name and renamed into place only
//! once it is complete, so a failed transfer never leaves a truncated
//! artifact where a good one is expected.

use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use futures::StreamExt;
use heleus_core::{ContentDigest, ContentHasher};
use tokio::io::AsyncWriteExt;

use crate::error::ClientError;
use crate::progress::ProgressObserver;

/// A staging file removed on drop unless it was renamed into place.
#[derive(Debug)]
pub(crate) struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    pub(crate) fn for_target(target: &Path) -> Self {
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".part");
        Self {
            path: target.with_file_name(name),
            armed: true,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged bytes to `target`.
    pub(crate) fn persist(mut self, target: &Path) -> std::io::Result<()> {
        std::fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Bytes written by [`stream_to_file`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Written {
    pub digest: ContentDigest,
    pub size_bytes: u64,
}

/// Stream a response body into `file`, hashing as it goes.
pub(crate) async fn stream_to_file(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    endpoint: &str,
    observer: &dyn ProgressObserver,
) -> Result<Written, ClientError> {
    let mut hasher = ContentHasher::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| ClientError::Unreachable {
            endpoint: endpoint.to_string(),
            source,
        })?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        observer.advance(chunk.len() as u64);
    }
    file.flush().await?;
    file.sync_all().await?;
    let size_bytes = hasher.len();
    Ok(Written {
        digest: hasher.finalize(),
        size_bytes,
    })
}

/// Download a single artifact to `target`, checking it against `expected`
/// when the server announced a digest.
pub(crate) async fn download_artifact(
    response: reqwest::Response,
    target: &Path,
    expected: Option<ContentDigest>,
    endpoint: &str,
    observer: &dyn ProgressObserver,
) -> Result<Written, ClientError> {
    let staged = PartFile::for_target(target);
    let mut file = tokio::fs::File::create(staged.path()).await?;
    let written = stream_to_file(response, &mut file, endpoint, observer).await?;
    drop(file);

    if let Some(expected) = expected {
        if expected != written.digest {
            return Err(ClientError::Integrity {
                expected,
                actual: written.digest,
            });
        }
    }
    staged.persist(target)?;
    Ok(written)
}

/// Download a bundle into an anonymous temporary file under `dest` and
/// extract every entry into `dest`.
pub(crate) async fn download_bundle(
    response: reqwest::Response,
    dest: &Path,
    endpoint: &str,
    observer: &dyn ProgressObserver,
) -> Result<Vec<PathBuf>, ClientError> {
    let spool = tempfile::tempfile_in(dest)?;
    let mut file = tokio::fs::File::from_std(spool);
    let written = stream_to_file(response, &mut file, endpoint, observer).await?;
    tracing::debug!(size_bytes = written.size_bytes, "bundle downloaded");

    let spool = file.into_std().await;
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_bundle(spool, &dest))
        .await
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?
}

/// Extract every file entry of a bundle archive into `dest`.
pub(crate) fn extract_bundle(
    mut archive: std::fs::File,
    dest: &Path,
) -> Result<Vec<PathBuf>, ClientError> {
    archive.seek(SeekFrom::Start(0))?;
    let mut archive = zip::ZipArchive::new(archive)?;
    let mut extracted = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let target = match entry.enclosed_name() {
            Some(relative) => dest.join(relative),
            None => return Err(ClientError::UnsafeEntry(entry.name().to_string())),
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let staged = PartFile::for_target(&target);
        let mut out = std::fs::File::create(staged.path())?;
        std::io::copy(&mut entry, &mut out)?;
        out.sync_all()?;
        drop(out);
        staged.persist(&target)?;

        tracing::debug!(path = %target.display(), "extracted");
        extracted.push(target);
    }
    Ok(extracted)
}
