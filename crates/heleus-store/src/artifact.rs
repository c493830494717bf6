//! # Artifact Store
//!
//! Append-only, content-addressed storage of APK blobs.
//!
//! ## Layout
//!
//! ```text
//! {root}/objects/{digest_hex}   committed artifacts
//! {root}/staging/{uuid}.part    uploads in flight
//! ```
//!
//! ## Atomic Commit
//!
//! Bytes are streamed into a staging file while the digest is computed
//! incrementally. Only after the last byte is written and fsynced is the
//! staging file renamed to `objects/{digest}`. A writer that is dropped
//! before [`ArtifactWriter::commit`] (client disconnect, size ceiling,
//! I/O failure) deletes its staging file, so an interrupted upload is
//! never addressable.
//!
//! ## Concurrency
//!
//! No locks. Concurrent uploads use distinct staging files, and two
//! commits of identical bytes rename identical content onto the same
//! name, which is harmless.
//!
//! ## Integrity
//!
//! [`ArtifactStore::get`] recomputes the digest of the stored bytes and
//! fails with [`StoreError::Integrity`] on mismatch.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use heleus_core::{sha256_digest, ContentDigest, ContentHasher};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::fsio;

/// An immutable stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub digest: ContentDigest,
    pub size_bytes: u64,
    pub stored_at: DateTime<Utc>,
}

/// Result of committing an upload.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub artifact: Artifact,
    /// True when the bytes were already stored before this upload.
    pub deduplicated: bool,
}

/// A committed artifact opened for streaming.
#[derive(Debug)]
pub struct OpenArtifact {
    pub artifact: Artifact,
    pub file: fs::File,
}

/// Filesystem-backed content-addressed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    objects_dir: PathBuf,
    staging_dir: PathBuf,
}

impl ArtifactStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Leftover staging files from a previous run are removed: an upload
    /// that was in flight when the process died can never be resumed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let objects_dir = root.join("objects");
        let staging_dir = root.join("staging");
        std::fs::create_dir_all(&objects_dir)?;
        std::fs::create_dir_all(&staging_dir)?;

        let swept = fsio::sweep(&staging_dir)?;
        if swept > 0 {
            tracing::warn!(swept, "removed interrupted uploads from staging");
        }

        Ok(Self {
            objects_dir,
            staging_dir,
        })
    }

    /// Filesystem path of the committed object for `digest`.
    pub fn path_of(&self, digest: &ContentDigest) -> PathBuf {
        self.objects_dir.join(digest.to_hex())
    }

    /// Start a streaming upload. `limit` is the size ceiling in bytes.
    pub async fn begin(&self, limit: Option<u64>) -> Result<ArtifactWriter, StoreError> {
        let staging_path = self
            .staging_dir
            .join(format!("{}.part", uuid::Uuid::new_v4()));
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging_path)
            .await?;
        Ok(ArtifactWriter {
            file: Some(file),
            staging_path,
            objects_dir: self.objects_dir.clone(),
            hasher: ContentHasher::new(),
            limit,
            committed: false,
        })
    }

    /// Store a complete byte slice. Idempotent.
    pub async fn put(&self, bytes: &[u8]) -> Result<PutOutcome, StoreError> {
        let mut writer = self.begin(None).await?;
        writer.write_chunk(bytes).await?;
        writer.commit().await
    }

    /// Whether an artifact with this digest is stored.
    pub async fn exists(&self, digest: &ContentDigest) -> Result<bool, StoreError> {
        Ok(fs::try_exists(self.path_of(digest)).await?)
    }

    /// Size and storage time of a committed artifact.
    pub async fn metadata(&self, digest: &ContentDigest) -> Result<Artifact, StoreError> {
        let meta = fs::metadata(self.path_of(digest))
            .await
            .map_err(|e| not_found_or_io(e, digest))?;
        Ok(Artifact {
            digest: *digest,
            size_bytes: meta.len(),
            stored_at: stored_at(meta.modified()?),
        })
    }

    /// Open a committed artifact for streaming.
    pub async fn open(&self, digest: &ContentDigest) -> Result<OpenArtifact, StoreError> {
        let file = fs::File::open(self.path_of(digest))
            .await
            .map_err(|e| not_found_or_io(e, digest))?;
        let meta = file.metadata().await?;
        Ok(OpenArtifact {
            artifact: Artifact {
                digest: *digest,
                size_bytes: meta.len(),
                stored_at: stored_at(meta.modified()?),
            },
            file,
        })
    }

    /// Read a whole artifact, verifying it still hashes to its address.
    pub async fn get(&self, digest: &ContentDigest) -> Result<Vec<u8>, StoreError> {
        let bytes = fs::read(self.path_of(digest))
            .await
            .map_err(|e| not_found_or_io(e, digest))?;
        let actual = sha256_digest(&bytes);
        if actual != *digest {
            return Err(StoreError::Integrity {
                expected: *digest,
                actual,
            });
        }
        Ok(bytes)
    }
}

fn not_found_or_io(err: std::io::Error, digest: &ContentDigest) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::ArtifactNotFound(*digest)
    } else {
        StoreError::Io(err)
    }
}

fn stored_at(modified: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(modified)
}

/// An upload in progress. Dropping it without committing discards it.
#[derive(Debug)]
pub struct ArtifactWriter {
    file: Option<fs::File>,
    staging_path: PathBuf,
    objects_dir: PathBuf,
    hasher: ContentHasher,
    limit: Option<u64>,
    committed: bool,
}

impl ArtifactWriter {
    /// Append the next chunk. Fails once the running total passes the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        let total = self.hasher.len() + chunk.len() as u64;
        if let Some(limit) = self.limit {
            if total > limit {
                return Err(StoreError::InvalidArtifact(format!(
                    "artifact exceeds the size ceiling of {limit} bytes"
                )));
            }
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StoreError::Io(std::io::Error::other("writer already finished")))?;
        file.write_all(chunk).await?;
        self.hasher.update(chunk);
        Ok(())
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.hasher.len()
    }

    /// Durably commit the upload under its content digest.
    pub async fn commit(mut self) -> Result<PutOutcome, StoreError> {
        if self.hasher.is_empty() {
            return Err(StoreError::InvalidArtifact("artifact is empty".into()));
        }
        let mut file = self
            .file
            .take()
            .ok_or_else(|| StoreError::Io(std::io::Error::other("writer already finished")))?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let size_bytes = self.hasher.len();
        let digest = std::mem::take(&mut self.hasher).finalize();
        let target = self.objects_dir.join(digest.to_hex());

        let deduplicated = fs::try_exists(&target).await?;
        if deduplicated {
            fs::remove_file(&self.staging_path).await?;
        } else {
            fs::rename(&self.staging_path, &target).await?;
        }
        self.committed = true;

        let meta = fs::metadata(&target).await?;
        tracing::debug!(hash = %digest, size_bytes, deduplicated, "artifact committed");
        Ok(PutOutcome {
            artifact: Artifact {
                digest,
                size_bytes,
                stored_at: stored_at(meta.modified()?),
            },
            deduplicated,
        })
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.staging_path);
        }
    }
}
