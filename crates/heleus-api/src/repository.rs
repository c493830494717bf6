//! # Repository Service
//!
//! Orchestrates the artifact store, application registry and snapshot
//! manager for the HTTP handlers. Handlers deal with transport concerns
//! (multipart parsing, headers, streaming); everything else lives here.
//!
//! ## Push
//!
//! [`RepositoryService::begin_push`] validates the filename and opens a
//! streaming writer; the handler feeds it chunk by chunk;
//! [`RepositoryService::complete_push`] commits the artifact and only
//! then records the push in the registry. An upload abandoned at any
//! point before commit leaves neither an artifact nor a history entry.
//!
//! ## Blocking Work
//!
//! Registry and snapshot writes fsync small JSON documents while holding
//! `parking_lot` locks, so they run on the blocking pool.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use heleus_core::wire::{
    AppEntry, AppHistoryEntry, AppHistoryResponse, AppVersionEntry, AppsResponse,
    FreezeResponse, PushResponse, SnapshotResponse, VersionEntry, VersionsResponse,
};
use heleus_core::{AppName, ContentDigest, VersionName, VersionSelector};
use heleus_store::{
    ApplicationRegistry, ArtifactStore, ArtifactWriter, OpenArtifact, PushRecord,
    SnapshotManager, StoreError,
};

use crate::bundle::{self, BundleEntry, BundleFile};
use crate::error::AppError;

/// The repository behind the HTTP API.
#[derive(Debug)]
pub struct RepositoryService {
    artifacts: ArtifactStore,
    registry: Arc<ApplicationRegistry>,
    snapshots: Arc<SnapshotManager>,
    max_artifact_bytes: u64,
}

/// An upload that has been accepted for streaming but not yet committed.
#[derive(Debug)]
pub struct PendingUpload {
    app: AppName,
    writer: ArtifactWriter,
}

impl PendingUpload {
    /// Application the upload will be recorded under.
    pub fn app(&self) -> &AppName {
        &self.app
    }

    /// Append the next chunk of the upload.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), AppError> {
        Ok(self.writer.write_chunk(chunk).await?)
    }
}

/// A single artifact resolved for download.
#[derive(Debug)]
pub struct ArtifactDownload {
    pub app: AppName,
    pub artifact: OpenArtifact,
}

/// A bundle archive resolved for download.
#[derive(Debug)]
pub struct BundleDownload {
    pub version: VersionSelector,
    pub bundle: BundleFile,
}

/// Counts reported by the status endpoint.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryStats {
    pub apps: usize,
    pub frozen_versions: usize,
}

impl RepositoryService {
    /// Open all three stores under `data_dir`.
    pub fn open(data_dir: &Path, max_artifact_bytes: u64) -> Result<Self, StoreError> {
        let artifacts = ArtifactStore::new(data_dir)?;
        let registry = ApplicationRegistry::load(data_dir)?;
        let snapshots = SnapshotManager::load(data_dir)?;
        tracing::info!(
            data_dir = %data_dir.display(),
            apps = registry.len(),
            versions = snapshots.len(),
            "repository opened"
        );
        Ok(Self {
            artifacts,
            registry: Arc::new(registry),
            snapshots: Arc::new(snapshots),
            max_artifact_bytes,
        })
    }

    /// Largest accepted artifact, in bytes.
    pub fn max_artifact_bytes(&self) -> u64 {
        self.max_artifact_bytes
    }

    /// Validate an uploaded filename and open a writer for its bytes.
    pub async fn begin_push(&self, filename: &str) -> Result<PendingUpload, AppError> {
        let app = AppName::from_filename(filename)?;
        let writer = self.artifacts.begin(Some(self.max_artifact_bytes)).await?;
        Ok(PendingUpload { app, writer })
    }

    /// Commit a fully received upload and advance the application's latest pointer.
    pub async fn complete_push(
        &self,
        upload: PendingUpload,
        message: Option<String>,
        version_tag: Option<String>,
    ) -> Result<PushResponse, AppError> {
        let PendingUpload { app, writer } = upload;
        let outcome = writer.commit().await?;
        let artifact = outcome.artifact;

        let record = PushRecord {
            hash: artifact.digest,
            size_bytes: artifact.size_bytes,
            message,
            version_tag,
        };
        let registry = Arc::clone(&self.registry);
        let name = app.clone();
        let summary = blocking(move || registry.update(&name, record)).await?;

        tracing::info!(
            app = %app,
            hash = %artifact.digest,
            size_bytes = artifact.size_bytes,
            deduplicated = outcome.deduplicated,
            "artifact pushed"
        );
        Ok(PushResponse {
            message: format!("Pushed {} ({} bytes)", app.artifact_filename(), artifact.size_bytes),
            app_name: summary.name,
            content_hash: summary.latest_hash,
            size_bytes: artifact.size_bytes,
            last_updated: summary.last_updated,
            version_tag: summary.version_tag,
            deduplicated: outcome.deduplicated,
        })
    }

    /// Resolve `(version, app)` to an artifact and open it for streaming.
    pub async fn pull_artifact(
        &self,
        version: &VersionSelector,
        app: &AppName,
    ) -> Result<ArtifactDownload, AppError> {
        let digest = match version {
            VersionSelector::Latest => self.registry.get_latest(app)?.latest_hash,
            VersionSelector::Frozen(v) => self.snapshots.resolve_app(v, app)?,
        };
        let artifact = self.artifacts.open(&digest).await.map_err(dangling)?;
        Ok(ArtifactDownload {
            app: app.clone(),
            artifact,
        })
    }

    /// Build the bundle archive for `version`.
    ///
    /// For `latest` the mapping is read with the same point-in-time
    /// capture freeze uses; artifacts are immutable, so every entry is
    /// exactly what was latest at that instant.
    pub async fn pull_bundle(&self, version: &VersionSelector) -> Result<BundleDownload, AppError> {
        let mapping = match version {
            VersionSelector::Latest => {
                let registry = Arc::clone(&self.registry);
                let mapping = blocking(move || Ok(registry.capture())).await?;
                if mapping.is_empty() {
                    return Err(AppError::NotFound(
                        "no applications have been pushed yet".into(),
                    ));
                }
                mapping
            }
            VersionSelector::Frozen(v) => self.snapshots.resolve_all(v)?,
        };

        let entries = self.bundle_entries(mapping);
        let bundle = tokio::task::spawn_blocking(move || bundle::write_bundle(&entries))
            .await
            .map_err(|e| AppError::Internal(format!("bundle task failed: {e}")))??;

        tracing::info!(
            version = %version,
            apps = bundle.entries,
            size_bytes = bundle.size_bytes,
            "bundle built"
        );
        Ok(BundleDownload {
            version: version.clone(),
            bundle,
        })
    }

    fn bundle_entries(&self, mapping: BTreeMap<AppName, ContentDigest>) -> Vec<BundleEntry> {
        mapping
            .into_iter()
            .map(|(app, digest)| BundleEntry {
                path: self.artifacts.path_of(&digest),
                app,
                digest,
            })
            .collect()
    }

    /// Freeze the registry's current state as `version`.
    pub async fn freeze(&self, version: VersionName) -> Result<FreezeResponse, AppError> {
        let registry = Arc::clone(&self.registry);
        let snapshots = Arc::clone(&self.snapshots);
        let frozen = blocking(move || snapshots.freeze(&version, &registry)).await?;
        Ok(FreezeResponse {
            message: format!(
                "Frozen version '{}' with {} application(s)",
                frozen.version,
                frozen.apps.len()
            ),
            version: frozen.version.clone(),
            created_at: frozen.created_at,
            apps: frozen.apps.clone(),
        })
    }

    /// All frozen versions, oldest first.
    pub fn list_versions(&self) -> VersionsResponse {
        VersionsResponse {
            versions: self
                .snapshots
                .list_versions()
                .into_iter()
                .map(|v| VersionEntry {
                    version: v.version,
                    created_at: v.created_at,
                })
                .collect(),
        }
    }

    /// One frozen version with its full mapping.
    pub fn get_version(&self, version: &VersionName) -> Result<SnapshotResponse, AppError> {
        let frozen = self.snapshots.get(version)?;
        Ok(SnapshotResponse {
            version: frozen.version.clone(),
            created_at: frozen.created_at,
            apps: frozen.apps.clone(),
        })
    }

    /// Every application's latest state.
    pub fn list_apps(&self) -> AppsResponse {
        AppsResponse {
            apps: self
                .registry
                .list_apps()
                .into_iter()
                .map(|s| AppEntry {
                    name: s.name,
                    latest_hash: s.latest_hash,
                    last_updated: s.last_updated,
                    version_tag: s.version_tag,
                })
                .collect(),
        }
    }

    /// Every application with its full push history.
    pub fn list_all(&self) -> AppHistoryResponse {
        AppHistoryResponse {
            apps: self
                .registry
                .list_all()
                .iter()
                .map(|app| AppHistoryEntry {
                    name: app.name.clone(),
                    versions: app
                        .history
                        .iter()
                        .map(|e| AppVersionEntry {
                            hash: e.hash,
                            timestamp: e.timestamp,
                            message: e.message.clone(),
                            version_tag: e.version_tag.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Counts for the status endpoint.
    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            apps: self.registry.len(),
            frozen_versions: self.snapshots.len(),
        }
    }
}

/// Run a blocking store operation off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {e}")))?
        .map_err(AppError::from)
}

/// A registry or snapshot entry whose artifact is missing is a server fault.
fn dangling(err: StoreError) -> AppError {
    match err {
        StoreError::ArtifactNotFound(digest) => {
            AppError::Internal(format!("referenced artifact {digest} is missing"))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heleus_core::sha256_digest;
    use tokio::io::AsyncReadExt;

    async fn push(repo: &RepositoryService, filename: &str, bytes: &[u8]) -> PushResponse {
        let mut upload = repo.begin_push(filename).await.unwrap();
        upload.write(bytes).await.unwrap();
        repo.complete_push(upload, None, None).await.unwrap()
    }

    async fn read_all(download: ArtifactDownload) -> Vec<u8> {
        let mut file = download.artifact.file;
        let mut out = Vec::new();
        file.read_to_end(&mut out).await.unwrap();
        out
    }

    fn latest() -> VersionSelector {
        VersionSelector::Latest
    }

    fn frozen(name: &str) -> VersionSelector {
        VersionSelector::parse(name).unwrap()
    }

    #[tokio::test]
    async fn push_freeze_push_pull_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();
        let calc = AppName::new("calc").unwrap();

        let first = push(&repo, "calc.apk", b"AAA").await;
        assert_eq!(first.app_name, calc);
        assert_eq!(first.content_hash, sha256_digest(b"AAA"));

        repo.freeze(VersionName::new("r1").unwrap()).await.unwrap();
        push(&repo, "calc.apk", b"BBB").await;

        let latest_bytes = read_all(repo.pull_artifact(&latest(), &calc).await.unwrap()).await;
        assert_eq!(latest_bytes, b"BBB");
        let r1_bytes = read_all(repo.pull_artifact(&frozen("r1"), &calc).await.unwrap()).await;
        assert_eq!(r1_bytes, b"AAA");
    }

    #[tokio::test]
    async fn push_rejects_non_apk_before_reading_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();
        assert!(matches!(
            repo.begin_push("notes.txt").await,
            Err(AppError::InvalidArtifact(_))
        ));
    }

    #[tokio::test]
    async fn oversize_push_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 4).unwrap();

        let mut upload = repo.begin_push("big.apk").await.unwrap();
        let err = upload.write(b"too many bytes").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArtifact(_)));
        drop(upload);

        assert_eq!(repo.stats().apps, 0);
        assert_eq!(std::fs::read_dir(dir.path().join("staging")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_push_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();

        let upload = repo.begin_push("empty.apk").await.unwrap();
        let err = repo.complete_push(upload, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArtifact(_)));
        assert_eq!(repo.stats().apps, 0);
    }

    #[tokio::test]
    async fn pull_unknown_combinations_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();
        push(&repo, "app1.apk", b"1").await;
        repo.freeze(VersionName::new("rel1").unwrap()).await.unwrap();

        let ghost = AppName::new("ghost").unwrap();
        let app1 = AppName::new("app1").unwrap();
        assert!(matches!(
            repo.pull_artifact(&latest(), &ghost).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.pull_artifact(&frozen("rel1"), &ghost).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.pull_artifact(&frozen("nope"), &app1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.pull_bundle(&frozen("nope")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn freeze_conflicts_and_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();

        assert!(matches!(
            repo.freeze(VersionName::new("v0").unwrap()).await,
            Err(AppError::EmptyRegistry(_))
        ));
        push(&repo, "calc.apk", b"AAA").await;
        repo.freeze(VersionName::new("v1").unwrap()).await.unwrap();
        assert!(matches!(
            repo.freeze(VersionName::new("v1").unwrap()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn bundle_of_frozen_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();
        push(&repo, "app1.apk", b"one").await;
        push(&repo, "app2.apk", b"two").await;
        repo.freeze(VersionName::new("rel1").unwrap()).await.unwrap();
        push(&repo, "app1.apk", b"one-later").await;

        let download = repo.pull_bundle(&frozen("rel1")).await.unwrap();
        assert_eq!(download.bundle.entries, 2);
        let mut archive = zip::ZipArchive::new(download.bundle.file).unwrap();
        let mut content = Vec::new();
        std::io::Read::read_to_end(&mut archive.by_name("app1.apk").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, b"one");
    }

    #[tokio::test]
    async fn latest_bundle_of_empty_registry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();
        assert!(matches!(
            repo.pull_bundle(&latest()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listings_reflect_pushes_and_freezes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryService::open(dir.path(), 1024).unwrap();
        push(&repo, "calc.apk", b"AAA").await;
        push(&repo, "calc.apk", b"BBB").await;
        push(&repo, "notes.apk", b"N").await;
        repo.freeze(VersionName::new("r1").unwrap()).await.unwrap();

        let apps = repo.list_apps().apps;
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].name.as_str(), "calc");
        assert_eq!(apps[0].latest_hash, sha256_digest(b"BBB"));

        let all = repo.list_all().apps;
        assert_eq!(all[0].versions.len(), 2);
        assert_eq!(all[0].versions[0].hash, sha256_digest(b"AAA"));

        let versions = repo.list_versions().versions;
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version.as_str(), "r1");

        let detail = repo.get_version(&VersionName::new("r1").unwrap()).unwrap();
        assert_eq!(detail.apps.len(), 2);
    }
}
