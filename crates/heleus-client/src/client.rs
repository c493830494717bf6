//! Typed client for the Heleus repository API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v1/status` | [`HeleusClient::status`] |
//! | POST   | `/api/v1/push` | [`HeleusClient::push`] |
//! | GET    | `/api/v1/pull[/{version}]` | [`HeleusClient::pull_bundle`] |
//! | GET    | `/api/v1/pull/{version}/{app}` | [`HeleusClient::pull_app`] |
//! | GET    | `/api/v1/freeze/{version}` | [`HeleusClient::freeze`] |
//! | GET    | `/api/v1/versions[/{version}]` | [`HeleusClient::list_versions`], [`HeleusClient::get_version`] |
//! | GET    | `/api/v1/apps`, `/api/v1/apps/all` | [`HeleusClient::list_apps`], [`HeleusClient::list_all`] |
//!
//! Failures are returned once; the client never retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use heleus_core::wire::{
    AppHistoryResponse, AppsResponse, FreezeResponse, PushResponse, SnapshotResponse,
    StatusResponse, VersionsResponse, APK_MIME, CONTENT_HASH_HEADER, PUSH_FILE_FIELD,
    PUSH_MESSAGE_FIELD, PUSH_TAG_FIELD,
};
use heleus_core::{AppName, ContentDigest, VersionName, VersionSelector};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::progress::{ProgressObserver, ProgressReader};
use crate::transfer;

/// Time allowed to establish a connection. Transfers themselves are not
/// time-limited; large artifacts can take as long as they need.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Optional metadata recorded with a push.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub message: Option<String>,
    pub version_tag: Option<String>,
}

/// Result of [`HeleusClient::pull_app`].
#[derive(Debug, Clone)]
pub struct PulledArtifact {
    pub path: PathBuf,
    pub content_hash: ContentDigest,
    pub size_bytes: u64,
}

/// Result of [`HeleusClient::pull_bundle`].
#[derive(Debug, Clone)]
pub struct PulledBundle {
    pub version: VersionSelector,
    pub files: Vec<PathBuf>,
}

/// Client for one Heleus repository server.
#[derive(Debug, Clone)]
pub struct HeleusClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HeleusClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(
                base_url.to_string(),
                "not a base URL".to_string(),
            )
            .into());
        }
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("heleus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Unreachable {
                endpoint: "client_init".into(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    /// Create a client for the server named in a configuration document.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.server_url()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Liveness check.
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.get_json(&["status"]).await
    }

    /// Upload a local APK. The file is streamed from disk and every chunk
    /// read is reported to `progress`.
    pub async fn push(
        &self,
        apk_path: &Path,
        options: PushOptions,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<PushResponse, ClientError> {
        let filename = apk_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClientError::MissingFile(apk_path.to_path_buf()))?
            .to_string();
        let metadata = match tokio::fs::metadata(apk_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(ClientError::MissingFile(apk_path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::MissingFile(apk_path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        AppName::from_filename(&filename)
            .map_err(|e| ClientError::InvalidArtifact(e.to_string()))?;

        let total = metadata.len();
        let file = tokio::fs::File::open(apk_path).await?;
        progress.start(&format!("Uploading {filename}"), Some(total));
        let reader = ProgressReader::new(file, progress.clone());
        let body = reqwest::Body::wrap_stream(ReaderStream::new(reader));

        let endpoint = self.endpoint(&["push"])?;
        let part = Part::stream_with_length(body, total)
            .file_name(filename.clone())
            .mime_str(APK_MIME)
            .map_err(|source| ClientError::Unreachable {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let mut form = Form::new().part(PUSH_FILE_FIELD, part);
        if let Some(message) = options.message {
            form = form.text(PUSH_MESSAGE_FIELD, message);
        }
        if let Some(tag) = options.version_tag {
            form = form.text(PUSH_TAG_FIELD, tag);
        }

        tracing::debug!(file = %filename, size_bytes = total, "pushing artifact");
        let sent = self.http.post(endpoint.clone()).multipart(form).send().await;
        progress.finish();
        let response = Self::checked(&endpoint, sent).await?;
        Self::decode(&endpoint, response).await
    }

    /// Download one application's artifact to `<dest>/<app>/<app>.apk`.
    pub async fn pull_app(
        &self,
        app: &AppName,
        version: &VersionSelector,
        dest: &Path,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<PulledArtifact, ClientError> {
        let endpoint = self.endpoint(&["pull", version.as_str(), app.as_str()])?;
        let sent = self.http.get(endpoint.clone()).send().await;
        let response = Self::checked(&endpoint, sent).await?;

        let expected = response
            .headers()
            .get(CONTENT_HASH_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| ContentDigest::from_hex(value).ok());
        if expected.is_none() {
            tracing::warn!("server did not announce a content hash; skipping verification");
        }

        let dir = dest.join(app.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        let target = dir.join(app.artifact_filename());

        let label = format!("Downloading {}", app.artifact_filename());
        progress.start(&label, response.content_length());
        let written = transfer::download_artifact(
            response,
            &target,
            expected,
            endpoint.as_str(),
            progress.as_ref(),
        )
        .await;
        progress.finish();
        let written = written?;

        Ok(PulledArtifact {
            path: target,
            content_hash: written.digest,
            size_bytes: written.size_bytes,
        })
    }

    /// Download the bundle of every application at `version` and extract
    /// each `<app>.apk` entry into `dest`.
    pub async fn pull_bundle(
        &self,
        version: &VersionSelector,
        dest: &Path,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<PulledBundle, ClientError> {
        let endpoint = match version {
            VersionSelector::Latest => self.endpoint(&["pull"])?,
            VersionSelector::Frozen(name) => self.endpoint(&["pull", name.as_str()])?,
        };
        let sent = self.http.get(endpoint.clone()).send().await;
        let response = Self::checked(&endpoint, sent).await?;

        tokio::fs::create_dir_all(dest).await?;
        progress.start(
            &format!("Downloading version {version}"),
            response.content_length(),
        );
        let files =
            transfer::download_bundle(response, dest, endpoint.as_str(), progress.as_ref()).await;
        progress.finish();

        Ok(PulledBundle {
            version: version.clone(),
            files: files?,
        })
    }

    /// Freeze the current latest state of every application as `version`.
    pub async fn freeze(&self, version: &VersionName) -> Result<FreezeResponse, ClientError> {
        self.get_json(&["freeze", version.as_str()]).await
    }

    /// All frozen versions, oldest first.
    pub async fn list_versions(&self) -> Result<VersionsResponse, ClientError> {
        self.get_json(&["versions"]).await
    }

    /// One frozen version with its application mapping.
    pub async fn get_version(&self, version: &VersionName) -> Result<SnapshotResponse, ClientError> {
        self.get_json(&["versions", version.as_str()]).await
    }

    /// Latest state of every application.
    pub async fn list_apps(&self) -> Result<AppsResponse, ClientError> {
        self.get_json(&["apps"]).await
    }

    /// Every application with its full push history.
    pub async fn list_all(&self) -> Result<AppHistoryResponse, ClientError> {
        self.get_json(&["apps", "all"]).await
    }

    /// `{base}/api/v1/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ConfigError::InvalidUrl(self.base_url.to_string(), "not a base URL".to_string())
            })?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let endpoint = self.endpoint(segments)?;
        let sent = self.http.get(endpoint.clone()).send().await;
        let response = Self::checked(&endpoint, sent).await?;
        Self::decode(&endpoint, response).await
    }

    /// Turn transport failures and non-2xx statuses into [`ClientError`]s.
    async fn checked(
        endpoint: &Url,
        sent: reqwest::Result<reqwest::Response>,
    ) -> Result<reqwest::Response, ClientError> {
        let response = sent.map_err(|source| ClientError::Unreachable {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_status(status, &body);
        tracing::debug!(%endpoint, status = status.as_u16(), "request failed: {err}");
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(
        endpoint: &Url,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        response
            .json()
            .await
            .map_err(|source| ClientError::Deserialization {
                endpoint: endpoint.to_string(),
                source,
            })
    }
}
