//! # Wire Types
//!
//! JSON bodies exchanged between `heleus-api` and `heleus-client`.
//! Both sides compile against these definitions, so a field rename is a
//! compile error on both ends rather than a silent protocol drift.
//!
//! Names and digests travel as plain strings (the newtypes serialize
//! transparently), timestamps as RFC 3339 UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::name::{AppName, VersionName};

/// Multipart field carrying the artifact bytes on push.
pub const PUSH_FILE_FIELD: &str = "file";
/// Optional multipart text field with a free-form push message.
pub const PUSH_MESSAGE_FIELD: &str = "message";
/// Optional multipart text field with a human-readable version label.
pub const PUSH_TAG_FIELD: &str = "version_tag";
/// Response header carrying the served artifact's digest.
pub const CONTENT_HASH_HEADER: &str = "x-content-hash";
/// MIME type artifacts are uploaded and served as.
pub const APK_MIME: &str = "application/vnd.android.package-archive";

/// `GET /api/v1/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub apps: usize,
    pub frozen_versions: usize,
    pub requests_served: u64,
    /// Responses with a 4xx or 5xx status since start-up.
    #[serde(default)]
    pub error_responses: u64,
}

/// `POST /api/v1/push`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub message: String,
    pub app_name: AppName,
    pub content_hash: ContentDigest,
    pub size_bytes: u64,
    pub last_updated: DateTime<Utc>,
    pub version_tag: Option<String>,
    /// True when identical bytes were already stored.
    pub deduplicated: bool,
}

/// `GET /api/v1/freeze/{version}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeResponse {
    pub message: String,
    pub version: VersionName,
    pub created_at: DateTime<Utc>,
    pub apps: BTreeMap<AppName, ContentDigest>,
}

/// One entry of `GET /api/v1/versions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: VersionName,
    pub created_at: DateTime<Utc>,
}

/// `GET /api/v1/versions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub versions: Vec<VersionEntry>,
}

/// `GET /api/v1/versions/{version}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub version: VersionName,
    pub created_at: DateTime<Utc>,
    pub apps: BTreeMap<AppName, ContentDigest>,
}

/// One entry of `GET /api/v1/apps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEntry {
    pub name: AppName,
    pub latest_hash: ContentDigest,
    pub last_updated: DateTime<Utc>,
    pub version_tag: Option<String>,
}

/// `GET /api/v1/apps`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsResponse {
    pub apps: Vec<AppEntry>,
}

/// One push in an application's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersionEntry {
    pub hash: ContentDigest,
    pub timestamp: DateTime<Utc>,
    pub message: Option<String>,
    pub version_tag: Option<String>,
}

/// An application with its full push history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppHistoryEntry {
    pub name: AppName,
    pub versions: Vec<AppVersionEntry>,
}

/// `GET /api/v1/apps/all`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppHistoryResponse {
    pub apps: Vec<AppHistoryEntry>,
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code (e.g. `NOT_FOUND`).
    #[serde(default)]
    pub code: Option<String>,
}
