//! # Application Registry
//!
//! Tracks every application's push history and, derived from it, the
//! application's latest artifact. The latest pointer is never stored
//! separately: it *is* the last history entry, so the two cannot drift.
//!
//! ## Locking
//!
//! The registry is an arena of per-application slots keyed by name.
//!
//! - Each slot has a `push` mutex. Pushes to the same application
//!   serialize their read-append-persist cycle, so no update is lost.
//!   Pushes to different applications never contend.
//! - A registry-wide `commit_gate` is taken *shared* by a push for the
//!   instant it swaps in its new record, and *exclusively* by
//!   [`ApplicationRegistry::capture`] while it copies every pointer. A
//!   capture therefore sees each application either entirely before or
//!   entirely after any concurrent push.
//!
//! All locks are `parking_lot` and are never held across `.await`.
//!
//! ## Persistence
//!
//! Each application is one JSON document at `apps/{sha256(name)}.json`,
//! replaced atomically on every push *before* the in-memory record
//! changes. A failed write leaves both disk and memory at the previous
//! state. Records staged in `tmp/` by a process that died mid-write are
//! swept when the registry is loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use heleus_core::{AppName, ContentDigest};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::fsio::{self, Commit};

/// One push, as recorded in an application's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub hash: ContentDigest,
    pub size_bytes: u64,
    pub timestamp: DateTime<Utc>,
    pub message: Option<String>,
    pub version_tag: Option<String>,
}

/// What a caller supplies when recording a push.
#[derive(Debug, Clone)]
pub struct PushRecord {
    pub hash: ContentDigest,
    pub size_bytes: u64,
    pub message: Option<String>,
    pub version_tag: Option<String>,
}

/// An application and its append-only push history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub name: AppName,
    pub history: Vec<HistoryEntry>,
}

impl Application {
    /// The most recent push, if any.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Current state of the application, if it has been pushed.
    pub fn summary(&self) -> Option<AppSummary> {
        self.latest().map(|entry| AppSummary {
            name: self.name.clone(),
            latest_hash: entry.hash,
            size_bytes: entry.size_bytes,
            last_updated: entry.timestamp,
            version_tag: entry.version_tag.clone(),
        })
    }
}

/// An application's latest pointer plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSummary {
    pub name: AppName,
    pub latest_hash: ContentDigest,
    pub size_bytes: u64,
    pub last_updated: DateTime<Utc>,
    pub version_tag: Option<String>,
}

#[derive(Debug, Default)]
struct AppSlot {
    push: Mutex<()>,
    /// `None` until the first push commits.
    record: RwLock<Option<Arc<Application>>>,
}

/// Durable per-application registry.
#[derive(Debug)]
pub struct ApplicationRegistry {
    apps_dir: PathBuf,
    tmp_dir: PathBuf,
    slots: RwLock<BTreeMap<AppName, Arc<AppSlot>>>,
    commit_gate: RwLock<()>,
}

impl ApplicationRegistry {
    /// Open the registry under `root`, reloading every persisted application.
    ///
    /// Must run before anything else writes records under `root`: stale
    /// staging files in `tmp/` are removed.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let apps_dir = root.join("apps");
        let tmp_dir = root.join("tmp");
        std::fs::create_dir_all(&apps_dir)?;
        std::fs::create_dir_all(&tmp_dir)?;

        let swept = fsio::sweep(&tmp_dir)?;
        if swept > 0 {
            tracing::warn!(swept, "removed interrupted record writes from tmp");
        }

        let mut slots = BTreeMap::new();
        for path in fsio::json_files(&apps_dir)? {
            let app: Application = fsio::read_json(&path)?;
            if app.history.is_empty() {
                return Err(StoreError::Corrupt {
                    path,
                    reason: "application record has no history".into(),
                });
            }
            fsio::check_record_path(&apps_dir, app.name.as_str(), &path)?;
            let slot = AppSlot {
                push: Mutex::new(()),
                record: RwLock::new(Some(Arc::new(app.clone()))),
            };
            slots.insert(app.name, Arc::new(slot));
        }
        tracing::info!(apps = slots.len(), "application registry loaded");

        Ok(Self {
            apps_dir,
            tmp_dir,
            slots: RwLock::new(slots),
            commit_gate: RwLock::new(()),
        })
    }

    fn record_path(&self, name: &AppName) -> PathBuf {
        fsio::record_path(&self.apps_dir, name.as_str())
    }

    fn slot(&self, name: &AppName) -> Option<Arc<AppSlot>> {
        self.slots.read().get(name).cloned()
    }

    fn slot_or_insert(&self, name: &AppName) -> Arc<AppSlot> {
        if let Some(slot) = self.slot(name) {
            return slot;
        }
        Arc::clone(self.slots.write().entry(name.clone()).or_default())
    }

    fn committed(&self, name: &AppName) -> Result<Arc<Application>, StoreError> {
        let not_found = || StoreError::AppNotFound(name.clone());
        let slot = self.slot(name).ok_or_else(not_found)?;
        let record = slot.record.read().clone();
        record.ok_or_else(not_found)
    }

    /// Record a push: create the application if needed, append a history
    /// entry, and advance its latest pointer.
    pub fn update(&self, name: &AppName, push: PushRecord) -> Result<AppSummary, StoreError> {
        let slot = self.slot_or_insert(name);
        let _serial = slot.push.lock();

        let current = slot.record.read().clone();
        let mut next = match current {
            Some(app) => Application::clone(&app),
            None => Application {
                name: name.clone(),
                history: Vec::new(),
            },
        };
        next.history.push(HistoryEntry {
            hash: push.hash,
            size_bytes: push.size_bytes,
            timestamp: Utc::now(),
            message: push.message,
            version_tag: push.version_tag,
        });

        fsio::write_json(&self.tmp_dir, &self.record_path(name), &next, Commit::Replace)?;

        let next = Arc::new(next);
        {
            let _gate = self.commit_gate.read();
            *slot.record.write() = Some(Arc::clone(&next));
        }

        let summary = next
            .summary()
            .ok_or_else(|| StoreError::AppNotFound(name.clone()))?;
        tracing::info!(
            app = %name,
            hash = %summary.latest_hash,
            pushes = next.history.len(),
            "registry updated"
        );
        Ok(summary)
    }

    /// Latest pointer and metadata of one application.
    pub fn get_latest(&self, name: &AppName) -> Result<AppSummary, StoreError> {
        self.committed(name)?
            .summary()
            .ok_or_else(|| StoreError::AppNotFound(name.clone()))
    }

    /// Every application's latest state, ordered by name.
    pub fn list_apps(&self) -> Vec<AppSummary> {
        self.list_all().iter().filter_map(|app| app.summary()).collect()
    }

    /// One application's push history, oldest first.
    pub fn list_history(&self, name: &AppName) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.committed(name)?.history.clone())
    }

    /// Every application with its full history, ordered by name.
    pub fn list_all(&self) -> Vec<Arc<Application>> {
        self.slots
            .read()
            .values()
            .filter_map(|slot| slot.record.read().clone())
            .collect()
    }

    /// Point-in-time copy of every application's latest hash.
    ///
    /// No push is ever half-visible: each application appears with the
    /// state it had either before or after any concurrent push.
    pub fn capture(&self) -> BTreeMap<AppName, ContentDigest> {
        let _gate = self.commit_gate.write();
        self.slots
            .read()
            .iter()
            .filter_map(|(name, slot)| {
                let record = slot.record.read();
                let hash = record.as_ref().and_then(|app| app.latest()).map(|e| e.hash);
                hash.map(|hash| (name.clone(), hash))
            })
            .collect()
    }

    /// Number of applications with at least one push.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.record.read().is_some())
            .count()
    }

    /// Whether no application has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
