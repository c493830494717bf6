//! # Snapshot Manager
//!
//! Freezes the registry's current state under an immutable, uniquely
//! named version.
//!
//! A frozen version is written exactly once to
//! `snapshots/{sha256(version)}.json` through a no-overwrite link, so even two processes racing on the same
//! name cannot replace an existing snapshot. Once loaded, snapshots are
//! shared as `Arc<FrozenVersion>` and never mutated.
//!
//! Freezing an empty registry fails with [`StoreError::EmptyRegistry`]:
//! a version that resolves nothing is never created.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use heleus_core::{AppName, ContentDigest, VersionName};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::fsio::{self, Commit};
use crate::registry::ApplicationRegistry;

/// An immutable, named capture of every application's latest artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenVersion {
    pub version: VersionName,
    pub created_at: DateTime<Utc>,
    pub apps: BTreeMap<AppName, ContentDigest>,
}

/// Outcome of [`SnapshotManager::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single application's artifact.
    Artifact(ContentDigest),
    /// The full application → artifact mapping.
    Bundle(BTreeMap<AppName, ContentDigest>),
}

/// Name and creation time of a frozen version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub version: VersionName,
    pub created_at: DateTime<Utc>,
}

/// Durable store of frozen versions.
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots_dir: PathBuf,
    tmp_dir: PathBuf,
    versions: RwLock<BTreeMap<VersionName, Arc<FrozenVersion>>>,
    freeze_lock: Mutex<()>,
}

impl SnapshotManager {
    /// Open the snapshot store under `root`, reloading every frozen version.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let snapshots_dir = root.join("snapshots");
        let tmp_dir = root.join("tmp");
        std::fs::create_dir_all(&snapshots_dir)?;
        std::fs::create_dir_all(&tmp_dir)?;

        let mut versions = BTreeMap::new();
        for path in fsio::json_files(&snapshots_dir)? {
            let frozen: FrozenVersion = fsio::read_json(&path)?;
            fsio::check_record_path(&snapshots_dir, frozen.version.as_str(), &path)?;
            versions.insert(frozen.version.clone(), Arc::new(frozen));
        }
        tracing::info!(versions = versions.len(), "snapshot store loaded");

        Ok(Self {
            snapshots_dir,
            tmp_dir,
            versions: RwLock::new(versions),
            freeze_lock: Mutex::new(()),
        })
    }

    /// Capture the registry's current state as `version`.
    pub fn freeze(
        &self,
        version: &VersionName,
        registry: &ApplicationRegistry,
    ) -> Result<Arc<FrozenVersion>, StoreError> {
        let _serial = self.freeze_lock.lock();

        if self.versions.read().contains_key(version) {
            return Err(StoreError::VersionExists(version.clone()));
        }

        let apps = registry.capture();
        if apps.is_empty() {
            return Err(StoreError::EmptyRegistry);
        }

        let frozen = FrozenVersion {
            version: version.clone(),
            created_at: Utc::now(),
            apps,
        };
        let target = fsio::record_path(&self.snapshots_dir, version.as_str());
        match fsio::write_json(&self.tmp_dir, &target, &frozen, Commit::CreateNew) {
            Ok(()) => {}
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::VersionExists(version.clone()));
            }
            Err(e) => return Err(e),
        }

        let frozen = Arc::new(frozen);
        self.versions
            .write()
            .insert(version.clone(), Arc::clone(&frozen));
        tracing::info!(version = %version, apps = frozen.apps.len(), "version frozen");
        Ok(frozen)
    }

    /// Fetch a frozen version.
    pub fn get(&self, version: &VersionName) -> Result<Arc<FrozenVersion>, StoreError> {
        self.versions
            .read()
            .get(version)
            .cloned()
            .ok_or_else(|| StoreError::VersionNotFound(version.clone()))
    }

    /// Resolve one application, or the whole mapping, within a version.
    pub fn resolve(
        &self,
        version: &VersionName,
        app: Option<&AppName>,
    ) -> Result<Resolution, StoreError> {
        match app {
            Some(app) => self.resolve_app(version, app).map(Resolution::Artifact),
            None => self.resolve_all(version).map(Resolution::Bundle),
        }
    }

    /// The artifact `app` had when `version` was frozen.
    pub fn resolve_app(
        &self,
        version: &VersionName,
        app: &AppName,
    ) -> Result<ContentDigest, StoreError> {
        self.get(version)?
            .apps
            .get(app)
            .copied()
            .ok_or_else(|| StoreError::AppNotInVersion {
                version: version.clone(),
                app: app.clone(),
            })
    }

    /// The full application → artifact mapping of `version`.
    pub fn resolve_all(
        &self,
        version: &VersionName,
    ) -> Result<BTreeMap<AppName, ContentDigest>, StoreError> {
        Ok(self.get(version)?.apps.clone())
    }

    /// All frozen versions, oldest first.
    pub fn list_versions(&self) -> Vec<VersionSummary> {
        let mut list: Vec<_> = self
            .versions
            .read()
            .values()
            .map(|v| VersionSummary {
                version: v.version.clone(),
                created_at: v.created_at,
            })
            .collect();
        list.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.version.cmp(&b.version))
        });
        list
    }

    /// Number of frozen versions.
    pub fn len(&self) -> usize {
        self.versions.read().len()
    }

    /// Whether nothing has been frozen yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PushRecord;
    use heleus_core::sha256_digest;

    fn app(name: &str) -> AppName {
        AppName::new(name).unwrap()
    }

    fn version(name: &str) -> VersionName {
        VersionName::new(name).unwrap()
    }

    fn push(registry: &ApplicationRegistry, name: &str, bytes: &[u8]) {
        registry
            .update(
                &app(name),
                PushRecord {
                    hash: sha256_digest(bytes),
                    size_bytes: bytes.len() as u64,
                    message: None,
                    version_tag: None,
                },
            )
            .unwrap();
    }

    fn setup() -> (tempfile::TempDir, ApplicationRegistry, SnapshotManager) {
        let dir = tempfile::tempdir().unwrap();
        let registry = ApplicationRegistry::load(dir.path()).unwrap();
        let snapshots = SnapshotManager::load(dir.path()).unwrap();
        (dir, registry, snapshots)
    }

    #[test]
    fn freeze_captures_every_app() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "app1", b"one");
        push(&registry, "app2", b"two");

        let frozen = snapshots.freeze(&version("rel1"), &registry).unwrap();
        assert_eq!(frozen.apps.len(), 2);
        assert_eq!(frozen.apps[&app("app1")], sha256_digest(b"one"));
        assert_eq!(frozen.apps[&app("app2")], sha256_digest(b"two"));
    }

    #[test]
    fn refreezing_a_name_conflicts_and_keeps_original() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "calc", b"AAA");
        let original = snapshots.freeze(&version("v1"), &registry).unwrap();

        push(&registry, "calc", b"BBB");
        let err = snapshots.freeze(&version("v1"), &registry).unwrap_err();
        assert!(matches!(err, StoreError::VersionExists(_)));

        let after = snapshots.get(&version("v1")).unwrap();
        assert_eq!(*after, *original);
        assert_eq!(after.apps[&app("calc")], sha256_digest(b"AAA"));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_pushes() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "A", b"H");
        snapshots.freeze(&version("v1"), &registry).unwrap();
        push(&registry, "A", b"H2");

        assert_eq!(
            registry.get_latest(&app("A")).unwrap().latest_hash,
            sha256_digest(b"H2")
        );
        assert_eq!(
            snapshots.resolve(&version("v1"), Some(&app("A"))).unwrap(),
            Resolution::Artifact(sha256_digest(b"H"))
        );
    }

    #[test]
    fn empty_registry_cannot_be_frozen() {
        let (_dir, registry, snapshots) = setup();
        let err = snapshots.freeze(&version("v0"), &registry).unwrap_err();
        assert!(matches!(err, StoreError::EmptyRegistry));
        assert!(snapshots.is_empty());
    }

    #[test]
    fn resolve_unknown_version_or_app_is_not_found() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "app1", b"1");
        snapshots.freeze(&version("rel1"), &registry).unwrap();

        assert!(matches!(
            snapshots.resolve(&version("nope"), None),
            Err(StoreError::VersionNotFound(_))
        ));
        assert!(matches!(
            snapshots.resolve(&version("rel1"), Some(&app("app2"))),
            Err(StoreError::AppNotInVersion { .. })
        ));
    }

    #[test]
    fn resolve_without_app_returns_mapping() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "app1", b"1");
        push(&registry, "app2", b"2");
        snapshots.freeze(&version("rel1"), &registry).unwrap();

        match snapshots.resolve(&version("rel1"), None).unwrap() {
            Resolution::Bundle(map) => {
                let names: Vec<_> = map.keys().map(|n| n.to_string()).collect();
                assert_eq!(names, vec!["app1", "app2"]);
            }
            other => panic!("expected bundle, got {other:?}"),
        }
    }

    #[test]
    fn versions_are_listed_in_creation_order() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "app1", b"1");
        for name in ["zz", "aa", "mm"] {
            snapshots.freeze(&version(name), &registry).unwrap();
        }
        let listed = snapshots.list_versions();
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn snapshots_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = ApplicationRegistry::load(dir.path()).unwrap();
            let snapshots = SnapshotManager::load(dir.path()).unwrap();
            push(&registry, "calc", b"AAA");
            snapshots.freeze(&version("r1"), &registry).unwrap();
        }
        let registry = ApplicationRegistry::load(dir.path()).unwrap();
        let snapshots = SnapshotManager::load(dir.path()).unwrap();
        assert_eq!(
            snapshots.resolve(&version("r1"), Some(&app("calc"))).unwrap(),
            Resolution::Artifact(sha256_digest(b"AAA"))
        );
        // A reloaded manager still refuses to reuse the name.
        assert!(matches!(
            snapshots.freeze(&version("r1"), &registry),
            Err(StoreError::VersionExists(_))
        ));
    }

    #[test]
    fn case_variant_version_names_are_distinct_snapshots() {
        let (dir, registry, snapshots) = setup();
        push(&registry, "calc", b"AAA");
        snapshots.freeze(&version("R1"), &registry).unwrap();
        push(&registry, "calc", b"BBB");
        snapshots.freeze(&version("r1"), &registry).unwrap();

        let reloaded = SnapshotManager::load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.resolve_app(&version("R1"), &app("calc")).unwrap(),
            sha256_digest(b"AAA")
        );
        assert_eq!(
            reloaded.resolve_app(&version("r1"), &app("calc")).unwrap(),
            sha256_digest(b"BBB")
        );
    }

    #[test]
    fn freezes_during_concurrent_pushes_capture_committed_state() {
        const APPS: [&str; 4] = ["app0", "app1", "app2", "app3"];
        const ROUNDS: u8 = 25;
        let (_dir, registry, snapshots) = setup();
        push(&registry, "app0", b"seed");

        let frozen = std::thread::scope(|s| {
            for (i, name) in APPS.iter().enumerate() {
                let registry = &registry;
                s.spawn(move || {
                    for round in 0..ROUNDS {
                        push(registry, name, &[i as u8, round]);
                    }
                });
            }
            let freezer = s.spawn(|| {
                let mut frozen = Vec::new();
                for n in 0..20 {
                    // Apps known before the capture must all appear in it.
                    let before: Vec<AppName> =
                        registry.list_apps().into_iter().map(|a| a.name).collect();
                    let snapshot = snapshots
                        .freeze(&version(&format!("v{n}")), &registry)
                        .unwrap();
                    for name in &before {
                        assert!(snapshot.apps.contains_key(name), "{name} missing");
                    }
                    frozen.push(snapshot);
                }
                frozen
            });
            freezer.join().unwrap()
        });

        let history: BTreeMap<AppName, Vec<ContentDigest>> = registry
            .list_all()
            .iter()
            .map(|a| (a.name.clone(), a.history.iter().map(|e| e.hash).collect()))
            .collect();
        assert_eq!(history.len(), APPS.len());

        let mut previous: Option<&FrozenVersion> = None;
        for snapshot in &frozen {
            for (name, hash) in &snapshot.apps {
                let pushes = &history[name];
                assert!(pushes.contains(hash), "{name} frozen with an unknown hash");
                // Later snapshots never see an older push of the same app.
                if let Some(earlier) = previous.and_then(|p| p.apps.get(name)) {
                    let at = |h: &ContentDigest| pushes.iter().position(|x| x == h);
                    assert!(at(earlier) <= at(hash), "{name} went backwards");
                }
            }
            if let Some(p) = previous {
                assert!(p.apps.keys().all(|name| snapshot.apps.contains_key(name)));
            }
            previous = Some(&**snapshot);
        }
    }

    #[test]
    fn concurrent_freezes_of_one_name_create_exactly_one() {
        let (_dir, registry, snapshots) = setup();
        push(&registry, "calc", b"AAA");

        let successes = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| snapshots.freeze(&version("race"), &registry).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(successes, 1);
    }
}
