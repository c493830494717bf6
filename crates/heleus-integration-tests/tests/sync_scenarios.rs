//! End-to-end sync scenarios.
//!
//! Each test starts a real `heleus-server` router on an ephemeral port
//! backed by a fresh data directory and drives it through `HeleusClient`,
//! the same path the `heleus` CLI takes.

use std::path::Path;
use std::sync::Arc;

use heleus_api::state::{AppConfig, AppState};
use heleus_client::{ClientError, HeleusClient, NoProgress, ProgressObserver, PushOptions};
use heleus_core::{sha256_digest, AppName, VersionName, VersionSelector};
use url::Url;

struct TestServer {
    client: HeleusClient,
    _data: tempfile::TempDir,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Start a server on a random available port.
async fn start_server() -> TestServer {
    let data = tempfile::tempdir().expect("data dir");
    let config = AppConfig {
        data_dir: data.path().to_path_buf(),
        ..AppConfig::default()
    };
    let app = heleus_api::app(AppState::open(config).expect("open repository"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind to random port");
    let port = listener.local_addr().unwrap().port();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await
            .ok();
    });

    let client = HeleusClient::new(Url::parse(&format!("http://127.0.0.1:{port}")).unwrap())
        .expect("client");
    for _ in 0..50 {
        if client.status().await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    TestServer {
        client,
        _data: data,
        shutdown: Some(tx),
    }
}

fn progress() -> Arc<dyn ProgressObserver> {
    Arc::new(NoProgress)
}

async fn push_bytes(client: &HeleusClient, workdir: &Path, filename: &str, bytes: &[u8]) {
    let path = workdir.join(filename);
    std::fs::write(&path, bytes).unwrap();
    client
        .push(&path, PushOptions::default(), progress())
        .await
        .expect("push");
}

#[tokio::test]
async fn repush_after_freeze_keeps_frozen_bytes() {
    let server = start_server().await;
    let client = &server.client;
    let work = tempfile::tempdir().unwrap();

    push_bytes(client, work.path(), "calc.apk", b"AAA").await;
    let apps = client.list_apps().await.unwrap();
    assert_eq!(apps.apps.len(), 1);
    assert_eq!(apps.apps[0].name.as_str(), "calc");
    assert_eq!(apps.apps[0].latest_hash, sha256_digest(b"AAA"));

    client.freeze(&VersionName::new("r1").unwrap()).await.unwrap();
    push_bytes(client, work.path(), "calc.apk", b"BBB").await;

    let calc = AppName::new("calc").unwrap();
    let latest_dir = tempfile::tempdir().unwrap();
    let latest = client
        .pull_app(&calc, &VersionSelector::Latest, latest_dir.path(), progress())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&latest.path).unwrap(), b"BBB");

    let frozen_dir = tempfile::tempdir().unwrap();
    let frozen = client
        .pull_app(
            &calc,
            &VersionSelector::parse("r1").unwrap(),
            frozen_dir.path(),
            progress(),
        )
        .await
        .unwrap();
    assert_eq!(std::fs::read(&frozen.path).unwrap(), b"AAA");
    assert_eq!(frozen.path, frozen_dir.path().join("calc").join("calc.apk"));

    let history = client.list_all().await.unwrap();
    let hashes: Vec<_> = history.apps[0].versions.iter().map(|v| v.hash).collect();
    assert_eq!(hashes, vec![sha256_digest(b"AAA"), sha256_digest(b"BBB")]);
}

#[tokio::test]
async fn frozen_bundle_contains_every_app() {
    let server = start_server().await;
    let client = &server.client;
    let work = tempfile::tempdir().unwrap();

    push_bytes(client, work.path(), "app1.apk", b"one").await;
    push_bytes(client, work.path(), "app2.apk", b"two").await;
    client.freeze(&VersionName::new("rel1").unwrap()).await.unwrap();
    push_bytes(client, work.path(), "app1.apk", b"one-v2").await;

    let dest = tempfile::tempdir().unwrap();
    let bundle = client
        .pull_bundle(&VersionSelector::parse("rel1").unwrap(), dest.path(), progress())
        .await
        .unwrap();

    let mut names: Vec<String> = bundle
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["app1.apk", "app2.apk"]);
    assert_eq!(std::fs::read(dest.path().join("app1.apk")).unwrap(), b"one");
    assert_eq!(std::fs::read(dest.path().join("app2.apk")).unwrap(), b"two");

    let latest = tempfile::tempdir().unwrap();
    client
        .pull_bundle(&VersionSelector::Latest, latest.path(), progress())
        .await
        .unwrap();
    assert_eq!(std::fs::read(latest.path().join("app1.apk")).unwrap(), b"one-v2");
}

#[tokio::test]
async fn refreezing_a_name_conflicts_and_keeps_original() {
    let server = start_server().await;
    let client = &server.client;
    let work = tempfile::tempdir().unwrap();
    let v1 = VersionName::new("v1").unwrap();

    push_bytes(client, work.path(), "calc.apk", b"AAA").await;
    client.freeze(&v1).await.unwrap();
    push_bytes(client, work.path(), "calc.apk", b"BBB").await;

    let err = client.freeze(&v1).await.unwrap_err();
    assert!(matches!(err, ClientError::Conflict(_)), "{err}");

    let snapshot = client.get_version(&v1).await.unwrap();
    assert_eq!(
        snapshot.apps[&AppName::new("calc").unwrap()],
        sha256_digest(b"AAA")
    );
    assert_eq!(client.list_versions().await.unwrap().versions.len(), 1);
}

#[tokio::test]
async fn missing_app_or_version_is_not_found_and_writes_nothing() {
    let server = start_server().await;
    let client = &server.client;
    let work = tempfile::tempdir().unwrap();
    push_bytes(client, work.path(), "calc.apk", b"AAA").await;

    let dest = tempfile::tempdir().unwrap();
    let err = client
        .pull_app(
            &AppName::new("ghost").unwrap(),
            &VersionSelector::Latest,
            dest.path(),
            progress(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)), "{err}");

    let err = client
        .pull_app(
            &AppName::new("calc").unwrap(),
            &VersionSelector::parse("nope").unwrap(),
            dest.path(),
            progress(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)), "{err}");

    let err = client
        .pull_bundle(&VersionSelector::parse("nope").unwrap(), dest.path(), progress())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)), "{err}");

    assert!(std::fs::read_dir(dest.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn identical_pushes_share_one_artifact() {
    let server = start_server().await;
    let client = &server.client;
    let work = tempfile::tempdir().unwrap();

    let first = work.path().join("a.apk");
    let second = work.path().join("b.apk");
    std::fs::write(&first, b"same").unwrap();
    std::fs::write(&second, b"same").unwrap();

    let a = client.push(&first, PushOptions::default(), progress()).await.unwrap();
    let b = client.push(&second, PushOptions::default(), progress()).await.unwrap();
    assert_eq!(a.content_hash, b.content_hash);
    assert!(!a.deduplicated);
    assert!(b.deduplicated);

    let status = client.status().await.unwrap();
    assert_eq!(status.apps, 2);
}

#[tokio::test]
async fn concurrent_pushes_to_one_app_lose_nothing() {
    let server = start_server().await;
    let work = tempfile::tempdir().unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let client = server.client.clone();
        let dir = work.path().join(format!("w{i}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("calc.apk");
        std::fs::write(&path, format!("build-{i}")).unwrap();
        tasks.push(tokio::spawn(async move {
            client
                .push(&path, PushOptions::default(), progress())
                .await
                .map(|r| r.content_hash)
        }));
    }
    let mut pushed = Vec::new();
    for task in tasks {
        pushed.push(task.await.unwrap().unwrap());
    }

    let history = server.client.list_all().await.unwrap();
    assert_eq!(history.apps.len(), 1);
    let recorded: Vec<_> = history.apps[0].versions.iter().map(|v| v.hash).collect();
    assert_eq!(recorded.len(), 8);
    for hash in &pushed {
        assert!(recorded.contains(hash));
    }
    let apps = server.client.list_apps().await.unwrap();
    assert_eq!(Some(&apps.apps[0].latest_hash), recorded.last());
}

#[tokio::test]
async fn invalid_uploads_are_rejected_end_to_end() {
    let server = start_server().await;
    let client = &server.client;
    let work = tempfile::tempdir().unwrap();

    let empty = work.path().join("empty.apk");
    std::fs::write(&empty, b"").unwrap();
    let err = client
        .push(&empty, PushOptions::default(), progress())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArtifact(_)), "{err}");
    assert!(client.list_apps().await.unwrap().apps.is_empty());

    let err = client
        .freeze(&VersionName::new("r0").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Conflict(_)), "{err}");
}
