mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gitsync::browser::BrowserHost;
use gitsync::remote::PutOutcome;
use gitsync::snapshot::capture_from;
use gitsync::{MemoryBrowser, Settings, SnapshotDocument, SyncEngine, UrlFilter};

use common::{browser, settings, RepoStore};

fn engine(
    store: &Arc<RepoStore>,
    browser: MemoryBrowser,
) -> SyncEngine<Arc<RepoStore>, MemoryBrowser> {
    SyncEngine::new(settings(), store.clone(), browser)
}

#[tokio::test]
async fn push_captures_groups_and_filters_internal_pages() -> Result<()> {
    let store = Arc::new(RepoStore::new());
    let local = browser(&[vec![
        ("https://a", false, Some("Work")),
        ("about:blank", false, None),
        ("https://b", true, None),
    ]]);

    let result = engine(&store, local).push().await;
    assert!(result.success, "{:?}", result.error);

    let document = store.document().expect("document written");
    assert_eq!(document.windows.len(), 1);
    let groups = &document.windows[0].groups;
    assert_eq!(groups.names().collect::<Vec<_>>(), vec!["Work", "Ungrouped"]);
    assert_eq!(
        serde_json::to_value(&document)?,
        serde_json::json!({
            "windows": [{
                "groups": {
                    "Work": [{ "url": "https://a", "pinned": false }],
                    "Ungrouped": [{ "url": "https://b", "pinned": true }]
                }
            }]
        })
    );

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].message, "Update GitSync data");
    assert!(writes[0].sha.is_none());
    Ok(())
}

#[tokio::test]
async fn push_respects_blacklist() -> Result<()> {
    let store = Arc::new(RepoStore::new());
    let local = browser(&[vec![
        ("https://mail.example.com/inbox", false, None),
        ("https://docs.example.com", false, None),
    ]]);
    let settings = Settings {
        url_blacklist: "https://mail., file://".into(),
        ..settings()
    };

    let result = SyncEngine::new(settings, store.clone(), local).push().await;
    assert!(result.success);

    let document = store.document().expect("document written");
    let urls: Vec<&str> = document.windows[0].tabs().map(|(_, t)| t.url.as_str()).collect();
    assert_eq!(urls, vec!["https://docs.example.com"]);
    Ok(())
}

#[tokio::test]
async fn pull_reproduces_pushed_state() -> Result<()> {
    let store = Arc::new(RepoStore::new());
    let source = browser(&[
        vec![
            ("https://a", true, None),
            ("https://b", false, Some("Research")),
            ("https://c", false, Some("Research")),
        ],
        vec![
            ("https://d", false, Some("Reading")),
            ("https://e", false, None),
        ],
    ]);
    let pushed = engine(&store, source).push().await;
    assert!(pushed.success);
    let expected = store.document().expect("document written");

    let target = browser(&[
        vec![("https://old-1", false, None)],
        vec![("https://old-2", false, Some("Stale"))],
        vec![("https://old-3", false, None)],
    ]);
    let target = engine(&store, target);
    let pulled = target.pull().await;
    assert!(pulled.success, "{:?}", pulled.error);

    let restored = capture_from(target.host(), &UrlFilter::default()).await?;
    assert_eq!(restored, expected);

    let windows = target.host().windows().await?;
    assert_eq!(windows.len(), 2);
    assert!(windows[0].tabs.iter().all(|t| !t.url.starts_with("https://old")));
    assert!(windows[0].tabs[0].active);
    Ok(())
}

#[tokio::test]
async fn pull_of_cleared_document_is_rejected_without_mutation() {
    let store = Arc::new(RepoStore::with_document(&SnapshotDocument::cleared()));
    let local = browser(&[vec![("https://keep", false, None)]]);
    let engine = engine(&store, local);

    let result = engine.pull().await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Nothing to pull."));
    assert_eq!(engine.host().mutation_count(), 0);
}

#[tokio::test]
async fn pull_without_remote_document_keeps_first_window() -> Result<()> {
    let store = Arc::new(RepoStore::new());
    let local = browser(&[
        vec![("https://keep", false, None)],
        vec![("https://other", false, None)],
    ]);
    let engine = engine(&store, local);

    let result = engine.pull().await;
    assert!(result.success, "{:?}", result.error);

    let windows = engine.host().windows().await?;
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].tabs[0].url, "https://keep");
    Ok(())
}

#[tokio::test]
async fn failed_pull_keeps_created_tabs_in_saved_session() -> Result<()> {
    let remote = browser(&[vec![
        ("https://a", false, None),
        ("https://b", false, None),
    ]]);
    let store = Arc::new(RepoStore::new());
    assert!(engine(&store, remote).push().await.success);

    let local = browser(&[vec![("https://old", false, None)]]);
    local.fail_tab_creation_after(1);
    let engine = engine(&store, local);
    let result = engine.pull().await;
    assert!(!result.success);

    let dir = tempfile::tempdir()?;
    let session = dir.path().join("session.json");
    engine.host().save(&session)?;

    let reloaded = MemoryBrowser::load(&session)?;
    let urls: Vec<String> = reloaded.windows().await?[0]
        .tabs
        .iter()
        .map(|t| t.url.clone())
        .collect();
    assert_eq!(urls, vec!["https://old".to_string(), "https://a".to_string()]);
    Ok(())
}

#[tokio::test]
async fn missing_configuration_fails_before_any_request() {
    let store = Arc::new(RepoStore::new());
    let local = browser(&[vec![("https://a", false, None)]]);
    let engine = SyncEngine::new(Settings::default(), store.clone(), local);

    for result in [
        engine.push().await,
        engine.pull().await,
        engine.clear_remote().await,
        engine.check_connection().await,
    ] {
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Please configure GitHub settings first")
        );
    }
    assert_eq!(store.request_count(), 0);
    assert_eq!(engine.host().mutation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_operations_are_rejected() {
    let store = Arc::new(RepoStore::new());
    store.slow_down(Duration::from_millis(200));
    let local = browser(&[vec![("https://a", false, None)]]);
    let engine = engine(&store, local);

    let (push, pull) = tokio::join!(engine.push(), engine.pull());
    assert!(push.success, "{:?}", push.error);
    assert!(!pull.success);
    assert_eq!(
        pull.error.as_deref(),
        Some("Another sync operation is already in progress")
    );

    let after = engine.pull().await;
    assert!(after.success, "{:?}", after.error);
}

#[tokio::test(start_paused = true)]
async fn conflicts_are_retried_then_written() {
    let store = Arc::new(RepoStore::new());
    store.script_puts([PutOutcome::Conflict, PutOutcome::Conflict, PutOutcome::Conflict]);
    let local = browser(&[vec![("https://a", false, None)]]);

    let result = engine(&store, local).push().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(store.writes().len(), 4);
    assert!(store.document().is_some());
}

#[tokio::test(start_paused = true)]
async fn persistent_conflict_gives_up_after_five_attempts() {
    let store = Arc::new(RepoStore::new());
    store.script_puts(std::iter::repeat(PutOutcome::Conflict).take(5));
    let local = browser(&[vec![("https://a", false, None)]]);

    let result = engine(&store, local).push().await;
    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Failed to save after 5 attempts due to repeated 409 conflicts")
    );
    assert_eq!(store.writes().len(), 5);
    assert!(store.document().is_none());
}

#[tokio::test]
async fn clear_remote_publishes_empty_document() {
    let seeded = SnapshotDocument {
        windows: vec![Default::default()],
    };
    let store = Arc::new(RepoStore::with_document(&seeded));
    let engine = engine(&store, MemoryBrowser::new());

    let result = engine.clear_remote().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(store.document(), Some(SnapshotDocument::cleared()));
    assert_eq!(store.writes()[0].sha.as_deref(), Some("sha-1"));
}

#[tokio::test]
async fn connection_check_uses_store() {
    let store = Arc::new(RepoStore::new());
    let result = engine(&store, MemoryBrowser::new()).check_connection().await;
    assert!(result.success);
    assert_eq!(store.request_count(), 1);
}
