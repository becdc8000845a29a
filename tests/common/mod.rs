#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;

use gitsync::browser::{MemoryBrowser, WindowId};
use gitsync::remote::{ObjectStore, PutContents, PutOutcome, TreeEntry};
use gitsync::{SnapshotDocument, Settings, SyncError, SyncResult};

pub const DOCUMENT: &str = "gitsync.json";

/// In-memory repository holding one document
#[derive(Default)]
pub struct RepoStore {
    document: Mutex<Option<(String, String)>>,
    writes: Mutex<Vec<PutContents>>,
    put_script: Mutex<VecDeque<PutOutcome>>,
    revision: AtomicUsize,
    requests: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl RepoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: &SnapshotDocument) -> Self {
        let store = Self::new();
        store.seed(document);
        store
    }

    pub fn seed(&self, document: &SnapshotDocument) {
        let json = document.to_pretty_json().unwrap();
        let sha = self.next_sha();
        *self.document.lock() = Some((sha, STANDARD.encode(json)));
    }

    /// Answer the next writes with these outcomes before accepting any
    pub fn script_puts(&self, outcomes: impl IntoIterator<Item = PutOutcome>) {
        self.put_script.lock().extend(outcomes);
    }

    /// Hold every request for `delay`
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn document(&self) -> Option<SnapshotDocument> {
        let guard = self.document.lock();
        let (_, content) = guard.as_ref()?;
        let bytes = STANDARD.decode(content).unwrap();
        Some(serde_json::from_slice(&bytes).unwrap())
    }

    pub fn writes(&self) -> Vec<PutContents> {
        self.writes.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn next_sha(&self) -> String {
        format!("sha-{}", self.revision.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn enter(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ObjectStore for RepoStore {
    async fn list_tree(&self, _reference: &str) -> SyncResult<Vec<TreeEntry>> {
        self.enter().await;
        Ok(self
            .document
            .lock()
            .as_ref()
            .map(|(sha, _)| TreeEntry {
                path: DOCUMENT.to_string(),
                sha: sha.clone(),
            })
            .into_iter()
            .collect())
    }

    async fn fetch_blob(&self, sha: &str) -> SyncResult<String> {
        self.enter().await;
        match self.document.lock().as_ref() {
            Some((current, content)) if current == sha => Ok(content.clone()),
            _ => Err(SyncError::transport("Failed to fetch blob: 404", Some(404))),
        }
    }

    async fn fetch_version(&self, _path: &str) -> SyncResult<Option<String>> {
        self.enter().await;
        Ok(self.document.lock().as_ref().map(|(sha, _)| sha.clone()))
    }

    async fn put_contents(&self, _path: &str, body: &PutContents) -> SyncResult<PutOutcome> {
        self.enter().await;
        self.writes.lock().push(body.clone());
        if let Some(outcome) = self.put_script.lock().pop_front() {
            return Ok(outcome);
        }

        let current = self.document.lock().as_ref().map(|(sha, _)| sha.clone());
        if body.sha != current {
            return Ok(PutOutcome::Conflict);
        }
        let sha = self.next_sha();
        *self.document.lock() = Some((sha, body.content.clone()));
        Ok(PutOutcome::Written)
    }

    async fn check_access(&self) -> SyncResult<()> {
        self.enter().await;
        Ok(())
    }
}

pub fn settings() -> Settings {
    Settings {
        github_owner: "octo".into(),
        github_repo: "tabs".into(),
        github_token: "t0ken".into(),
        ..Settings::default()
    }
}

/// Browser with one window per entry; each tab is `(url, pinned, group)`
pub fn browser(windows: &[Vec<(&str, bool, Option<&str>)>]) -> MemoryBrowser {
    let browser = MemoryBrowser::new();
    for tabs in windows {
        open(&browser, tabs);
    }
    browser
}

fn open(browser: &MemoryBrowser, tabs: &[(&str, bool, Option<&str>)]) -> WindowId {
    let window = browser.add_window();
    let mut groups: Vec<(&str, Vec<u32>)> = Vec::new();
    for (url, pinned, group) in tabs {
        let id = browser.add_tab(window, url, *pinned).unwrap();
        if let Some(name) = *group {
            match groups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, ids)) => ids.push(id),
                None => groups.push((name, vec![id])),
            }
        }
    }
    for (name, ids) in groups {
        browser.add_group(window, name, &ids).unwrap();
    }
    window
}
