//! Push / pull orchestration
//!
//! The engine owns the remote document client and the browser host and
//! runs at most one operation at a time: an invocation that arrives while
//! another push or pull is in flight is rejected, never interleaved.

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserHost;
use crate::config::Settings;
use crate::error::{RetryPolicy, SyncError, SyncResult};
use crate::remote::{DocumentClient, ObjectStore};
use crate::snapshot::{capture_from, restore, SnapshotDocument, UrlFilter};

/// Uniform answer of every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl From<SyncResult<()>> for OperationResult {
    fn from(result: SyncResult<()>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

pub struct SyncEngine<S, H> {
    settings: Settings,
    client: DocumentClient<S>,
    host: H,
    running: Mutex<()>,
}

impl<S: ObjectStore, H: BrowserHost> SyncEngine<S, H> {
    pub fn new(settings: Settings, store: S, host: H) -> Self {
        let client = DocumentClient::new(store, settings.document_path.clone(), settings.branch.clone());
        Self {
            settings,
            client,
            host,
            running: Mutex::new(()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.client = self.client.with_retry_policy(retry);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn client(&self) -> &DocumentClient<S> {
        &self.client
    }

    /// Publish the current browser state
    pub async fn push(&self) -> OperationResult {
        self.guarded("push", self.push_inner()).await
    }

    /// Replace the browser state with the remote document
    pub async fn pull(&self) -> OperationResult {
        self.guarded("pull", self.pull_inner()).await
    }

    /// Publish a document with no windows
    pub async fn clear_remote(&self) -> OperationResult {
        self.guarded("clear-remote", self.clear_inner()).await
    }

    /// Check that the repository is reachable; does not take the operation lock
    pub async fn check_connection(&self) -> OperationResult {
        let result = match self.settings.require_remote() {
            Ok(()) => self.client.store().check_access().await,
            Err(e) => Err(e),
        };
        result.into()
    }

    async fn push_inner(&self) -> SyncResult<()> {
        self.settings.require_remote()?;
        let filter = UrlFilter::new(self.settings.blacklist());
        debug!(blacklisted = filter.blacklist().len(), "capturing browser state");
        let document = capture_from(&self.host, &filter).await?;
        self.client.publish(&document).await?;
        Ok(())
    }

    async fn pull_inner(&self) -> SyncResult<()> {
        self.settings.require_remote()?;
        let document = self.client.fetch().await;
        restore(&self.host, &document).await?;
        Ok(())
    }

    async fn clear_inner(&self) -> SyncResult<()> {
        self.settings.require_remote()?;
        self.client.publish(&SnapshotDocument::cleared()).await?;
        Ok(())
    }

    async fn guarded<F>(&self, operation: &'static str, work: F) -> OperationResult
    where
        F: Future<Output = SyncResult<()>>,
    {
        let Ok(_running) = self.running.try_lock() else {
            warn!(operation, "rejected, another operation is running");
            return OperationResult::failure(SyncError::Busy.to_string());
        };

        info!(operation, "started");
        let started = Instant::now();
        match work.await {
            Ok(()) => {
                info!(operation, elapsed_ms = started.elapsed().as_millis() as u64, "finished");
                OperationResult::success()
            }
            Err(e) => {
                error!(operation, category = ?e.category(), "{}", e);
                OperationResult::failure(e.to_string())
            }
        }
    }
}
