//! Remote object store access
//!
//! [`ObjectStore`] is the raw, content-addressed API (tree listing, blob
//! reads, conditional file writes). [`DocumentClient`] layers the read and
//! write protocols for the single snapshot document on top of it.

pub mod client;
pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

pub use client::{DocumentClient, MAX_PAYLOAD_BYTES};
pub use github::{GitHubConfig, GitHubStore};

/// Commit message attached to every document write
pub const COMMIT_MESSAGE: &str = "Update GitSync data";

/// One entry of a recursive tree listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
}

/// Body of a conditional create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutContents {
    pub message: String,
    /// Base64 payload
    pub content: String,
    /// Version token; absent means "create"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// How the store answered a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// The object changed since the token was read (HTTP 409)
    Conflict,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Recursive listing of the tree at `reference`
    async fn list_tree(&self, reference: &str) -> SyncResult<Vec<TreeEntry>>;

    /// Base64 content of a blob
    async fn fetch_blob(&self, sha: &str) -> SyncResult<String>;

    /// Current version token of the file at `path`, `None` if absent
    async fn fetch_version(&self, path: &str) -> SyncResult<Option<String>>;

    async fn put_contents(&self, path: &str, body: &PutContents) -> SyncResult<PutOutcome>;

    /// Verify that the repository is reachable with the configured credential
    async fn check_access(&self) -> SyncResult<()>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    async fn list_tree(&self, reference: &str) -> SyncResult<Vec<TreeEntry>> {
        (**self).list_tree(reference).await
    }

    async fn fetch_blob(&self, sha: &str) -> SyncResult<String> {
        (**self).fetch_blob(sha).await
    }

    async fn fetch_version(&self, path: &str) -> SyncResult<Option<String>> {
        (**self).fetch_version(path).await
    }

    async fn put_contents(&self, path: &str, body: &PutContents) -> SyncResult<PutOutcome> {
        (**self).put_contents(path, body).await
    }

    async fn check_access(&self) -> SyncResult<()> {
        (**self).check_access().await
    }
}
