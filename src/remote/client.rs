//! Read and write protocols for the snapshot document

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{ObjectStore, PutContents, PutOutcome, COMMIT_MESSAGE};
use crate::error::{RetryPolicy, SyncError, SyncResult};
use crate::snapshot::SnapshotDocument;

/// Upper bound on the base64 payload sent in one write
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

pub struct DocumentClient<S> {
    store: S,
    path: String,
    reference: String,
    retry: RetryPolicy,
}

impl<S: ObjectStore> DocumentClient<S> {
    pub fn new(store: S, path: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
            reference: reference.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Write `document` without overwriting a version we did not observe.
    ///
    /// Each attempt re-reads the version token, then writes conditionally.
    /// Conflicts are retried up to the policy bound; any other failure is
    /// returned at once. Returns the number of attempts used.
    pub async fn publish(&self, document: &SnapshotDocument) -> SyncResult<u32> {
        let content = encode_payload(document)?;
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let version = match self.store.fetch_version(&self.path).await {
                Ok(version) => version,
                Err(e) => {
                    debug!(path = %self.path, error = %e, "version lookup failed, writing as create");
                    None
                }
            };

            let body = PutContents {
                message: COMMIT_MESSAGE.to_string(),
                content: content.clone(),
                sha: version,
            };

            match self.store.put_contents(&self.path, &body).await? {
                PutOutcome::Written => {
                    info!(path = %self.path, attempt, "document published");
                    return Ok(attempt);
                }
                PutOutcome::Conflict => {
                    warn!(path = %self.path, attempt, max_attempts, "version conflict on write");
                    if attempt < max_attempts {
                        sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(SyncError::ConflictExhausted {
            attempts: max_attempts,
        })
    }

    /// Read the document, degrading every failure to [`SnapshotDocument::empty`]
    pub async fn fetch(&self) -> SnapshotDocument {
        match self.fetch_strict().await {
            Ok(Some(document)) => document,
            Ok(None) => {
                info!(path = %self.path, "no remote document yet");
                SnapshotDocument::empty()
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "remote document unreadable, using empty document");
                SnapshotDocument::empty()
            }
        }
    }

    /// Read the document, reporting failures; `Ok(None)` when it does not exist
    pub async fn fetch_strict(&self) -> SyncResult<Option<SnapshotDocument>> {
        let tree = self.store.list_tree(&self.reference).await?;
        let Some(entry) = tree.into_iter().find(|e| e.path == self.path) else {
            return Ok(None);
        };
        debug!(path = %self.path, sha = %entry.sha, "resolved document blob");

        let content = self.store.fetch_blob(&entry.sha).await?;
        decode_payload(&content).map(Some)
    }
}

/// Pretty JSON, then base64
pub fn encode_payload(document: &SnapshotDocument) -> SyncResult<String> {
    let json = document
        .to_pretty_json()
        .map_err(|e| SyncError::Encode(e.to_string()))?;
    let encoded = STANDARD.encode(json.as_bytes());
    if encoded.len() > MAX_PAYLOAD_BYTES {
        return Err(SyncError::Encode(format!(
            "payload is {} bytes, limit is {}",
            encoded.len(),
            MAX_PAYLOAD_BYTES
        )));
    }
    Ok(encoded)
}

/// Inverse of [`encode_payload`]; tolerates the line breaks GitHub inserts
pub fn decode_payload(content: &str) -> SyncResult<SnapshotDocument> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SyncError::Decode(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| SyncError::Decode(e.to_string()))?;
    SnapshotDocument::from_json(&text).map_err(|e| SyncError::Decode(e.to_string()))
}
