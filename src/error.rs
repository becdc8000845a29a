//! Error kinds and retry bounds for sync operations
//!
//! Every failure inside push, pull or clear-remote is one of the
//! [`SyncError`] variants below. Operation boundaries flatten them into an
//! [`OperationResult`](crate::sync::OperationResult) message; the only
//! failure that is retried silently is a version conflict, bounded by
//! [`RetryPolicy`].

use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the synchronization engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// Owner, repository or credential is not configured
    #[error("{0}")]
    ConfigurationMissing(String),

    /// Network or HTTP failure other than a version conflict
    #[error("{message}")]
    RemoteTransport {
        message: String,
        status: Option<u16>,
    },

    /// Every bounded write attempt hit a conflicting version
    #[error("Failed to save after {attempts} attempts due to repeated 409 conflicts")]
    ConflictExhausted { attempts: u32 },

    /// Remote payload could not be decoded or parsed
    #[error("Failed to decode remote document: {0}")]
    Decode(String),

    /// Local document could not be encoded for upload
    #[error("Failed to encode document: {0}")]
    Encode(String),

    /// Remote document has no windows to restore
    #[error("Nothing to pull.")]
    EmptyPullSource,

    /// A browser capability call failed
    #[error("Browser operation failed: {0}")]
    Host(#[from] anyhow::Error),

    /// Another push/pull is running
    #[error("Another sync operation is already in progress")]
    Busy,
}

impl SyncError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::ConfigurationMissing(message.into())
    }

    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        SyncError::RemoteTransport {
            message: message.into(),
            status,
        }
    }

    /// HTTP status attached to a transport failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::RemoteTransport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::ConfigurationMissing(_) => ErrorCategory::Configuration,
            SyncError::RemoteTransport { .. } => ErrorCategory::Network,
            SyncError::ConflictExhausted { .. } => ErrorCategory::Conflict,
            SyncError::Decode(_) => ErrorCategory::Decode,
            SyncError::Encode(_) | SyncError::EmptyPullSource => ErrorCategory::Validation,
            SyncError::Host(_) => ErrorCategory::Host,
            SyncError::Busy => ErrorCategory::Busy,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        SyncError::RemoteTransport {
            message: e.to_string(),
            status,
        }
    }
}

/// Categorized error types for deciding how a caller reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Settings are incomplete (not retryable)
    Configuration,

    /// Network-related errors
    Network,

    /// Remote kept changing under us (retry later)
    Conflict,

    /// Malformed remote payload
    Decode,

    /// Invalid local input
    Validation,

    /// Browser capability failure
    Host,

    /// Overlapping operation was rejected (retry later)
    Busy,
}

impl ErrorCategory {
    /// Whether the user should simply try the operation again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network | ErrorCategory::Conflict | ErrorCategory::Busy
        )
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after every attempt
    pub backoff_multiplier: f64,

    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(300),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Fixed delay between every attempt
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Create a no-retry policy
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let nanos = self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_nanos(nanos.round() as u64).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let err = SyncError::configuration("Please configure GitHub settings first");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.to_string(), "Please configure GitHub settings first");

        let err = SyncError::transport("Failed to save to GitHub: 500", Some(500));
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.status(), Some(500));

        assert_eq!(SyncError::Busy.category(), ErrorCategory::Busy);
        assert_eq!(SyncError::EmptyPullSource.to_string(), "Nothing to pull.");
    }

    #[test]
    fn test_exhaustion_message_names_attempts() {
        let err = SyncError::ConflictExhausted { attempts: 5 };
        assert_eq!(
            err.to_string(),
            "Failed to save after 5 attempts due to repeated 409 conflicts"
        );
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCategory::Conflict.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
    }

    #[test]
    fn test_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_after(1), Duration::from_millis(300));
        assert_eq!(policy.delay_after(4), Duration::from_millis(300));

        let no_retry = RetryPolicy::no_retry();
        assert_eq!(no_retry.max_attempts, 1);

        let backoff = RetryPolicy {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(backoff.delay_after(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_after(3), Duration::from_millis(300));
    }
}
