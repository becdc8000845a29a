//! # GitSync - Browser Tab Sync Through a GitHub Repository
//!
//! Captures the open windows, tab groups and tabs of a browser into a single
//! JSON document (`gitsync.json`), publishes it to a GitHub repository with
//! optimistic concurrency, and rebuilds the browser from it on another machine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use gitsync::{GitHubConfig, GitHubStore, MemoryBrowser, Settings, SyncEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(Path::new("gitsync.toml"))?;
//!     let store = GitHubStore::new(GitHubConfig::from_settings(&settings))?;
//!     let browser = MemoryBrowser::load(Path::new("session.json"))?;
//!
//!     let engine = SyncEngine::new(settings, store, browser);
//!     let result = engine.push().await;
//!     println!("pushed: {}", result.success);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod logging;
pub mod remote;
pub mod scheduler;
pub mod snapshot;
pub mod sync;

// Re-export main types for library consumers
pub use browser::{BrowserHost, MemoryBrowser};
pub use config::Settings;
pub use error::{ErrorCategory, RetryPolicy, SyncError, SyncResult};
pub use remote::{DocumentClient, GitHubConfig, GitHubStore, ObjectStore};
pub use scheduler::AutoPushScheduler;
pub use snapshot::{GroupMap, RestoreReport, SnapshotDocument, TabEntry, UrlFilter, WindowEntry};
pub use sync::{OperationResult, SyncEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
