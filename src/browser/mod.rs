//! Browser capability surface
//!
//! The sync engine never touches a real browser directly. It reads and
//! mutates windows, tabs and groups through [`BrowserHost`], so the same
//! restore algorithm can drive a WebExtension bridge, a session file, or the
//! in-process [`MemoryBrowser`] used by tests.
//!
//! ```text
//! SyncEngine
//!       |
//!       v
//! BrowserHost (trait)
//!       |
//!       +---> MemoryBrowser (session file / tests)
//!       |
//!       +---> extension bridge (external)
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::{HostCall, MemoryBrowser};

pub type WindowId = u32;
pub type TabId = u32;
pub type GroupId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTab {
    pub id: TabId,
    pub window_id: WindowId,
    /// Position within the window's tab strip
    pub index: usize,
    pub url: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserWindow {
    pub id: WindowId,
    #[serde(default)]
    pub tabs: Vec<BrowserTab>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabGroup {
    pub id: GroupId,
    pub window_id: WindowId,
    #[serde(default)]
    pub title: String,
}

/// Parameters for opening a tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTab {
    pub window_id: WindowId,
    pub url: String,
    pub pinned: bool,
    pub active: bool,
}

/// Partial tab update; `None` leaves the property unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabUpdate {
    pub active: Option<bool>,
    pub pinned: Option<bool>,
}

impl TabUpdate {
    pub fn activate() -> Self {
        Self {
            active: Some(true),
            ..Default::default()
        }
    }

    pub fn pin() -> Self {
        Self {
            pinned: Some(true),
            ..Default::default()
        }
    }
}

/// Window/tab/group primitives provided by the host environment.
///
/// Each call is independent and may fail; nothing here is transactional.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// All open windows with their tabs, in host order
    async fn windows(&self) -> Result<Vec<BrowserWindow>>;

    /// All tab groups across every window
    async fn tab_groups(&self) -> Result<Vec<TabGroup>>;

    /// Open a window; hosts may seed it with a blank tab when `url` is `None`
    async fn create_window(&self, url: Option<&str>) -> Result<BrowserWindow>;

    async fn remove_window(&self, id: WindowId) -> Result<()>;

    async fn create_tab(&self, tab: CreateTab) -> Result<BrowserTab>;

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<()>;

    async fn remove_tabs(&self, ids: &[TabId]) -> Result<()>;

    /// Put the given tabs into a new group and return its id
    async fn group_tabs(&self, ids: &[TabId]) -> Result<GroupId>;

    async fn set_group_title(&self, id: GroupId, title: &str) -> Result<()>;
}

#[async_trait]
impl<T: BrowserHost + ?Sized> BrowserHost for std::sync::Arc<T> {
    async fn windows(&self) -> Result<Vec<BrowserWindow>> {
        (**self).windows().await
    }

    async fn tab_groups(&self) -> Result<Vec<TabGroup>> {
        (**self).tab_groups().await
    }

    async fn create_window(&self, url: Option<&str>) -> Result<BrowserWindow> {
        (**self).create_window(url).await
    }

    async fn remove_window(&self, id: WindowId) -> Result<()> {
        (**self).remove_window(id).await
    }

    async fn create_tab(&self, tab: CreateTab) -> Result<BrowserTab> {
        (**self).create_tab(tab).await
    }

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<()> {
        (**self).update_tab(id, update).await
    }

    async fn remove_tabs(&self, ids: &[TabId]) -> Result<()> {
        (**self).remove_tabs(ids).await
    }

    async fn group_tabs(&self, ids: &[TabId]) -> Result<GroupId> {
        (**self).group_tabs(ids).await
    }

    async fn set_group_title(&self, id: GroupId, title: &str) -> Result<()> {
        (**self).set_group_title(id, title).await
    }
}
