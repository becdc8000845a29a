//! In-process browser host
//!
//! Behaves like a real browser where it matters to the sync engine: a
//! window whose last tab is removed closes itself, and a group whose last
//! member leaves disappears. The CLI persists it as a JSON session file;
//! tests use the call log to assert exactly which mutations were issued.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{
    BrowserHost, BrowserTab, BrowserWindow, CreateTab, GroupId, TabGroup, TabId, TabUpdate,
    WindowId,
};

/// URL given to tabs of windows opened without one
pub const BLANK_URL: &str = "about:blank";

/// One recorded mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateWindow { url: Option<String> },
    RemoveWindow(WindowId),
    CreateTab { window_id: WindowId, url: String, pinned: bool },
    UpdateTab { id: TabId, update: TabUpdate },
    RemoveTabs(Vec<TabId>),
    GroupTabs(Vec<TabId>),
    SetGroupTitle { id: GroupId, title: String },
}

/// Serializable browser contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserState {
    #[serde(default)]
    pub windows: Vec<BrowserWindow>,
    #[serde(default)]
    pub groups: Vec<TabGroup>,
    #[serde(default)]
    next_id: u32,
}

impl BrowserState {
    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut BrowserWindow> {
        self.windows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| anyhow!("No window with id {}", id))
    }

    fn tab_mut(&mut self, id: TabId) -> Result<&mut BrowserTab> {
        self.windows
            .iter_mut()
            .flat_map(|w| w.tabs.iter_mut())
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow!("No tab with id {}", id))
    }

    fn window_of(&self, tab: TabId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|w| w.tabs.iter().any(|t| t.id == tab))
            .map(|w| w.id)
    }

    fn deactivate_all(&mut self, window: WindowId) {
        if let Ok(window) = self.window_mut(window) {
            window.tabs.iter_mut().for_each(|t| t.active = false);
        }
    }

    /// Close empty windows, drop empty groups, renumber tab positions
    fn settle(&mut self) {
        self.windows.retain(|w| !w.tabs.is_empty());
        for window in &mut self.windows {
            for (index, tab) in window.tabs.iter_mut().enumerate() {
                tab.index = index;
                tab.window_id = window.id;
            }
        }
        let windows = &self.windows;
        self.groups.retain(|g| {
            windows
                .iter()
                .flat_map(|w| w.tabs.iter())
                .any(|t| t.group_id == Some(g.id))
        });
    }

    /// Repair ids and positions after loading a hand-edited session
    fn normalize(&mut self) {
        let max_tab = self.windows.iter().flat_map(|w| w.tabs.iter()).map(|t| t.id);
        let max_window = self.windows.iter().map(|w| w.id);
        let max_group = self.groups.iter().map(|g| g.id);
        let highest = max_tab.chain(max_window).chain(max_group).max().unwrap_or(0);
        self.next_id = self.next_id.max(highest);

        for window in &mut self.windows {
            for (index, tab) in window.tabs.iter_mut().enumerate() {
                tab.index = index;
                tab.window_id = window.id;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBrowser {
    state: Mutex<BrowserState>,
    calls: Mutex<Vec<HostCall>>,
    tab_budget: Mutex<Option<usize>>,
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(mut state: BrowserState) -> Self {
        state.normalize();
        Self {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    /// Load a session file; a missing file is an empty browser
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        let state: BrowserState = serde_json::from_str(&text)
            .with_context(|| format!("Invalid session file {}", path.display()))?;
        Ok(Self::from_state(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(&*self.state.lock())?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write session {}", path.display()))
    }

    pub fn state(&self) -> BrowserState {
        self.state.lock().clone()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of mutating calls issued so far
    pub fn mutation_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Make `create_tab` fail once `count` more tabs have been created
    pub fn fail_tab_creation_after(&self, count: usize) {
        *self.tab_budget.lock() = Some(count);
    }

    /// Open an empty window without recording a call
    pub fn add_window(&self) -> WindowId {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        state.windows.push(BrowserWindow {
            id,
            tabs: Vec::new(),
        });
        id
    }

    /// Append a tab without recording a call
    pub fn add_tab(&self, window: WindowId, url: &str, pinned: bool) -> Result<TabId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        let target = state.window_mut(window)?;
        target.tabs.push(BrowserTab {
            id,
            window_id: window,
            index: target.tabs.len(),
            url: url.to_string(),
            pinned,
            active: target.tabs.is_empty(),
            group_id: None,
        });
        Ok(id)
    }

    /// Group existing tabs without recording a call
    pub fn add_group(&self, window: WindowId, title: &str, tabs: &[TabId]) -> Result<GroupId> {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        for tab in tabs {
            state.tab_mut(*tab)?.group_id = Some(id);
        }
        state.groups.push(TabGroup {
            id,
            window_id: window,
            title: title.to_string(),
        });
        Ok(id)
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl BrowserHost for MemoryBrowser {
    async fn windows(&self) -> Result<Vec<BrowserWindow>> {
        Ok(self.state.lock().windows.clone())
    }

    async fn tab_groups(&self) -> Result<Vec<TabGroup>> {
        Ok(self.state.lock().groups.clone())
    }

    async fn create_window(&self, url: Option<&str>) -> Result<BrowserWindow> {
        self.record(HostCall::CreateWindow {
            url: url.map(String::from),
        });
        let mut state = self.state.lock();
        let id = state.alloc_id();
        let tab_id = state.alloc_id();
        let window = BrowserWindow {
            id,
            tabs: vec![BrowserTab {
                id: tab_id,
                window_id: id,
                index: 0,
                url: url.unwrap_or(BLANK_URL).to_string(),
                pinned: false,
                active: true,
                group_id: None,
            }],
        };
        state.windows.push(window.clone());
        Ok(window)
    }

    async fn remove_window(&self, id: WindowId) -> Result<()> {
        self.record(HostCall::RemoveWindow(id));
        let mut state = self.state.lock();
        let before = state.windows.len();
        state.windows.retain(|w| w.id != id);
        if state.windows.len() == before {
            bail!("No window with id {}", id);
        }
        state.groups.retain(|g| g.window_id != id);
        Ok(())
    }

    async fn create_tab(&self, tab: CreateTab) -> Result<BrowserTab> {
        self.record(HostCall::CreateTab {
            window_id: tab.window_id,
            url: tab.url.clone(),
            pinned: tab.pinned,
        });
        {
            let mut budget = self.tab_budget.lock();
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    bail!("Tab creation refused for {}", tab.url);
                }
                *remaining -= 1;
            }
        }

        let mut state = self.state.lock();
        let id = state.alloc_id();
        if tab.active {
            state.deactivate_all(tab.window_id);
        }
        let window = state.window_mut(tab.window_id)?;
        let created = BrowserTab {
            id,
            window_id: tab.window_id,
            index: window.tabs.len(),
            url: tab.url,
            pinned: tab.pinned,
            active: tab.active,
            group_id: None,
        };
        window.tabs.push(created.clone());
        Ok(created)
    }

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<()> {
        self.record(HostCall::UpdateTab { id, update });
        let mut state = self.state.lock();
        let window = state
            .window_of(id)
            .ok_or_else(|| anyhow!("No tab with id {}", id))?;
        if update.active == Some(true) {
            state.deactivate_all(window);
        }
        let tab = state.tab_mut(id)?;
        if let Some(active) = update.active {
            tab.active = active;
        }
        if let Some(pinned) = update.pinned {
            tab.pinned = pinned;
        }
        Ok(())
    }

    async fn remove_tabs(&self, ids: &[TabId]) -> Result<()> {
        self.record(HostCall::RemoveTabs(ids.to_vec()));
        let mut state = self.state.lock();
        if let Some(missing) = ids.iter().find(|id| state.window_of(**id).is_none()) {
            bail!("No tab with id {}", missing);
        }
        for window in &mut state.windows {
            window.tabs.retain(|t| !ids.contains(&t.id));
        }
        state.settle();
        Ok(())
    }

    async fn group_tabs(&self, ids: &[TabId]) -> Result<GroupId> {
        self.record(HostCall::GroupTabs(ids.to_vec()));
        let mut state = self.state.lock();
        let first = ids.first().ok_or_else(|| anyhow!("Cannot group zero tabs"))?;
        let window = state
            .window_of(*first)
            .ok_or_else(|| anyhow!("No tab with id {}", first))?;
        if let Some(stray) = ids.iter().find(|id| state.window_of(**id) != Some(window)) {
            bail!("Tab {} is not in window {}", stray, window);
        }

        let id = state.alloc_id();
        for tab in ids {
            state.tab_mut(*tab)?.group_id = Some(id);
        }
        state.groups.push(TabGroup {
            id,
            window_id: window,
            title: String::new(),
        });
        state.settle();
        Ok(id)
    }

    async fn set_group_title(&self, id: GroupId, title: &str) -> Result<()> {
        self.record(HostCall::SetGroupTitle {
            id,
            title: title.to_string(),
        });
        let mut state = self.state.lock();
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| anyhow!("No group with id {}", id))?;
        group.title = title.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removing_last_tab_closes_window() {
        let browser = MemoryBrowser::new();
        let window = browser.create_window(Some("https://a")).await.unwrap();
        let tab = window.tabs[0].id;

        browser.remove_tabs(&[tab]).await.unwrap();
        assert!(browser.windows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_group_dissolves_when_members_leave() {
        let browser = MemoryBrowser::new();
        let window = browser.add_window();
        let a = browser.add_tab(window, "https://a", false).unwrap();
        let b = browser.add_tab(window, "https://b", false).unwrap();

        let group = browser.group_tabs(&[a]).await.unwrap();
        browser.set_group_title(group, "Work").await.unwrap();
        assert_eq!(browser.tab_groups().await.unwrap()[0].title, "Work");

        browser.remove_tabs(&[a]).await.unwrap();
        assert!(browser.tab_groups().await.unwrap().is_empty());
        assert_eq!(browser.windows().await.unwrap()[0].tabs[0].id, b);
        assert_eq!(browser.windows().await.unwrap()[0].tabs[0].index, 0);
    }

    #[tokio::test]
    async fn test_activation_is_exclusive_per_window() {
        let browser = MemoryBrowser::new();
        let window = browser.add_window();
        let a = browser.add_tab(window, "https://a", false).unwrap();
        let b = browser.add_tab(window, "https://b", false).unwrap();

        browser.update_tab(b, TabUpdate::activate()).await.unwrap();
        let tabs = &browser.windows().await.unwrap()[0].tabs;
        assert!(!tabs.iter().find(|t| t.id == a).unwrap().active);
        assert!(tabs.iter().find(|t| t.id == b).unwrap().active);
    }

    #[tokio::test]
    async fn test_tab_budget() {
        let browser = MemoryBrowser::new();
        let window = browser.add_window();
        browser.fail_tab_creation_after(1);

        let req = |url: &str| CreateTab {
            window_id: window,
            url: url.to_string(),
            pinned: false,
            active: false,
        };
        assert!(browser.create_tab(req("https://a")).await.is_ok());
        assert!(browser.create_tab(req("https://b")).await.is_err());
        assert_eq!(browser.mutation_count(), 2);
    }

    #[test]
    fn test_session_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let browser = MemoryBrowser::new();
        let window = browser.add_window();
        let tab = browser.add_tab(window, "https://a", true).unwrap();
        browser.add_group(window, "Docs", &[tab]).unwrap();
        browser.save(&path).unwrap();

        let loaded = MemoryBrowser::load(&path).unwrap();
        assert_eq!(loaded.state(), browser.state());

        // fresh ids never collide with loaded ones
        let next = loaded.add_window();
        assert!(next > tab);

        let missing = MemoryBrowser::load(&dir.path().join("absent.json")).unwrap();
        assert!(missing.state().windows.is_empty());
    }
}
