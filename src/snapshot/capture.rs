//! Live browser state to snapshot document

use tracing::debug;

use super::document::{SnapshotDocument, TabEntry, WindowEntry, UNGROUPED};
use super::filter::UrlFilter;
use crate::browser::{BrowserHost, BrowserTab, BrowserWindow, TabGroup};
use crate::error::SyncResult;

/// Read every window and group from the host and build a document
pub async fn capture_from<H: BrowserHost + ?Sized>(
    host: &H,
    filter: &UrlFilter,
) -> SyncResult<SnapshotDocument> {
    let windows = host.windows().await?;
    let groups = host.tab_groups().await?;
    let document = capture(&windows, &groups, filter);
    debug!(
        windows = document.windows.len(),
        tabs = document.tab_count(),
        "captured local snapshot"
    );
    Ok(document)
}

/// Pure transform: same input, same output
pub fn capture(windows: &[BrowserWindow], groups: &[TabGroup], filter: &UrlFilter) -> SnapshotDocument {
    let windows = windows
        .iter()
        .map(|window| {
            let mut tabs: Vec<&BrowserTab> = window.tabs.iter().collect();
            tabs.sort_by_key(|t| t.index);

            let mut entry = WindowEntry::default();
            for tab in tabs.into_iter().filter(|t| filter.is_syncable(&t.url)) {
                entry
                    .groups
                    .push_tab(&group_name(tab, groups), TabEntry::new(tab.url.clone(), tab.pinned));
            }
            entry
        })
        .collect();

    SnapshotDocument { windows }
}

fn group_name(tab: &BrowserTab, groups: &[TabGroup]) -> String {
    let Some(group_id) = tab.group_id else {
        return UNGROUPED.to_string();
    };
    match groups.iter().find(|g| g.id == group_id) {
        Some(group) if !group.title.is_empty() => group.title.clone(),
        _ => format!("Group {}", group_id),
    }
}
