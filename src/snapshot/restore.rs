//! Snapshot document to live browser state
//!
//! Replaces every window with the windows described by a document:
//!
//! 1. The first existing window becomes the anchor (one is opened if the
//!    browser has none). Its current tabs are remembered for removal.
//! 2. Every other window is closed, as one awaited batch.
//! 3. The document's first window is materialized into the anchor. New tabs
//!    are created first, grouped, the first one activated, and only then are
//!    the anchor's old tabs removed, so the anchor never goes empty.
//! 4. Each further document window opens a new window seeded with its first
//!    tab, then receives the rest of its tabs and its groups.
//! 5. If the document's first window had no tabs, the anchor was left as
//!    is; it is closed once any further window has opened. A document with
//!    a single empty window leaves the anchor untouched.
//!
//! Nothing is rolled back on failure: tabs and windows created before the
//! failing call stay open.

use futures::future::join_all;
use tracing::{debug, info};

use super::document::{SnapshotDocument, TabEntry, WindowEntry, UNGROUPED};
use super::filter::UrlFilter;
use crate::browser::{BrowserHost, BrowserWindow, CreateTab, TabId, TabUpdate, WindowId};
use crate::error::{SyncError, SyncResult};

/// Counts of what a restore changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub windows_closed: usize,
    pub windows_created: usize,
    pub tabs_created: usize,
    pub tabs_removed: usize,
    pub groups_created: usize,
    pub windows_skipped: usize,
}

/// The pre-existing window that receives the document's first window
#[derive(Debug, Clone)]
struct AnchorWindow {
    id: WindowId,
    original_tabs: Vec<TabId>,
}

impl AnchorWindow {
    fn from_window(window: &BrowserWindow) -> Self {
        Self {
            id: window.id,
            original_tabs: window.tabs.iter().map(|t| t.id).collect(),
        }
    }
}

/// A created tab and the group it must join
type PlacedTab<'a> = (TabId, &'a str);

pub async fn restore<H: BrowserHost + ?Sized>(
    host: &H,
    document: &SnapshotDocument,
) -> SyncResult<RestoreReport> {
    let Some((first, rest)) = document.windows.split_first() else {
        return Err(SyncError::EmptyPullSource);
    };

    let filter = UrlFilter::default();
    let mut report = RestoreReport::default();

    let mut existing = host.windows().await?.into_iter();
    let anchor = match existing.next() {
        Some(window) => AnchorWindow::from_window(&window),
        None => {
            let window = host.create_window(None).await?;
            report.windows_created += 1;
            AnchorWindow::from_window(&window)
        }
    };
    debug!(anchor = anchor.id, tabs = anchor.original_tabs.len(), "anchor window selected");

    let doomed: Vec<WindowId> = existing.map(|w| w.id).collect();
    let closed = join_all(doomed.iter().map(|id| host.remove_window(*id))).await;
    for result in closed {
        result?;
    }
    report.windows_closed = doomed.len();

    let anchor_filled = fill_anchor(host, &anchor, first, &filter, &mut report).await?;

    let mut opened = 0;
    for entry in rest {
        if open_window(host, entry, &filter, &mut report).await? {
            opened += 1;
        }
    }

    // an unfilled anchor still holds stale tabs; drop it once another window exists
    if !anchor_filled && opened > 0 {
        host.remove_window(anchor.id).await?;
        report.windows_closed += 1;
        report.tabs_removed += anchor.original_tabs.len();
    }

    info!(
        windows_created = report.windows_created,
        windows_closed = report.windows_closed,
        tabs_created = report.tabs_created,
        groups_created = report.groups_created,
        "restore finished"
    );
    Ok(report)
}

fn planned_tabs<'a>(entry: &'a WindowEntry, filter: &UrlFilter) -> Vec<(&'a str, &'a TabEntry)> {
    entry
        .tabs()
        .filter(|(_, tab)| filter.is_syncable(&tab.url))
        .collect()
}

async fn fill_anchor<H: BrowserHost + ?Sized>(
    host: &H,
    anchor: &AnchorWindow,
    entry: &WindowEntry,
    filter: &UrlFilter,
    report: &mut RestoreReport,
) -> SyncResult<bool> {
    let planned = planned_tabs(entry, filter);
    if planned.is_empty() {
        // removing the old tabs now would empty, and so close, the anchor
        debug!(anchor = anchor.id, "first window has no tabs, anchor left as is");
        report.windows_skipped += 1;
        return Ok(false);
    }

    let mut placed: Vec<PlacedTab> = Vec::with_capacity(planned.len());
    for (group, tab) in planned {
        let created = host
            .create_tab(CreateTab {
                window_id: anchor.id,
                url: tab.url.clone(),
                pinned: tab.pinned,
                active: false,
            })
            .await?;
        placed.push((created.id, group));
        report.tabs_created += 1;
    }

    regroup(host, &placed, report).await?;

    host.update_tab(placed[0].0, TabUpdate::activate()).await?;

    if !anchor.original_tabs.is_empty() {
        host.remove_tabs(&anchor.original_tabs).await?;
        report.tabs_removed += anchor.original_tabs.len();
    }
    Ok(true)
}

async fn open_window<H: BrowserHost + ?Sized>(
    host: &H,
    entry: &WindowEntry,
    filter: &UrlFilter,
    report: &mut RestoreReport,
) -> SyncResult<bool> {
    let planned = planned_tabs(entry, filter);
    let Some(((first_group, first_tab), rest)) = planned.split_first() else {
        report.windows_skipped += 1;
        return Ok(false);
    };

    let window = host.create_window(Some(&first_tab.url)).await?;
    report.windows_created += 1;
    let seed = window.tabs.first().map(|t| t.id).ok_or_else(|| {
        SyncError::Host(anyhow::anyhow!("window {} opened without a tab", window.id))
    })?;
    if first_tab.pinned {
        host.update_tab(seed, TabUpdate::pin()).await?;
    }

    let mut placed: Vec<PlacedTab> = Vec::with_capacity(planned.len());
    placed.push((seed, *first_group));
    report.tabs_created += 1;

    for (group, tab) in rest {
        let created = host
            .create_tab(CreateTab {
                window_id: window.id,
                url: tab.url.clone(),
                pinned: tab.pinned,
                active: false,
            })
            .await?;
        placed.push((created.id, *group));
        report.tabs_created += 1;
    }

    regroup(host, &placed, report).await?;
    Ok(true)
}

/// One group per distinct name, in order of first appearance
async fn regroup<H: BrowserHost + ?Sized>(
    host: &H,
    placed: &[PlacedTab<'_>],
    report: &mut RestoreReport,
) -> SyncResult<()> {
    let mut groups: Vec<(&str, Vec<TabId>)> = Vec::new();
    for (tab, name) in placed.iter().filter(|(_, name)| *name != UNGROUPED) {
        match groups.iter_mut().find(|(n, _)| n == name) {
            Some((_, ids)) => ids.push(*tab),
            None => groups.push((*name, vec![*tab])),
        }
    }

    for (name, ids) in groups {
        let group = host.group_tabs(&ids).await?;
        host.set_group_title(group, name).await?;
        report.groups_created += 1;
    }
    Ok(())
}
