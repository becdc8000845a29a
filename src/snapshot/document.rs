//! Portable snapshot document
//!
//! The JSON stored remotely looks like:
//!
//! ```json
//! { "windows": [ { "groups": { "Work": [ { "url": "https://a", "pinned": false } ] } } ] }
//! ```
//!
//! Group order inside a window is significant, so [`GroupMap`] keeps
//! insertion order instead of sorting keys.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label for tabs that belong to no group. Never becomes a real group.
pub const UNGROUPED: &str = "Ungrouped";

/// All windows, in host enumeration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub windows: Vec<WindowEntry>,
}

impl SnapshotDocument {
    /// Document returned when the remote has nothing yet: one window, no groups
    pub fn empty() -> Self {
        Self {
            windows: vec![WindowEntry::default()],
        }
    }

    /// Document published by clear-remote: no windows at all
    pub fn cleared() -> Self {
        Self {
            windows: Vec::new(),
        }
    }

    pub fn tab_count(&self) -> usize {
        self.windows.iter().map(WindowEntry::tab_count).sum()
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// One browser window: group name to ordered tabs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowEntry {
    #[serde(default)]
    pub groups: GroupMap,
}

impl WindowEntry {
    pub fn tab_count(&self) -> usize {
        self.groups.iter().map(|(_, tabs)| tabs.len()).sum()
    }

    /// Tabs in document order, each paired with its group name
    pub fn tabs(&self) -> impl Iterator<Item = (&str, &TabEntry)> {
        self.groups
            .iter()
            .flat_map(|(name, tabs)| tabs.iter().map(move |tab| (name, tab)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pinned: bool,
}

impl TabEntry {
    pub fn new(url: impl Into<String>, pinned: bool) -> Self {
        Self {
            url: url.into(),
            pinned,
        }
    }
}

/// Insertion-ordered map from group name to tabs.
///
/// Names are unique: pushing into an existing name appends to that group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupMap {
    entries: Vec<(String, Vec<TabEntry>)>,
}

impl GroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&[TabEntry]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tabs)| tabs.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TabEntry])> {
        self.entries
            .iter()
            .map(|(n, tabs)| (n.as_str(), tabs.as_slice()))
    }

    /// Append one tab to `name`, creating the group at the end if new
    pub fn push_tab(&mut self, name: &str, tab: TabEntry) {
        self.group_mut(name).push(tab);
    }

    /// Append several tabs to `name`, creating the group at the end if new
    pub fn extend_group(&mut self, name: impl Into<String>, tabs: Vec<TabEntry>) {
        let name = name.into();
        self.group_mut(&name).extend(tabs);
    }

    fn group_mut(&mut self, name: &str) -> &mut Vec<TabEntry> {
        let pos = match self.entries.iter().position(|(n, _)| n == name) {
            Some(pos) => pos,
            None => {
                self.entries.push((name.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<TabEntry>)> for GroupMap {
    fn from_iter<I: IntoIterator<Item = (S, Vec<TabEntry>)>>(iter: I) -> Self {
        let mut map = GroupMap::new();
        for (name, tabs) in iter {
            map.extend_group(name, tabs);
        }
        map
    }
}

impl Serialize for GroupMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, tabs) in &self.entries {
            map.serialize_entry(name, tabs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GroupMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupMapVisitor;

        impl<'de> Visitor<'de> for GroupMapVisitor {
            type Value = GroupMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of group names to tab lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<GroupMap, A::Error> {
                let mut groups = GroupMap::new();
                while let Some((name, tabs)) = access.next_entry::<String, Vec<TabEntry>>()? {
                    groups.extend_group(name, tabs);
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupMapVisitor)
    }
}
