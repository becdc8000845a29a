//! Which tab URLs are worth syncing

/// Schemes that only make sense inside the local browser
pub const INTERNAL_PREFIXES: &[&str] = &["about:", "moz-extension:"];

/// URL prefix filter applied on capture and on restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlFilter {
    blacklist: Vec<String>,
}

impl UrlFilter {
    /// Build from a comma-separated prefix list, e.g. `"https://mail., file://"`
    pub fn from_blacklist(config: &str) -> Self {
        Self::new(parse_blacklist(config))
    }

    pub fn new(blacklist: Vec<String>) -> Self {
        Self { blacklist }
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Case-sensitive prefix match; empty URLs are never syncable
    pub fn is_syncable(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        let internal = INTERNAL_PREFIXES.iter().any(|prefix| url.starts_with(prefix));
        !internal && !self.blacklist.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }
}

pub fn parse_blacklist(config: &str) -> Vec<String> {
    config
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
