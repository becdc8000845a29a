//! Persisted settings
//!
//! Stored as TOML. Environment variables (optionally from a `.env` file)
//! override file values so credentials can stay out of the settings file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::snapshot::filter::parse_blacklist;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DOCUMENT_PATH: &str = "gitsync.json";

const MISSING_REMOTE: &str = "Please configure GitHub settings first";
const INCOMPLETE_SAVE: &str = "Please fill in GitHub owner, repository, and token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub github_owner: String,
    pub github_repo: String,
    pub github_token: String,

    /// Comma-separated URL prefixes never pushed
    pub url_blacklist: String,

    /// Minutes between automatic pushes, `0` disables
    pub auto_push_interval: u32,

    pub api_url: String,
    pub branch: String,
    pub document_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_owner: String::new(),
            github_repo: String::new(),
            github_token: String::new(),
            url_blacklist: String::new(),
            auto_push_interval: 0,
            api_url: DEFAULT_API_URL.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
        }
    }
}

impl Settings {
    /// Read `path` (defaults if absent), then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = Self::from_file(path)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate_for_save()?;
        self.write(path)
    }

    /// Persist without validation, used when credentials are removed
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings {}", path.display()))
    }

    /// Overlay `GITSYNC_*` values looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text_fields: [(&str, &mut String); 5] = [
            ("GITSYNC_OWNER", &mut self.github_owner),
            ("GITSYNC_REPO", &mut self.github_repo),
            ("GITSYNC_TOKEN", &mut self.github_token),
            ("GITSYNC_BLACKLIST", &mut self.url_blacklist),
            ("GITSYNC_API_URL", &mut self.api_url),
        ];
        for (key, field) in text_fields {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }

        if let Some(value) = lookup("GITSYNC_AUTO_PUSH_INTERVAL") {
            self.auto_push_interval = parse_interval(&value)?;
        }
        Ok(())
    }

    /// Owner, repository and token must all be present before any network call
    pub fn require_remote(&self) -> SyncResult<()> {
        if self.has_remote() {
            Ok(())
        } else {
            Err(SyncError::configuration(MISSING_REMOTE))
        }
    }

    pub fn validate_for_save(&self) -> SyncResult<()> {
        if self.has_remote() {
            Ok(())
        } else {
            Err(SyncError::configuration(INCOMPLETE_SAVE))
        }
    }

    fn has_remote(&self) -> bool {
        [&self.github_owner, &self.github_repo, &self.github_token]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    pub fn blacklist(&self) -> Vec<String> {
        parse_blacklist(&self.url_blacklist)
    }

    pub fn clear_token(&mut self) {
        self.github_token.clear();
    }

    /// Token with everything but the last four characters hidden
    pub fn masked_token(&self) -> String {
        let token = self.github_token.trim();
        let count = token.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        token
            .chars()
            .enumerate()
            .map(|(i, c)| if i < count - 4 { '*' } else { c })
            .collect()
    }
}

/// Whole, non-negative number of minutes
pub fn parse_interval(value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| anyhow::anyhow!("Auto Push must be a whole number."))
}
