//! GitHub REST backend
//!
//! Maps the object-store operations onto the GitHub git-data and contents
//! APIs. Every request carries the bearer credential and disables
//! intermediary caching; reads also add a `cachebuster` query parameter
//! because some proxies ignore `Cache-Control` on GET.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ObjectStore, PutContents, PutOutcome, TreeEntry};
use crate::config::Settings;
use crate::error::{SyncError, SyncResult};

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Where the document repository lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API root, e.g. `https://api.github.com`
    pub api_url: String,

    /// Repository owner (user or organisation)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Personal access token
    pub token: String,
}

impl GitHubConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            owner: settings.github_owner.trim().to_string(),
            repo: settings.github_repo.trim().to_string(),
            token: settings.github_token.trim().to_string(),
        }
    }

    /// `{api_url}/repos/{owner}/{repo}` plus an optional suffix
    pub fn repo_url(&self, suffix: &str) -> String {
        let base = format!(
            "{}/repos/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo
        );
        if suffix.is_empty() {
            base
        } else {
            format!("{}/{}", base, suffix.trim_start_matches('/'))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
}

pub struct GitHubStore {
    config: GitHubConfig,
    client: Client,
}

impl GitHubStore {
    pub fn new(config: GitHubConfig) -> SyncResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-cache"),
        );

        let client = Client::builder()
            .user_agent(concat!("gitsync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let cachebuster = chrono::Utc::now().timestamp_millis().to_string();
        self.client
            .get(url)
            .bearer_auth(&self.config.token)
            .query(&[("cachebuster", cachebuster)])
    }
}

fn status_error(prefix: &str, status: StatusCode) -> SyncError {
    SyncError::transport(format!("{}: {}", prefix, status.as_u16()), Some(status.as_u16()))
}

#[async_trait]
impl ObjectStore for GitHubStore {
    async fn list_tree(&self, reference: &str) -> SyncResult<Vec<TreeEntry>> {
        let url = self.config.repo_url(&format!("git/trees/{}", reference));
        debug!(%url, "listing tree");

        let response = self.get(&url).query(&[("recursive", "1")]).send().await?;
        if !response.status().is_success() {
            return Err(status_error("GitHub API error", response.status()));
        }

        let tree: TreeResponse = response.json().await?;
        Ok(tree.tree)
    }

    async fn fetch_blob(&self, sha: &str) -> SyncResult<String> {
        let url = self.config.repo_url(&format!("git/blobs/{}", sha));
        debug!(%url, "fetching blob");

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(status_error("Failed to fetch blob", response.status()));
        }

        let blob: BlobResponse = response.json().await?;
        Ok(blob.content)
    }

    async fn fetch_version(&self, path: &str) -> SyncResult<Option<String>> {
        let url = self.config.repo_url(&format!("contents/{}", path));
        debug!(%url, "reading version token");

        let response = self.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error("Failed to read version", response.status()));
        }

        let contents: ContentsResponse = response.json().await?;
        Ok(Some(contents.sha))
    }

    async fn put_contents(&self, path: &str, body: &PutContents) -> SyncResult<PutOutcome> {
        let url = self.config.repo_url(&format!("contents/{}", path));
        debug!(%url, create = body.sha.is_none(), "writing contents");

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(PutOutcome::Written)
        } else if status == StatusCode::CONFLICT {
            Ok(PutOutcome::Conflict)
        } else {
            let detail = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), %detail, "write rejected");
            Err(status_error("Failed to save to GitHub", status))
        }
    }

    async fn check_access(&self) -> SyncResult<()> {
        let url = self.config.repo_url("");
        let response = self.get(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(SyncError::transport(
            format!(
                "Connection failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
            .trim_end()
            .to_string(),
            Some(status.as_u16()),
        ))
    }
}
