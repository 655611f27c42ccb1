//! Spec sources.
//!
//! Defines the `SpecSource` trait and provides implementations for:
//! - WHATWG — living standards with commit-snapshot URLs
//! - W3C — editor's drafts (CSSWG monorepo plus standalone repos)
//! - TC39 — ECMA-262 living standard
//!
//! Every source resolves its latest revision through the GitHub commits
//! API, so all three share the helpers here.

pub mod tc39;
pub mod w3c;
pub mod whatwg;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::config::HttpConfig;
use crate::types::SpecDescriptor;

/// Abstraction over spec publishers.
///
/// Implementors know which specs they publish, how to fetch the rendered
/// HTML, and how to find the latest revision of the underlying repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// Publisher identifier: "whatwg" | "w3c" | "tc39".
    fn publisher(&self) -> &str;

    /// All specs this source knows about.
    fn specs(&self) -> &[SpecDescriptor];

    /// Fetch the rendered HTML for a spec at a given revision.
    /// Sources without versioned snapshots ignore `sha` and fetch the
    /// current draft.
    async fn fetch_html(&self, spec: &SpecDescriptor, sha: &str) -> Result<String>;

    /// Latest commit SHA and commit date for the spec's repository.
    async fn latest_revision(&self, spec: &SpecDescriptor) -> Result<(String, DateTime<Utc>)>;

    /// Map a URL to `(spec name, anchor)` if this source recognizes it.
    fn resolve_url(&self, url: &str) -> Option<(String, String)>;
}

/// Build the shared HTTP client used by all sources.
pub fn build_http_client(cfg: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
        .user_agent(cfg.user_agent.clone())
        .build()
        .context("Failed to build HTTP client for spec sources")
}

/// Fetch a URL and return the body text, failing on non-2xx status.
pub(crate) async fn fetch_text(http: &Client, url: &str) -> Result<String> {
    let response = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to fetch {}: HTTP {}", url, response.status());
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read body from {url}"))
}

/// Latest commit on a GitHub repository's default branch.
///
/// Returns `(sha, committer date)`. An optional token raises the
/// unauthenticated rate limit from 60 to 5000 requests per hour.
pub(crate) async fn latest_github_commit(
    http: &Client,
    repo: &str,
    token: Option<&str>,
) -> Result<(String, DateTime<Utc>)> {
    let url = format!("https://api.github.com/repos/{repo}/commits?per_page=1");

    let mut request = http.get(&url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("GitHub API request failed for {repo}"))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to fetch latest commit for {}: HTTP {}",
            repo,
            response.status()
        );
    }

    let commits: serde_json::Value = response
        .json()
        .await
        .context("Failed to parse GitHub commits response")?;

    let commit = commits
        .as_array()
        .and_then(|arr| arr.first())
        .ok_or_else(|| anyhow::anyhow!("No commits found for {repo}"))?;

    let sha = commit["sha"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing sha in commit for {repo}"))?
        .to_string();

    let date_str = commit["commit"]["committer"]["date"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing committer date for {repo}"))?;

    let date = DateTime::parse_from_rfc3339(date_str)
        .with_context(|| format!("Bad committer date for {repo}: {date_str}"))?
        .with_timezone(&Utc);

    Ok((sha, date))
}
