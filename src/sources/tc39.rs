//! TC39 — ECMA-262.
//!
//! The living standard is rendered at `https://tc39.es/ecma262/`. There is
//! no per-commit snapshot URL; fetches return the current draft and the
//! recorded SHA identifies the revision we indexed.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

use super::{fetch_text, latest_github_commit, SpecSource};
use crate::types::SpecDescriptor;

const PUBLISHER: &str = "tc39";

pub const TC39_SPECS: &[SpecDescriptor] = &[SpecDescriptor {
    name: "ECMA-262",
    base_url: "https://tc39.es/ecma262",
    publisher: PUBLISHER,
    repo: "tc39/ecma262",
}];

/// TC39 spec source.
pub struct Tc39Source {
    http: Client,
    github_token: Option<String>,
}

impl Tc39Source {
    pub fn new(http: Client, github_token: Option<String>) -> Self {
        Self { http, github_token }
    }
}

#[async_trait]
impl SpecSource for Tc39Source {
    fn publisher(&self) -> &str {
        PUBLISHER
    }

    fn specs(&self) -> &[SpecDescriptor] {
        TC39_SPECS
    }

    async fn fetch_html(&self, spec: &SpecDescriptor, _sha: &str) -> Result<String> {
        let url = format!("{}/", spec.base_url.trim_end_matches('/'));
        fetch_text(&self.http, &url).await
    }

    async fn latest_revision(&self, spec: &SpecDescriptor) -> Result<(String, DateTime<Utc>)> {
        latest_github_commit(&self.http, spec.repo, self.github_token.as_deref()).await
    }

    fn resolve_url(&self, url: &str) -> Option<(String, String)> {
        let parsed = url::Url::parse(url).ok()?;
        let anchor = parsed.fragment()?.to_string();

        if parsed.host_str()? != "tc39.es" {
            return None;
        }

        let path = parsed.path().trim_matches('/');
        TC39_SPECS
            .iter()
            .find(|spec| {
                spec.base_url
                    .strip_prefix("https://tc39.es/")
                    .is_some_and(|dir| dir == path)
            })
            .map(|spec| (spec.name.to_string(), anchor))
    }
}
