//! W3C editor's drafts.
//!
//! Two hosting flavors:
//! - CSSWG drafts at `https://drafts.csswg.org/<dir>` — all backed by the
//!   `w3c/csswg-drafts` monorepo, so they share one revision lookup.
//! - Standalone specs at `https://w3c.github.io/<Repo>` with individual
//!   repositories.
//!
//! W3C drafts have no commit-snapshot URLs; fetches always return the
//! current editor's draft and the recorded SHA identifies the revision we
//! indexed.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

use super::{fetch_text, latest_github_commit, SpecSource};
use crate::types::SpecDescriptor;

const PUBLISHER: &str = "w3c";
const CSSWG_HOST: &str = "drafts.csswg.org";
const CSSWG_REPO: &str = "w3c/csswg-drafts";

pub const W3C_SPECS: &[SpecDescriptor] = &[
    // -- CSSWG drafts (monorepo) --
    SpecDescriptor {
        name: "CSS-ALIGN",
        base_url: "https://drafts.csswg.org/css-align-3",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-ANIMATIONS",
        base_url: "https://drafts.csswg.org/css-animations-2",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-CASCADE",
        base_url: "https://drafts.csswg.org/css-cascade-6",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-COLOR",
        base_url: "https://drafts.csswg.org/css-color-4",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-CONTAIN",
        base_url: "https://drafts.csswg.org/css-contain-3",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-DISPLAY",
        base_url: "https://drafts.csswg.org/css-display-4",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-FLEXBOX",
        base_url: "https://drafts.csswg.org/css-flexbox-1",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-FONTS",
        base_url: "https://drafts.csswg.org/css-fonts-4",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-GRID",
        base_url: "https://drafts.csswg.org/css-grid-2",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-POSITION",
        base_url: "https://drafts.csswg.org/css-position-4",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-SYNTAX",
        base_url: "https://drafts.csswg.org/css-syntax-3",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "CSS-VALUES",
        base_url: "https://drafts.csswg.org/css-values-4",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    SpecDescriptor {
        name: "SELECTORS",
        base_url: "https://drafts.csswg.org/selectors-4",
        publisher: PUBLISHER,
        repo: CSSWG_REPO,
    },
    // -- Standalone specs (individual repos) --
    SpecDescriptor {
        name: "GAMEPAD",
        base_url: "https://w3c.github.io/gamepad",
        publisher: PUBLISHER,
        repo: "w3c/gamepad",
    },
    SpecDescriptor {
        name: "INTERSECTION-OBSERVER",
        base_url: "https://w3c.github.io/IntersectionObserver",
        publisher: PUBLISHER,
        repo: "w3c/IntersectionObserver",
    },
    SpecDescriptor {
        name: "PERMISSIONS",
        base_url: "https://w3c.github.io/permissions",
        publisher: PUBLISHER,
        repo: "w3c/permissions",
    },
    SpecDescriptor {
        name: "PUSH-API",
        base_url: "https://w3c.github.io/push-api",
        publisher: PUBLISHER,
        repo: "w3c/push-api",
    },
    SpecDescriptor {
        name: "SERVICE-WORKERS",
        base_url: "https://w3c.github.io/ServiceWorker",
        publisher: PUBLISHER,
        repo: "w3c/ServiceWorker",
    },
    SpecDescriptor {
        name: "WEBCODECS",
        base_url: "https://w3c.github.io/webcodecs",
        publisher: PUBLISHER,
        repo: "w3c/webcodecs",
    },
];

/// Directory segment of a CSSWG draft URL, None for standalone specs.
fn csswg_dir(spec: &SpecDescriptor) -> Option<&str> {
    spec.base_url
        .strip_prefix("https://drafts.csswg.org/")
}

/// W3C spec source.
pub struct W3cSource {
    http: Client,
    github_token: Option<String>,
}

impl W3cSource {
    pub fn new(http: Client, github_token: Option<String>) -> Self {
        Self { http, github_token }
    }
}

#[async_trait]
impl SpecSource for W3cSource {
    fn publisher(&self) -> &str {
        PUBLISHER
    }

    fn specs(&self) -> &[SpecDescriptor] {
        W3C_SPECS
    }

    async fn fetch_html(&self, spec: &SpecDescriptor, _sha: &str) -> Result<String> {
        let url = format!("{}/", spec.base_url.trim_end_matches('/'));
        fetch_text(&self.http, &url).await
    }

    /// For CSSWG monorepo specs this returns the monorepo HEAD, which the
    /// indexer caches per-repo so all CSSWG drafts cost one API call.
    async fn latest_revision(&self, spec: &SpecDescriptor) -> Result<(String, DateTime<Utc>)> {
        latest_github_commit(&self.http, spec.repo, self.github_token.as_deref()).await
    }

    fn resolve_url(&self, url: &str) -> Option<(String, String)> {
        let parsed = url::Url::parse(url).ok()?;
        let anchor = parsed.fragment()?.to_string();

        match parsed.host_str()? {
            CSSWG_HOST => {
                let path = parsed.path().trim_matches('/');
                W3C_SPECS
                    .iter()
                    .find(|spec| csswg_dir(spec) == Some(path))
                    .map(|spec| (spec.name.to_string(), anchor))
            }
            "w3c.github.io" => {
                // Paths may carry extra segments (/ServiceWorker/v1/);
                // match on the first one.
                let repo_part = parsed.path().trim_matches('/').split('/').next()?;
                let wanted = format!("https://w3c.github.io/{repo_part}");
                W3C_SPECS
                    .iter()
                    .find(|spec| spec.base_url == wanted)
                    .map(|spec| (spec.name.to_string(), anchor))
            }
            _ => None,
        }
    }
}
