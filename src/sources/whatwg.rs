//! WHATWG living standards.
//!
//! Every WHATWG standard is a single-repo spec rendered at
//! `https://<name>.spec.whatwg.org`, with pinned revisions available
//! under `/commit-snapshots/<sha>/`. The full list lives at
//! `https://spec.whatwg.org/`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

use super::{fetch_text, latest_github_commit, SpecSource};
use crate::types::SpecDescriptor;

const PUBLISHER: &str = "whatwg";

pub const WHATWG_SPECS: &[SpecDescriptor] = &[
    SpecDescriptor {
        name: "COMPAT",
        base_url: "https://compat.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/compat",
    },
    SpecDescriptor {
        name: "COMPRESSION",
        base_url: "https://compression.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/compression",
    },
    SpecDescriptor {
        name: "CONSOLE",
        base_url: "https://console.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/console",
    },
    SpecDescriptor {
        name: "DOM",
        base_url: "https://dom.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/dom",
    },
    SpecDescriptor {
        name: "ENCODING",
        base_url: "https://encoding.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/encoding",
    },
    SpecDescriptor {
        name: "FETCH",
        base_url: "https://fetch.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/fetch",
    },
    SpecDescriptor {
        name: "FS",
        base_url: "https://fs.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/fs",
    },
    SpecDescriptor {
        name: "FULLSCREEN",
        base_url: "https://fullscreen.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/fullscreen",
    },
    SpecDescriptor {
        name: "HTML",
        base_url: "https://html.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/html",
    },
    SpecDescriptor {
        name: "INFRA",
        base_url: "https://infra.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/infra",
    },
    SpecDescriptor {
        name: "MIMESNIFF",
        base_url: "https://mimesniff.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/mimesniff",
    },
    SpecDescriptor {
        name: "NOTIFICATIONS",
        base_url: "https://notifications.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/notifications",
    },
    SpecDescriptor {
        name: "QUIRKS",
        base_url: "https://quirks.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/quirks",
    },
    SpecDescriptor {
        name: "STORAGE",
        base_url: "https://storage.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/storage",
    },
    SpecDescriptor {
        name: "STREAMS",
        base_url: "https://streams.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/streams",
    },
    SpecDescriptor {
        name: "URL",
        base_url: "https://url.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/url",
    },
    SpecDescriptor {
        name: "URLPATTERN",
        base_url: "https://urlpattern.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/urlpattern",
    },
    SpecDescriptor {
        name: "WEBIDL",
        base_url: "https://webidl.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/webidl",
    },
    SpecDescriptor {
        name: "WEBSOCKETS",
        base_url: "https://websockets.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/websockets",
    },
    SpecDescriptor {
        name: "XHR",
        base_url: "https://xhr.spec.whatwg.org",
        publisher: PUBLISHER,
        repo: "whatwg/xhr",
    },
];

/// WHATWG spec source.
pub struct WhatwgSource {
    http: Client,
    github_token: Option<String>,
}

impl WhatwgSource {
    pub fn new(http: Client, github_token: Option<String>) -> Self {
        Self { http, github_token }
    }
}

#[async_trait]
impl SpecSource for WhatwgSource {
    fn publisher(&self) -> &str {
        PUBLISHER
    }

    fn specs(&self) -> &[SpecDescriptor] {
        WHATWG_SPECS
    }

    /// WHATWG standards pin revisions under `/commit-snapshots/<sha>/`,
    /// so an indexed snapshot always corresponds to the SHA we recorded.
    async fn fetch_html(&self, spec: &SpecDescriptor, sha: &str) -> Result<String> {
        let url = format!("{}/commit-snapshots/{}/", spec.base_url, sha);
        fetch_text(&self.http, &url).await
    }

    async fn latest_revision(&self, spec: &SpecDescriptor) -> Result<(String, DateTime<Utc>)> {
        latest_github_commit(&self.http, spec.repo, self.github_token.as_deref()).await
    }

    fn resolve_url(&self, url: &str) -> Option<(String, String)> {
        let parsed = url::Url::parse(url).ok()?;
        let anchor = parsed.fragment()?.to_string();
        let base = format!("{}://{}", parsed.scheme(), parsed.host_str()?);

        WHATWG_SPECS
            .iter()
            .find(|spec| spec.base_url == base)
            .map(|spec| (spec.name.to_string(), anchor))
    }
}
