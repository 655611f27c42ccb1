//! Spec catalog — routes spec names and URLs to their sources.
//!
//! Owns one `SpecSource` per publisher and fans lookups out across them,
//! the same way a router owns its platform clients.

use anyhow::Result;

use crate::config::AppConfig;
use crate::sources::tc39::Tc39Source;
use crate::sources::w3c::W3cSource;
use crate::sources::whatwg::WhatwgSource;
use crate::sources::{build_http_client, SpecSource};
use crate::types::{LensError, SpecDescriptor, SpecUrl};

/// Top-level catalog of all known specs, one entry per publisher.
pub struct SpecCatalog {
    sources: Vec<Box<dyn SpecSource>>,
}

impl SpecCatalog {
    /// Build the catalog with a shared HTTP client configured from `cfg`.
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let http = build_http_client(&cfg.http)?;
        let token = cfg.github_token();

        Ok(Self {
            sources: vec![
                Box::new(WhatwgSource::new(http.clone(), token.clone())),
                Box::new(W3cSource::new(http.clone(), token.clone())),
                Box::new(Tc39Source::new(http, token)),
            ],
        })
    }

    /// Find a spec by name, case-insensitively.
    pub fn find_spec(&self, name: &str) -> Option<&SpecDescriptor> {
        let wanted = name.to_lowercase();
        self.sources
            .iter()
            .flat_map(|source| source.specs())
            .find(|spec| spec.name.to_lowercase() == wanted)
    }

    /// The source responsible for a spec.
    pub fn source_for(&self, spec: &SpecDescriptor) -> Result<&dyn SpecSource, LensError> {
        self.sources
            .iter()
            .find(|source| source.publisher() == spec.publisher)
            .map(|source| source.as_ref())
            .ok_or_else(|| LensError::UnknownPublisher(spec.publisher.to_string()))
    }

    /// All known specs across publishers.
    pub fn all_specs(&self) -> Vec<&SpecDescriptor> {
        self.sources
            .iter()
            .flat_map(|source| source.specs())
            .collect()
    }

    /// Map a URL to `(spec name, anchor)` if any source recognizes it.
    pub fn resolve_url(&self, url: &str) -> Option<(String, String)> {
        self.sources
            .iter()
            .find_map(|source| source.resolve_url(url))
    }

    /// `(spec, base_url)` pairs for the source-code scanner.
    pub fn spec_urls(&self) -> Vec<SpecUrl> {
        self.all_specs()
            .into_iter()
            .map(|spec| SpecUrl {
                spec: spec.name.to_string(),
                base_url: spec.base_url.to_string(),
            })
            .collect()
    }
}
