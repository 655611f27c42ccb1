//! Index orchestration: decide when a spec needs fetching, then fetch,
//! extract, and store it.
//!
//! Revision checks go through a per-repo head cache with a configurable
//! TTL, so repeated queries cost no GitHub calls and all CSSWG drafts
//! (one monorepo) share a single lookup per window.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::SpecCatalog;
use crate::extract;
use crate::sources::SpecSource;
use crate::store::SpecStore;
use crate::types::{
    ExistsReport, HeadingEntry, LensError, NavLink, NavSummary, RefLink, SectionReport,
    SpecDescriptor, SpecRef,
};

/// Coordinates sources, extraction, and the store.
pub struct Indexer {
    store: SpecStore,
    catalog: Arc<SpecCatalog>,
    ttl_hours: i64,
}

impl Indexer {
    pub fn new(store: SpecStore, catalog: Arc<SpecCatalog>, ttl_hours: i64) -> Self {
        Self {
            store,
            catalog,
            ttl_hours,
        }
    }

    pub fn catalog(&self) -> &SpecCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &SpecStore {
        &self.store
    }

    /// Latest SHA for a spec's repo, via the head cache.
    ///
    /// Only asks GitHub when the cache entry is missing or older than the
    /// TTL (or `force` is set). The cache key is the repo path, so specs
    /// sharing a monorepo make at most one API call per window.
    async fn latest_sha(
        &self,
        spec: &SpecDescriptor,
        source: &dyn SpecSource,
        force: bool,
    ) -> Result<(String, DateTime<Utc>)> {
        if !force {
            if let Some((sha, commit_date, checked_at)) =
                self.store.cached_head(spec.repo).await?
            {
                let age = Utc::now().signed_duration_since(checked_at);
                if age.num_hours() < self.ttl_hours {
                    debug!(spec = spec.name, sha = %sha, "Using cached head");
                    return Ok((sha, commit_date));
                }
            }
        }

        let (sha, date) = source.latest_revision(spec).await?;
        self.store.record_head(spec.repo, &sha, &date).await?;
        Ok((sha, date))
    }

    /// Fetch, extract, and store one revision of a spec. Replaces any
    /// previously indexed data so the spec keeps exactly one snapshot.
    async fn index_revision(
        &self,
        spec: &SpecDescriptor,
        source: &dyn SpecSource,
        sha: &str,
        date: &DateTime<Utc>,
    ) -> Result<i64> {
        info!(spec = spec.name, sha, "Indexing spec");

        let html = source.fetch_html(spec, sha).await?;
        let parsed = extract::extract_document(&html, spec.name, spec.base_url, &self.catalog)?;

        let spec_id = self
            .store
            .upsert_spec(spec.name, spec.base_url, spec.publisher)
            .await?;
        self.store.wipe_spec(spec_id).await?;

        let snapshot_id = self
            .store
            .insert_snapshot(spec_id, sha, &date.to_rfc3339())
            .await?;
        self.store
            .insert_sections(snapshot_id, &parsed.sections)
            .await?;
        self.store
            .insert_cross_refs(snapshot_id, &parsed.cross_refs)
            .await?;

        info!(
            spec = spec.name,
            sections = parsed.sections.len(),
            refs = parsed.cross_refs.len(),
            "Spec indexed"
        );
        Ok(snapshot_id)
    }

    /// Ensure a spec is indexed at its latest known revision and return
    /// `(snapshot_id, sha)`. This is the lazy entry point used by every
    /// query path.
    pub async fn ensure_indexed(
        &self,
        spec: &SpecDescriptor,
        source: &dyn SpecSource,
    ) -> Result<(i64, String)> {
        let (sha, date) = self.latest_sha(spec, source, false).await?;

        if let Some(snapshot_id) = self.store.snapshot_by_sha(spec.name, &sha).await? {
            return Ok((snapshot_id, sha));
        }

        let snapshot_id = self.index_revision(spec, source, &sha, &date).await?;
        Ok((snapshot_id, sha))
    }

    /// Re-index a spec if upstream moved. Returns `Some((snapshot_id,
    /// sha))` when re-indexed, None when already current. `force`
    /// bypasses the head cache.
    pub async fn refresh(
        &self,
        spec: &SpecDescriptor,
        source: &dyn SpecSource,
        force: bool,
    ) -> Result<Option<(i64, String)>> {
        let (sha, date) = self.latest_sha(spec, source, force).await?;

        if self.store.snapshot_by_sha(spec.name, &sha).await?.is_some() {
            return Ok(None);
        }

        let snapshot_id = self.index_revision(spec, source, &sha, &date).await?;
        Ok(Some((snapshot_id, sha)))
    }

    /// Refresh every spec in the catalog concurrently. Failures are
    /// collected per spec rather than aborting the sweep.
    pub async fn refresh_all(&self, force: bool) -> Vec<(String, Result<Option<(i64, String)>>)> {
        let specs = self.catalog.all_specs();

        let tasks = specs.into_iter().map(|spec| async move {
            let result = match self.catalog.source_for(spec) {
                Ok(source) => self.refresh(spec, source, force).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = &result {
                warn!(spec = spec.name, error = %e, "Refresh failed");
            }
            (spec.name.to_string(), result)
        });

        join_all(tasks).await
    }
}

// ---------------------------------------------------------------------------
// Query helpers
// ---------------------------------------------------------------------------

impl Indexer {
    /// Resolve a spec name (and optional SHA) to an indexed snapshot,
    /// indexing lazily when needed. Returns `(canonical name, snapshot_id,
    /// sha)`.
    pub async fn resolve_snapshot(
        &self,
        spec_name: &str,
        sha: Option<&str>,
    ) -> Result<(String, i64, String)> {
        let spec = self
            .catalog
            .find_spec(spec_name)
            .ok_or_else(|| LensError::UnknownSpec(spec_name.to_string()))?;

        match sha {
            Some(sha) => {
                let snapshot_id = self
                    .store
                    .snapshot_by_sha(spec.name, sha)
                    .await?
                    .ok_or_else(|| LensError::UnknownSnapshot {
                        spec: spec.name.to_string(),
                        sha: sha.to_string(),
                    })?;
                Ok((spec.name.to_string(), snapshot_id, sha.to_string()))
            }
            None => {
                let source = self.catalog.source_for(spec)?;
                let (snapshot_id, sha) = self.ensure_indexed(spec, source).await?;
                Ok((spec.name.to_string(), snapshot_id, sha))
            }
        }
    }

    /// Full report for one section: body, navigation, and references.
    pub async fn section_report(
        &self,
        spec_ref: &SpecRef,
        sha: Option<&str>,
    ) -> Result<SectionReport> {
        let (spec_name, snapshot_id, sha) = self.resolve_snapshot(&spec_ref.spec, sha).await?;

        let section = self
            .store
            .section(snapshot_id, &spec_ref.anchor)
            .await?
            .ok_or_else(|| LensError::UnknownAnchor {
                spec: spec_name.clone(),
                anchor: spec_ref.anchor.clone(),
            })?;

        let children = self
            .store
            .children(snapshot_id, &section.anchor)
            .await?
            .into_iter()
            .map(|(anchor, title)| NavLink { anchor, title })
            .collect();

        let mut nav = NavSummary {
            parent: None,
            prev: None,
            next: None,
            children,
        };
        for (slot, anchor) in [
            (&mut nav.parent, &section.parent_anchor),
            (&mut nav.prev, &section.prev_anchor),
            (&mut nav.next, &section.next_anchor),
        ] {
            if let Some(anchor) = anchor {
                *slot = self
                    .store
                    .section(snapshot_id, anchor)
                    .await?
                    .map(|s| NavLink {
                        anchor: s.anchor,
                        title: s.title,
                    });
            }
        }

        let outgoing_refs = self
            .store
            .outgoing_refs(snapshot_id, &section.anchor)
            .await?
            .into_iter()
            .map(|(spec, anchor)| RefLink { spec, anchor })
            .collect();
        let incoming_refs = self
            .store
            .incoming_refs(&spec_name, &section.anchor)
            .await?
            .into_iter()
            .map(|(spec, anchor)| RefLink { spec, anchor })
            .collect();

        Ok(SectionReport {
            spec: spec_name,
            sha,
            anchor: section.anchor,
            title: section.title,
            kind: section.kind.as_str().to_string(),
            body: section.body_md,
            nav,
            outgoing_refs,
            incoming_refs,
        })
    }

    /// Whether an anchor exists, with its kind when it does.
    pub async fn exists_report(&self, spec_ref: &SpecRef) -> Result<ExistsReport> {
        let (spec_name, snapshot_id, _) = self.resolve_snapshot(&spec_ref.spec, None).await?;
        let section = self.store.section(snapshot_id, &spec_ref.anchor).await?;

        Ok(ExistsReport {
            exists: section.is_some(),
            spec: spec_name,
            anchor: spec_ref.anchor.clone(),
            kind: section.map(|s| s.kind.as_str().to_string()),
        })
    }

    /// Heading outline of a spec.
    pub async fn heading_list(
        &self,
        spec_name: &str,
        sha: Option<&str>,
    ) -> Result<Vec<HeadingEntry>> {
        let (_, snapshot_id, _) = self.resolve_snapshot(spec_name, sha).await?;
        let headings = self.store.headings(snapshot_id).await?;

        Ok(headings
            .into_iter()
            .map(|h| HeadingEntry {
                anchor: h.anchor,
                title: h.title,
                level: h.level.unwrap_or(0),
                parent: h.parent_anchor,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
