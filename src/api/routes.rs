//! HTTP API handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use super::ApiState;
use crate::types::{AnchorsReport, SearchReport, SectionReport, SpecRef, SpecUrlEntry};

/// Translate an internal error into an HTTP response.
///
/// "Not found" style domain errors map to 404; everything else (network,
/// database) is a 502 because the index is a cache over upstream specs.
fn http_error(e: anyhow::Error) -> (StatusCode, String) {
    let message = e.to_string();
    let status = if message.contains("not found") || message.contains("Unknown spec") {
        StatusCode::NOT_FOUND
    } else {
        warn!(error = %message, "API request failed");
        StatusCode::BAD_GATEWAY
    };
    (status, message)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn list_specs(State(state): State<ApiState>) -> Json<Vec<SpecUrlEntry>> {
    let entries = state
        .catalog()
        .all_specs()
        .into_iter()
        .map(|spec| SpecUrlEntry {
            spec: spec.name.to_string(),
            base_url: spec.base_url.to_string(),
            publisher: spec.publisher.to_string(),
        })
        .collect();
    Json(entries)
}

#[derive(Debug, Deserialize)]
pub struct SectionParams {
    pub spec: String,
    pub anchor: String,
    pub sha: Option<String>,
}

pub async fn get_section(
    State(state): State<ApiState>,
    Query(params): Query<SectionParams>,
) -> Result<Json<SectionReport>, (StatusCode, String)> {
    let spec_ref = SpecRef {
        spec: params.spec,
        anchor: params.anchor,
    };
    state
        .section_report(&spec_ref, params.sha.as_deref())
        .await
        .map(Json)
        .map_err(http_error)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub spec: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    20
}

pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchReport>, (StatusCode, String)> {
    let results = state
        .store()
        .search(&params.q, params.spec.as_deref(), params.limit)
        .await
        .map_err(http_error)?;
    Ok(Json(SearchReport {
        query: params.q,
        results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnchorParams {
    pub pattern: String,
    pub spec: Option<String>,
    #[serde(default = "default_anchor_limit")]
    pub limit: i64,
}

fn default_anchor_limit() -> i64 {
    50
}

pub async fn find_anchors(
    State(state): State<ApiState>,
    Query(params): Query<AnchorParams>,
) -> Result<Json<AnchorsReport>, (StatusCode, String)> {
    let like = params.pattern.replace('*', "%");
    let results = state
        .store()
        .match_anchors(&like, params.spec.as_deref(), params.limit)
        .await
        .map_err(http_error)?;
    Ok(Json(AnchorsReport {
        pattern: params.pattern,
        results,
    }))
}
