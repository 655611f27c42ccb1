//! Read-only JSON API over the spec index.
//!
//! Lets dashboards and scripts query sections without shelling out to
//! the CLI. CORS is enabled for GET so local tooling can call it from a
//! browser.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::indexer::Indexer;

/// Shared handler state.
pub type ApiState = Arc<Indexer>;

/// Build the router with all routes and middleware.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/specs", get(routes::list_specs))
        .route("/api/section", get(routes::get_section))
        .route("/api/search", get(routes::search))
        .route("/api/anchors", get(routes::find_anchors))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until the process exits.
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!(port, "API listening on http://localhost:{port}");
    axum::serve(listener, build_router(state))
        .await
        .context("API server error")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
