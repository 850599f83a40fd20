//! HTTP proxy in front of the song catalog.
//!
//! Mirrors the catalog for other clients: search results come back already
//! mapped to [`Track`]s, lyrics and download options keep their raw shapes.

pub mod error;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::audio::{StreamUrl, Track};
use crate::catalog::{CatalogClient, Lyrics};
pub use error::{ProxyError, Result};

const SEARCH_FAILED: &str = "Failed to search songs";
const LYRICS_MISSING: &str = "Lyrics not available for this song";
const LYRICS_FAILED: &str = "Failed to fetch lyrics";
const DOWNLOAD_MISSING: &str = "Download not available for this song";
const DOWNLOAD_FAILED: &str = "Failed to fetch download URLs";

#[derive(Clone)]
pub struct ProxyState {
    pub catalog: CatalogClient,
    pub search_limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Vec<Track>,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_urls: Vec<StreamUrl>,
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/search/songs", get(search_songs))
        .route("/api/lyrics/:song_id", get(lyrics))
        .route("/api/download/:song_id", get(download_urls))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

pub async fn serve(state: ProxyState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Proxy listening on {}", listener.local_addr()?);
    info!("Forwarding to catalog at {}", state.catalog.base_url());

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn search_songs(
    State(state): State<ProxyState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let limit = params.limit.unwrap_or(state.search_limit);
    let tracks = state
        .catalog
        .search(&params.query, limit)
        .await
        .map_err(|e| ProxyError::from_catalog(e, SEARCH_FAILED, SEARCH_FAILED))?;

    Ok(Json(SearchResponse {
        tracks,
        query: params.query,
    }))
}

async fn lyrics(State(state): State<ProxyState>, Path(song_id): Path<String>) -> Result<Json<Lyrics>> {
    let lyrics = state
        .catalog
        .fetch_lyrics(&song_id)
        .await
        .map_err(|e| ProxyError::from_catalog(e, LYRICS_MISSING, LYRICS_FAILED))?;
    Ok(Json(lyrics))
}

async fn download_urls(
    State(state): State<ProxyState>,
    Path(song_id): Path<String>,
) -> Result<Json<DownloadResponse>> {
    let download_urls = state
        .catalog
        .fetch_download_options(&song_id)
        .await
        .map_err(|e| ProxyError::from_catalog(e, DOWNLOAD_MISSING, DOWNLOAD_FAILED))?;
    Ok(Json(DownloadResponse { download_urls }))
}

async fn health(State(state): State<ProxyState>) -> impl IntoResponse {
    if state.catalog.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok", "catalog": "connected" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "catalog": "disconnected" })),
        )
    }
}
