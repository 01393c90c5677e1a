use std::str::FromStr;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use websearch_core::error::Error;
use websearch_core::types::{DocumentRecord, SearchMode, SearchRequest, SearchResult};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/index", post(index_document))
        .route("/scrape", post(scrape))
        .route("/crawl", post(crawl))
        .route("/search", post(search))
        .route("/encode", post(encode))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IndexDocumentBody {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlListBody {
    pub urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default = "default_search_type")]
    pub search_type: String,
    pub rows: Option<usize>,
    pub rerank_docs: Option<usize>,
}

fn default_search_type() -> String {
    "hybrid".to_string()
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub search_type: String,
    pub total_found: usize,
    pub results: Vec<SearchResult>,
    pub query_time: f64,
}

#[derive(Debug, Deserialize)]
pub struct EncodeBody {
    pub text: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "websearch",
        "endpoints": {
            "search": "POST /search",
            "index": "POST /index",
            "scrape": "POST /scrape",
            "crawl": "POST /crawl",
            "encode": "POST /encode",
            "stats": "GET /stats",
            "health": "GET /health",
        },
    }))
}

/// Synchronous ingestion of a single document.
async fn index_document(
    State(state): State<AppState>,
    Json(body): Json<IndexDocumentBody>,
) -> Result<Json<DocumentRecord>, ApiError> {
    let record = state.pipeline.ingest(&body.url, &body.title, &body.content).await?;
    Ok(Json(record))
}

/// Deferred ingestion: enqueue and return immediately. The worker
/// pool picks the URLs up in the background.
async fn scrape(
    State(state): State<AppState>,
    Json(body): Json<UrlListBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    for url in &body.urls {
        state.queue.enqueue(url).await?;
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": format!("Queued {} URLs for crawling", body.urls.len()),
            "urls": body.urls,
        })),
    ))
}

/// Same enqueue path as /scrape, reporting the resulting queue depth.
async fn crawl(
    State(state): State<AppState>,
    Json(body): Json<UrlListBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    for url in &body.urls {
        state.queue.enqueue(url).await?;
    }
    let queue_length = state.queue.len().await?;
    Ok(Json(json!({
        "message": format!("Added {} URLs to crawl queue", body.urls.len()),
        "queue_length": queue_length,
        "urls": body.urls,
    })))
}

async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let started = Instant::now();
    let mode = SearchMode::from_str(&body.search_type)?;
    let rows = body.rows.unwrap_or(state.settings.search.default_rows);
    // The rerank pool must cover the requested page; an explicit
    // value smaller than rows is still rejected by validation.
    let rerank_docs = body
        .rerank_docs
        .unwrap_or_else(|| state.settings.search.default_rerank_docs.max(rows));

    let request = SearchRequest { query: body.query.clone(), mode, rows, rerank_docs };
    let results = state.engine.search(&request).await?;

    Ok(Json(SearchResponse {
        query: body.query,
        search_type: mode.as_str().to_string(),
        total_found: results.len(),
        results,
        query_time: (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0,
    }))
}

/// Diagnostic endpoint: embed arbitrary text.
async fn encode(
    State(state): State<AppState>,
    Json(body): Json<EncodeBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let embedder = state.embedder.clone();
    let embedding = tokio::task::spawn_blocking(move || embedder.embed(&body.text))
        .await
        .map_err(|e| ApiError(Error::Embedding(format!("embedding task failed: {e}"))))??;
    Ok(Json(json!({
        "embedding": embedding,
        "dimension": embedding.len(),
        "model": websearch_embed::MODEL_NAME,
    })))
}

async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let documents_indexed = state.index.count().await?;
    // A down queue should not take /stats with it.
    let crawl_queue_length = state.queue.len().await.unwrap_or(0);
    Ok(Json(json!({
        "documents_indexed": documents_indexed,
        "crawl_queue_length": crawl_queue_length,
        "embedding_model": websearch_embed::MODEL_NAME,
        "vector_dimension": state.embedder.dim(),
    })))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let solr = state.index.ping().await.is_ok();
    let redis = state.queue.ping().await.is_ok();
    // The model either loaded at startup or the process never came up.
    let embeddings = true;

    let label = |up: bool| if up { "healthy" } else { "unhealthy" };
    let status = if solr && redis { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "services": {
            "solr": label(solr),
            "redis": label(redis),
            "embeddings": label(embeddings),
        },
    }))
}
