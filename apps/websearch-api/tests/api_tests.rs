use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use websearch_api::{router, startup, AppState};
use websearch_core::config::Settings;
use websearch_core::error::{Error, Result};
use websearch_core::traits::{IndexStore, UrlQueue};
use websearch_core::types::{DocumentRecord, SearchResult, EMBEDDING_DIM};
use websearch_embed::FakeEmbedder;
use websearch_hybrid::HybridSearchEngine;
use websearch_index::MemoryIndex;
use websearch_pipeline::IngestionPipeline;
use websearch_queue::MemoryQueue;

/// Serves the router over in-memory collaborators on an ephemeral
/// port and returns its base URL plus handles for assertions.
async fn spawn_app(ltr_available: bool) -> (String, Arc<MemoryIndex>, Arc<MemoryQueue>) {
    let settings = Arc::new(Settings::default());
    let embedder = Arc::new(FakeEmbedder::new(EMBEDDING_DIM));
    let index = Arc::new(MemoryIndex::new(settings.solr.title_boost, ltr_available));
    let queue = Arc::new(MemoryQueue::new());
    let pipeline = Arc::new(IngestionPipeline::new(embedder.clone(), index.clone()));
    let engine = Arc::new(HybridSearchEngine::new(
        embedder.clone(),
        index.clone(),
        settings.search.max_rows,
    ));

    let state = AppState {
        embedder,
        index: index.clone(),
        queue: queue.clone(),
        pipeline,
        engine,
        settings,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });
    (format!("http://{addr}"), index, queue)
}

#[tokio::test]
async fn index_then_search_round_trip() {
    let (base, _index, _queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/index"))
        .json(&json!({
            "url": "https://example.com/a",
            "title": "Hello World",
            "content": "Tiny test doc about vector search.",
        }))
        .send()
        .await
        .expect("index request");
    assert_eq!(resp.status(), 200);
    let record: Value = resp.json().await.expect("record json");
    assert_eq!(record["url"], "https://example.com/a");
    assert_eq!(record["domain"], "example.com");
    assert_eq!(record["content_vector"].as_array().map(Vec::len), Some(EMBEDDING_DIM));

    let resp = client
        .post(format!("{base}/search"))
        .json(&json!({"query": "vector search", "search_type": "bm25", "rows": 5}))
        .send()
        .await
        .expect("search request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("search json");
    assert_eq!(body["search_type"], "bm25");
    let urls: Vec<&str> = body["results"]
        .as_array()
        .expect("results")
        .iter()
        .filter_map(|r| r["url"].as_str())
        .collect();
    assert!(urls.contains(&"https://example.com/a"));
}

#[tokio::test]
async fn unknown_search_type_is_bad_request() {
    let (base, index, _queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/search"))
        .json(&json!({"query": "anything", "search_type": "unknown"}))
        .send()
        .await
        .expect("search request");
    assert_eq!(resp.status(), 400);
    assert_eq!(index.query_calls(), 0, "rejected before any index call");
}

#[tokio::test]
async fn empty_query_is_bad_request() {
    let (base, _index, _queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/search"))
        .json(&json!({"query": "", "search_type": "bm25"}))
        .send()
        .await
        .expect("search request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn hybrid_without_ranking_model_is_service_unavailable() {
    let (base, _index, _queue) = spawn_app(false).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/index"))
        .json(&json!({"url": "https://example.com/a", "title": "t", "content": "some body"}))
        .send()
        .await
        .expect("index request");

    let resp = client
        .post(format!("{base}/search"))
        .json(&json!({"query": "anything", "search_type": "hybrid", "rows": 3, "rerank_docs": 50}))
        .send()
        .await
        .expect("search request");
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"].as_str().unwrap_or_default().contains("Ranking model unavailable"));
}

#[tokio::test]
async fn scrape_accepts_and_enqueues() {
    let (base, _index, queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/scrape"))
        .json(&json!({"urls": ["https://example.com/1", "https://example.com/2"]}))
        .send()
        .await
        .expect("scrape request");
    assert_eq!(resp.status(), 202);
    assert_eq!(queue.len().await.expect("len"), 2);
}

#[tokio::test]
async fn crawl_reports_queue_depth() {
    let (base, _index, _queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/crawl"))
        .json(&json!({"urls": ["https://example.com/1"]}))
        .send()
        .await
        .expect("crawl request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["queue_length"], 1);
}

#[tokio::test]
async fn stats_and_health_report_dependencies() {
    let (base, _index, queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/index"))
        .json(&json!({"url": "https://example.com/a", "title": "t", "content": "stats body"}))
        .send()
        .await
        .expect("index request");
    queue.enqueue("https://example.com/next").await.expect("enqueue");

    let stats: Value = client
        .get(format!("{base}/stats"))
        .send()
        .await
        .expect("stats request")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["documents_indexed"], 1);
    assert_eq!(stats["crawl_queue_length"], 1);
    assert_eq!(stats["vector_dimension"], EMBEDDING_DIM);

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["services"]["embeddings"], "healthy");
}

/// Index stub whose ping fails a scripted number of times before
/// recovering.
struct FlakyIndex {
    failures_left: AtomicUsize,
}

impl FlakyIndex {
    fn failing(times: usize) -> Self {
        Self { failures_left: AtomicUsize::new(times) }
    }
}

#[async_trait]
impl IndexStore for FlakyIndex {
    async fn upsert(&self, _record: &DocumentRecord) -> Result<()> {
        Ok(())
    }
    async fn search_lexical(&self, _query: &str, _rows: usize) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
    async fn search_vector(&self, _vector: &[f32], _rows: usize) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
    async fn search_fused(
        &self,
        _query: &str,
        _vector: &[f32],
        _rows: usize,
        _rerank_docs: usize,
    ) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
    async fn count(&self) -> Result<u64> {
        Ok(0)
    }
    async fn ping(&self) -> Result<()> {
        if self.failures_left.load(Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            Err(Error::IndexQuery("connection refused".into()))
        }
    }
}

#[tokio::test]
async fn startup_waits_for_index_to_come_up() {
    let index = FlakyIndex::failing(2);
    startup::wait_for_index(&index, 5, Duration::from_millis(1))
        .await
        .expect("index comes up within the retry budget");
}

#[tokio::test]
async fn startup_gives_up_on_unreachable_index() {
    let index = FlakyIndex::failing(usize::MAX);
    let err = startup::wait_for_index(&index, 3, Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IndexQuery(_)));
}

#[tokio::test]
async fn encode_returns_fixed_dimension_vector() {
    let (base, _index, _queue) = spawn_app(true).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/encode"))
        .json(&json!({"text": "hello world"}))
        .send()
        .await
        .expect("encode request")
        .json()
        .await
        .expect("encode json");
    assert_eq!(body["dimension"], EMBEDDING_DIM);
    assert_eq!(body["embedding"].as_array().map(Vec::len), Some(EMBEDDING_DIM));
}
