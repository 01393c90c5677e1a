use std::str::FromStr;
use std::sync::Arc;

use websearch_core::error::Error;
use websearch_core::types::{SearchMode, SearchRequest, EMBEDDING_DIM};
use websearch_embed::FakeEmbedder;
use websearch_hybrid::HybridSearchEngine;
use websearch_index::MemoryIndex;
use websearch_pipeline::IngestionPipeline;

const MAX_ROWS: usize = 100;

fn engine_over(index: Arc<MemoryIndex>) -> HybridSearchEngine {
    HybridSearchEngine::new(Arc::new(FakeEmbedder::new(EMBEDDING_DIM)), index, MAX_ROWS)
}

async fn seed(index: &Arc<MemoryIndex>, docs: &[(&str, &str, &str)]) {
    let pipeline = IngestionPipeline::new(Arc::new(FakeEmbedder::new(EMBEDDING_DIM)), index.clone());
    for (url, title, content) in docs {
        pipeline.ingest(url, title, content).await.expect("seed ingest");
    }
}

fn request(query: &str, mode: SearchMode, rows: usize, rerank_docs: usize) -> SearchRequest {
    SearchRequest { query: query.to_string(), mode, rows, rerank_docs }
}

#[tokio::test]
async fn bm25_end_to_end_includes_ingested_document() {
    let index = Arc::new(MemoryIndex::new(3.0, true));
    seed(&index, &[(
        "https://example.com/a",
        "Hello World",
        "Tiny test doc about vector search.",
    )])
    .await;

    let engine = engine_over(index);
    let hits = engine
        .search(&request("vector search", SearchMode::Bm25, 5, 20))
        .await
        .expect("search");

    assert!(hits.iter().any(|h| h.url == "https://example.com/a"));
}

#[tokio::test]
async fn validation_failures_perform_zero_index_calls() {
    let index = Arc::new(MemoryIndex::new(3.0, true));
    let engine = engine_over(index.clone());

    let err = engine.search(&request("", SearchMode::Bm25, 5, 20)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    let err = engine.search(&request("rust", SearchMode::Vector, 0, 20)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRows(_)));

    let err = engine
        .search(&request("rust", SearchMode::Bm25, MAX_ROWS + 1, 200))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRows(_)));

    let err = engine.search(&request("rust", SearchMode::Hybrid, 30, 10)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRows(_)));

    assert_eq!(index.query_calls(), 0, "rejected input must never reach the index");
}

#[tokio::test]
async fn unknown_search_type_is_rejected_at_the_boundary() {
    // The wire string never becomes a SearchRequest, so by
    // construction no index call can happen for it.
    let err = SearchMode::from_str("unknown").unwrap_err();
    assert!(matches!(err, Error::InvalidSearchType(_)));
}

#[tokio::test]
async fn hybrid_without_ranking_model_is_distinguishable() {
    let index = Arc::new(MemoryIndex::new(3.0, false));
    seed(&index, &[("https://example.com/a", "Anything", "some document body")]).await;

    let engine = engine_over(index);
    let err = engine
        .search(&request("anything", SearchMode::Hybrid, 3, 50))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::RankingUnavailable(_)),
        "callers must be able to fall back on this specific error, got {err:?}"
    );
}

#[tokio::test]
async fn modes_rank_independently_over_the_same_corpus() {
    let index = Arc::new(MemoryIndex::new(3.0, true));
    seed(
        &index,
        &[
            ("https://example.com/title-match", "alpha beta", "entirely unrelated words here"),
            ("https://example.com/body-match", "nothing", "alpha beta alpha beta"),
        ],
    )
    .await;
    let engine = engine_over(index);

    let lexical = engine
        .search(&request("alpha beta", SearchMode::Bm25, 5, 20))
        .await
        .expect("bm25");
    let dense = engine
        .search(&request("alpha beta", SearchMode::Vector, 5, 20))
        .await
        .expect("vector");
    let fused = engine
        .search(&request("alpha beta", SearchMode::Hybrid, 5, 20))
        .await
        .expect("hybrid");

    // Title boost decides the lexical winner deterministically.
    assert_eq!(lexical[0].url, "https://example.com/title-match");
    assert_eq!(lexical.len(), 2);
    assert_eq!(dense.len(), 2);

    // Fused results come from the same corpus, possibly reordered.
    let corpus = ["https://example.com/title-match", "https://example.com/body-match"];
    assert!(fused.iter().all(|h| corpus.contains(&h.url.as_str())));
    assert!(!fused.is_empty());
}

#[tokio::test]
async fn results_are_capped_at_requested_rows() {
    let index = Arc::new(MemoryIndex::new(3.0, true));
    seed(
        &index,
        &[
            ("https://example.com/1", "rust guide", "rust rust rust"),
            ("https://example.com/2", "rust intro", "rust basics"),
            ("https://example.com/3", "rust book", "more rust"),
        ],
    )
    .await;
    let engine = engine_over(index);

    let hits = engine
        .search(&request("rust", SearchMode::Bm25, 2, 20))
        .await
        .expect("search");
    assert!(hits.len() <= 2);

    let hits = engine
        .search(&request("rust", SearchMode::Hybrid, 2, 10))
        .await
        .expect("search");
    assert!(hits.len() <= 2);

    // Ordered descending by score.
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}
