//! Hybrid Query Engine: validates a search request, dispatches it to
//! the right index operation, and returns a uniformly shaped ranked
//! list. No caching, no cross-mode mixing; each mode is one
//! round-trip to the index.

use std::sync::Arc;

use websearch_core::error::{Error, Result};
use websearch_core::traits::{Embedder, IndexStore};
use websearch_core::types::{SearchMode, SearchRequest, SearchResult};

pub struct HybridSearchEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn IndexStore>,
    max_rows: usize,
}

impl HybridSearchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn IndexStore>, max_rows: usize) -> Self {
        Self { embedder, index, max_rows }
    }

    /// Returns at most `request.rows` results. All input validation
    /// happens before any index call; a `RankingUnavailable` failure
    /// from hybrid mode propagates as-is so callers can decide
    /// whether to degrade to lexical search.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        request.validate(self.max_rows)?;

        let results = match request.mode {
            SearchMode::Bm25 => self.index.search_lexical(&request.query, request.rows).await?,
            SearchMode::Vector => {
                let vector = self.embed_query(&request.query).await?;
                self.index.search_vector(&vector, request.rows).await?
            }
            SearchMode::Hybrid => {
                let vector = self.embed_query(&request.query).await?;
                self.index
                    .search_fused(&request.query, &vector, request.rows, request.rerank_docs)
                    .await?
            }
        };
        tracing::debug!(
            mode = request.mode.as_str(),
            rows = request.rows,
            hits = results.len(),
            "search dispatched"
        );
        Ok(results)
    }

    /// Query embedding is CPU-bound; keep it off the async scheduler.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
    }
}
