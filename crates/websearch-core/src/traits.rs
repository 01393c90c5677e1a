use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentRecord, FetchedPage, SearchResult};

/// Fixed-dimension sentence embedder. Stateless after load and safe
/// for concurrent use; `embed` is CPU-bound, so async callers should
/// run it on a blocking thread.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    /// Deterministic for identical input. Empty text embeds to a
    /// valid vector, never an error.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Typed gateway to the external search-index engine. Each call is a
/// single independent round-trip; no transactions span calls.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Insert-or-overwrite keyed by `record.url`.
    async fn upsert(&self, record: &DocumentRecord) -> Result<()>;
    /// BM25-style ranking over title/content with the engine's
    /// configured title boost.
    async fn search_lexical(&self, query: &str, rows: usize) -> Result<Vec<SearchResult>>;
    /// Cosine nearest-neighbor over `content_vector`.
    async fn search_vector(&self, vector: &[f32], rows: usize) -> Result<Vec<SearchResult>>;
    /// Lexical candidate retrieval re-scored by the engine's named
    /// learned-ranking model. Fails with `RankingUnavailable` when
    /// the model is missing; callers decide whether to degrade.
    async fn search_fused(
        &self,
        query: &str,
        vector: &[f32],
        rows: usize,
        rerank_docs: usize,
    ) -> Result<Vec<SearchResult>>;
    async fn count(&self) -> Result<u64>;
    async fn ping(&self) -> Result<()>;
}

/// String-payload queue with at-least-once delivery. Duplicate
/// delivery is safe because ingestion upserts are idempotent.
#[async_trait]
pub trait UrlQueue: Send + Sync {
    async fn enqueue(&self, url: &str) -> Result<()>;
    /// Blocks up to `timeout`, returning `None` when the poll
    /// interval elapses with nothing to claim.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>>;
    async fn len(&self) -> Result<u64>;
    async fn ping(&self) -> Result<()>;
}

/// Retrieves a page and extracts plain title/body text. All failures
/// surface as `Error::Fetch`; the background worker logs and moves on.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}
