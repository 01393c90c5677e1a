//! Domain types shared by the ingestion pipeline and query engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Dimension of the sentence-embedding model (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Neutral priority for pages without a computed rank signal.
pub const DEFAULT_PAGE_RANK: f32 = 0.5;

/// The unit of indexing. `url` is the natural key: re-ingesting the
/// same URL overwrites the stored record instead of duplicating it.
///
/// Field names match the index engine's schema so the record
/// serializes straight into an update request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub content_vector: Vec<f32>,
    pub domain: String,
    pub crawl_date: DateTime<Utc>,
    pub page_rank: f32,
    pub content_length: usize,
}

impl DocumentRecord {
    /// Assembles a record from its parts, deriving `domain`,
    /// `content_length` and `crawl_date`.
    ///
    /// Rejects empty `url`/`content` and a vector whose length does
    /// not match `dim`; a record with a partial vector is never
    /// constructed.
    pub fn build(url: &str, title: &str, content: &str, vector: Vec<f32>, dim: usize) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::InvalidDocument("url must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(Error::InvalidDocument(format!("content must not be empty (url={url})")));
        }
        if vector.len() != dim {
            return Err(Error::Embedding(format!(
                "vector length {} does not match model dimension {dim}",
                vector.len()
            )));
        }
        let domain = derive_domain(url)?;
        Ok(Self {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            content_vector: vector,
            domain,
            crawl_date: Utc::now(),
            page_rank: DEFAULT_PAGE_RANK,
            content_length: content.len(),
        })
    }
}

/// Authority component of `url`, e.g. "example.com".
pub fn derive_domain(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::InvalidDocument(format!("unparseable url {url}: {e}")))?;
    Ok(parsed.host_str().unwrap_or_default().to_string())
}

/// Closed set of search strategies. Anything else on the wire is
/// rejected at the boundary before an index call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Bm25,
    Vector,
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Bm25 => "bm25",
            SearchMode::Vector => "vector",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bm25" => Ok(SearchMode::Bm25),
            "vector" => Ok(SearchMode::Vector),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(Error::InvalidSearchType(format!(
                "{other:?} (expected one of: bm25, vector, hybrid)"
            ))),
        }
    }
}

/// A single search round-trip. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub mode: SearchMode,
    pub rows: usize,
    /// Candidate-pool size for the fused re-ranking pass. Only
    /// consulted in hybrid mode; must be >= `rows` there.
    pub rerank_docs: usize,
}

impl SearchRequest {
    /// Fail-fast input validation, performed before any index call.
    pub fn validate(&self, max_rows: usize) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".into()));
        }
        if self.rows == 0 {
            return Err(Error::InvalidRows("rows must be positive".into()));
        }
        if self.rows > max_rows {
            return Err(Error::InvalidRows(format!(
                "rows {} exceeds maximum {max_rows}",
                self.rows
            )));
        }
        if self.mode == SearchMode::Hybrid && self.rerank_docs < self.rows {
            return Err(Error::InvalidRows(format!(
                "rerank_docs {} must be >= rows {}",
                self.rerank_docs, self.rows
            )));
        }
        Ok(())
    }
}

/// One ranked hit. `score` semantics depend on the mode that produced
/// it (BM25 relevance, cosine similarity, or fused rank score) and
/// are not comparable across modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub score: f32,
}

/// Title and plain body text extracted from a fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub title: String,
    pub text: String,
}
