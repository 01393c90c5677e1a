use std::sync::Arc;

use websearch_core::error::{Error, Result};
use websearch_core::traits::{Embedder, IndexStore};
use websearch_core::types::DocumentRecord;

/// Turns a submitted document into an embedded, indexed record.
///
/// Idempotent by construction: the upsert is keyed by url, so
/// re-ingesting identical input leaves one stored record whose only
/// changed field is `crawl_date`.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn IndexStore>,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn IndexStore>) -> Self {
        Self { embedder, index }
    }

    /// Validate, embed, upsert. The first failing step aborts the
    /// whole operation; in particular an embedding failure performs
    /// zero index calls, so no record ever lands with a partial
    /// vector.
    pub async fn ingest(&self, url: &str, title: &str, content: &str) -> Result<DocumentRecord> {
        if url.trim().is_empty() {
            return Err(Error::InvalidDocument("url must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(Error::InvalidDocument(format!("content must not be empty (url={url})")));
        }

        // Title folded into the embedded text to bias the semantic
        // signal toward title terms.
        let text = format!("{title} {content}");
        let embedder = self.embedder.clone();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))??;

        let record = DocumentRecord::build(url, title, content, vector, self.embedder.dim())?;
        self.index.upsert(&record).await?;
        tracing::info!(url, chars = record.content_length, "ingested document");
        Ok(record)
    }
}
