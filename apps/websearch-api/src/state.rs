use std::sync::Arc;

use websearch_core::config::Settings;
use websearch_core::traits::{Embedder, IndexStore, UrlQueue};
use websearch_hybrid::HybridSearchEngine;
use websearch_pipeline::IngestionPipeline;

/// Process-scoped services, explicitly constructed at startup and
/// injected into handlers. Everything here is either read-only after
/// initialization or internally pooled, so cloning per request is
/// cheap and lock-free.
#[derive(Clone)]
pub struct AppState {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn IndexStore>,
    pub queue: Arc<dyn UrlQueue>,
    pub pipeline: Arc<IngestionPipeline>,
    pub engine: Arc<HybridSearchEngine>,
    pub settings: Arc<Settings>,
}
