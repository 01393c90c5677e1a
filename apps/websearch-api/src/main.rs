use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use websearch_api::{router, startup, AppState};
use websearch_core::config::Settings;
use websearch_core::traits::{IndexStore, UrlQueue};
use websearch_hybrid::HybridSearchEngine;
use websearch_index::SolrIndex;
use websearch_pipeline::{HttpFetcher, IngestionPipeline, WorkerPool};
use websearch_queue::RedisQueue;

const INDEX_WAIT_ATTEMPTS: u32 = 30;
const INDEX_WAIT_DELAY: Duration = Duration::from_secs(1);

/// Startup order: settings -> model load -> clients (index gated on
/// reachability) -> worker pool -> request serving. Teardown reverses
/// it: drain the server, then stop the workers.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Arc::new(Settings::load()?);

    // Model load is fatal on failure: vector and hybrid search cannot
    // run degraded without it.
    let embedder = websearch_embed::get_default_embedder(&settings)?;

    let index: Arc<dyn IndexStore> = Arc::new(SolrIndex::new(
        &settings.solr.base_url,
        &settings.solr.collection,
        settings.solr.title_boost,
        &settings.solr.ltr_model,
    )?);
    startup::wait_for_index(index.as_ref(), INDEX_WAIT_ATTEMPTS, INDEX_WAIT_DELAY).await?;
    tracing::info!("index engine reachable");
    let queue: Arc<dyn UrlQueue> =
        Arc::new(RedisQueue::connect(&settings.redis.url, &settings.redis.queue_key).await?);
    let fetcher = Arc::new(HttpFetcher::new(&settings.fetch)?);

    let pipeline = Arc::new(IngestionPipeline::new(embedder.clone(), index.clone()));
    let engine = Arc::new(HybridSearchEngine::new(
        embedder.clone(),
        index.clone(),
        settings.search.max_rows,
    ));

    let workers = WorkerPool::start(
        settings.worker.count,
        queue.clone(),
        fetcher,
        pipeline.clone(),
        Duration::from_secs(settings.worker.dequeue_timeout_secs),
    );

    let state = AppState { embedder, index, queue, pipeline, engine, settings: settings.clone() };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    tracing::info!(addr = %settings.server.bind_addr, "serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server drained, stopping workers");
    workers.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
}
