use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use websearch_core::error::Result;
use websearch_core::traits::{PageFetcher, UrlQueue};

use crate::ingest::IngestionPipeline;

/// Fixed pool of long-lived tasks draining the URL queue at bounded
/// concurrency. One bad item never stops a worker: per-item failures
/// are logged with the offending URL and the loop moves on. Failed
/// items are dropped, not re-enqueued.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    pub fn start(
        count: usize,
        queue: Arc<dyn UrlQueue>,
        fetcher: Arc<dyn PageFetcher>,
        pipeline: Arc<IngestionPipeline>,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let handles = (0..count)
            .map(|id| {
                let queue = queue.clone();
                let fetcher = fetcher.clone();
                let pipeline = pipeline.clone();
                let rx = shutdown.subscribe();
                tokio::spawn(run_worker(id, queue, fetcher, pipeline, poll_interval, rx))
            })
            .collect();
        Self { handles, shutdown }
    }

    /// Signals all workers and waits for them to drain. An item
    /// already claimed runs to completion; workers notice the signal
    /// within one poll interval.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    id: usize,
    queue: Arc<dyn UrlQueue>,
    fetcher: Arc<dyn PageFetcher>,
    pipeline: Arc<IngestionPipeline>,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
) {
    tracing::info!(worker = id, "background worker started");
    // The shutdown flag is consulted only between full
    // dequeue-process iterations. Racing it against an in-flight
    // dequeue would cancel a pop whose item may already be off the
    // queue, losing it without a trace; the bounded dequeue timeout
    // caps shutdown latency instead.
    while !*shutdown.borrow() {
        match queue.dequeue(poll_interval).await {
            Ok(Some(url)) => {
                if let Err(e) = process_one(fetcher.as_ref(), &pipeline, &url).await {
                    tracing::warn!(worker = id, url, error = %e, "background ingestion failed");
                }
            }
            Ok(None) => {} // poll interval elapsed, loop again
            Err(e) => {
                tracing::error!(worker = id, error = %e, "queue dequeue failed");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
    tracing::info!(worker = id, "background worker stopped");
}

/// Fetch-then-ingest for a single claimed URL.
pub async fn process_one(
    fetcher: &dyn PageFetcher,
    pipeline: &IngestionPipeline,
    url: &str,
) -> Result<()> {
    let page = fetcher.fetch(url).await?;
    pipeline.ingest(url, &page.title, &page.text).await?;
    Ok(())
}
