//! Ingestion side of the system: content fetching, the ingestion
//! pipeline that turns a document into an indexed record, and the
//! background worker pool that drains the URL queue.

pub mod fetch;
pub mod ingest;
pub mod worker;

pub use fetch::HttpFetcher;
pub use ingest::IngestionPipeline;
pub use worker::WorkerPool;
