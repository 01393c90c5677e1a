//! Index Client: typed gateways to the search-index engine.
//!
//! `SolrIndex` talks to a real Solr collection (BM25, KNN vector and
//! LTR-fused queries). `MemoryIndex` is a small in-process stand-in
//! with the same contract, used by tests and index-less development.

pub mod memory;
pub mod solr;

pub use memory::MemoryIndex;
pub use solr::SolrIndex;
