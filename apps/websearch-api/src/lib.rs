//! HTTP surface over the ingestion pipeline and hybrid query engine.

pub mod error;
pub mod routes;
pub mod startup;
pub mod state;

pub use routes::router;
pub use state::AppState;
