use thiserror::Error;

/// Failure taxonomy shared by every crate in the workspace.
///
/// The first four variants are caller mistakes and map to 4xx at the
/// HTTP edge; the rest are dependency failures and map to 5xx.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid search type: {0}")]
    InvalidSearchType(String),

    #[error("Invalid rows: {0}")]
    InvalidRows(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index write failed: {0}")]
    IndexWrite(String),

    #[error("Index query failed: {0}")]
    IndexQuery(String),

    #[error("Ranking model unavailable: {0}")]
    RankingUnavailable(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Queue operation failed: {0}")]
    Queue(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for errors caused by caller input rather than a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDocument(_)
                | Error::InvalidQuery(_)
                | Error::InvalidSearchType(_)
                | Error::InvalidRows(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
