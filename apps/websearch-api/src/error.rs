use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use websearch_core::error::Error;

/// Maps the core taxonomy onto HTTP statuses: caller mistakes are
/// 4xx, dependency failures are 5xx, and a missing ranking model is
/// 503 so clients can tell it apart from a generic engine failure.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::RankingUnavailable(_) | Error::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::IndexWrite(_) | Error::IndexQuery(_) | Error::Fetch(_) => StatusCode::BAD_GATEWAY,
            Error::Embedding(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
