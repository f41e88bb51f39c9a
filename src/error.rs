//! Error types surfaced by the collection and relay pipeline.
//!
//! Every failure a handler can return maps to one variant here, and each
//! variant maps to one HTTP status plus a structured `{"error": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The hosting API returned a response without the expected item
    /// container. The whole request fails rather than partially succeeding.
    #[error("Data Not Available")]
    DataUnavailable,

    /// Throttle retries were exhausted without a well-formed response.
    #[error("rate limit retries exhausted after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// A forecasting endpoint returned non-2xx or an unparseable body.
    #[error("forecast endpoint {label} unavailable: {reason}")]
    ForecastUnavailable { label: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::DataUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ForecastUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(%status, "request failed: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_variants() {
        assert_eq!(
            ApiError::DataUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::RateLimitExceeded { attempts: 6 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::ForecastUnavailable {
                label: "createdAtImageUrls".into(),
                reason: "502".into()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
