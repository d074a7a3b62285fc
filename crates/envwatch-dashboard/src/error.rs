//! Dashboard error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use envwatch_core::CoreError;
use envwatch_feed::FeedError;
use envwatch_persistence::PersistenceError;
use thiserror::Error;
use tracing::error;

use crate::types::ErrorBody;

/// Errors surfaced by ingestion, queries and handlers.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to save reading: {0}")]
    Persistence(PersistenceError),

    #[error("Failed to query readings: {0}")]
    StoreQuery(PersistenceError),

    #[error("Telemetry poller is not configured")]
    PollerUnavailable,

    #[error("Telemetry poll failed: {0}")]
    Poll(#[from] FeedError),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl From<CoreError> for DashboardError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => Self::Validation(msg),
        }
    }
}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PollerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::StoreQuery(_) | Self::Poll(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller. Store and upstream details stay in the log.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Persistence(_) => "Failed to save reading".to_string(),
            Self::StoreQuery(_) => "Failed to load readings".to_string(),
            Self::PollerUnavailable => self.to_string(),
            Self::Poll(_) => "Failed to fetch telemetry".to_string(),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
