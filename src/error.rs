//! Error types for the reminder scheduler
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the namespaced cache.
///
/// Only namespace creation can fail; every other cache operation resolves
/// to an empty default instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A namespace with this name is already registered
    #[error("Failed to create cache. {0} already exists")]
    NamespaceExists(String),
}

// == Scheduler Error Enum ==
/// Unified error type for the scheduler, its collaborators and the HTTP surface.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Cache configuration error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Backing store call failed
    #[error("Store error: {0}")]
    Store(String),

    /// Notifier call failed
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Reminder not found in the working set or the store
    #[error("Reminder not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Owner has reached the pending reminder limit
    #[error("Reminder limit reached: {0}")]
    LimitReached(String),

    /// Caller is not allowed to act on this reminder
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SchedulerError::LimitReached(_) => StatusCode::TOO_MANY_REQUESTS,
            SchedulerError::Forbidden(_) => StatusCode::FORBIDDEN,
            SchedulerError::Store(_) | SchedulerError::Notifier(_) => StatusCode::BAD_GATEWAY,
            SchedulerError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the scheduler.
pub type Result<T> = std::result::Result<T, SchedulerError>;
