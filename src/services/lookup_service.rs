//! Backend seam for entity lookups.
//!
//! The search controller only ever talks to a [`SearchBackend`], so the HTTP
//! client can be swapped for an in-memory one in tests.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::domain::SearchRequest;

/// Failure kinds of a lookup.
///
/// `Aborted` is expected and frequent: it marks a request that was superseded
/// or torn down, and the controller leaves visible state untouched for it. A
/// backend returning `Aborted` for a request that is still current is treated
/// as a failure. `BelowThreshold` only describes a refused search; it is never
/// returned from a fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Query shorter than {min} characters")]
    BelowThreshold { min: usize },

    #[error("Request aborted")]
    Aborted,

    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Backend returned HTTP {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Http(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// A backend search endpoint.
///
/// Implementations return the raw response body; shaping it into suggestions
/// is the controller's job. Dropping the returned future must abandon the
/// request.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Name used in logs and metric labels.
    fn name(&self) -> &str;

    /// Runs one search call.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Status`] for non-2xx responses
    /// - [`SearchError::Http`] for transport failures
    /// - [`SearchError::Decode`] when the body is not JSON
    async fn fetch(&self, request: &SearchRequest) -> Result<Value, SearchError>;
}
