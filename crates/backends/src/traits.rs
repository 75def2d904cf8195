//! Shared search interface over vector backends.

use async_trait::async_trait;
use omnivec_core::Filter;

use crate::error::BackendError;

/// One scored match from a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f64,
    pub metadata: serde_json::Value,
}

/// Similarity search with optional metadata filtering.
///
/// Implementations validate and translate `filter` before any I/O; a filter
/// that cannot be translated fails the call without issuing a query.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Nearest-neighbour search, optionally restricted by `filter`.
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError>;
}
