//! Qdrant provider over the REST points-query API.

pub mod filter;

use async_trait::async_trait;
use omnivec_core::constants::{HTTP_TIMEOUT_SECS, MAX_QUERY_LIMIT};
use omnivec_core::env_config::env_string_with_default;
use omnivec_core::Filter;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::traits::{ScoredPoint, VectorSearch};

pub use filter::{Condition, FieldCondition, Match, QdrantFilter, RangeCondition, translate};

/// Default service endpoint.
pub const DEFAULT_URL: &str = "http://localhost:6333";

/// Qdrant client for one collection.
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Create a client for `collection` at `base_url`.
    ///
    /// # Errors
    /// `BackendError::HttpRequest` if the HTTP client cannot be built.
    pub fn new(base_url: &str, collection: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            collection: collection.into(),
            api_key: None,
        })
    }

    /// Create a client from `QDRANT_URL`, `QDRANT_COLLECTION`, and
    /// optionally `QDRANT_API_KEY`.
    ///
    /// # Errors
    /// `BackendError::HttpRequest` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, BackendError> {
        let url = env_string_with_default("QDRANT_URL", DEFAULT_URL);
        let collection = env_string_with_default("QDRANT_COLLECTION", "omnivec");
        let store = Self::new(&url, collection)?;
        Ok(match std::env::var("QDRANT_API_KEY") {
            Ok(key) if !key.is_empty() => store.with_api_key(key),
            _ => store,
        })
    }

    /// Authenticate requests with an API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Serialize)]
struct QueryRequest {
    query: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<QdrantFilter>,
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<QueryPoint>,
}

#[derive(Deserialize)]
struct QueryPoint {
    id: serde_json::Value,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    payload: serde_json::Value,
}

#[async_trait]
impl VectorSearch for QdrantStore {
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let translated = match filter {
            Some(f) => {
                f.err()?;
                Some(filter::translate(f)?)
            },
            None => None,
        };
        let request = QueryRequest {
            query: query.to_vec(),
            filter: translated,
            limit: limit.min(MAX_QUERY_LIMIT),
            with_payload: true,
        };
        tracing::debug!(limit, filtered = filter.is_some(), "qdrant query");

        let url = format!("{}/collections/{}/points/query", self.base_url, self.collection);
        let mut builder = self.client.post(url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpStatus { code: status.as_u16(), body });
        }
        let body = response.text().await?;
        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::JsonParse {
                context: "qdrant query response".to_owned(),
                source: e,
            })?;
        Ok(parsed
            .result
            .points
            .into_iter()
            .map(|point| ScoredPoint {
                id: json_id_to_string(&point.id),
                score: point.score,
                metadata: point.payload,
            })
            .collect())
    }
}

/// Qdrant point ids are integers or UUID strings.
fn json_id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
