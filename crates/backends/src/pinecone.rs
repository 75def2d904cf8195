//! Pinecone provider: flat operator-map metadata filters.
//!
//! This integration pushes down equality and membership predicates only
//! (`$eq`/`$ne`/`$in`/`$nin`). Range, pattern, and array-contains
//! predicates have no mapping here and fail fast instead of being silently
//! dropped and post-filtered.

use async_trait::async_trait;
use omnivec_core::constants::{HTTP_TIMEOUT_SECS, MAX_QUERY_LIMIT};
use omnivec_core::{Filter, FilterError, FilterOp};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::require_env;
use crate::error::BackendError;
use crate::support::{leaf_parts, membership_list, single_child};
use crate::traits::{ScoredPoint, VectorSearch};

pub(crate) const BACKEND: &str = "pinecone";

/// Translate `filter` into a nested operator map.
///
/// The grammar has no general negation: `not` is representable only when
/// its child is `eq` or `in`, which are rewritten in place to `$ne`/`$nin`.
///
/// # Errors
/// `OperatorNotSupported` for every predicate outside the
/// equality/membership subset; `InvalidQuery` for structural problems.
pub fn translate(filter: &Filter) -> Result<serde_json::Value, FilterError> {
    match filter.op() {
        FilterOp::And => render_logical(filter, "$and"),
        FilterOp::Or => render_logical(filter, "$or"),
        FilterOp::Not => {
            let child = single_child(filter)?;
            match child.op() {
                FilterOp::Eq => render_scalar(child, "$ne"),
                FilterOp::In => render_membership(child, "$nin"),
                _ => Err(FilterError::OperatorNotSupported {
                    backend: BACKEND,
                    op: FilterOp::Not,
                }),
            }
        },
        FilterOp::Eq => render_scalar(filter, "$eq"),
        FilterOp::Ne => render_scalar(filter, "$ne"),
        FilterOp::In => render_membership(filter, "$in"),
        FilterOp::Nin => render_membership(filter, "$nin"),
        FilterOp::Gt
        | FilterOp::Gte
        | FilterOp::Lt
        | FilterOp::Lte
        | FilterOp::Like
        | FilterOp::Contains => {
            Err(FilterError::OperatorNotSupported { backend: BACKEND, op: filter.op() })
        },
    }
}

fn render_logical(node: &Filter, key: &str) -> Result<serde_json::Value, FilterError> {
    if node.children().is_empty() {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires at least one sub-filter",
            node.op()
        )));
    }
    // Singleton arrays are tolerated by the grammar; no collapse needed.
    let parts: Vec<serde_json::Value> =
        node.children().iter().map(translate).collect::<Result<_, _>>()?;
    Ok(json!({ key: parts }))
}

fn render_scalar(node: &Filter, op_key: &str) -> Result<serde_json::Value, FilterError> {
    let (field, value) = leaf_parts(node)?;
    if value.is_list() {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a scalar value",
            node.op()
        )));
    }
    Ok(json!({ field: { op_key: value.to_json() } }))
}

fn render_membership(node: &Filter, op_key: &str) -> Result<serde_json::Value, FilterError> {
    let (field, value) = leaf_parts(node)?;
    // The grammar serializes the list natively, empty or not; an empty
    // `$in` simply matches nothing.
    membership_list(node, value)?;
    Ok(json!({ field: { op_key: value.to_json() } }))
}

/// Default environment variables consulted by [`PineconeStore::from_env`].
pub const ENV_INDEX_HOST: &str = "PINECONE_INDEX_HOST";
pub const ENV_API_KEY: &str = "PINECONE_API_KEY";

/// Pinecone client over the index-host REST API.
pub struct PineconeStore {
    client: reqwest::Client,
    index_host: String,
    api_key: String,
}

impl std::fmt::Debug for PineconeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeStore")
            .field("index_host", &self.index_host)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

impl PineconeStore {
    /// Create a client for the index at `index_host`.
    ///
    /// # Errors
    /// `BackendError::HttpRequest` if the HTTP client cannot be built.
    pub fn new(index_host: &str, api_key: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            index_host: index_host.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from `PINECONE_INDEX_HOST` and `PINECONE_API_KEY`.
    ///
    /// # Errors
    /// `BackendError::Config` if either variable is unset.
    pub fn from_env() -> Result<Self, BackendError> {
        let host = require_env(ENV_INDEX_HOST)?;
        let key = require_env(ENV_API_KEY)?;
        Self::new(&host, key)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[async_trait]
impl VectorSearch for PineconeStore {
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let translated = match filter {
            Some(f) => {
                f.err()?;
                Some(translate(f)?)
            },
            None => None,
        };
        let request = QueryRequest {
            vector: query.to_vec(),
            top_k: limit.min(MAX_QUERY_LIMIT),
            filter: translated,
            include_metadata: true,
        };
        tracing::debug!(limit, filtered = filter.is_some(), "pinecone query");

        let response = self
            .client
            .post(format!("{}/query", self.index_host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpStatus { code: status.as_u16(), body });
        }
        let body = response.text().await?;
        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::JsonParse {
                context: "pinecone query response".to_owned(),
                source: e,
            })?;
        Ok(parsed
            .matches
            .into_iter()
            .map(|m| ScoredPoint { id: m.id, score: m.score, metadata: m.metadata })
            .collect())
    }
}
