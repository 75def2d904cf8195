//! Milvus provider: boolean-expression filter strings.
//!
//! Metadata lives in a JSON field addressed as `metadata["key"]`; the whole
//! filter becomes one expression string passed to the search call.

use async_trait::async_trait;
use omnivec_core::constants::{HTTP_TIMEOUT_SECS, MAX_QUERY_LIMIT};
use omnivec_core::env_config::env_string_with_default;
use omnivec_core::{Filter, FilterError, FilterOp, FilterValue};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::support::{leaf_parts, membership_list, single_child};
use crate::traits::{ScoredPoint, VectorSearch};

/// JSON field holding document metadata.
const METADATA_FIELD: &str = "metadata";

/// Default service endpoint.
pub const DEFAULT_URL: &str = "http://localhost:19530";

/// Translate `filter` into one Milvus boolean expression.
///
/// Comparison here is type-flexible, so no casting is emitted. An empty
/// `in` list collapses to `false` and an empty `nin` list to `true`.
///
/// # Errors
/// `InvalidQuery` for structural problems; every operator has an expression
/// form, so `OperatorNotSupported` is never returned.
pub fn translate(filter: &Filter) -> Result<String, FilterError> {
    match filter.op() {
        FilterOp::And => render_logical(filter, " and "),
        FilterOp::Or => render_logical(filter, " or "),
        FilterOp::Not => Ok(format!("not ({})", translate(single_child(filter)?)?)),
        FilterOp::Eq => render_cmp(filter, "=="),
        FilterOp::Ne => render_cmp(filter, "!="),
        FilterOp::Gt => render_cmp(filter, ">"),
        FilterOp::Gte => render_cmp(filter, ">="),
        FilterOp::Lt => render_cmp(filter, "<"),
        FilterOp::Lte => render_cmp(filter, "<="),
        FilterOp::Like => render_cmp(filter, "like"),
        FilterOp::In => render_membership(filter, true),
        FilterOp::Nin => render_membership(filter, false),
        FilterOp::Contains => {
            let (field, value) = leaf_parts(filter)?;
            if value.is_list() {
                return Err(FilterError::InvalidQuery(
                    "contains requires a scalar value".to_owned(),
                ));
            }
            Ok(format!("json_contains({}, {})", accessor(field), literal(value)))
        },
    }
}

fn render_logical(node: &Filter, joiner: &str) -> Result<String, FilterError> {
    match node.children() {
        [] => Err(FilterError::InvalidQuery(format!(
            "{} requires at least one sub-filter",
            node.op()
        ))),
        [only] => translate(only),
        children => {
            let parts: Vec<String> = children
                .iter()
                .map(|child| {
                    let expr = translate(child)?;
                    Ok(if needs_parens(child) { format!("({expr})") } else { expr })
                })
                .collect::<Result<_, FilterError>>()?;
            Ok(parts.join(joiner))
        },
    }
}

fn needs_parens(node: &Filter) -> bool {
    matches!(node.op(), FilterOp::And | FilterOp::Or) && node.children().len() > 1
}

fn render_cmp(node: &Filter, op_expr: &str) -> Result<String, FilterError> {
    let (field, value) = leaf_parts(node)?;
    if value.is_list() {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a scalar value",
            node.op()
        )));
    }
    Ok(format!("{} {op_expr} {}", accessor(field), literal(value)))
}

fn render_membership(node: &Filter, include: bool) -> Result<String, FilterError> {
    let (field, value) = leaf_parts(node)?;
    let items = membership_list(node, value)?;
    if items.is_empty() {
        // Identity elements under set semantics.
        return Ok((if include { "false" } else { "true" }).to_owned());
    }
    let op_expr = if include { "in" } else { "not in" };
    Ok(format!("{} {op_expr} {}", accessor(field), literal(value)))
}

fn accessor(field: &str) -> String {
    format!("{METADATA_FIELD}[{}]", quote(field))
}

fn literal(value: &FilterValue) -> String {
    match value {
        FilterValue::Str(s) => quote(s),
        FilterValue::Int(i) => i.to_string(),
        FilterValue::Float(f) => f.to_string(),
        FilterValue::Bool(b) => b.to_string(),
        FilterValue::List(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(", "))
        },
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Milvus client over the v2 REST API.
pub struct MilvusStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl std::fmt::Debug for MilvusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusStore")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl MilvusStore {
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
        })
    }

    /// Create a client from `MILVUS_URL` and `MILVUS_COLLECTION`.
    ///
    /// # Errors
    /// `BackendError::HttpRequest` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, BackendError> {
        let url = env_string_with_default("MILVUS_URL", DEFAULT_URL);
        let collection = env_string_with_default("MILVUS_COLLECTION", "omnivec");
        Self::new(&url, collection)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    collection_name: &'a str,
    data: Vec<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    limit: usize,
    output_fields: Vec<&'a str>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: serde_json::Value,
    distance: f64,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[async_trait]
impl VectorSearch for MilvusStore {
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let expr = match filter {
            Some(f) => {
                f.err()?;
                Some(translate(f)?)
            },
            None => None,
        };
        let request = SearchRequest {
            collection_name: &self.collection,
            data: vec![query.to_vec()],
            filter: expr,
            limit: limit.min(MAX_QUERY_LIMIT),
            output_fields: vec![METADATA_FIELD],
        };
        tracing::debug!(limit, filtered = filter.is_some(), "milvus search");

        let response = self
            .client
            .post(format!("{}/v2/vectordb/entities/search", self.base_url))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpStatus { code: status.as_u16(), body });
        }
        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::JsonParse {
                context: "milvus search response".to_owned(),
                source: e,
            })?;
        Ok(parsed
            .data
            .into_iter()
            .map(|hit| ScoredPoint {
                id: json_id_to_string(&hit.id),
                score: hit.distance,
                metadata: hit.metadata,
            })
            .collect())
    }
}

/// Milvus primary keys are strings or integers depending on the schema.
fn json_id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
