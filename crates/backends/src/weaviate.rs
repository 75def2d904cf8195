//! Weaviate provider: GraphQL `where` filters built as operator chains.
//!
//! A clause is a path + operator + typed value, and groups are an operator
//! plus operands. The finished chain renders into the GraphQL query issued
//! against `/v1/graphql`.

use async_trait::async_trait;
use omnivec_core::constants::{HTTP_TIMEOUT_SECS, MAX_QUERY_LIMIT};
use omnivec_core::env_config::env_string_with_default;
use omnivec_core::{Filter, FilterError, FilterOp, FilterValue};
use serde::Serialize;

use crate::error::BackendError;
use crate::support::{leaf_parts, membership_list, single_child};
use crate::traits::{ScoredPoint, VectorSearch};

/// Default service endpoint.
pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Sentinel for an empty membership set: no document carries this value, so
/// the clause is always false without erroring.
const EMPTY_IN_SENTINEL: &str = "__no_match__";

/// Weaviate `where` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Like,
    ContainsAny,
    And,
    Or,
    Not,
}

impl WhereOperator {
    /// GraphQL enum token.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Equal => "Equal",
            Self::NotEqual => "NotEqual",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanEqual => "GreaterThanEqual",
            Self::LessThan => "LessThan",
            Self::LessThanEqual => "LessThanEqual",
            Self::Like => "Like",
            Self::ContainsAny => "ContainsAny",
            Self::And => "And",
            Self::Or => "Or",
            Self::Not => "Not",
        }
    }
}

/// Chained builder for one `where` clause or group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereFilter {
    operator: Option<WhereOperator>,
    path: Option<Vec<String>>,
    value_text: Option<serde_json::Value>,
    value_int: Option<serde_json::Value>,
    value_number: Option<serde_json::Value>,
    value_boolean: Option<serde_json::Value>,
    operands: Option<Vec<WhereFilter>>,
}

impl WhereFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_operator(mut self, operator: WhereOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn with_value_text(mut self, value: impl Into<String>) -> Self {
        self.value_text = Some(serde_json::Value::String(value.into()));
        self
    }

    #[must_use]
    pub fn with_value_text_list(mut self, values: Vec<String>) -> Self {
        self.value_text = Some(serde_json::json!(values));
        self
    }

    #[must_use]
    pub fn with_value_int(mut self, value: i64) -> Self {
        self.value_int = Some(serde_json::json!(value));
        self
    }

    #[must_use]
    pub fn with_value_int_list(mut self, values: Vec<i64>) -> Self {
        self.value_int = Some(serde_json::json!(values));
        self
    }

    #[must_use]
    pub fn with_value_number(mut self, value: f64) -> Self {
        self.value_number = Some(serde_json::json!(value));
        self
    }

    #[must_use]
    pub fn with_value_number_list(mut self, values: Vec<f64>) -> Self {
        self.value_number = Some(serde_json::json!(values));
        self
    }

    #[must_use]
    pub fn with_value_boolean(mut self, value: bool) -> Self {
        self.value_boolean = Some(serde_json::json!(value));
        self
    }

    #[must_use]
    pub fn with_value_boolean_list(mut self, values: Vec<bool>) -> Self {
        self.value_boolean = Some(serde_json::json!(values));
        self
    }

    #[must_use]
    pub fn with_operands(mut self, operands: Vec<Self>) -> Self {
        self.operands = Some(operands);
        self
    }

    #[must_use]
    pub const fn operator(&self) -> Option<WhereOperator> {
        self.operator
    }

    #[must_use]
    pub fn operands(&self) -> Option<&[Self]> {
        self.operands.as_deref()
    }

    /// Render as a GraphQL argument object.
    #[must_use]
    pub fn to_graphql(&self) -> String {
        let mut parts = Vec::new();
        if let Some(operator) = self.operator {
            parts.push(format!("operator: {}", operator.name()));
        }
        if let Some(path) = &self.path {
            parts.push(format!("path: {}", render_json(&serde_json::json!(path))));
        }
        for (key, value) in [
            ("valueText", &self.value_text),
            ("valueInt", &self.value_int),
            ("valueNumber", &self.value_number),
            ("valueBoolean", &self.value_boolean),
        ] {
            if let Some(value) = value {
                parts.push(format!("{key}: {}", render_json(value)));
            }
        }
        if let Some(operands) = &self.operands {
            let rendered: Vec<String> = operands.iter().map(Self::to_graphql).collect();
            parts.push(format!("operands: [{}]", rendered.join(", ")));
        }
        format!("{{{}}}", parts.join(", "))
    }
}

/// JSON scalar/array literals are valid GraphQL input literals.
fn render_json(value: &serde_json::Value) -> String {
    value.to_string()
}

/// Translate `filter` into a `where` clause chain.
///
/// `nin` is synthesized as a `Not`-wrapped `in`; an empty `in` list becomes
/// an always-false equality clause against a sentinel value instead of an
/// error.
///
/// # Errors
/// `InvalidQuery` for structural problems; every operator is expressible
/// here, so `OperatorNotSupported` is never returned.
pub fn translate(filter: &Filter) -> Result<WhereFilter, FilterError> {
    match filter.op() {
        FilterOp::And => render_logical(filter, WhereOperator::And),
        FilterOp::Or => render_logical(filter, WhereOperator::Or),
        FilterOp::Not => {
            let inner = translate(single_child(filter)?)?;
            Ok(not_wrapped(inner))
        },
        FilterOp::Eq => render_cmp(filter, WhereOperator::Equal),
        FilterOp::Ne => render_cmp(filter, WhereOperator::NotEqual),
        FilterOp::Gt => render_cmp(filter, WhereOperator::GreaterThan),
        FilterOp::Gte => render_cmp(filter, WhereOperator::GreaterThanEqual),
        FilterOp::Lt => render_cmp(filter, WhereOperator::LessThan),
        FilterOp::Lte => render_cmp(filter, WhereOperator::LessThanEqual),
        FilterOp::Like => render_cmp(filter, WhereOperator::Like),
        FilterOp::Contains => {
            let (field, value) = leaf_parts(filter)?;
            if value.is_list() {
                return Err(FilterError::InvalidQuery(
                    "contains requires a scalar value".to_owned(),
                ));
            }
            let base = clause(field, WhereOperator::ContainsAny);
            Ok(set_list_value(base, std::slice::from_ref(value)))
        },
        FilterOp::In => render_membership(filter),
        FilterOp::Nin => {
            let inner = render_membership(filter)?;
            Ok(not_wrapped(inner))
        },
    }
}

fn render_logical(node: &Filter, operator: WhereOperator) -> Result<WhereFilter, FilterError> {
    match node.children() {
        [] => Err(FilterError::InvalidQuery(format!(
            "{} requires at least one sub-filter",
            node.op()
        ))),
        // Singleton groups are rejected by the service; return the child.
        [only] => translate(only),
        children => {
            let operands: Vec<WhereFilter> =
                children.iter().map(translate).collect::<Result<_, _>>()?;
            Ok(WhereFilter::new().with_operator(operator).with_operands(operands))
        },
    }
}

fn not_wrapped(inner: WhereFilter) -> WhereFilter {
    WhereFilter::new().with_operator(WhereOperator::Not).with_operands(vec![inner])
}

fn clause(field: &str, operator: WhereOperator) -> WhereFilter {
    WhereFilter::new().with_path(vec![field.to_owned()]).with_operator(operator)
}

fn render_cmp(node: &Filter, operator: WhereOperator) -> Result<WhereFilter, FilterError> {
    let (field, value) = leaf_parts(node)?;
    let base = clause(field, operator);
    match value {
        FilterValue::Str(s) => Ok(base.with_value_text(s.clone())),
        FilterValue::Int(i) => Ok(base.with_value_int(*i)),
        FilterValue::Float(f) => Ok(base.with_value_number(*f)),
        FilterValue::Bool(b) => Ok(base.with_value_boolean(*b)),
        FilterValue::List(_) => Err(FilterError::InvalidQuery(format!(
            "{} requires a scalar value",
            node.op()
        ))),
    }
}

fn render_membership(node: &Filter) -> Result<WhereFilter, FilterError> {
    let (field, value) = leaf_parts(node)?;
    let items = membership_list(node, value)?;
    if items.is_empty() {
        // Always-false clause instead of an error: the sentinel value never
        // appears in real data.
        return Ok(clause(field, WhereOperator::Equal).with_value_text(EMPTY_IN_SENTINEL));
    }
    Ok(set_list_value(clause(field, WhereOperator::ContainsAny), items))
}

/// Pick the value setter from the first element's type; homogeneity was
/// checked by `membership_list`.
fn set_list_value(base: WhereFilter, items: &[FilterValue]) -> WhereFilter {
    match items.first() {
        Some(FilterValue::Int(_)) => base.with_value_int_list(
            items.iter().filter_map(|v| match v {
                FilterValue::Int(i) => Some(*i),
                _ => None,
            }).collect(),
        ),
        Some(FilterValue::Float(_)) => base.with_value_number_list(
            items.iter().filter_map(|v| match v {
                FilterValue::Float(f) => Some(*f),
                _ => None,
            }).collect(),
        ),
        Some(FilterValue::Bool(_)) => base.with_value_boolean_list(
            items.iter().filter_map(|v| match v {
                FilterValue::Bool(b) => Some(*b),
                _ => None,
            }).collect(),
        ),
        _ => base.with_value_text_list(
            items.iter().filter_map(|v| match v {
                FilterValue::Str(s) => Some(s.clone()),
                _ => None,
            }).collect(),
        ),
    }
}

/// Weaviate client over the GraphQL API.
pub struct WeaviateStore {
    client: reqwest::Client,
    base_url: String,
    class: String,
    properties: Vec<String>,
    api_key: Option<String>,
}

impl std::fmt::Debug for WeaviateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaviateStore")
            .field("base_url", &self.base_url)
            .field("class", &self.class)
            .field("properties", &self.properties)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl WeaviateStore {
    /// Create a client for `class` at `base_url`.
    ///
    /// # Errors
    /// `BackendError::HttpRequest` if the HTTP client cannot be built.
    pub fn new(base_url: &str, class: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            class: class.into(),
            properties: Vec::new(),
            api_key: None,
        })
    }

    /// Create a client from `WEAVIATE_URL`, `WEAVIATE_CLASS`, and
    /// optionally `WEAVIATE_API_KEY`.
    ///
    /// # Errors
    /// `BackendError::HttpRequest` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, BackendError> {
        let url = env_string_with_default("WEAVIATE_URL", DEFAULT_URL);
        let class = env_string_with_default("WEAVIATE_CLASS", "Document");
        let store = Self::new(&url, class)?;
        Ok(match std::env::var("WEAVIATE_API_KEY") {
            Ok(key) if !key.is_empty() => store.with_api_key(key),
            _ => store,
        })
    }

    /// Properties to return with each hit.
    #[must_use]
    pub fn with_properties(mut self, properties: Vec<String>) -> Self {
        self.properties = properties;
        self
    }

    /// Authenticate requests with an API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn build_query(&self, query: &[f32], where_filter: Option<&WhereFilter>, limit: usize) -> String {
        let vector =
            format!("[{}]", query.iter().map(ToString::to_string).collect::<Vec<_>>().join(","));
        let where_part = match where_filter {
            Some(w) => format!(", where: {}", w.to_graphql()),
            None => String::new(),
        };
        let props = if self.properties.is_empty() {
            String::new()
        } else {
            format!("{} ", self.properties.join(" "))
        };
        format!(
            "{{ Get {{ {class}(nearVector: {{vector: {vector}}}, limit: {limit}{where_part}) \
             {{ {props}_additional {{ id distance }} }} }} }}",
            class = self.class,
        )
    }
}

#[derive(Serialize)]
struct GraphQlRequest {
    query: String,
}

#[async_trait]
impl VectorSearch for WeaviateStore {
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let where_filter = match filter {
            Some(f) => {
                f.err()?;
                Some(translate(f)?)
            },
            None => None,
        };
        let graphql =
            self.build_query(query, where_filter.as_ref(), limit.min(MAX_QUERY_LIMIT));
        tracing::debug!(limit, filtered = filter.is_some(), "weaviate graphql query");

        let mut builder = self
            .client
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&GraphQlRequest { query: graphql });
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpStatus { code: status.as_u16(), body });
        }
        let body = response.text().await?;
        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| BackendError::JsonParse {
                context: "weaviate graphql response".to_owned(),
                source: e,
            })?;
        let hits = parsed
            .pointer(&format!("/data/Get/{}", self.class))
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                BackendError::InvalidResponse(format!("missing Get.{} in response", self.class))
            })?;
        Ok(hits.iter().map(|hit| hit_to_point(hit)).collect())
    }
}

fn hit_to_point(hit: &serde_json::Value) -> ScoredPoint {
    let id = hit
        .pointer("/_additional/id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let distance =
        hit.pointer("/_additional/distance").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
    let metadata = match hit {
        serde_json::Value::Object(map) => {
            let props: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .filter(|(key, _)| key.as_str() != "_additional")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            serde_json::Value::Object(props)
        },
        other => other.clone(),
    };
    ScoredPoint { id, score: 1.0 - distance, metadata }
}
