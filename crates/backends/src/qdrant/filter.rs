//! Qdrant filter wire types and translation.
//!
//! The grammar is structurally asymmetric: only a filter carries the
//! `must`/`should`/`must_not` slots, and a condition is either a leaf field
//! test or a nested sub-filter. Logical nodes therefore take one conversion
//! path at the root (node to filter) and another everywhere else (node to
//! condition, wrapped as a nested filter).

use omnivec_core::{Filter, FilterError, FilterOp, FilterValue};
use serde::Serialize;

use crate::support::{leaf_parts, membership_list, single_child};

pub(crate) const BACKEND: &str = "qdrant";

/// Boolean filter with the three condition slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QdrantFilter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Condition>,
}

/// One entry in a filter slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    Field(FieldCondition),
    Nested { filter: QdrantFilter },
}

/// Leaf test against one payload key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub r#match: Option<Match>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeCondition>,
}

impl FieldCondition {
    fn matching(key: &str, m: Match) -> Self {
        Self { key: key.to_owned(), r#match: Some(m), range: None }
    }

    fn ranged(key: &str, range: RangeCondition) -> Self {
        Self { key: key.to_owned(), r#match: None, range: Some(range) }
    }
}

/// Exact-value or any-of match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Match {
    Value { value: serde_json::Value },
    Any { any: Vec<serde_json::Value> },
}

/// Numeric range bounds; unset bounds are omitted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RangeCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
}

/// Translate `filter` into a root Qdrant filter.
///
/// `ne` and `nin` have no first-class negation primitive and are
/// synthesized as a nested filter whose `must_not` holds the corresponding
/// `eq`/`in` condition, one level deeper than an explicit `not` produces.
///
/// # Errors
/// `InvalidQuery` for structural problems, including empty or mixed-type
/// membership lists (this target has no empty-set shortcut);
/// `OperatorNotSupported` for pattern and array-contains predicates and for
/// non-numeric range values.
pub fn translate(filter: &Filter) -> Result<QdrantFilter, FilterError> {
    to_filter(filter)
}

/// Node to filter: the root path, also used for logical nodes that get
/// wrapped as nested conditions.
fn to_filter(node: &Filter) -> Result<QdrantFilter, FilterError> {
    match node.op() {
        FilterOp::And => Ok(QdrantFilter { must: conditions(node.children())?, ..Default::default() }),
        FilterOp::Or => {
            Ok(QdrantFilter { should: conditions(node.children())?, ..Default::default() })
        },
        FilterOp::Not => Ok(QdrantFilter {
            must_not: vec![to_condition(single_child(node)?)?],
            ..Default::default()
        }),
        // A bare condition at the root becomes a single-entry must.
        _ => Ok(QdrantFilter { must: vec![to_condition(node)?], ..Default::default() }),
    }
}

fn conditions(children: &[Filter]) -> Result<Vec<Condition>, FilterError> {
    children.iter().map(to_condition).collect()
}

/// Node to condition: leaves become field conditions, logical nodes nest.
fn to_condition(node: &Filter) -> Result<Condition, FilterError> {
    match node.op() {
        FilterOp::And | FilterOp::Or | FilterOp::Not => {
            Ok(Condition::Nested { filter: to_filter(node)? })
        },
        FilterOp::Eq => Ok(Condition::Field(eq_condition(node)?)),
        FilterOp::In => Ok(Condition::Field(in_condition(node)?)),
        FilterOp::Ne => Ok(negated(eq_condition(node)?)),
        FilterOp::Nin => Ok(negated(in_condition(node)?)),
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            Ok(Condition::Field(range_condition(node)?))
        },
        FilterOp::Like | FilterOp::Contains => {
            Err(FilterError::OperatorNotSupported { backend: BACKEND, op: node.op() })
        },
    }
}

/// Wrap a condition in a nested must_not filter.
fn negated(condition: FieldCondition) -> Condition {
    Condition::Nested {
        filter: QdrantFilter {
            must_not: vec![Condition::Field(condition)],
            ..Default::default()
        },
    }
}

fn eq_condition(node: &Filter) -> Result<FieldCondition, FilterError> {
    let (field, value) = leaf_parts(node)?;
    if value.is_list() {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a scalar value",
            node.op()
        )));
    }
    Ok(FieldCondition::matching(field, Match::Value { value: value.to_json() }))
}

fn in_condition(node: &Filter) -> Result<FieldCondition, FilterError> {
    let (field, value) = leaf_parts(node)?;
    let items = membership_list(node, value)?;
    if items.is_empty() {
        // No identity-element shortcut here: an any-of match over nothing
        // is rejected by the service.
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a non-empty list",
            node.op()
        )));
    }
    let any = items.iter().map(FilterValue::to_json).collect();
    Ok(FieldCondition::matching(field, Match::Any { any }))
}

fn range_condition(node: &Filter) -> Result<FieldCondition, FilterError> {
    let (field, value) = leaf_parts(node)?;
    // Stricter than validation: this target only ranges over numbers.
    let Some(bound) = numeric_bound(value) else {
        return Err(FilterError::OperatorNotSupported { backend: BACKEND, op: node.op() });
    };
    let range = match node.op() {
        FilterOp::Gt => RangeCondition { gt: Some(bound), ..Default::default() },
        FilterOp::Gte => RangeCondition { gte: Some(bound), ..Default::default() },
        FilterOp::Lt => RangeCondition { lt: Some(bound), ..Default::default() },
        _ => RangeCondition { lte: Some(bound), ..Default::default() },
    };
    Ok(FieldCondition::ranged(field, range))
}

fn numeric_bound(value: &FilterValue) -> Option<f64> {
    match value {
        #[expect(clippy::cast_precision_loss, reason = "range bounds tolerate f64 rounding")]
        FilterValue::Int(i) => Some(*i as f64),
        FilterValue::Float(f) => Some(*f),
        _ => None,
    }
}
