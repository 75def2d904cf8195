//! Small checks shared by the translators.
//!
//! Each translator stays safe to call standalone, so the structural checks
//! from validation are repeated here at the point of use.

use omnivec_core::{Filter, FilterError, FilterValue};

/// Field and value of a leaf condition.
pub(crate) fn leaf_parts(node: &Filter) -> Result<(&str, &FilterValue), FilterError> {
    let field = node.field().filter(|f| !f.is_empty()).ok_or_else(|| {
        FilterError::InvalidQuery(format!("{} condition requires a non-empty field", node.op()))
    })?;
    let value = node.value().ok_or_else(|| {
        FilterError::InvalidQuery(format!("{} condition requires a value", node.op()))
    })?;
    Ok((field, value))
}

/// The single child of a `not` node.
pub(crate) fn single_child(node: &Filter) -> Result<&Filter, FilterError> {
    match node.children() {
        [child] => Ok(child),
        other => Err(FilterError::InvalidQuery(format!(
            "not requires exactly one child, got {}",
            other.len()
        ))),
    }
}

/// Elements of a homogeneous membership list. Empty lists pass through;
/// the empty-set policy belongs to the caller.
pub(crate) fn membership_list<'a>(
    node: &'a Filter,
    value: &'a FilterValue,
) -> Result<&'a [FilterValue], FilterError> {
    let FilterValue::List(items) = value else {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a list value, got {}",
            node.op(),
            value.type_name()
        )));
    };
    if let Some(first) = items.first() {
        if first.is_list() {
            return Err(FilterError::InvalidQuery(format!(
                "{} list elements must be scalars",
                node.op()
            )));
        }
        if items.iter().any(|item| !first.same_scalar_type(item)) {
            return Err(FilterError::InvalidQuery(format!(
                "{} list elements must all share one type",
                node.op()
            )));
        }
    }
    Ok(items)
}
