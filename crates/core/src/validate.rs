//! Structural and type validation of filter trees.
//!
//! Runs once, before translation. Translators still re-check the structural
//! pieces they depend on so each stays safe to call standalone, and enforce
//! their own target-specific constraints on top (e.g. the condition-tree
//! backend rejects non-numeric ranges that other targets coerce).

use crate::error::FilterError;
use crate::filter::{Filter, FilterOp};
use crate::value::FilterValue;

/// Validate `filter` and every node beneath it.
///
/// The first violation short-circuits. Membership lists may be empty here:
/// the empty-set policy is per-backend (identity element, sentinel clause,
/// or hard error) and is applied by each translator.
///
/// # Errors
/// `FilterError::InvalidQuery` describing the first violation found.
pub fn validate(filter: &Filter) -> Result<(), FilterError> {
    match filter.op() {
        FilterOp::And | FilterOp::Or => filter.children().iter().try_for_each(validate),
        FilterOp::Not => {
            let [child] = filter.children() else {
                return Err(FilterError::InvalidQuery(format!(
                    "not requires exactly one child, got {}",
                    filter.children().len()
                )));
            };
            validate(child)
        },
        op => validate_leaf(filter, op),
    }
}

fn validate_leaf(filter: &Filter, op: FilterOp) -> Result<(), FilterError> {
    if filter.field().is_none_or(str::is_empty) {
        return Err(FilterError::InvalidQuery(format!(
            "{op} condition requires a non-empty field"
        )));
    }
    let Some(value) = filter.value() else {
        return Err(FilterError::InvalidQuery(format!("{op} condition requires a value")));
    };
    match op {
        FilterOp::In | FilterOp::Nin => validate_membership_list(op, value),
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            if value.is_numeric() {
                Ok(())
            } else {
                Err(FilterError::InvalidQuery(format!(
                    "{op} requires a numeric value, got {}",
                    value.type_name()
                )))
            }
        },
        _ => Ok(()),
    }
}

fn validate_membership_list(op: FilterOp, value: &FilterValue) -> Result<(), FilterError> {
    let FilterValue::List(items) = value else {
        return Err(FilterError::InvalidQuery(format!(
            "{op} requires a list value, got {}",
            value.type_name()
        )));
    };
    let Some(first) = items.first() else {
        return Ok(());
    };
    if first.is_list() {
        return Err(FilterError::InvalidQuery(format!("{op} list elements must be scalars")));
    }
    if items.iter().any(|item| !first.same_scalar_type(item)) {
        return Err(FilterError::InvalidQuery(format!(
            "{op} list elements must all share one type"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn well_formed_tree_passes() {
        let filter = Filter::and(vec![
            Filter::eq("category", "test"),
            Filter::or(vec![Filter::gt("score", 50_i64), Filter::is_in("tag", vec!["a", "b"])]),
            Filter::not(Filter::like("name", "%draft%")),
        ]);
        assert!(validate(&filter).is_ok());
    }

    #[test]
    fn empty_field_is_rejected() {
        let err = validate(&Filter::eq("", "x")).unwrap_err();
        assert!(err.is_invalid_query());
    }

    #[test]
    fn empty_field_is_rejected_deep_in_the_tree() {
        let filter = Filter::and(vec![
            Filter::eq("ok", 1_i64),
            Filter::or(vec![Filter::ne("", "x")]),
        ]);
        assert!(validate(&filter).is_err());
    }

    #[test]
    fn mixed_type_membership_list_is_rejected() {
        let filter = Filter::is_in(
            "category",
            vec![FilterValue::Str("a".to_owned()), FilterValue::Int(1)],
        );
        let err = validate(&filter).unwrap_err();
        assert!(err.to_string().contains("share one type"));
    }

    #[test]
    fn empty_membership_list_passes_validation() {
        // The empty-set policy belongs to each backend, not the validator.
        assert!(validate(&Filter::is_in("category", Vec::<String>::new())).is_ok());
        assert!(validate(&Filter::not_in("category", Vec::<String>::new())).is_ok());
    }

    #[test]
    fn scalar_value_for_membership_is_rejected() {
        let filter = Filter::new(
            FilterOp::In,
            Some("category".to_owned()),
            Some(FilterValue::Str("a".to_owned())),
            vec![],
        );
        assert!(validate(&filter).is_err());
    }

    #[test]
    fn non_numeric_range_is_rejected() {
        let err = validate(&Filter::gt("score", "high")).unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn not_arity_is_enforced() {
        let none = Filter::new(FilterOp::Not, None, None, vec![]);
        let two = Filter::new(FilterOp::Not, None, None, vec![
            Filter::eq("a", 1_i64),
            Filter::eq("b", 2_i64),
        ]);
        assert!(validate(&none).is_err());
        assert!(validate(&two).is_err());
        assert!(validate(&Filter::not(Filter::eq("a", 1_i64))).is_ok());
    }
}
