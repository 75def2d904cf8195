//! Metadata-filter translation to a parameterized SQL predicate.
//!
//! Produces a `WHERE` fragment over a JSON metadata column using `$N`
//! placeholders. The caller supplies the first free parameter index (the
//! fragment is appended after binds already present in the enclosing query,
//! e.g. the distance-ordering vector) and receives the next free index
//! back, so sibling fragments and the trailing `LIMIT` bind never collide.

use omnivec_core::{Filter, FilterError, FilterOp, FilterValue};

use crate::support::{leaf_parts, membership_list, single_child};

/// A translated predicate: SQL fragment, positional args in placeholder
/// order, and the next free `$N`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub clause: String,
    pub args: Vec<FilterValue>,
    pub next_index: usize,
}

/// Translate `filter` into a predicate over the JSON `column`.
///
/// Scalar comparisons read the field as text via `->>`; numeric comparisons
/// additionally cast to `numeric`. Membership tests bind the operand as an
/// array; `contains` uses JSON containment against the raw field. An empty
/// `in` list collapses to `FALSE` and an empty `nin` list to `TRUE`, the
/// identity elements under set semantics.
///
/// # Errors
/// `InvalidQuery` for structural problems; this target represents every
/// operator, so `OperatorNotSupported` is never returned.
pub fn translate(
    filter: &Filter,
    column: &str,
    start_index: usize,
) -> Result<SqlFilter, FilterError> {
    let mut args = Vec::new();
    let (clause, next_index) = render(filter, column, start_index, &mut args)?;
    Ok(SqlFilter { clause, args, next_index })
}

/// Render one node. Returns the fragment and the next free parameter index;
/// `args` grows in placeholder order. Sibling order matters: each child
/// starts numbering where the previous one stopped.
fn render(
    node: &Filter,
    column: &str,
    index: usize,
    args: &mut Vec<FilterValue>,
) -> Result<(String, usize), FilterError> {
    match node.op() {
        FilterOp::And => render_logical(node, column, index, args, " AND "),
        FilterOp::Or => render_logical(node, column, index, args, " OR "),
        FilterOp::Not => {
            let (inner, next) = render(single_child(node)?, column, index, args)?;
            Ok((format!("NOT ({inner})"), next))
        },
        FilterOp::Eq => render_text_cmp(node, column, index, args, "="),
        FilterOp::Ne => render_text_cmp(node, column, index, args, "<>"),
        FilterOp::Like => render_text_cmp(node, column, index, args, "LIKE"),
        FilterOp::Gt => render_numeric_cmp(node, column, index, args, ">"),
        FilterOp::Gte => render_numeric_cmp(node, column, index, args, ">="),
        FilterOp::Lt => render_numeric_cmp(node, column, index, args, "<"),
        FilterOp::Lte => render_numeric_cmp(node, column, index, args, "<="),
        FilterOp::In => render_membership(node, column, index, args, true),
        FilterOp::Nin => render_membership(node, column, index, args, false),
        FilterOp::Contains => render_contains(node, column, index, args),
    }
}

fn render_logical(
    node: &Filter,
    column: &str,
    index: usize,
    args: &mut Vec<FilterValue>,
    joiner: &str,
) -> Result<(String, usize), FilterError> {
    match node.children() {
        [] => Err(FilterError::InvalidQuery(format!(
            "{} requires at least one sub-filter",
            node.op()
        ))),
        [only] => render(only, column, index, args),
        children => {
            let mut parts = Vec::with_capacity(children.len());
            let mut next = index;
            for child in children {
                let (sql, after) = render(child, column, next, args)?;
                next = after;
                parts.push(if needs_parens(child) { format!("({sql})") } else { sql });
            }
            Ok((parts.join(joiner), next))
        },
    }
}

/// Only multi-child and/or groups need grouping; `NOT (..)` self-groups and
/// leaves are atomic.
fn needs_parens(node: &Filter) -> bool {
    matches!(node.op(), FilterOp::And | FilterOp::Or) && node.children().len() > 1
}

fn render_text_cmp(
    node: &Filter,
    column: &str,
    index: usize,
    args: &mut Vec<FilterValue>,
    op_sql: &str,
) -> Result<(String, usize), FilterError> {
    let (field, value) = leaf_parts(node)?;
    if value.is_list() {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a scalar value",
            node.op()
        )));
    }
    args.push(value.clone());
    Ok((format!("{column}->>'{}' {op_sql} ${index}", escape_field(field)), index + 1))
}

fn render_numeric_cmp(
    node: &Filter,
    column: &str,
    index: usize,
    args: &mut Vec<FilterValue>,
    op_sql: &str,
) -> Result<(String, usize), FilterError> {
    let (field, value) = leaf_parts(node)?;
    if !value.is_numeric() {
        return Err(FilterError::InvalidQuery(format!(
            "{} requires a numeric value, got {}",
            node.op(),
            value.type_name()
        )));
    }
    args.push(value.clone());
    Ok((
        format!("({column}->>'{}')::numeric {op_sql} ${index}", escape_field(field)),
        index + 1,
    ))
}

fn render_membership(
    node: &Filter,
    column: &str,
    index: usize,
    args: &mut Vec<FilterValue>,
    include: bool,
) -> Result<(String, usize), FilterError> {
    let (field, value) = leaf_parts(node)?;
    let items = membership_list(node, value)?;
    let Some(first) = items.first() else {
        // Identity elements: nothing is in the empty set, everything is
        // outside it. No placeholder is consumed.
        return Ok(((if include { "FALSE" } else { "TRUE" }).to_owned(), index));
    };
    let accessor = match first {
        FilterValue::Int(_) | FilterValue::Float(_) => {
            format!("({column}->>'{}')::numeric", escape_field(field))
        },
        FilterValue::Bool(_) => format!("({column}->>'{}')::boolean", escape_field(field)),
        _ => format!("{column}->>'{}'", escape_field(field)),
    };
    args.push(value.clone());
    let op_sql = if include { "= ANY" } else { "<> ALL" };
    Ok((format!("{accessor} {op_sql}(${index})"), index + 1))
}

/// JSON containment against the raw (non-text) field: does this JSON array
/// field contain exactly this one value. The argument is bound as the text
/// form of a single-element array and cast to `jsonb` server-side.
fn render_contains(
    node: &Filter,
    column: &str,
    index: usize,
    args: &mut Vec<FilterValue>,
) -> Result<(String, usize), FilterError> {
    let (field, value) = leaf_parts(node)?;
    if value.is_list() {
        return Err(FilterError::InvalidQuery("contains requires a scalar value".to_owned()));
    }
    let payload = serde_json::Value::Array(vec![value.to_json()]).to_string();
    args.push(FilterValue::Str(payload));
    Ok((format!("{column}->'{}' @> ${index}::jsonb", escape_field(field)), index + 1))
}

/// Field names are interpolated into the fragment, not bound.
fn escape_field(field: &str) -> String {
    field.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_list(items: &[&str]) -> FilterValue {
        FilterValue::List(items.iter().map(|s| FilterValue::Str((*s).to_owned())).collect())
    }

    #[test]
    fn and_of_eq_and_gt_threads_parameter_indexes() {
        let filter = Filter::and(vec![
            Filter::eq("category", "test"),
            Filter::gt("score", 50_i64),
        ]);
        let out = translate(&filter, "metadata", 2).unwrap();
        assert_eq!(
            out.clause,
            "metadata->>'category' = $2 AND (metadata->>'score')::numeric > $3"
        );
        assert_eq!(
            out.args,
            vec![FilterValue::Str("test".to_owned()), FilterValue::Int(50)]
        );
        assert_eq!(out.next_index, 4);
    }

    #[test]
    fn start_index_restarts_on_every_call() {
        let filter = Filter::eq("category", "test");
        let first = translate(&filter, "metadata", 2).unwrap();
        let second = translate(&filter, "metadata", 2).unwrap();
        assert_eq!(first, second);
        let offset = translate(&filter, "metadata", 7).unwrap();
        assert_eq!(offset.clause, "metadata->>'category' = $7");
        assert_eq!(offset.next_index, 8);
    }

    #[test]
    fn nested_groups_get_parentheses_and_continue_numbering() {
        let filter = Filter::and(vec![
            Filter::or(vec![Filter::eq("a", 1_i64), Filter::eq("b", 2_i64)]),
            Filter::eq("c", 3_i64),
        ]);
        let out = translate(&filter, "metadata", 1).unwrap();
        assert_eq!(
            out.clause,
            "(metadata->>'a' = $1 OR metadata->>'b' = $2) AND metadata->>'c' = $3"
        );
        assert_eq!(out.next_index, 4);
    }

    #[test]
    fn single_child_group_is_unwrapped() {
        let filter = Filter::and(vec![Filter::eq("a", 1_i64)]);
        let out = translate(&filter, "metadata", 1).unwrap();
        assert_eq!(out.clause, "metadata->>'a' = $1");
    }

    #[test]
    fn not_prefixes_negation() {
        let filter = Filter::not(Filter::eq("deleted", true));
        let out = translate(&filter, "metadata", 1).unwrap();
        assert_eq!(out.clause, "NOT (metadata->>'deleted' = $1)");
        assert_eq!(out.args, vec![FilterValue::Bool(true)]);
    }

    #[test]
    fn membership_binds_one_array_argument() {
        let filter = Filter::is_in("category", vec!["a", "b", "c"]);
        let out = translate(&filter, "metadata", 3).unwrap();
        assert_eq!(out.clause, "metadata->>'category' = ANY($3)");
        assert_eq!(out.args, vec![str_list(&["a", "b", "c"])]);
        assert_eq!(out.next_index, 4);
    }

    #[test]
    fn numeric_membership_casts_the_field() {
        let filter = Filter::not_in("score", vec![1_i64, 2]);
        let out = translate(&filter, "metadata", 1).unwrap();
        assert_eq!(out.clause, "(metadata->>'score')::numeric <> ALL($1)");
    }

    #[test]
    fn empty_in_is_false_and_empty_nin_is_true() {
        let empty_in = Filter::is_in("category", Vec::<String>::new());
        let out = translate(&empty_in, "metadata", 5).unwrap();
        assert_eq!(out.clause, "FALSE");
        assert!(out.args.is_empty());
        assert_eq!(out.next_index, 5);

        let empty_nin = Filter::not_in("category", Vec::<String>::new());
        let out = translate(&empty_nin, "metadata", 5).unwrap();
        assert_eq!(out.clause, "TRUE");
        assert!(out.args.is_empty());
        assert_eq!(out.next_index, 5);
    }

    #[test]
    fn contains_uses_json_containment_with_single_element_array() {
        let filter = Filter::contains("tags", "rust");
        let out = translate(&filter, "metadata", 2).unwrap();
        assert_eq!(out.clause, "metadata->'tags' @> $2::jsonb");
        assert_eq!(out.args, vec![FilterValue::Str("[\"rust\"]".to_owned())]);
    }

    #[test]
    fn like_maps_to_pattern_match() {
        let filter = Filter::like("title", "%draft%");
        let out = translate(&filter, "metadata", 1).unwrap();
        assert_eq!(out.clause, "metadata->>'title' LIKE $1");
    }

    #[test]
    fn empty_field_is_invalid() {
        let err = translate(&Filter::eq("", "x"), "metadata", 1).unwrap_err();
        assert!(err.is_invalid_query());
    }

    #[test]
    fn non_numeric_range_is_invalid() {
        let err = translate(&Filter::gt("score", "high"), "metadata", 1).unwrap_err();
        assert!(err.is_invalid_query());
    }

    #[test]
    fn malformed_not_is_invalid() {
        let none = Filter::new(FilterOp::Not, None, None, vec![]);
        assert!(translate(&none, "metadata", 1).unwrap_err().is_invalid_query());
        let two = Filter::new(FilterOp::Not, None, None, vec![
            Filter::eq("a", 1_i64),
            Filter::eq("b", 2_i64),
        ]);
        assert!(translate(&two, "metadata", 1).unwrap_err().is_invalid_query());
    }

    #[test]
    fn field_quotes_are_escaped() {
        let filter = Filter::eq("we'ird", "x");
        let out = translate(&filter, "metadata", 1).unwrap();
        assert_eq!(out.clause, "metadata->>'we''ird' = $1");
    }

    #[test]
    fn sibling_args_stay_in_placeholder_order() {
        let filter = Filter::or(vec![
            Filter::is_in("t", vec!["x", "y"]),
            Filter::gte("n", 1.5),
            Filter::eq("s", "v"),
        ]);
        let out = translate(&filter, "metadata", 4).unwrap();
        assert_eq!(
            out.clause,
            "metadata->>'t' = ANY($4) OR (metadata->>'n')::numeric >= $5 OR metadata->>'s' = $6"
        );
        assert_eq!(out.args.len(), 3);
        assert_eq!(out.next_index, 7);
    }
}
