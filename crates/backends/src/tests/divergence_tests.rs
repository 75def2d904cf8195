//! Properties that must hold across all five translators at once.
//!
//! The per-backend differences exercised here (empty membership sets,
//! negation of unsupported children, non-numeric ranges) are contract, not
//! accidents: each reflects what the target grammar can and cannot say.

use omnivec_core::{Filter, FilterError, FilterOp};

use crate::{milvus, pgvector, pinecone, qdrant, weaviate};

/// Run one tree through every translator and collect the per-backend result
/// as `Ok(())` or the error.
fn translate_all(filter: &Filter) -> Vec<(&'static str, Result<(), FilterError>)> {
    vec![
        ("pgvector", pgvector::translate(filter, "metadata", 1).map(|_| ())),
        ("milvus", milvus::translate(filter).map(|_| ())),
        ("pinecone", pinecone::translate(filter).map(|_| ())),
        ("qdrant", qdrant::translate(filter).map(|_| ())),
        ("weaviate", weaviate::translate(filter).map(|_| ())),
    ]
}

#[test]
fn empty_field_leaf_is_invalid_everywhere() {
    for (backend, result) in translate_all(&Filter::eq("", "x")) {
        let err = result.expect_err(backend);
        assert!(err.is_invalid_query(), "{backend}: {err}");
    }
}

#[test]
fn malformed_not_is_invalid_everywhere() {
    let none = Filter::new(FilterOp::Not, None, None, vec![]);
    let two = Filter::new(FilterOp::Not, None, None, vec![
        Filter::eq("a", 1_i64),
        Filter::eq("b", 2_i64),
    ]);
    for bad in [none, two] {
        for (backend, result) in translate_all(&bad) {
            let err = result.expect_err(backend);
            assert!(err.is_invalid_query(), "{backend}: {err}");
        }
    }
}

#[test]
fn equality_and_membership_shapes_never_error_anywhere() {
    let filters = [
        Filter::eq("status", "active"),
        Filter::ne("status", "gone"),
        Filter::is_in("tag", vec!["a", "b"]),
        Filter::not_in("tag", vec!["c"]),
        Filter::and(vec![Filter::eq("a", 1_i64), Filter::eq("b", 2_i64)]),
        Filter::or(vec![Filter::eq("a", 1_i64), Filter::eq("b", 2_i64)]),
        Filter::not(Filter::eq("deleted", true)),
    ];
    for filter in &filters {
        filter.err().expect("well-formed tree");
        for (backend, result) in translate_all(filter) {
            // The one capability gap in this set: pinecone has no general
            // negation, and not(eq) is rewritten rather than rejected.
            assert!(result.is_ok(), "{backend} rejected {:?}", filter.op());
        }
    }
}

#[test]
fn range_support_diverges_by_capability() {
    let filter = Filter::gt("score", 50_i64);
    assert!(pgvector::translate(&filter, "metadata", 1).is_ok());
    assert!(milvus::translate(&filter).is_ok());
    assert!(qdrant::translate(&filter).is_ok());
    assert!(weaviate::translate(&filter).is_ok());
    assert!(pinecone::translate(&filter).unwrap_err().is_unsupported());
}

#[test]
fn empty_in_policy_diverges_exactly_as_specified() {
    let empty_in = Filter::is_in("tag", Vec::<String>::new());

    // Relational and expression-string targets: literal false, no error.
    let pg = pgvector::translate(&empty_in, "metadata", 1).unwrap();
    assert_eq!(pg.clause, "FALSE");
    assert!(pg.args.is_empty());
    assert_eq!(milvus::translate(&empty_in).unwrap(), "false");

    // Structured-tree target: hard error.
    assert!(qdrant::translate(&empty_in).unwrap_err().is_invalid_query());

    // Builder-chain target: always-false sentinel clause, no error.
    let w = weaviate::translate(&empty_in).unwrap();
    assert_eq!(w.operator(), Some(weaviate::WhereOperator::Equal));

    // Operator-map target: the grammar serializes the empty list natively.
    assert!(pinecone::translate(&empty_in).is_ok());
}

#[test]
fn empty_nin_policy_diverges_exactly_as_specified() {
    let empty_nin = Filter::not_in("tag", Vec::<String>::new());

    let pg = pgvector::translate(&empty_nin, "metadata", 1).unwrap();
    assert_eq!(pg.clause, "TRUE");
    assert_eq!(milvus::translate(&empty_nin).unwrap(), "true");

    assert!(qdrant::translate(&empty_nin).unwrap_err().is_invalid_query());

    // Builder-chain: not-wrapped sentinel clause, i.e. always true.
    let w = weaviate::translate(&empty_nin).unwrap();
    assert_eq!(w.operator(), Some(weaviate::WhereOperator::Not));
}

#[test]
fn mixed_type_membership_is_invalid_where_checked() {
    use omnivec_core::FilterValue;
    let mixed = Filter::is_in(
        "tag",
        vec![FilterValue::Str("a".to_owned()), FilterValue::Int(1)],
    );
    // Validation catches it before any translator runs.
    assert!(mixed.err().unwrap_err().is_invalid_query());
    // Targets that cannot emit a usable artifact for a mixed list also
    // check standalone.
    assert!(pgvector::translate(&mixed, "metadata", 1).is_err());
    assert!(milvus::translate(&mixed).is_err());
    assert!(qdrant::translate(&mixed).is_err());
    assert!(weaviate::translate(&mixed).is_err());
}

#[test]
fn translation_is_idempotent_everywhere() {
    let filter = Filter::and(vec![
        Filter::eq("category", "test"),
        Filter::or(vec![
            Filter::gt("score", 50_i64),
            Filter::is_in("tag", vec!["a", "b"]),
        ]),
        Filter::not(Filter::eq("deleted", true)),
    ]);
    assert_eq!(
        pgvector::translate(&filter, "metadata", 2).unwrap(),
        pgvector::translate(&filter, "metadata", 2).unwrap()
    );
    assert_eq!(milvus::translate(&filter).unwrap(), milvus::translate(&filter).unwrap());
    assert_eq!(qdrant::translate(&filter).unwrap(), qdrant::translate(&filter).unwrap());
    assert_eq!(weaviate::translate(&filter).unwrap(), weaviate::translate(&filter).unwrap());
}

#[test]
fn translators_never_mutate_the_tree() {
    let filter = Filter::and(vec![
        Filter::eq("category", "test"),
        Filter::not(Filter::is_in("tag", vec!["a"])),
    ]);
    let before = filter.clone();
    let _ = pgvector::translate(&filter, "metadata", 1);
    let _ = milvus::translate(&filter);
    let _ = pinecone::translate(&filter);
    let _ = qdrant::translate(&filter);
    let _ = weaviate::translate(&filter);
    assert_eq!(filter, before);
}
