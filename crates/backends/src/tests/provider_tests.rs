//! HTTP provider round-trips against a mock server.

#![expect(clippy::unwrap_used, reason = "test code")]

use omnivec_core::Filter;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::traits::VectorSearch;
use crate::{MilvusStore, PineconeStore, QdrantStore, ScoredPoint, WeaviateStore};

#[tokio::test]
async fn qdrant_search_sends_translated_filter_and_parses_points() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/query"))
        .and(body_partial_json(json!({
            "filter": {
                "should": [
                    {"key": "status", "match": {"value": "active"}},
                    {"key": "status", "match": {"value": "pending"}},
                ]
            },
            "with_payload": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "points": [
                    {"id": 7, "score": 0.92, "payload": {"status": "active"}},
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = QdrantStore::new(&server.uri(), "docs").unwrap();
    let filter = Filter::or(vec![
        Filter::eq("status", "active"),
        Filter::eq("status", "pending"),
    ]);
    let points = store.search(&[0.1, 0.2], Some(&filter), 5).await.unwrap();
    assert_eq!(
        points,
        vec![ScoredPoint {
            id: "7".to_owned(),
            score: 0.92,
            metadata: json!({"status": "active"}),
        }]
    );
}

#[tokio::test]
async fn milvus_search_sends_expression_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/vectordb/entities/search"))
        .and(body_partial_json(json!({
            "collectionName": "docs",
            "filter": "metadata[\"category\"] == \"test\"",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [
                {"id": "doc-1", "distance": 0.88, "metadata": {"category": "test"}},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = MilvusStore::new(&server.uri(), "docs").unwrap();
    let filter = Filter::eq("category", "test");
    let points = store.search(&[0.5], Some(&filter), 3).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].id, "doc-1");
    assert_eq!(points[0].score, 0.88);
}

#[tokio::test]
async fn untranslatable_filter_aborts_before_any_request() {
    let server = MockServer::start().await;
    // No request may reach the service when translation fails.
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let store = PineconeStore::new(&server.uri(), "key").unwrap();
    let err = store.search(&[0.1], Some(&Filter::gt("score", 1_i64)), 5).await.unwrap_err();
    assert!(err.is_filter_error());
    server.verify().await;
}

#[tokio::test]
async fn invalid_tree_fails_validation_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let store = QdrantStore::new(&server.uri(), "docs").unwrap();
    let err = store.search(&[0.1], Some(&Filter::eq("", "x")), 5).await.unwrap_err();
    assert!(err.is_filter_error());
    server.verify().await;
}

#[tokio::test]
async fn weaviate_search_embeds_where_clause_in_graphql() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "Get": {
                    "Document": [
                        {
                            "category": "test",
                            "_additional": {"id": "abc", "distance": 0.2},
                        }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = WeaviateStore::new(&server.uri(), "Document")
        .unwrap()
        .with_properties(vec!["category".to_owned()]);
    let filter = Filter::eq("category", "test");
    let points = store.search(&[0.3, 0.4], Some(&filter), 2).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].id, "abc");
    assert!((points[0].score - 0.8).abs() < 1e-9);
    assert_eq!(points[0].metadata, json!({"category": "test"}));
}

#[tokio::test]
async fn non_success_status_maps_to_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = MilvusStore::new(&server.uri(), "docs").unwrap();
    let err = store.search(&[0.1], None, 5).await.unwrap_err();
    match err {
        crate::BackendError::HttpStatus { code, body } => {
            assert_eq!(code, 500);
            assert_eq!(body, "boom");
        },
        other => panic!("unexpected error: {other}"),
    }
}
