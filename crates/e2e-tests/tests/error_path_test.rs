//! Error path E2E tests for notequery.
//!
//! Rejections stop after the applicable shapes, transient failures are
//! retried, and schema or subtree failures never fail a search.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::ResponseTemplate;

use e2e_tests::{invoke, InvokeMethod, RootKind, TestHarness};
use notequery_compiler::QueryOptions;
use notequery_types::{CombineMode, Condition, Operator, PropertyFilter, QueryError};

/// A non-tag query has no legacy shapes, so one rejection is final.
#[tokio::test]
async fn test_rejected_advanced_query_is_not_reshaped() {
    let harness = TestHarness::new().await;
    invoke()
        .and(RootKind(106))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown kind 106"))
        .expect(1)
        .mount(&harness.server)
        .await;

    let err = harness
        .service_without_content()
        .search_advanced(
            vec![Condition::tag("project"), Condition::task(None)],
            CombineMode::ChainAnd,
            &QueryOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    assert!(err.to_string().contains("unknown kind 106"));
}

/// Every shape rejected: the last rejection is reported.
#[tokio::test]
async fn test_all_shapes_rejected() {
    let harness = TestHarness::new().await;
    invoke()
        .and(InvokeMethod("query"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .expect(3)
        .mount(&harness.server)
        .await;

    let err = harness
        .service_without_content()
        .search_by_tag("task", &[], &QueryOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::BackendRejected(_)));
}

/// A 503 followed by success is retried transparently.
#[tokio::test]
async fn test_transient_failure_is_retried() {
    let harness = TestHarness::new().await;
    invoke()
        .and(InvokeMethod("search-blocks-by-text"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&harness.server)
        .await;
    harness
        .mount_method("search-blocks-by-text", json!([{"id": 1, "text": "hit"}]))
        .await;

    let response = harness
        .service_without_content()
        .search_text("hit")
        .await
        .unwrap();

    assert_eq!(response.len(), 1);
    assert_eq!(harness.calls("search-blocks-by-text").await.len(), 3);
}

/// Transport failures abort the cascade instead of trying older shapes.
#[tokio::test]
async fn test_transport_failure_stops_fallback() {
    let harness = TestHarness::new().await;
    invoke()
        .and(RootKind(100))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.server)
        .await;
    invoke()
        .and(RootKind(1))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&harness.server)
        .await;

    let err = harness
        .service_without_content()
        .search_by_tag("task", &[], &QueryOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Transport(_)));
    // First attempt plus three retries.
    assert_eq!(harness.calls("query").await.len(), 4);
}

/// An unknown tag degrades to unenhanced filters.
#[tokio::test]
async fn test_unknown_tag_searches_without_schema() {
    let harness = TestHarness::new().await;
    harness.mount_method("get-blockid-by-alias", json!(null)).await;
    harness.mount_method("query", json!([])).await;

    let service = harness.service_without_content();
    let filters = vec![PropertyFilter::new("priority", Operator::Lt, Some(json!("5")))];
    let response = service
        .search_by_tag("ghost", &filters, &QueryOptions::default())
        .await
        .unwrap();
    assert!(response.is_empty());

    let queries = harness.calls("query").await;
    assert_eq!(
        queries[0]["args"][0]["q"]["conditions"][0]["properties"][0],
        json!({"name": "priority", "op": 8, "value": 5})
    );

    let err = service.tag_schema("ghost").await.unwrap_err();
    assert!(matches!(err, QueryError::TagNotFound(name) if name == "ghost"));
}

/// A failing subtree fetch leaves only that hit without full content.
#[tokio::test]
async fn test_subtree_failure_is_isolated() {
    let harness = TestHarness::new().await;
    harness
        .mount_method("query", json!([{"id": 1, "text": "one"}, {"id": 2, "text": "two"}]))
        .await;
    invoke()
        .and(InvokeMethod("get-block-tree"))
        .and(wiremock::matchers::body_partial_json(json!({"args": [1]})))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.server)
        .await;
    invoke()
        .and(InvokeMethod("get-block-tree"))
        .and(wiremock::matchers::body_partial_json(json!({"args": [2]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 2, "text": "two"})),
        )
        .mount(&harness.server)
        .await;

    let response = harness
        .service()
        .search_advanced(
            vec![Condition::text("o")],
            CombineMode::And,
            &QueryOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.len(), 2);
    assert_eq!(response.results[0].full_content, None);
    assert_eq!(response.results[1].full_content.as_deref(), Some("- two"));
}

/// Empty text is refused before any request is made.
#[tokio::test]
async fn test_empty_text_search() {
    let harness = TestHarness::new().await;

    let err = harness
        .service_without_content()
        .search_text("   ")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::InvalidQuery(_)));
    assert!(harness.calls("search-blocks-by-text").await.is_empty());
}
