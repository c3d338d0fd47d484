//! End-to-end test infrastructure for notequery.
//!
//! Provides a shared TestHarness backed by a wiremock server that speaks
//! the backend's `/api/invoke` protocol, plus helpers for mounting method
//! handlers and building backend payloads.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use notequery_client::{BackendClient, BackendConfig};
use notequery_search::SearchService;
use notequery_types::ResultOptions;

/// Matches invoke requests by backend method name.
pub struct InvokeMethod(pub &'static str);

impl wiremock::Match for InvokeMethod {
    fn matches(&self, request: &Request) -> bool {
        request_body(request)
            .map(|body| body["method"] == self.0)
            .unwrap_or(false)
    }
}

/// Matches `query` requests whose root item has the given kind code.
///
/// The root kind tells the wire shapes apart: 100/101/106 for the current
/// shape, 1 for the legacy wrapper, 4 for a bare tag item.
pub struct RootKind(pub u16);

impl wiremock::Match for RootKind {
    fn matches(&self, request: &Request) -> bool {
        request_body(request)
            .map(|body| body["method"] == "query" && body["args"][0]["q"]["kind"] == self.0)
            .unwrap_or(false)
    }
}

/// Decoded JSON body of a recorded request.
pub fn request_body(request: &Request) -> Option<Value> {
    serde_json::from_slice(&request.body).ok()
}

/// Shared test harness for E2E tests.
///
/// Owns the mock backend and a client pointed at it.
pub struct TestHarness {
    /// Mock note-database backend
    pub server: MockServer,
    /// Client with fast retries
    pub client: Arc<BackendClient>,
}

impl TestHarness {
    /// Start a mock backend and connect a client to it.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let config = BackendConfig::new(server.uri()).with_retries(3, Duration::from_millis(5));
        let client = Arc::new(BackendClient::new(config).expect("Failed to create client"));
        Self { server, client }
    }

    /// Search service over the harness client with default result options.
    pub fn service(&self) -> SearchService<BackendClient, BackendClient> {
        SearchService::with_backend(self.client.clone())
    }

    /// Search service that skips subtree fetches.
    pub fn service_without_content(&self) -> SearchService<BackendClient, BackendClient> {
        self.service()
            .with_result_options(ResultOptions::without_full_content())
    }

    /// Answer every call to `method_name` with `response`.
    pub async fn mount_method(&self, method_name: &'static str, response: Value) {
        invoke()
            .and(InvokeMethod(method_name))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// Register a tag and its property definitions for schema lookups.
    pub async fn mount_tag(&self, name: &'static str, id: i64, definitions: Value) {
        invoke()
            .and(InvokeMethod("get-blockid-by-alias"))
            .and(wiremock::matchers::body_partial_json(json!({"args": [name]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(id)))
            .mount(&self.server)
            .await;

        invoke()
            .and(InvokeMethod("get-block"))
            .and(wiremock::matchers::body_partial_json(json!({"args": [id]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "aliases": [name],
                "properties": definitions,
            })))
            .mount(&self.server)
            .await;
    }

    /// Decoded bodies of every recorded call to `method_name`.
    pub async fn calls(&self, method_name: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(request_body)
            .filter(|body| body["method"] == method_name)
            .collect()
    }
}

/// Base mock for the backend's single invoke endpoint.
pub fn invoke() -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(path("/api/invoke"))
}

/// A block tagged with `tag`, carrying `link_data` on the tag link.
pub fn tagged_block(id: i64, text: &str, tag: &str, link_data: Value) -> Value {
    json!({
        "id": id,
        "text": text,
        "refs": [{"id": id * 100, "from": id, "to": 10, "type": 2, "alias": tag, "data": link_data}],
        "created": 1_706_540_400_000_i64,
        "modified": 1_706_626_800_000_i64,
    })
}

/// A two-level subtree rooted at `id`.
pub fn subtree(id: i64, text: &str, children: &[&str]) -> Value {
    let children: Vec<Value> = children
        .iter()
        .enumerate()
        .map(|(i, child)| json!({"id": id * 10 + i as i64 + 1, "text": child, "children": []}))
        .collect();
    json!({"id": id, "text": text, "children": children})
}
