//! Backend query interface.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use notequery_compiler::{GroupKind, QueryDescription, QueryItem, WireShape};
use notequery_types::{BlockId, BlockTree, QueryError};

/// The backend calls query execution needs.
///
/// Implementations return the raw response value; envelope unwrapping
/// happens in the executor. A structural refusal of the submitted query
/// must surface as `QueryError::BackendRejected`.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run a compiled query.
    async fn query(&self, query: &QueryDescription) -> Result<Value, QueryError>;

    /// Full-text search. The response pairs alias matches with content
    /// matches.
    async fn search_text(&self, text: &str) -> Result<Value, QueryError>;

    /// Fetch a block with its nested children.
    async fn get_block_tree(&self, id: BlockId) -> Result<Option<BlockTree>, QueryError>;
}

/// Which wire shape a submitted query uses.
pub fn shape_of(query: &QueryDescription) -> WireShape {
    match &query.q {
        QueryItem::Group {
            kind: GroupKind::LegacyAnd,
            ..
        } => WireShape::LegacySingle,
        QueryItem::Tag(_) => WireShape::DirectTag,
        _ => WireShape::Current,
    }
}

/// Mock backend for testing.
#[derive(Default)]
pub struct MockBackend {
    /// Query response per wire shape; unset shapes answer `[]`
    pub responses: HashMap<WireShape, Value>,
    /// Shapes the backend refuses
    pub rejected: HashSet<WireShape>,
    /// Fail every query with a transport error
    pub transport_failure: bool,
    /// Text search response
    pub text_response: Value,
    /// Subtrees by root id
    pub trees: HashMap<BlockId, BlockTree>,
    /// Roots whose subtree fetch fails
    pub failing_trees: HashSet<BlockId>,
    requests: Mutex<Vec<Value>>,
    tree_fetches: AtomicUsize,
}

impl MockBackend {
    /// Answer queries of `shape` with `response`.
    pub fn with_response(mut self, shape: WireShape, response: Value) -> Self {
        self.responses.insert(shape, response);
        self
    }

    /// Refuse queries of `shape`.
    pub fn with_rejection(mut self, shape: WireShape) -> Self {
        self.rejected.insert(shape);
        self
    }

    /// Fail every query as if the network were down.
    pub fn with_transport_failure(mut self) -> Self {
        self.transport_failure = true;
        self
    }

    /// Answer text searches with `response`.
    pub fn with_text_response(mut self, response: Value) -> Self {
        self.text_response = response;
        self
    }

    /// Register a subtree.
    pub fn with_tree(mut self, tree: BlockTree) -> Self {
        self.trees.insert(tree.id, tree);
        self
    }

    /// Make the subtree fetch for `id` fail.
    pub fn with_tree_failure(mut self, id: BlockId) -> Self {
        self.failing_trees.insert(id);
        self
    }

    /// Every query submitted so far, as sent.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of queries submitted so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of subtree fetches so far.
    pub fn tree_fetch_count(&self) -> usize {
        self.tree_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryBackend for MockBackend {
    async fn query(&self, query: &QueryDescription) -> Result<Value, QueryError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(query.to_value());
        }

        if self.transport_failure {
            return Err(QueryError::Transport("connection refused".to_string()));
        }

        let shape = shape_of(query);
        if self.rejected.contains(&shape) {
            return Err(QueryError::BackendRejected(format!(
                "unsupported query shape {}",
                shape.as_str()
            )));
        }

        Ok(self.responses.get(&shape).cloned().unwrap_or_else(|| json!([])))
    }

    async fn search_text(&self, _text: &str) -> Result<Value, QueryError> {
        if self.transport_failure {
            return Err(QueryError::Transport("connection refused".to_string()));
        }
        Ok(self.text_response.clone())
    }

    async fn get_block_tree(&self, id: BlockId) -> Result<Option<BlockTree>, QueryError> {
        self.tree_fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_trees.contains(&id) {
            return Err(QueryError::Transport(format!("tree fetch for {} failed", id)));
        }
        Ok(self.trees.get(&id).cloned())
    }
}
