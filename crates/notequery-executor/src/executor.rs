//! Query execution with a wire-shape fallback cascade.
//!
//! The backend's query-tree format has changed across versions. A query is
//! submitted in its compiled shape first; on a structural rejection it is
//! re-enveloped in each older shape in turn. Only rejections move the
//! cascade forward: any other error is returned at once.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use notequery_compiler::{QueryDescription, WireShape};
use notequery_types::{Block, QueryError};

use crate::backend::QueryBackend;
use crate::envelope::parse_blocks;

/// Ordered wire shapes to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    pub shapes: Vec<WireShape>,
}

impl FallbackChain {
    /// Current shape, then the legacy single-condition group, then the
    /// bare tag item.
    pub fn standard() -> Self {
        Self {
            shapes: vec![
                WireShape::Current,
                WireShape::LegacySingle,
                WireShape::DirectTag,
            ],
        }
    }

    /// Submit the compiled shape only.
    pub fn current_only() -> Self {
        Self {
            shapes: vec![WireShape::Current],
        }
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::standard()
    }
}

/// Outcome of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Decoded result blocks
    pub blocks: Vec<Block>,

    /// Shapes submitted, in order
    pub shapes_attempted: Vec<WireShape>,

    /// Shape the backend accepted
    pub shape_used: WireShape,

    /// Whether a shape other than the first was needed
    pub fallback_occurred: bool,

    /// Total execution time
    pub total_time_ms: u64,
}

impl ExecutionResult {
    pub fn count(&self) -> usize {
        self.blocks.len()
    }
}

/// Executor that submits compiled queries through a fallback chain.
pub struct ResilientExecutor<B: QueryBackend + 'static> {
    backend: Arc<B>,
    chain: FallbackChain,
}

impl<B: QueryBackend + 'static> ResilientExecutor<B> {
    /// Create an executor using the standard chain.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            chain: FallbackChain::standard(),
        }
    }

    /// Use a different fallback chain.
    pub fn with_chain(mut self, chain: FallbackChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Submit `query`, falling back through older shapes on rejection.
    ///
    /// Shapes that cannot express the query (legacy shapes for anything but
    /// a single tag condition) are skipped. If every applicable shape is
    /// rejected the last rejection is returned unmodified.
    pub async fn execute_with_fallback(
        &self,
        query: &QueryDescription,
    ) -> Result<ExecutionResult, QueryError> {
        let start = Instant::now();
        let mut shapes_attempted = Vec::new();
        let mut last_error = None;

        for shape in &self.chain.shapes {
            let Some(shaped) = query.reshape(*shape) else {
                debug!(shape = shape.as_str(), "Shape does not apply to query, skipping");
                continue;
            };

            shapes_attempted.push(*shape);
            debug!(
                shape = shape.as_str(),
                attempt = shapes_attempted.len(),
                "Submitting query"
            );

            match self.backend.query(&shaped).await {
                Ok(response) => {
                    let blocks = parse_blocks(response);
                    let fallback_occurred = shapes_attempted.len() > 1;
                    if fallback_occurred {
                        info!(
                            shape = shape.as_str(),
                            attempts = shapes_attempted.len(),
                            "Backend accepted fallback shape"
                        );
                    }
                    return Ok(ExecutionResult {
                        blocks,
                        shape_used: *shape,
                        shapes_attempted,
                        fallback_occurred,
                        total_time_ms: start.elapsed().as_millis() as u64,
                    });
                }
                Err(e) if e.is_rejection() => {
                    debug!(shape = shape.as_str(), error = %e, "Backend rejected shape");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            attempts = shapes_attempted.len(),
            "Backend rejected every query shape"
        );
        Err(last_error.unwrap_or_else(|| {
            QueryError::InvalidQuery("no wire shape applies to this query".to_string())
        }))
    }

    /// Run a full-text search and decode its blocks.
    pub async fn search_text(&self, text: &str) -> Result<Vec<Block>, QueryError> {
        let response = self.backend.search_text(text).await?;
        Ok(parse_blocks(response))
    }
}
