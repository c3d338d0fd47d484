//! # notequery-executor
//!
//! Runs compiled queries against the note-database backend and turns its
//! responses into uniform search results.
//!
//! ## Core Concepts
//!
//! - **Fallback chain**: ordered wire shapes tried on structural rejection
//! - **Envelope unwrapping**: every response shape flattened to a list
//! - **Normalization**: blocks projected into `SearchResult`s with merged
//!   properties and a bounded subtree rendering
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notequery_executor::{ResilientExecutor, ResultNormalizer};
//!
//! let executor = ResilientExecutor::new(backend.clone());
//! let execution = executor.execute_with_fallback(&query).await?;
//!
//! let normalizer = ResultNormalizer::new(backend, ResultOptions::default());
//! let results = normalizer.normalize(execution.blocks).await;
//! ```

pub mod backend;
pub mod envelope;
pub mod executor;
pub mod normalize;

pub use backend::{shape_of, MockBackend, QueryBackend};
pub use envelope::{parse_blocks, unwrap_envelope};
pub use executor::{ExecutionResult, FallbackChain, ResilientExecutor};
pub use normalize::{
    block_title, project_properties, render_tree, to_search_result, ResultNormalizer,
};
