//! # notequery-search
//!
//! The search pipeline: resolve schema, compile, execute with fallback,
//! normalize.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notequery_search::SearchService;
//!
//! let service = SearchService::with_backend(Arc::new(client));
//! let response = service
//!     .search_by_tag("task", &filters, &QueryOptions::default())
//!     .await?;
//! ```

pub mod service;

pub use service::{SearchResponse, SearchService};
