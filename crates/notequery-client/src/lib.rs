//! # notequery-client
//!
//! HTTP transport to the note-database backend.
//!
//! [`BackendClient`] implements both [`notequery_executor::QueryBackend`]
//! and [`notequery_schema::SchemaSource`], so one client serves a whole
//! search pipeline.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notequery_client::{BackendClient, BackendConfig};
//!
//! let client = BackendClient::new(BackendConfig::new("http://127.0.0.1:18088"))?;
//! let id = client.resolve_tag_id("task").await?;
//! ```

pub mod client;
pub mod error;

pub use client::{methods, BackendClient, BackendConfig};
pub use error::ClientError;
