//! # notequery-types
//!
//! Shared domain types for the notequery system.
//!
//! This crate defines the data model every other crate speaks:
//! - Conditions: the atomic search predicates and how they combine
//! - Property filters: typed predicates with a closed operator set
//! - Tag schemas: property definitions fetched from the backend
//! - Blocks: the raw shapes the backend returns
//! - Search results: the uniform shape handed back to callers
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use notequery_types::{Condition, Operator, PropType, PropertyFilter};
//!
//! let filter = PropertyFilter::new("priority", Operator::Gte, Some(8.into()))
//!     .with_type(PropType::Number);
//! let condition = Condition::tag_with("task", vec![filter]);
//! assert_eq!(condition.kind_name(), "tag");
//! ```

pub mod block;
pub mod condition;
pub mod config;
pub mod date;
pub mod error;
pub mod filter;
pub mod result;
pub mod schema;

pub use block::{Block, BlockId, BlockProperty, BlockRef, BlockTree, TAG_REF_TYPE};
pub use condition::{CombineMode, Condition, DateRange, TaskQuery};
pub use config::Settings;
pub use date::{DateSpec, TimeUnit};
pub use error::QueryError;
pub use filter::{Operator, PropType, PropertyFilter};
pub use result::{ResultOptions, SearchResult, TRUNCATION_MARKER};
pub use schema::{ChoiceOption, PropertySchema, TagSchema};
