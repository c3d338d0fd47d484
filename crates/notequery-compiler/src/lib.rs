//! # notequery-compiler
//!
//! Turns high-level conditions into the note-database backend's query tree.
//!
//! ## Core Concepts
//!
//! - **Converters**: operator tokens to numeric codes, raw values to the
//!   scalar a property type expects
//! - **Compilers**: tag, advanced, task and journal queries
//! - **Wire shapes**: the same compiled query re-enveloped for older
//!   backend versions
//!
//! ## Usage
//!
//! ```rust
//! use notequery_compiler::{compile_tag_query, QueryOptions};
//! use notequery_types::{Operator, PropType, PropertyFilter};
//!
//! let filter = PropertyFilter::new("priority", Operator::Gte, Some("8".into()))
//!     .with_type(PropType::Number);
//! let query = compile_tag_query("task", &[filter], &QueryOptions::default());
//! assert_eq!(query.to_value()["q"]["conditions"][0]["properties"][0]["value"], 8);
//! ```
//!
//! ## Modules
//!
//! - [`convert`]: operator and value converters
//! - [`sort`]: sort specification normalization
//! - [`wire`]: the backend query-tree format
//! - [`compile`]: the compilers

pub mod compile;
pub mod convert;
pub mod sort;
pub mod wire;

pub use compile::{
    compile_advanced_query, compile_condition, compile_journal_query, compile_property_clause,
    compile_tag_query, compile_task_query, QueryOptions,
};
pub use convert::{convert_value, map_operator, to_number, try_convert_value_from_operator};
pub use sort::{normalize_sort, SortDirection, SortEntry, SortSpec};
pub use wire::{
    GroupKind, PropertyClause, QueryDescription, QueryItem, TagItem, WireDate, WireShape,
};
