//! # notequery-schema
//!
//! Tag schema resolution for notequery.
//!
//! A tag's schema lists its typed properties. The resolver fetches schemas
//! from the backend through [`SchemaSource`], memoizes them in a
//! [`SchemaCache`] with a time-based expiry, and uses them to correct
//! property filters before compilation.
//!
//! ## Modules
//!
//! - [`source`]: the backend lookup trait and schema construction
//! - [`cache`]: TTL cache keyed by normalized tag name
//! - [`enhance`]: pure filter rewriting against a schema
//! - [`resolver`]: the cached resolver

pub mod cache;
pub mod enhance;
pub mod resolver;
pub mod source;

pub use cache::{SchemaCache, DEFAULT_SCHEMA_TTL};
pub use enhance::{enhance_filter, enhance_filters};
pub use resolver::SchemaResolver;
pub use source::{definition, get_tag_schema, MockSchemaSource, SchemaSource};
