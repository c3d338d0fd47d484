//! Cached schema resolver.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use notequery_types::{Condition, PropertyFilter, QueryError, TagSchema};

use crate::cache::SchemaCache;
use crate::enhance;
use crate::source::{get_tag_schema, SchemaSource};

/// Resolves tag schemas through a TTL cache and applies them to filters.
pub struct SchemaResolver<S: SchemaSource + 'static> {
    source: Arc<S>,
    cache: SchemaCache,
}

impl<S: SchemaSource + 'static> SchemaResolver<S> {
    /// Create a resolver with the default 30 minute TTL.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cache: SchemaCache::default(),
        }
    }

    /// Set the cache TTL. Existing entries are discarded.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = SchemaCache::new(ttl);
        self
    }

    /// The underlying cache.
    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Fetch a schema from the backend, bypassing the cache.
    pub async fn get_tag_schema(&self, tag_name: &str) -> Result<TagSchema, QueryError> {
        get_tag_schema(self.source.as_ref(), tag_name).await
    }

    /// Cached schema for `tag_name`, fetched on miss or expiry.
    pub async fn get_cached_tag_schema(&self, tag_name: &str) -> Result<TagSchema, QueryError> {
        if let Some(schema) = self.cache.get(tag_name) {
            return Ok(schema);
        }

        let schema = self.get_tag_schema(tag_name).await?;
        info!(
            tag = %tag_name,
            properties = schema.properties.len(),
            "Refreshed tag schema"
        );
        self.cache.insert(tag_name, schema.clone());
        Ok(schema)
    }

    /// Drop every cached schema.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Drop the cached schema for one tag.
    pub fn invalidate(&self, tag_name: &str) -> bool {
        self.cache.invalidate(tag_name)
    }

    /// Enhance `filters` against the schema of `tag_name`.
    ///
    /// Never fails: if the schema cannot be resolved the original filters
    /// are returned.
    pub async fn enhance_filters(
        &self,
        tag_name: &str,
        filters: &[PropertyFilter],
    ) -> Vec<PropertyFilter> {
        if filters.is_empty() {
            return Vec::new();
        }

        match self.get_cached_tag_schema(tag_name).await {
            Ok(schema) => enhance::enhance_filters(&schema, filters),
            Err(e) => {
                warn!(
                    tag = %tag_name,
                    error = %e,
                    "Schema lookup failed, using filters as written"
                );
                filters.to_vec()
            }
        }
    }

    /// Enhance the property filters of a tag condition; other conditions
    /// are returned as they are.
    pub async fn enhance_condition(&self, condition: Condition) -> Condition {
        match condition {
            Condition::Tag { name, properties } if !properties.is_empty() => {
                let properties = self.enhance_filters(&name, &properties).await;
                Condition::Tag { name, properties }
            }
            other => other,
        }
    }
}
