//! Time-expiring tag schema cache.
//!
//! Entries are keyed by tag name with surrounding whitespace, a leading `#`
//! and case removed. An entry is replaced whole on refresh, never patched.
//! Concurrent misses on the same key each fetch and the last write wins.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use notequery_types::TagSchema;

/// Default entry lifetime: 30 minutes.
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    schema: TagSchema,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

/// Process-scoped schema cache owned by a resolver.
#[derive(Debug)]
pub struct SchemaCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_TTL)
    }
}

impl SchemaCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Normalized cache key for a tag name.
    pub fn key(tag_name: &str) -> String {
        tag_name.trim().trim_start_matches('#').to_lowercase()
    }

    /// Unexpired schema for `tag_name`.
    pub fn get(&self, tag_name: &str) -> Option<TagSchema> {
        let key = Self::key(tag_name);
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(&key)?;
        if entry.expires_at.map_or(true, |at| Instant::now() < at) {
            debug!(tag = %key, "Schema cache hit");
            Some(entry.schema.clone())
        } else {
            debug!(tag = %key, "Schema cache entry expired");
            None
        }
    }

    /// Store `schema` under `tag_name` with a fresh expiry.
    pub fn insert(&self, tag_name: &str, schema: TagSchema) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                Self::key(tag_name),
                CacheEntry {
                    schema,
                    expires_at: Instant::now().checked_add(self.ttl),
                },
            );
        }
    }

    /// Drop the entry for `tag_name`. Returns whether one existed.
    pub fn invalidate(&self, tag_name: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(&Self::key(tag_name)).is_some())
            .unwrap_or(false)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
