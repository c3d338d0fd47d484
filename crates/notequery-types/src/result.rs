//! Search result types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::BlockId;

/// Marker line appended to a rendered subtree that was cut short.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// A uniform search hit, rebuilt for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: BlockId,

    pub title: String,

    pub content: String,

    /// Indented rendering of the block's subtree, bounded in size
    #[serde(rename = "fullContent", default, skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,

    /// Merged properties: own, then outgoing links, then incoming links
    #[serde(rename = "propertyValues", default, skip_serializing_if = "Option::is_none")]
    pub property_values: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl SearchResult {
    /// Whether the rendered subtree was cut short.
    pub fn is_truncated(&self) -> bool {
        self.full_content
            .as_deref()
            .map(|c| c.ends_with(TRUNCATION_MARKER))
            .unwrap_or(false)
    }
}

/// Controls how raw blocks are projected into results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOptions {
    /// Fetch and render each hit's subtree
    #[serde(default = "default_include_full_content")]
    pub include_full_content: bool,

    /// Maximum number of nodes rendered per subtree
    #[serde(default = "default_tree_max_blocks")]
    pub tree_max_blocks: usize,

    /// Maximum depth rendered below the hit itself
    #[serde(default = "default_tree_max_depth")]
    pub tree_max_depth: usize,

    /// Cap on the number of results returned
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_include_full_content() -> bool {
    true
}

fn default_tree_max_blocks() -> usize {
    50
}

fn default_tree_max_depth() -> usize {
    5
}

impl Default for ResultOptions {
    fn default() -> Self {
        Self {
            include_full_content: default_include_full_content(),
            tree_max_blocks: default_tree_max_blocks(),
            tree_max_depth: default_tree_max_depth(),
            max_results: None,
        }
    }
}

impl ResultOptions {
    /// Options that skip subtree fetches entirely.
    pub fn without_full_content() -> Self {
        Self {
            include_full_content: false,
            ..Default::default()
        }
    }

    /// Limit the number of results.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}
