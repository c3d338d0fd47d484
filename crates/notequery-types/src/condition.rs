//! Condition algebra.
//!
//! A `Condition` is one atomic search predicate. Conditions are combined
//! into a group under a `CombineMode` by the query compiler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::date::DateSpec;
use crate::error::QueryError;
use crate::filter::PropertyFilter;

/// One atomic search predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Blocks carrying a named tag, optionally narrowed by typed properties
    Tag {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        properties: Vec<PropertyFilter>,
    },

    /// Free-text match
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<bool>,
    },

    /// Task-state predicate; `None` matches any task
    Task {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed: Option<bool>,
    },

    /// Journal blocks dated within `start..=end`
    Journal { start: DateSpec, end: DateSpec },

    /// Blocks linking to a specific block
    Reference {
        #[serde(rename = "blockId")]
        block_id: BlockId,
    },

    /// Topology predicate; unset fields are not constrained
    Structural {
        #[serde(rename = "hasTags", default, skip_serializing_if = "Option::is_none")]
        has_tags: Option<bool>,
        #[serde(rename = "hasParent", default, skip_serializing_if = "Option::is_none")]
        has_parent: Option<bool>,
        #[serde(rename = "hasChild", default, skip_serializing_if = "Option::is_none")]
        has_child: Option<bool>,
        #[serde(rename = "hasAliases", default, skip_serializing_if = "Option::is_none")]
        has_aliases: Option<bool>,
    },

    /// Exact block identity
    BlockMatch {
        #[serde(rename = "blockId")]
        block_id: BlockId,
    },
}

impl Condition {
    /// Tag condition without property filters.
    pub fn tag(name: impl Into<String>) -> Self {
        Condition::Tag {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Tag condition with property filters.
    pub fn tag_with(name: impl Into<String>, properties: Vec<PropertyFilter>) -> Self {
        Condition::Tag {
            name: name.into(),
            properties,
        }
    }

    /// Free-text condition.
    pub fn text(text: impl Into<String>) -> Self {
        Condition::Text {
            text: text.into(),
            raw: None,
        }
    }

    /// Task condition.
    pub fn task(completed: Option<bool>) -> Self {
        Condition::Task { completed }
    }

    /// Journal date-range condition.
    pub fn journal(start: DateSpec, end: DateSpec) -> Self {
        Condition::Journal { start, end }
    }

    /// Variant name, as logged by the compiler.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Condition::Tag { .. } => "tag",
            Condition::Text { .. } => "text",
            Condition::Task { .. } => "task",
            Condition::Journal { .. } => "journal",
            Condition::Reference { .. } => "reference",
            Condition::Structural { .. } => "structural",
            Condition::BlockMatch { .. } => "block_match",
        }
    }
}

/// How sibling conditions in a group are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Every condition holds on the same block
    #[default]
    And,

    /// Any condition holds
    Or,

    /// Conditions hold somewhere along one ancestor/descendant chain
    ChainAnd,
}

impl CombineMode {
    /// Returns the display name for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            CombineMode::And => "and",
            CombineMode::Or => "or",
            CombineMode::ChainAnd => "chain_and",
        }
    }
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombineMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "and" => Ok(CombineMode::And),
            "or" => Ok(CombineMode::Or),
            "chain_and" | "chain" => Ok(CombineMode::ChainAnd),
            other => Err(QueryError::InvalidQuery(format!(
                "unknown combine mode '{}'",
                other
            ))),
        }
    }
}

/// Inclusive journal date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateSpec,
    pub end: DateSpec,
}

/// Parameters of a task search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Restrict to completed (`true`) or open (`false`) tasks
    #[serde(default)]
    pub completed: Option<bool>,

    /// Restrict to tasks found under journal entries dated in this range
    #[serde(default, rename = "dateRange")]
    pub date_range: Option<DateRange>,
}
