//! Sort specification normalization.
//!
//! Callers may describe a sort key as a bare field name, a
//! `{field, direction}` record, or a `[field, direction]` pair. Entries
//! that cannot be understood are dropped; if nothing survives, no sort is
//! sent and the backend applies its own default.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[default]
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    /// Parse a user-supplied direction.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// A sort key as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    /// Field name, descending
    Field(String),

    /// `[field, direction]`
    Pair(String, String),

    /// `{field, direction?}`
    Record {
        field: String,
        #[serde(default)]
        direction: Option<String>,
    },

    /// Anything else; always dropped
    Other(Value),
}

impl SortSpec {
    /// Sort by `field` in the given direction.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        let direction = match direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        SortSpec::Pair(field.into(), direction.to_string())
    }
}

/// `field` or `field:direction`.
impl FromStr for SortSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.split_once(':') {
            Some((field, direction)) => SortSpec::Pair(field.to_string(), direction.to_string()),
            None => SortSpec::Field(s.to_string()),
        })
    }
}

/// A normalized sort key, serialized as `[field, "ASC"|"DESC"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortEntry(pub String, pub SortDirection);

/// Normalize caller sort specs, silently dropping invalid entries.
pub fn normalize_sort(specs: &[SortSpec]) -> Vec<SortEntry> {
    specs.iter().filter_map(normalize_one).collect()
}

fn normalize_one(spec: &SortSpec) -> Option<SortEntry> {
    let (field, direction) = match spec {
        SortSpec::Field(field) => (field.as_str(), None),
        SortSpec::Pair(field, direction) => (field.as_str(), Some(direction.as_str())),
        SortSpec::Record { field, direction } => (field.as_str(), direction.as_deref()),
        SortSpec::Other(_) => return None,
    };

    let field = field.trim();
    if field.is_empty() {
        return None;
    }

    let direction = match direction {
        None => SortDirection::default(),
        Some(d) if d.trim().is_empty() => SortDirection::default(),
        Some(d) => SortDirection::parse(d)?,
    };

    Some(SortEntry(field.to_string(), direction))
}
