//! Backend block model.
//!
//! These are the shapes the note-database backend returns for query hits,
//! tag definitions and subtrees. Every field except `id` is optional on the
//! wire; missing and `null` collections both decode as empty.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::filter::PropType;

/// Link-record type code of a tag reference.
pub const TAG_REF_TYPE: u8 = 2;

/// Backend block identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub i64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for BlockId {
    fn from(value: i64) -> Self {
        BlockId(value)
    }
}

/// A typed property value (or, on a tag block, a property definition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProperty {
    pub name: String,

    /// Raw backend type code
    #[serde(rename = "type", default)]
    pub type_code: Option<u8>,

    #[serde(default)]
    pub value: Option<Value>,

    #[serde(rename = "typeArgs", default)]
    pub type_args: Option<Value>,
}

impl BlockProperty {
    /// Decoded property type, if the code is known.
    pub fn prop_type(&self) -> Option<PropType> {
        self.type_code.and_then(PropType::from_code)
    }
}

/// A link record between two blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    #[serde(default)]
    pub id: Option<BlockId>,

    #[serde(default)]
    pub from: Option<BlockId>,

    #[serde(default)]
    pub to: Option<BlockId>,

    #[serde(rename = "type", default)]
    pub ref_type: u8,

    #[serde(default)]
    pub alias: Option<String>,

    /// Properties attached to the link itself
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<BlockProperty>,
}

impl BlockRef {
    /// Whether this link applies a tag.
    pub fn is_tag(&self) -> bool {
        self.ref_type == TAG_REF_TYPE
    }
}

/// A block as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub aliases: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<BlockProperty>,

    /// Outgoing link records
    #[serde(default, deserialize_with = "null_as_default")]
    pub refs: Vec<BlockRef>,

    /// Incoming link records
    #[serde(default, deserialize_with = "null_as_default")]
    pub back_refs: Vec<BlockRef>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<BlockId>,

    #[serde(default)]
    pub parent: Option<BlockId>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub modified: Option<DateTime<Utc>>,
}

impl Block {
    /// Names of the tags applied to this block, in link order.
    pub fn tag_names(&self) -> Vec<String> {
        self.refs
            .iter()
            .filter(|r| r.is_tag())
            .filter_map(|r| r.alias.clone())
            .collect()
    }
}

/// A block with its nested children, as returned by a subtree fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockTree {
    pub id: BlockId,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<BlockTree>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps arrive as epoch milliseconds or RFC 3339 strings depending on
/// the backend version; anything else decodes as `None`.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}
