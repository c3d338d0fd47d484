//! Backend query-tree wire format.
//!
//! A compiled query is a `QueryDescription` whose `q` is a tree of
//! `QueryItem`s. Groups and condition items are distinguished only by their
//! numeric `kind`, so `QueryItem` serializes by hand.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use notequery_types::{BlockId, CombineMode, DateSpec};

use crate::sort::SortEntry;

/// Item kind codes.
pub mod kind {
    pub const LEGACY_AND: u16 = 1;
    pub const JOURNAL: u16 = 3;
    pub const TAG: u16 = 4;
    pub const REFERENCE: u16 = 6;
    pub const TEXT: u16 = 8;
    pub const STRUCTURAL: u16 = 9;
    pub const TASK: u16 = 11;
    pub const BLOCK_MATCH: u16 = 12;
    pub const AND: u16 = 100;
    pub const OR: u16 = 101;
    pub const CHAIN_AND: u16 = 106;
}

/// Kind of a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    And,
    Or,
    ChainAnd,
    /// Single-condition wrapper understood by older backends
    LegacyAnd,
}

impl GroupKind {
    pub fn code(&self) -> u16 {
        match self {
            GroupKind::And => kind::AND,
            GroupKind::Or => kind::OR,
            GroupKind::ChainAnd => kind::CHAIN_AND,
            GroupKind::LegacyAnd => kind::LEGACY_AND,
        }
    }
}

impl From<CombineMode> for GroupKind {
    fn from(mode: CombineMode) -> Self {
        match mode {
            CombineMode::And => GroupKind::And,
            CombineMode::Or => GroupKind::Or,
            CombineMode::ChainAnd => GroupKind::ChainAnd,
        }
    }
}

/// A compiled property predicate inside a tag item.
///
/// `value` is absent (not `null`) for null checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyClause {
    pub name: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub prop_type: Option<u8>,

    #[serde(rename = "typeArgs", skip_serializing_if = "Option::is_none")]
    pub type_args: Option<Value>,

    pub op: u8,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A compiled tag condition.
#[derive(Debug, Clone, PartialEq)]
pub struct TagItem {
    pub name: String,
    pub properties: Vec<PropertyClause>,
}

/// Date on the wire: `{t: 1, v, u}` relative or `{t: 2, v}` absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireDate {
    pub t: u8,
    pub v: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<&'static str>,
}

impl From<DateSpec> for WireDate {
    fn from(spec: DateSpec) -> Self {
        match spec {
            DateSpec::Relative { value, unit } => WireDate {
                t: 1,
                v: value,
                u: Some(unit.symbol()),
            },
            DateSpec::Absolute { value } => WireDate {
                t: 2,
                v: value,
                u: None,
            },
        }
    }
}

/// A node of the query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem {
    Group {
        kind: GroupKind,
        conditions: Vec<QueryItem>,
    },
    Tag(TagItem),
    Text {
        text: String,
        raw: Option<bool>,
    },
    Task {
        completed: Option<bool>,
    },
    Journal {
        start: WireDate,
        end: WireDate,
    },
    Reference {
        block_id: BlockId,
    },
    Structural {
        has_tags: Option<bool>,
        has_parent: Option<bool>,
        has_child: Option<bool>,
        has_aliases: Option<bool>,
    },
    BlockMatch {
        block_id: BlockId,
    },
}

impl QueryItem {
    /// Group of the given kind.
    pub fn group(kind: GroupKind, conditions: Vec<QueryItem>) -> Self {
        QueryItem::Group { kind, conditions }
    }

    /// Numeric `kind` written on the wire.
    pub fn kind_code(&self) -> u16 {
        match self {
            QueryItem::Group { kind, .. } => kind.code(),
            QueryItem::Tag(_) => kind::TAG,
            QueryItem::Text { .. } => kind::TEXT,
            QueryItem::Task { .. } => kind::TASK,
            QueryItem::Journal { .. } => kind::JOURNAL,
            QueryItem::Reference { .. } => kind::REFERENCE,
            QueryItem::Structural { .. } => kind::STRUCTURAL,
            QueryItem::BlockMatch { .. } => kind::BLOCK_MATCH,
        }
    }

    /// The sole tag item of a single-condition group, if that is what this is.
    pub fn single_tag(&self) -> Option<&TagItem> {
        match self {
            QueryItem::Group { conditions, .. } if conditions.len() == 1 => match &conditions[0] {
                QueryItem::Tag(tag) => Some(tag),
                _ => None,
            },
            QueryItem::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl Serialize for QueryItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", &self.kind_code())?;

        match self {
            QueryItem::Group { conditions, .. } => {
                map.serialize_entry("conditions", conditions)?;
            }
            QueryItem::Tag(tag) => {
                map.serialize_entry("name", &tag.name)?;
                if !tag.properties.is_empty() {
                    map.serialize_entry("properties", &tag.properties)?;
                }
            }
            QueryItem::Text { text, raw } => {
                map.serialize_entry("text", text)?;
                if let Some(raw) = raw {
                    map.serialize_entry("raw", raw)?;
                }
            }
            QueryItem::Task { completed } => {
                if let Some(completed) = completed {
                    map.serialize_entry("completed", completed)?;
                }
            }
            QueryItem::Journal { start, end } => {
                map.serialize_entry("start", start)?;
                map.serialize_entry("end", end)?;
            }
            QueryItem::Reference { block_id } | QueryItem::BlockMatch { block_id } => {
                map.serialize_entry("blockId", block_id)?;
            }
            QueryItem::Structural {
                has_tags,
                has_parent,
                has_child,
                has_aliases,
            } => {
                let flags = [
                    ("hasTags", has_tags),
                    ("hasParent", has_parent),
                    ("hasChild", has_child),
                    ("hasAliases", has_aliases),
                ];
                for (key, flag) in flags {
                    if let Some(flag) = flag {
                        map.serialize_entry(key, flag)?;
                    }
                }
            }
        }

        map.end()
    }
}

/// Structural envelope used to submit a query. Newer backends accept
/// `Current`; older ones need one of the legacy envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireShape {
    /// Query as compiled
    Current,
    /// Tag item wrapped in a `kind=1` group
    LegacySingle,
    /// Tag item as the root, no group
    DirectTag,
}

impl WireShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireShape::Current => "current",
            WireShape::LegacySingle => "legacy_single",
            WireShape::DirectTag => "direct_tag",
        }
    }
}

/// A complete compiled query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescription {
    pub q: QueryItem,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    #[serde(rename = "pageSize", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(rename = "excludeId", skip_serializing_if = "Option::is_none")]
    pub exclude_id: Option<BlockId>,
}

impl QueryDescription {
    /// Re-envelope this query for `shape`, reusing the same property
    /// clauses. Legacy shapes exist only for single-tag queries; `None`
    /// means the shape does not apply.
    pub fn reshape(&self, shape: WireShape) -> Option<QueryDescription> {
        let q = match shape {
            WireShape::Current => self.q.clone(),
            WireShape::LegacySingle => QueryItem::group(
                GroupKind::LegacyAnd,
                vec![QueryItem::Tag(self.q.single_tag()?.clone())],
            ),
            WireShape::DirectTag => QueryItem::Tag(self.q.single_tag()?.clone()),
        };

        Some(QueryDescription {
            q,
            sort: self.sort.clone(),
            page: self.page,
            page_size: self.page_size,
            exclude_id: self.exclude_id,
        })
    }

    /// JSON value of this query.
    pub fn to_value(&self) -> Value {
        // Serializing these types cannot fail: all map keys are strings.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortDirection;
    use notequery_types::TimeUnit;
    use serde_json::json;

    fn tag_query() -> QueryDescription {
        QueryDescription {
            q: QueryItem::group(
                GroupKind::And,
                vec![QueryItem::Tag(TagItem {
                    name: "task".to_string(),
                    properties: vec![PropertyClause {
                        name: "priority".to_string(),
                        prop_type: Some(3),
                        type_args: None,
                        op: 9,
                        value: Some(json!(8)),
                    }],
                })],
            ),
            sort: vec![SortEntry("modified".to_string(), SortDirection::Desc)],
            page: Some(1),
            page_size: Some(20),
            exclude_id: None,
        }
    }

    #[test]
    fn test_serialize_current_shape() {
        assert_eq!(
            tag_query().to_value(),
            json!({
                "q": {
                    "kind": 100,
                    "conditions": [{
                        "kind": 4,
                        "name": "task",
                        "properties": [{"name": "priority", "type": 3, "op": 9, "value": 8}]
                    }]
                },
                "sort": [["modified", "DESC"]],
                "page": 1,
                "pageSize": 20
            })
        );
    }

    #[test]
    fn test_legacy_shapes_reuse_clauses() {
        let query = tag_query();
        let clause = json!([{"name": "priority", "type": 3, "op": 9, "value": 8}]);

        let legacy = query.reshape(WireShape::LegacySingle).unwrap().to_value();
        assert_eq!(legacy["q"]["kind"], 1);
        assert_eq!(legacy["q"]["conditions"][0]["kind"], 4);
        assert_eq!(legacy["q"]["conditions"][0]["properties"], clause);
        assert_eq!(legacy["sort"], json!([["modified", "DESC"]]));

        let direct = query.reshape(WireShape::DirectTag).unwrap().to_value();
        assert_eq!(direct["q"]["kind"], 4);
        assert_eq!(direct["q"]["name"], "task");
        assert_eq!(direct["q"]["properties"], clause);
        assert!(direct["q"].get("conditions").is_none());
    }

    #[test]
    fn test_legacy_shapes_need_single_tag() {
        let query = QueryDescription {
            q: QueryItem::group(
                GroupKind::Or,
                vec![
                    QueryItem::Task { completed: None },
                    QueryItem::Text {
                        text: "x".to_string(),
                        raw: None,
                    },
                ],
            ),
            sort: vec![],
            page: None,
            page_size: None,
            exclude_id: None,
        };
        assert!(query.reshape(WireShape::Current).is_some());
        assert!(query.reshape(WireShape::LegacySingle).is_none());
        assert!(query.reshape(WireShape::DirectTag).is_none());
    }

    #[test]
    fn test_wire_dates() {
        let relative = WireDate::from(DateSpec::relative(-7, TimeUnit::Day));
        assert_eq!(
            serde_json::to_value(relative).unwrap(),
            json!({"t": 1, "v": -7, "u": "d"})
        );
        let absolute = WireDate::from(DateSpec::absolute(1_700_000_000_000));
        assert_eq!(
            serde_json::to_value(absolute).unwrap(),
            json!({"t": 2, "v": 1_700_000_000_000_i64})
        );
    }

    #[test]
    fn test_structural_omits_unset_flags() {
        let item = QueryItem::Structural {
            has_tags: Some(true),
            has_parent: None,
            has_child: Some(false),
            has_aliases: None,
        };
        assert_eq!(
            serde_json::to_value(item).unwrap(),
            json!({"kind": 9, "hasTags": true, "hasChild": false})
        );
    }
}
