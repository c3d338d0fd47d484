//! Typed property filters.
//!
//! A property filter narrows a tag match by one of the tag's typed
//! properties, e.g. `priority >= 8`. The operator set is closed and each
//! operator and property type has a fixed numeric code on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// Scalar kind of a typed property.
///
/// The discriminants are the backend's type codes and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PropTypeRepr", into = "u8")]
pub enum PropType {
    Json = 0,
    Text = 1,
    BlockRefs = 2,
    Number = 3,
    Boolean = 4,
    DateTime = 5,
    TextChoices = 6,
}

impl PropType {
    /// Backend type code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a type by its backend code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PropType::Json),
            1 => Some(PropType::Text),
            2 => Some(PropType::BlockRefs),
            3 => Some(PropType::Number),
            4 => Some(PropType::Boolean),
            5 => Some(PropType::DateTime),
            6 => Some(PropType::TextChoices),
            _ => None,
        }
    }

    /// Human-readable type name.
    pub fn name(&self) -> &'static str {
        match self {
            PropType::Json => "json",
            PropType::Text => "text",
            PropType::BlockRefs => "block-refs",
            PropType::Number => "number",
            PropType::Boolean => "boolean",
            PropType::DateTime => "datetime",
            PropType::TextChoices => "text-choices",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(PropType::Json),
            "text" => Some(PropType::Text),
            "block-refs" | "blockrefs" => Some(PropType::BlockRefs),
            "number" => Some(PropType::Number),
            "boolean" | "bool" => Some(PropType::Boolean),
            "datetime" | "date" => Some(PropType::DateTime),
            "text-choices" | "textchoices" | "choices" => Some(PropType::TextChoices),
            _ => None,
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<PropType> for u8 {
    fn from(value: PropType) -> Self {
        value.code()
    }
}

/// Accepts either the numeric code or the type name when deserializing.
#[derive(Deserialize)]
#[serde(untagged)]
enum PropTypeRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<PropTypeRepr> for PropType {
    type Error = String;

    fn try_from(repr: PropTypeRepr) -> Result<Self, Self::Error> {
        match repr {
            PropTypeRepr::Code(code) => {
                PropType::from_code(code).ok_or_else(|| format!("unknown property type code {code}"))
            }
            PropTypeRepr::Name(name) => {
                PropType::from_name(&name).ok_or_else(|| format!("unknown property type '{name}'"))
            }
        }
    }
}

/// Comparison operator of a property filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
    Ne,
    IsNull,
    NotNull,
    Includes,
    NotIncludes,
}

impl Operator {
    /// Every supported operator.
    pub const ALL: [Operator; 10] = [
        Operator::Gte,
        Operator::Gt,
        Operator::Lte,
        Operator::Lt,
        Operator::Eq,
        Operator::Ne,
        Operator::IsNull,
        Operator::NotNull,
        Operator::Includes,
        Operator::NotIncludes,
    ];

    /// Backend operator code. Codes 5 and 6 are reserved.
    pub fn code(&self) -> u8 {
        match self {
            Operator::Eq => 1,
            Operator::Ne => 2,
            Operator::Includes => 3,
            Operator::NotIncludes => 4,
            Operator::Gt => 7,
            Operator::Lt => 8,
            Operator::Gte => 9,
            Operator::Lte => 10,
            Operator::IsNull => 11,
            Operator::NotNull => 12,
        }
    }

    /// Token as written by users.
    pub fn as_token(&self) -> &'static str {
        match self {
            Operator::Gte => ">=",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Lt => "<",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::IsNull => "is null",
            Operator::NotNull => "not null",
            Operator::Includes => "includes",
            Operator::NotIncludes => "not includes",
        }
    }

    /// Null checks carry no value on the wire.
    pub fn is_null_check(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::NotNull)
    }

    /// Ordering operators imply numeric comparison.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte
        )
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let normalized = token
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        match normalized.as_str() {
            ">=" => Ok(Operator::Gte),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Lte),
            "<" => Ok(Operator::Lt),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "is null" => Ok(Operator::IsNull),
            "not null" => Ok(Operator::NotNull),
            "includes" => Ok(Operator::Includes),
            "not includes" => Ok(Operator::NotIncludes),
            _ => Err(QueryError::UnsupportedOperator(token.to_string())),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = QueryError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_token().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// One typed property predicate on a tag match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// Property name
    pub name: String,

    /// Comparison operator
    pub op: Operator,

    /// Comparison value, absent for null checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Declared property type, if known
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub prop_type: Option<PropType>,

    /// Type-specific arguments passed through to the backend
    #[serde(rename = "typeArgs", default, skip_serializing_if = "Option::is_none")]
    pub type_args: Option<Value>,
}

impl PropertyFilter {
    /// Create an untyped filter.
    pub fn new(name: impl Into<String>, op: Operator, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            op,
            value,
            prop_type: None,
            type_args: None,
        }
    }

    /// Set the property type.
    pub fn with_type(mut self, prop_type: PropType) -> Self {
        self.prop_type = Some(prop_type);
        self
    }

    /// Set the type arguments.
    pub fn with_type_args(mut self, type_args: Value) -> Self {
        self.type_args = Some(type_args);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_codes_are_distinct() {
        let mut codes: Vec<u8> = Operator::ALL.iter().map(|op| op.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Operator::ALL.len());
        assert!(!codes.contains(&5));
        assert!(!codes.contains(&6));
    }

    #[test]
    fn test_operator_token_roundtrip() {
        for op in Operator::ALL {
            assert_eq!(op.as_token().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_operator_parse_normalizes_whitespace_and_case() {
        assert_eq!(" Is  NULL ".parse::<Operator>().unwrap(), Operator::IsNull);
        assert_eq!("NOT includes".parse::<Operator>().unwrap(), Operator::NotIncludes);
    }

    #[test]
    fn test_operator_rejects_unknown_token() {
        for token in ["=", "~=", "contains", "", "<>"] {
            let err = token.parse::<Operator>().unwrap_err();
            assert!(matches!(err, QueryError::UnsupportedOperator(t) if t == token));
        }
    }

    #[test]
    fn test_prop_type_codes() {
        assert_eq!(PropType::Json.code(), 0);
        assert_eq!(PropType::Number.code(), 3);
        assert_eq!(PropType::TextChoices.code(), 6);
        assert_eq!(PropType::from_code(5), Some(PropType::DateTime));
        assert_eq!(PropType::from_code(7), None);
    }

    #[test]
    fn test_filter_deserializes_code_or_name() {
        let by_code: PropertyFilter =
            serde_json::from_value(json!({"name": "priority", "op": ">=", "value": "8", "type": 3}))
                .unwrap();
        let by_name: PropertyFilter = serde_json::from_value(
            json!({"name": "priority", "op": ">=", "value": "8", "type": "number"}),
        )
        .unwrap();
        assert_eq!(by_code, by_name);
        assert_eq!(by_code.prop_type, Some(PropType::Number));
    }

    #[test]
    fn test_filter_with_bad_operator_fails_to_deserialize() {
        let result: Result<PropertyFilter, _> =
            serde_json::from_value(json!({"name": "priority", "op": "=>", "value": 1}));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Unsupported operator"));
    }
}
