//! Operator and value converters.
//!
//! Coercion is best-effort: a value that cannot be coerced into the
//! property's scalar type is returned unchanged so the backend can reject
//! it with a precise error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

use notequery_types::{Operator, PropType, QueryError};

/// Map an operator token to its backend code.
pub fn map_operator(token: &str) -> Result<u8, QueryError> {
    token.parse::<Operator>().map(|op| op.code())
}

/// Coerce a raw filter value into the scalar type `prop_type` expects.
pub fn convert_value(value: Value, prop_type: PropType) -> Value {
    let converted = match prop_type {
        PropType::Number => to_number(&value),
        PropType::Boolean => to_boolean(&value),
        PropType::DateTime => to_timestamp(&value),
        PropType::Json | PropType::Text | PropType::BlockRefs | PropType::TextChoices => None,
    };
    converted.unwrap_or(value)
}

/// Coerce an untyped value based on the operator alone: ordering operators
/// get numeric coercion, everything else passes through.
pub fn try_convert_value_from_operator(value: Value, op: Operator) -> Value {
    if op.is_ordering() {
        to_number(&value).unwrap_or(value)
    } else {
        value
    }
}

/// Numeric value of a number or numeric string. Integers stay integers.
pub fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(int) = s.parse::<i64>() {
        return Some(Value::from(int));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn to_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(Value::Bool(true)),
            "false" | "0" | "no" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn to_timestamp(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => parse_timestamp(s.trim()).map(Value::from),
        _ => None,
    }
}

/// Epoch milliseconds from a numeric string, RFC 3339, or a naive UTC
/// date / datetime.
fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_operator_table() {
        let table = [
            ("==", 1),
            ("!=", 2),
            ("includes", 3),
            ("not includes", 4),
            (">", 7),
            ("<", 8),
            (">=", 9),
            ("<=", 10),
            ("is null", 11),
            ("not null", 12),
        ];
        for (token, code) in table {
            assert_eq!(map_operator(token).unwrap(), code, "token {}", token);
        }
    }

    #[test]
    fn test_map_operator_unsupported() {
        assert!(matches!(
            map_operator("like"),
            Err(QueryError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn test_convert_number() {
        assert_eq!(convert_value(json!("8"), PropType::Number), json!(8));
        assert_eq!(convert_value(json!(" -2.5 "), PropType::Number), json!(-2.5));
        assert_eq!(convert_value(json!(3), PropType::Number), json!(3));
        assert_eq!(convert_value(json!("high"), PropType::Number), json!("high"));
        assert_eq!(convert_value(json!(""), PropType::Number), json!(""));
        assert_eq!(convert_value(json!("NaN"), PropType::Number), json!("NaN"));
    }

    #[test]
    fn test_convert_boolean() {
        for truthy in ["true", "1", "YES", " yes "] {
            assert_eq!(convert_value(json!(truthy), PropType::Boolean), json!(true));
        }
        for falsy in ["false", "0", "No"] {
            assert_eq!(convert_value(json!(falsy), PropType::Boolean), json!(false));
        }
        assert_eq!(convert_value(json!(1), PropType::Boolean), json!(true));
        assert_eq!(convert_value(json!("maybe"), PropType::Boolean), json!("maybe"));
    }

    #[test]
    fn test_convert_datetime() {
        assert_eq!(
            convert_value(json!("2024-01-15"), PropType::DateTime),
            json!(1_705_276_800_000_i64)
        );
        assert_eq!(
            convert_value(json!("2024-01-15T00:00:00Z"), PropType::DateTime),
            json!(1_705_276_800_000_i64)
        );
        assert_eq!(
            convert_value(json!("2024-01-15 00:00:00"), PropType::DateTime),
            json!(1_705_276_800_000_i64)
        );
        assert_eq!(
            convert_value(json!("1705276800000"), PropType::DateTime),
            json!(1_705_276_800_000_i64)
        );
        assert_eq!(
            convert_value(json!("last week"), PropType::DateTime),
            json!("last week")
        );
    }

    #[test]
    fn test_convert_passthrough_types() {
        assert_eq!(convert_value(json!("8"), PropType::Text), json!("8"));
        assert_eq!(convert_value(json!("8"), PropType::TextChoices), json!("8"));
        assert_eq!(convert_value(json!({"a": 1}), PropType::Json), json!({"a": 1}));
    }

    #[test]
    fn test_operator_based_conversion() {
        assert_eq!(
            try_convert_value_from_operator(json!("5"), Operator::Gt),
            json!(5)
        );
        assert_eq!(
            try_convert_value_from_operator(json!("5"), Operator::Lte),
            json!(5)
        );
        assert_eq!(
            try_convert_value_from_operator(json!("5"), Operator::Eq),
            json!("5")
        );
        assert_eq!(
            try_convert_value_from_operator(json!("5"), Operator::Includes),
            json!("5")
        );
        assert_eq!(
            try_convert_value_from_operator(json!("soon"), Operator::Gt),
            json!("soon")
        );
    }
}
