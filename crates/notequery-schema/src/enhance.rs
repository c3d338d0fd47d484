//! Property-filter enhancement.
//!
//! Rewrites user-written filters to match a tag schema: exact property-name
//! casing, the schema's property type, and for `TextChoices` properties the
//! set-membership operator and the exact option label.

use serde_json::{Number, Value};

use notequery_types::{Operator, PropType, PropertyFilter, PropertySchema, TagSchema};

/// Enhance every filter against `schema`. Filters naming an unknown
/// property pass through unchanged.
pub fn enhance_filters(schema: &TagSchema, filters: &[PropertyFilter]) -> Vec<PropertyFilter> {
    filters.iter().map(|f| enhance_filter(schema, f)).collect()
}

/// Enhance a single filter against `schema`.
pub fn enhance_filter(schema: &TagSchema, filter: &PropertyFilter) -> PropertyFilter {
    let Some(property) = schema.property(&filter.name) else {
        return filter.clone();
    };

    let mut enhanced = filter.clone();
    enhanced.name = property.name.clone();
    enhanced.prop_type = Some(property.prop_type);

    if property.prop_type == PropType::TextChoices {
        // Choice values are stored as a set.
        if enhanced.op == Operator::Eq {
            enhanced.op = Operator::Includes;
        }
        enhanced.value = enhanced.value.map(|value| resolve_choice(property, value));
    }

    enhanced
}

/// Map a choice value to its exact option label: numbers are positional
/// indexes, strings are labels matched without case. Unmatched values are
/// returned unchanged.
fn resolve_choice(property: &PropertySchema, value: Value) -> Value {
    let label = match &value {
        Value::Number(n) => choice_index(n)
            .and_then(|index| property.option_at(index))
            .map(|option| option.label.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<usize>()
                .ok()
                .and_then(|index| property.option_at(index))
                .or_else(|| property.option_by_label(s))
                .map(|option| option.label.clone())
        }
        Value::Array(items) => {
            return Value::Array(
                items
                    .iter()
                    .cloned()
                    .map(|item| resolve_choice(property, item))
                    .collect(),
            );
        }
        _ => None,
    };

    label.map(Value::String).unwrap_or(value)
}

/// Positional index from an integer or a whole, non-negative float.
fn choice_index(n: &Number) -> Option<usize> {
    if let Some(index) = n.as_u64() {
        return usize::try_from(index).ok();
    }
    n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= usize::MAX as f64)
        .map(|f| f as usize)
}
