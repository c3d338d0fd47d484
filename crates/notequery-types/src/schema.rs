//! Tag schema types.
//!
//! A tag schema lists the typed properties a tag defines. For
//! `TextChoices` properties each option's `value` is its position in the
//! authored choice list; relabeling an option keeps its identity but
//! reordering the list changes it.

use serde::{Deserialize, Serialize};

use crate::filter::PropType;

/// One option of an enumerated-choice property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,

    /// Index in the authored choice list
    pub value: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Definition of one typed property on a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,

    #[serde(rename = "type")]
    pub prop_type: PropType,

    #[serde(rename = "typeName")]
    pub type_name: String,

    /// Present only for `TextChoices` properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
}

impl PropertySchema {
    /// Find the option at a positional index.
    pub fn option_at(&self, index: usize) -> Option<&ChoiceOption> {
        self.options
            .as_ref()
            .and_then(|opts| opts.iter().find(|o| o.value == index))
    }

    /// Find an option by label, ignoring case.
    pub fn option_by_label(&self, label: &str) -> Option<&ChoiceOption> {
        self.options
            .as_ref()
            .and_then(|opts| opts.iter().find(|o| o.label.eq_ignore_ascii_case(label)))
    }
}

/// Property definitions of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSchema {
    #[serde(rename = "tagName")]
    pub tag_name: String,

    pub properties: Vec<PropertySchema>,
}

impl TagSchema {
    /// Look up a property by name, ignoring case.
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        let needle = name.trim();
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(needle))
    }
}
