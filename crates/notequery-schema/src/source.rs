//! Backend schema lookup.
//!
//! A tag is itself a block. Its `properties` are the property definitions
//! the tag contributes, and a `TextChoices` definition carries the authored
//! choice list in `typeArgs.choices`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use notequery_types::{
    Block, BlockId, BlockProperty, ChoiceOption, PropType, PropertySchema, QueryError, TagSchema,
};

/// Read access to the backend calls schema resolution needs.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Backend identity of the tag named `name`, if it exists.
    async fn resolve_tag_id(&self, name: &str) -> Result<Option<BlockId>, QueryError>;

    /// Fetch a block by id.
    async fn get_block(&self, id: BlockId) -> Result<Option<Block>, QueryError>;
}

/// Fetch the property definitions of `tag_name` from `source`.
///
/// Fails with `TagNotFound` if the tag has no backend identity or its
/// block has disappeared. Definitions with an unknown type code are skipped.
pub async fn get_tag_schema<S>(source: &S, tag_name: &str) -> Result<TagSchema, QueryError>
where
    S: SchemaSource + ?Sized,
{
    let name = tag_name.trim().trim_start_matches('#');

    let id = source
        .resolve_tag_id(name)
        .await?
        .ok_or_else(|| QueryError::TagNotFound(name.to_string()))?;

    let block = source
        .get_block(id)
        .await?
        .ok_or_else(|| QueryError::TagNotFound(name.to_string()))?;

    let properties: Vec<PropertySchema> = block
        .properties
        .iter()
        .filter_map(|definition| property_schema(name, definition))
        .collect();

    debug!(tag = %name, id = %id, properties = properties.len(), "Fetched tag schema");

    Ok(TagSchema {
        tag_name: name.to_string(),
        properties,
    })
}

fn property_schema(tag: &str, definition: &BlockProperty) -> Option<PropertySchema> {
    let Some(prop_type) = definition.prop_type() else {
        warn!(
            tag = %tag,
            property = %definition.name,
            code = ?definition.type_code,
            "Skipping property with unknown type"
        );
        return None;
    };

    let options = match prop_type {
        PropType::TextChoices => Some(choice_options(definition.type_args.as_ref())),
        _ => None,
    };

    Some(PropertySchema {
        name: definition.name.clone(),
        prop_type,
        type_name: prop_type.name().to_string(),
        options,
    })
}

/// Expand an authored choice list. Entries are bare labels or
/// `{label, color?}` records; an option's value is its list position, so
/// unreadable entries still consume an index.
fn choice_options(type_args: Option<&Value>) -> Vec<ChoiceOption> {
    let Some(choices) = type_args
        .and_then(|args| args.get("choices"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    choices
        .iter()
        .enumerate()
        .filter_map(|(index, choice)| match choice {
            Value::String(label) => Some(ChoiceOption {
                label: label.clone(),
                value: index,
                color: None,
            }),
            Value::Object(record) => {
                let label = record.get("label").and_then(Value::as_str)?;
                Some(ChoiceOption {
                    label: label.to_string(),
                    value: index,
                    color: record
                        .get("color")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            }
            _ => None,
        })
        .collect()
}

/// In-memory schema source for tests.
#[derive(Default)]
pub struct MockSchemaSource {
    /// Tag ids by lowercase name
    pub tags: HashMap<String, BlockId>,
    /// Blocks by id
    pub blocks: HashMap<BlockId, Block>,
    /// Fail every call with a transport error
    pub fail: bool,
    fetches: AtomicUsize,
}

impl MockSchemaSource {
    /// Register a tag with its property definitions.
    pub fn with_tag(mut self, name: &str, id: i64, definitions: Vec<BlockProperty>) -> Self {
        let id = BlockId(id);
        self.tags.insert(name.to_lowercase(), id);
        self.blocks.insert(
            id,
            Block {
                id,
                text: Some(name.to_string()),
                properties: definitions,
                ..Default::default()
            },
        );
        self
    }

    /// Make every call fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Number of tag-id resolutions served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for MockSchemaSource {
    async fn resolve_tag_id(&self, name: &str) -> Result<Option<BlockId>, QueryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(QueryError::Transport("schema source unavailable".to_string()));
        }
        Ok(self.tags.get(&name.to_lowercase()).copied())
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<Block>, QueryError> {
        if self.fail {
            return Err(QueryError::Transport("schema source unavailable".to_string()));
        }
        Ok(self.blocks.get(&id).cloned())
    }
}

/// Property definition as a tag block stores it.
pub fn definition(name: &str, prop_type: PropType, type_args: Option<Value>) -> BlockProperty {
    BlockProperty {
        name: name.to_string(),
        type_code: Some(prop_type.code()),
        value: None,
        type_args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_source() -> MockSchemaSource {
        MockSchemaSource::default().with_tag(
            "Task",
            42,
            vec![
                definition("priority", PropType::Number, None),
                definition(
                    "status",
                    PropType::TextChoices,
                    Some(json!({"choices": [
                        "todo",
                        {"label": "in-progress", "color": "#ffaa00"},
                        "canceled"
                    ]})),
                ),
                BlockProperty {
                    name: "mystery".to_string(),
                    type_code: Some(42),
                    value: None,
                    type_args: None,
                },
            ],
        )
    }

    #[tokio::test]
    async fn test_get_tag_schema() {
        let source = task_source();
        let schema = get_tag_schema(&source, "#task").await.unwrap();

        assert_eq!(schema.tag_name, "task");
        assert_eq!(schema.properties.len(), 2);

        let priority = schema.property("priority").unwrap();
        assert_eq!(priority.prop_type, PropType::Number);
        assert_eq!(priority.type_name, "number");
        assert!(priority.options.is_none());

        let status = schema.property("status").unwrap();
        let options = status.options.as_ref().unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[1].label, "in-progress");
        assert_eq!(options[1].value, 1);
        assert_eq!(options[1].color.as_deref(), Some("#ffaa00"));
        assert_eq!(options[2].value, 2);
    }

    #[tokio::test]
    async fn test_unknown_tag_is_not_found() {
        let source = task_source();
        let err = get_tag_schema(&source, "project").await.unwrap_err();
        assert!(matches!(err, QueryError::TagNotFound(name) if name == "project"));
    }

    #[tokio::test]
    async fn test_missing_tag_block_is_not_found() {
        let mut source = task_source();
        source.blocks.clear();
        let err = get_tag_schema(&source, "task").await.unwrap_err();
        assert!(matches!(err, QueryError::TagNotFound(_)));
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let err = get_tag_schema(&MockSchemaSource::failing(), "task")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)));
    }

    #[test]
    fn test_unreadable_choice_keeps_positions() {
        let options = choice_options(Some(&json!({"choices": ["a", 7, {"label": "c"}]})));
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].label, "c");
        assert_eq!(options[1].value, 2);
    }

    #[test]
    fn test_choices_missing() {
        assert!(choice_options(None).is_empty());
        assert!(choice_options(Some(&json!({"choices": "todo"}))).is_empty());
    }
}
