//! Query compilers.
//!
//! Each compiler is a direct structural translation from conditions to the
//! wire tree. The condition-to-item mapping is one exhaustive `match`, so a
//! new condition variant does not compile until it has a wire form.

use serde::{Deserialize, Serialize};
use tracing::debug;

use notequery_types::{
    BlockId, CombineMode, Condition, DateSpec, PropertyFilter, QueryError, TaskQuery,
};

use crate::convert::{convert_value, try_convert_value_from_operator};
use crate::sort::{normalize_sort, SortSpec};
use crate::wire::{GroupKind, PropertyClause, QueryDescription, QueryItem, TagItem, WireDate};

/// Sorting, pagination and exclusion shared by every compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub sort: Vec<SortSpec>,

    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default, rename = "pageSize")]
    pub page_size: Option<u32>,

    /// Block to leave out of the results (typically the caller's own block)
    #[serde(default, rename = "excludeId")]
    pub exclude_id: Option<BlockId>,
}

impl QueryOptions {
    /// Add a sort key.
    pub fn with_sort(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    /// Request one page of results.
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    /// Exclude a block from the results.
    pub fn excluding(mut self, id: BlockId) -> Self {
        self.exclude_id = Some(id);
        self
    }
}

/// Compile one property filter into its wire clause.
pub fn compile_property_clause(filter: &PropertyFilter) -> PropertyClause {
    let value = if filter.op.is_null_check() {
        None
    } else {
        filter.value.clone().map(|value| match filter.prop_type {
            Some(prop_type) => convert_value(value, prop_type),
            None => try_convert_value_from_operator(value, filter.op),
        })
    };

    PropertyClause {
        name: filter.name.clone(),
        prop_type: filter.prop_type.map(|t| t.code()),
        type_args: filter.type_args.clone(),
        op: filter.op.code(),
        value,
    }
}

/// Compile one condition into its wire item.
pub fn compile_condition(condition: &Condition) -> QueryItem {
    match condition {
        Condition::Tag { name, properties } => QueryItem::Tag(TagItem {
            name: normalize_tag_name(name),
            properties: properties.iter().map(compile_property_clause).collect(),
        }),
        Condition::Text { text, raw } => QueryItem::Text {
            text: text.clone(),
            raw: *raw,
        },
        Condition::Task { completed } => QueryItem::Task {
            completed: *completed,
        },
        Condition::Journal { start, end } => QueryItem::Journal {
            start: WireDate::from(*start),
            end: WireDate::from(*end),
        },
        Condition::Reference { block_id } => QueryItem::Reference {
            block_id: *block_id,
        },
        Condition::Structural {
            has_tags,
            has_parent,
            has_child,
            has_aliases,
        } => QueryItem::Structural {
            has_tags: *has_tags,
            has_parent: *has_parent,
            has_child: *has_child,
            has_aliases: *has_aliases,
        },
        Condition::BlockMatch { block_id } => QueryItem::BlockMatch {
            block_id: *block_id,
        },
    }
}

/// Blocks tagged `tag_name`, narrowed by `filters`.
pub fn compile_tag_query(
    tag_name: &str,
    filters: &[PropertyFilter],
    options: &QueryOptions,
) -> QueryDescription {
    let tag = Condition::Tag {
        name: tag_name.to_string(),
        properties: filters.to_vec(),
    };
    debug!(tag = %tag_name, filters = filters.len(), "Compiling tag query");
    describe(
        QueryItem::group(GroupKind::And, vec![compile_condition(&tag)]),
        options,
    )
}

/// Any combination of conditions under one combine mode.
pub fn compile_advanced_query(
    conditions: &[Condition],
    mode: CombineMode,
    options: &QueryOptions,
) -> Result<QueryDescription, QueryError> {
    if conditions.is_empty() {
        return Err(QueryError::InvalidQuery(
            "advanced query needs at least one condition".to_string(),
        ));
    }

    let kinds: Vec<&str> = conditions.iter().map(Condition::kind_name).collect();
    debug!(
        mode = %mode,
        conditions = ?kinds,
        "Compiling advanced query"
    );

    let items = conditions.iter().map(compile_condition).collect();
    Ok(describe(QueryItem::group(mode.into(), items), options))
}

/// Tasks, optionally restricted to journal entries dated within a range.
///
/// The range is a separate chain-AND group: the task block and the dated
/// journal block are different blocks on the same ancestor chain, which a
/// flat AND cannot express.
pub fn compile_task_query(task: &TaskQuery, options: &QueryOptions) -> QueryDescription {
    let mut items = vec![compile_condition(&Condition::Task {
        completed: task.completed,
    })];

    if let Some(range) = task.date_range {
        items.push(QueryItem::group(
            GroupKind::ChainAnd,
            vec![compile_condition(&Condition::Journal {
                start: range.start,
                end: range.end,
            })],
        ));
    }

    describe(QueryItem::group(GroupKind::And, items), options)
}

/// Journal blocks dated within `start..=end`.
pub fn compile_journal_query(
    start: DateSpec,
    end: DateSpec,
    options: &QueryOptions,
) -> QueryDescription {
    describe(
        QueryItem::group(
            GroupKind::And,
            vec![compile_condition(&Condition::Journal { start, end })],
        ),
        options,
    )
}

fn describe(q: QueryItem, options: &QueryOptions) -> QueryDescription {
    QueryDescription {
        q,
        sort: normalize_sort(&options.sort),
        page: options.page,
        page_size: options.page_size,
        exclude_id: options.exclude_id,
    }
}

/// Tag names are matched without a leading `#` and surrounding whitespace.
fn normalize_tag_name(name: &str) -> String {
    let trimmed = name.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed).to_string()
}
