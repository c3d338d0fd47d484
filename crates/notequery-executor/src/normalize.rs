//! Result normalization.
//!
//! Projects raw backend blocks into `SearchResult`s: title and content from
//! the block itself, merged property values, tag names, and optionally a
//! bounded rendering of the block's subtree.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use notequery_types::{Block, BlockId, BlockTree, ResultOptions, SearchResult, TRUNCATION_MARKER};

use crate::backend::QueryBackend;

/// Render a subtree as indented bullet lines, visiting children before
/// siblings.
///
/// At most `max_blocks` nodes are rendered and nothing deeper than
/// `max_depth` levels below the root. If either bound cuts the walk short,
/// `TRUNCATION_MARKER` is appended as a final line.
pub fn render_tree(tree: &BlockTree, max_blocks: usize, max_depth: usize) -> String {
    let mut renderer = TreeRenderer {
        lines: Vec::new(),
        rendered: 0,
        max_blocks,
        max_depth,
        truncated: false,
    };
    renderer.visit(tree, 0);

    if renderer.truncated {
        renderer.lines.push(TRUNCATION_MARKER.to_string());
    }
    renderer.lines.join("\n")
}

struct TreeRenderer {
    lines: Vec<String>,
    rendered: usize,
    max_blocks: usize,
    max_depth: usize,
    truncated: bool,
}

impl TreeRenderer {
    fn visit(&mut self, node: &BlockTree, depth: usize) {
        if self.rendered >= self.max_blocks {
            self.truncated = true;
            return;
        }

        self.render_node(node, depth);
        self.rendered += 1;

        if node.children.is_empty() {
            return;
        }
        if depth >= self.max_depth {
            self.truncated = true;
            return;
        }

        for child in &node.children {
            self.visit(child, depth + 1);
            if self.rendered >= self.max_blocks && self.truncated {
                break;
            }
        }
    }

    fn render_node(&mut self, node: &BlockTree, depth: usize) {
        let indent = "  ".repeat(depth);
        let text = node.text.as_deref().unwrap_or("").trim_end();
        let mut lines = text.lines();

        self.lines
            .push(format!("{}- {}", indent, lines.next().unwrap_or("")).trim_end().to_string());
        for continuation in lines {
            self.lines.push(format!("{}  {}", indent, continuation));
        }
    }
}

/// Merge a block's property values: its own properties first, then those
/// on outgoing link records, then those on incoming link records. The
/// first valued occurrence of a name wins.
pub fn project_properties(block: &Block) -> BTreeMap<String, Value> {
    let own = block.properties.iter();
    let outgoing = block.refs.iter().flat_map(|r| r.data.iter());
    let incoming = block.back_refs.iter().flat_map(|r| r.data.iter());

    let mut values = BTreeMap::new();
    for property in own.chain(outgoing).chain(incoming) {
        match &property.value {
            None | Some(Value::Null) => continue,
            Some(value) => {
                values
                    .entry(property.name.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }
    values
}

/// Display title: first alias, else first non-empty line of text.
pub fn block_title(block: &Block) -> String {
    if let Some(alias) = block.aliases.iter().find(|a| !a.trim().is_empty()) {
        return alias.clone();
    }

    block
        .text
        .as_deref()
        .and_then(|text| text.lines().map(str::trim).find(|line| !line.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Block {}", block.id))
}

/// Project one block into a result.
pub fn to_search_result(block: Block, full_content: Option<String>) -> SearchResult {
    let property_values = project_properties(&block);
    let tags = block.tag_names();

    SearchResult {
        id: block.id,
        title: block_title(&block),
        content: block.text.clone().unwrap_or_default(),
        full_content,
        property_values: (!property_values.is_empty()).then_some(property_values),
        created: block.created,
        modified: block.modified,
        tags: (!tags.is_empty()).then_some(tags),
    }
}

/// Normalizes result blocks, fetching subtrees from the backend.
pub struct ResultNormalizer<B: QueryBackend + 'static> {
    backend: Arc<B>,
    options: ResultOptions,
}

impl<B: QueryBackend + 'static> ResultNormalizer<B> {
    pub fn new(backend: Arc<B>, options: ResultOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &ResultOptions {
        &self.options
    }

    /// Project `blocks` into results, in order.
    ///
    /// Subtree fetches run concurrently. A failed fetch leaves that
    /// result without `full_content` and does not affect the others.
    pub async fn normalize(&self, mut blocks: Vec<Block>) -> Vec<SearchResult> {
        if let Some(max) = self.options.max_results {
            blocks.truncate(max);
        }

        let full_contents: Vec<Option<String>> = if self.options.include_full_content {
            join_all(blocks.iter().map(|block| self.full_content(block.id))).await
        } else {
            vec![None; blocks.len()]
        };

        debug!(results = blocks.len(), "Normalized results");

        blocks
            .into_iter()
            .zip(full_contents)
            .map(|(block, full_content)| to_search_result(block, full_content))
            .collect()
    }

    async fn full_content(&self, id: BlockId) -> Option<String> {
        match self.backend.get_block_tree(id).await {
            Ok(Some(tree)) => Some(render_tree(
                &tree,
                self.options.tree_max_blocks,
                self.options.tree_max_depth,
            )),
            Ok(None) => None,
            Err(e) => {
                warn!(block = %id, error = %e, "Subtree fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use notequery_types::{BlockProperty, BlockRef, TAG_REF_TYPE};
    use serde_json::json;

    fn node(id: i64, text: &str, children: Vec<BlockTree>) -> BlockTree {
        BlockTree {
            id: BlockId(id),
            text: Some(text.to_string()),
            children,
        }
    }

    fn property(name: &str, value: Value) -> BlockProperty {
        BlockProperty {
            name: name.to_string(),
            type_code: None,
            value: Some(value),
            type_args: None,
        }
    }

    fn link(ref_type: u8, alias: Option<&str>, data: Vec<BlockProperty>) -> BlockRef {
        BlockRef {
            id: None,
            from: None,
            to: None,
            ref_type,
            alias: alias.map(str::to_string),
            data,
        }
    }

    #[test]
    fn test_render_depth_first() {
        let tree = node(
            1,
            "root",
            vec![
                node(2, "a", vec![node(3, "a1", vec![])]),
                node(4, "b", vec![]),
            ],
        );

        assert_eq!(render_tree(&tree, 50, 5), "- root\n  - a\n    - a1\n  - b");
    }

    #[test]
    fn test_render_block_budget_flags_truncation() {
        let children = (0..10).map(|i| node(i + 2, &format!("c{}", i), vec![])).collect();
        let tree = node(1, "root", children);

        let rendered = render_tree(&tree, 3, 5);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines, vec!["- root", "  - c0", "  - c1", TRUNCATION_MARKER]);
    }

    #[test]
    fn test_render_exact_budget_not_truncated() {
        let tree = node(1, "root", vec![node(2, "a", vec![])]);
        assert_eq!(render_tree(&tree, 2, 5), "- root\n  - a");
    }

    #[test]
    fn test_render_depth_ceiling_flags_truncation() {
        let tree = node(1, "root", vec![node(2, "a", vec![node(3, "deep", vec![])])]);

        let rendered = render_tree(&tree, 50, 1);

        assert!(!rendered.contains("deep"));
        assert!(rendered.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_render_multiline_text() {
        let tree = node(1, "first\nsecond", vec![]);
        assert_eq!(render_tree(&tree, 5, 5), "- first\n  second");
    }

    #[test]
    fn test_projection_first_occurrence_wins() {
        let block = Block {
            id: BlockId(1),
            properties: vec![property("priority", json!(8))],
            refs: vec![link(
                TAG_REF_TYPE,
                Some("task"),
                vec![
                    property("priority", json!(1)),
                    property("status", json!("todo")),
                ],
            )],
            back_refs: vec![link(
                1,
                None,
                vec![
                    property("status", json!("done")),
                    property("owner", json!("ana")),
                ],
            )],
            ..Default::default()
        };

        let values = project_properties(&block);

        assert_eq!(values["priority"], json!(8));
        assert_eq!(values["status"], json!("todo"));
        assert_eq!(values["owner"], json!("ana"));
    }

    #[test]
    fn test_projection_skips_valueless() {
        let block = Block {
            id: BlockId(1),
            properties: vec![BlockProperty {
                name: "status".to_string(),
                type_code: Some(6),
                value: None,
                type_args: None,
            }],
            refs: vec![link(TAG_REF_TYPE, None, vec![property("status", json!("todo"))])],
            ..Default::default()
        };

        assert_eq!(project_properties(&block)["status"], json!("todo"));
    }

    #[test]
    fn test_title_prefers_alias() {
        let mut block = Block {
            id: BlockId(7),
            text: Some("\n  Plan launch  \nmore".to_string()),
            ..Default::default()
        };
        assert_eq!(block_title(&block), "Plan launch");

        block.aliases = vec!["Launch".to_string()];
        assert_eq!(block_title(&block), "Launch");

        block.aliases.clear();
        block.text = None;
        assert_eq!(block_title(&block), "Block 7");
    }

    #[test]
    fn test_search_result_fields() {
        let block = Block {
            id: BlockId(5),
            text: Some("Ship it".to_string()),
            refs: vec![link(TAG_REF_TYPE, Some("task"), vec![])],
            ..Default::default()
        };

        let result = to_search_result(block, None);

        assert_eq!(result.title, "Ship it");
        assert_eq!(result.content, "Ship it");
        assert_eq!(result.tags, Some(vec!["task".to_string()]));
        assert!(result.property_values.is_none());
        assert!(result.full_content.is_none());
    }

    #[tokio::test]
    async fn test_tree_fetch_failure_isolated() {
        let backend = Arc::new(
            MockBackend::default()
                .with_tree(node(1, "one", vec![node(10, "child", vec![])]))
                .with_tree_failure(BlockId(2))
                .with_tree(node(3, "three", vec![])),
        );
        let normalizer = ResultNormalizer::new(backend.clone(), ResultOptions::default());
        let blocks = (1..=3)
            .map(|id| Block {
                id: BlockId(id),
                ..Default::default()
            })
            .collect();

        let results = normalizer.normalize(blocks).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].full_content.as_deref(), Some("- one\n  - child"));
        assert!(results[1].full_content.is_none());
        assert_eq!(results[2].full_content.as_deref(), Some("- three"));
        assert_eq!(backend.tree_fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_without_full_content_skips_fetch() {
        let backend = Arc::new(MockBackend::default().with_tree(node(1, "one", vec![])));
        let normalizer =
            ResultNormalizer::new(backend.clone(), ResultOptions::without_full_content());

        let results = normalizer
            .normalize(vec![Block {
                id: BlockId(1),
                ..Default::default()
            }])
            .await;

        assert!(results[0].full_content.is_none());
        assert_eq!(backend.tree_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_max_results_truncates_before_fetch() {
        let backend = Arc::new(MockBackend::default());
        let normalizer = ResultNormalizer::new(
            backend.clone(),
            ResultOptions::default().with_max_results(2),
        );
        let blocks = (1..=5)
            .map(|id| Block {
                id: BlockId(id),
                ..Default::default()
            })
            .collect();

        let results = normalizer.normalize(blocks).await;

        assert_eq!(results.len(), 2);
        assert_eq!(backend.tree_fetch_count(), 2);
    }
}
