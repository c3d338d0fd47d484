//! Search pipeline.
//!
//! Every search runs the same steps: enhance property filters against the
//! tag schema, compile, execute with fallback, normalize. Calls share no
//! state other than the schema cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use notequery_compiler::{
    compile_advanced_query, compile_journal_query, compile_tag_query, compile_task_query,
    QueryDescription, QueryOptions, WireShape,
};
use notequery_executor::{FallbackChain, QueryBackend, ResilientExecutor, ResultNormalizer};
use notequery_schema::{SchemaResolver, SchemaSource};
use notequery_types::{
    BlockId, CombineMode, Condition, DateSpec, PropertyFilter, QueryError, ResultOptions,
    SearchResult, Settings, TagSchema, TaskQuery,
};

/// Results of one search.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,

    /// Wire shape the backend accepted; `None` for text search
    pub shape_used: Option<WireShape>,

    /// Whether an older wire shape was needed
    pub fallback_occurred: bool,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// Search entry point over a query backend and a schema source.
pub struct SearchService<B: QueryBackend + 'static, S: SchemaSource + 'static> {
    executor: ResilientExecutor<B>,
    normalizer: ResultNormalizer<B>,
    schemas: SchemaResolver<S>,
}

impl<B, S> SearchService<B, S>
where
    B: QueryBackend + 'static,
    S: SchemaSource + 'static,
{
    /// Create a service with default result options and schema TTL.
    pub fn new(backend: Arc<B>, schema_source: Arc<S>) -> Self {
        Self {
            executor: ResilientExecutor::new(backend.clone()),
            normalizer: ResultNormalizer::new(backend, ResultOptions::default()),
            schemas: SchemaResolver::new(schema_source),
        }
    }

    /// Create a service configured from `settings`.
    pub fn from_settings(backend: Arc<B>, schema_source: Arc<S>, settings: &Settings) -> Self {
        Self::new(backend, schema_source)
            .with_result_options(settings.results.clone())
            .with_schema_ttl(settings.schema_cache_ttl())
    }

    pub fn with_result_options(mut self, options: ResultOptions) -> Self {
        self.normalizer = ResultNormalizer::new(self.executor.backend().clone(), options);
        self
    }

    pub fn with_schema_ttl(mut self, ttl: Duration) -> Self {
        self.schemas = self.schemas.with_ttl(ttl);
        self
    }

    pub fn with_fallback_chain(mut self, chain: FallbackChain) -> Self {
        self.executor = self.executor.with_chain(chain);
        self
    }

    /// Blocks tagged `tag_name`, narrowed by `filters`.
    pub async fn search_by_tag(
        &self,
        tag_name: &str,
        filters: &[PropertyFilter],
        options: &QueryOptions,
    ) -> Result<SearchResponse, QueryError> {
        let filters = self.schemas.enhance_filters(tag_name, filters).await;
        let query = compile_tag_query(tag_name, &filters, options);
        self.run(&query).await
    }

    /// Any combination of conditions. Tag conditions with property filters
    /// are enhanced first.
    pub async fn search_advanced(
        &self,
        conditions: Vec<Condition>,
        mode: CombineMode,
        options: &QueryOptions,
    ) -> Result<SearchResponse, QueryError> {
        let mut enhanced = Vec::with_capacity(conditions.len());
        for condition in conditions {
            enhanced.push(self.schemas.enhance_condition(condition).await);
        }

        let query = compile_advanced_query(&enhanced, mode, options)?;
        self.run(&query).await
    }

    /// Tasks, optionally within journal entries dated in a range.
    pub async fn search_tasks(
        &self,
        task: &TaskQuery,
        options: &QueryOptions,
    ) -> Result<SearchResponse, QueryError> {
        self.run(&compile_task_query(task, options)).await
    }

    /// Journal blocks dated within `start..=end`.
    pub async fn search_journal(
        &self,
        start: DateSpec,
        end: DateSpec,
        options: &QueryOptions,
    ) -> Result<SearchResponse, QueryError> {
        self.run(&compile_journal_query(start, end, options)).await
    }

    /// Blocks that link to `block_id`.
    pub async fn search_references(
        &self,
        block_id: BlockId,
        options: &QueryOptions,
    ) -> Result<SearchResponse, QueryError> {
        let query =
            compile_advanced_query(&[Condition::Reference { block_id }], CombineMode::And, options)?;
        self.run(&query).await
    }

    /// Full-text search; alias matches come before content matches.
    pub async fn search_text(&self, text: &str) -> Result<SearchResponse, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::InvalidQuery(
                "text search needs a non-empty query".to_string(),
            ));
        }

        let blocks = self.executor.search_text(text).await?;
        debug!(text = %text, blocks = blocks.len(), "Text search returned");

        Ok(SearchResponse {
            results: self.normalizer.normalize(blocks).await,
            shape_used: None,
            fallback_occurred: false,
        })
    }

    /// Cached schema of `tag_name`.
    pub async fn tag_schema(&self, tag_name: &str) -> Result<TagSchema, QueryError> {
        self.schemas.get_cached_tag_schema(tag_name).await
    }

    /// Drop every cached schema.
    pub fn clear_schema_cache(&self) {
        self.schemas.clear();
    }

    /// Drop the cached schema of one tag.
    pub fn invalidate_schema(&self, tag_name: &str) -> bool {
        self.schemas.invalidate(tag_name)
    }

    async fn run(&self, query: &QueryDescription) -> Result<SearchResponse, QueryError> {
        let execution = self.executor.execute_with_fallback(query).await?;
        info!(
            blocks = execution.count(),
            shape = execution.shape_used.as_str(),
            time_ms = execution.total_time_ms,
            "Query executed"
        );

        Ok(SearchResponse {
            results: self.normalizer.normalize(execution.blocks).await,
            shape_used: Some(execution.shape_used),
            fallback_occurred: execution.fallback_occurred,
        })
    }
}

impl<C> SearchService<C, C>
where
    C: QueryBackend + SchemaSource + 'static,
{
    /// Service over a single backend serving both queries and schemas.
    pub fn with_backend(backend: Arc<C>) -> Self {
        Self::new(backend.clone(), backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notequery_executor::MockBackend;
    use notequery_schema::{definition, MockSchemaSource};
    use notequery_types::{DateRange, Operator, PropType, TimeUnit};
    use serde_json::json;

    fn schema_source() -> Arc<MockSchemaSource> {
        Arc::new(MockSchemaSource::default().with_tag(
            "task",
            7,
            vec![
                definition("Priority", PropType::Number, None),
                definition(
                    "status",
                    PropType::TextChoices,
                    Some(json!({"choices": ["todo", "in-progress", "canceled"]})),
                ),
            ],
        ))
    }

    fn service(
        backend: MockBackend,
    ) -> (
        SearchService<MockBackend, MockSchemaSource>,
        Arc<MockBackend>,
        Arc<MockSchemaSource>,
    ) {
        let backend = Arc::new(backend);
        let schemas = schema_source();
        let service = SearchService::new(backend.clone(), schemas.clone())
            .with_result_options(ResultOptions::without_full_content());
        (service, backend, schemas)
    }

    #[tokio::test]
    async fn test_tag_search_enhances_and_compiles() {
        let (service, backend, _) = service(MockBackend::default().with_response(
            WireShape::Current,
            json!([{"id": 1, "text": "Ship release"}]),
        ));
        let filters = vec![
            PropertyFilter::new("priority", Operator::Gte, Some(json!("8"))),
            PropertyFilter::new("Status", Operator::Eq, Some(json!(2))),
        ];

        let response = service
            .search_by_tag("task", &filters, &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.len(), 1);
        assert_eq!(response.results[0].title, "Ship release");
        assert_eq!(response.shape_used, Some(WireShape::Current));

        let sent = &backend.requests()[0];
        let properties = &sent["q"]["conditions"][0]["properties"];
        assert_eq!(
            properties[0],
            json!({"name": "Priority", "type": 3, "op": 9, "value": 8})
        );
        assert_eq!(
            properties[1],
            json!({"name": "status", "type": 6, "op": 3, "value": "canceled"})
        );
    }

    #[tokio::test]
    async fn test_tag_search_with_unknown_tag_uses_original_filters() {
        let (service, backend, _) = service(MockBackend::default());
        let filters = vec![PropertyFilter::new("size", Operator::Gt, Some(json!("3")))];

        let response = service
            .search_by_tag("project", &filters, &QueryOptions::default())
            .await
            .unwrap();

        assert!(response.is_empty());
        let clause = &backend.requests()[0]["q"]["conditions"][0]["properties"][0];
        assert_eq!(clause, &json!({"name": "size", "op": 7, "value": 3}));
    }

    #[tokio::test]
    async fn test_schema_fetched_once_across_searches() {
        let (service, _, schemas) = service(MockBackend::default());
        let filters = vec![PropertyFilter::new("priority", Operator::Gt, Some(json!(1)))];

        for tag in ["task", "Task", " TASK "] {
            service
                .search_by_tag(tag, &filters, &QueryOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(schemas.fetch_count(), 1);

        service.clear_schema_cache();
        service.tag_schema("task").await.unwrap();
        assert_eq!(schemas.fetch_count(), 2);
        assert!(service.invalidate_schema("task"));
    }

    #[tokio::test]
    async fn test_advanced_search_enhances_tag_conditions() {
        let (service, backend, _) = service(MockBackend::default());
        let conditions = vec![
            Condition::tag_with(
                "task",
                vec![PropertyFilter::new("status", Operator::Eq, Some(json!("TODO")))],
            ),
            Condition::text("launch"),
        ];

        service
            .search_advanced(conditions, CombineMode::Or, &QueryOptions::default())
            .await
            .unwrap();

        let sent = &backend.requests()[0];
        assert_eq!(sent["q"]["kind"], 101);
        assert_eq!(sent["q"]["conditions"][0]["properties"][0]["value"], "todo");
        assert_eq!(sent["q"]["conditions"][0]["properties"][0]["op"], 3);
        assert_eq!(sent["q"]["conditions"][1], json!({"kind": 8, "text": "launch"}));
    }

    #[tokio::test]
    async fn test_advanced_search_rejects_empty() {
        let (service, backend, _) = service(MockBackend::default());
        let err = service
            .search_advanced(vec![], CombineMode::And, &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_task_search() {
        let (service, backend, _) = service(MockBackend::default());
        let task = TaskQuery {
            completed: Some(false),
            date_range: Some(DateRange {
                start: DateSpec::relative(-7, TimeUnit::Day),
                end: DateSpec::today(),
            }),
        };

        service
            .search_tasks(&task, &QueryOptions::default())
            .await
            .unwrap();

        let sent = &backend.requests()[0];
        assert_eq!(sent["q"]["conditions"][1]["kind"], 106);
    }

    #[tokio::test]
    async fn test_reference_and_journal_search() {
        let (service, backend, _) = service(MockBackend::default());

        service
            .search_references(BlockId(12), &QueryOptions::default())
            .await
            .unwrap();
        service
            .search_journal(
                DateSpec::relative(-1, TimeUnit::Week),
                DateSpec::today(),
                &QueryOptions::default(),
            )
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(
            requests[0]["q"]["conditions"][0],
            json!({"kind": 6, "blockId": 12})
        );
        assert_eq!(requests[1]["q"]["conditions"][0]["kind"], 3);
    }

    #[tokio::test]
    async fn test_fallback_reported() {
        let (service, _, _) = service(
            MockBackend::default()
                .with_rejection(WireShape::Current)
                .with_response(WireShape::LegacySingle, json!([{"id": 3}])),
        );

        let response = service
            .search_by_tag("task", &[], &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.shape_used, Some(WireShape::LegacySingle));
        assert!(response.fallback_occurred);
    }

    #[tokio::test]
    async fn test_text_search() {
        let (service, _, _) = service(MockBackend::default().with_text_response(json!([
            [{"id": 1, "aliases": ["Launch"]}],
            [{"id": 2, "text": "launch checklist"}]
        ])));

        let response = service.search_text("launch").await.unwrap();

        let titles: Vec<&str> = response.results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Launch", "launch checklist"]);
        assert_eq!(response.shape_used, None);

        assert!(matches!(
            service.search_text("  ").await,
            Err(QueryError::InvalidQuery(_))
        ));
    }
}
