//! HTTP client for the note-database backend.
//!
//! Every backend call is a `POST {base_url}/api/invoke` with body
//! `{"method": <name>, "args": [...]}`. Transient failures (connection
//! errors, 429, 5xx) are retried with exponential backoff; rejections are
//! returned at once so the executor's shape cascade can react to them.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use notequery_compiler::QueryDescription;
use notequery_executor::QueryBackend;
use notequery_schema::SchemaSource;
use notequery_types::{Block, BlockId, BlockTree, QueryError, Settings};

use crate::error::ClientError;

/// Backend method names.
pub mod methods {
    pub const QUERY: &str = "query";
    pub const SEARCH_TEXT: &str = "search-blocks-by-text";
    pub const RESOLVE_ALIAS: &str = "get-blockid-by-alias";
    pub const GET_BLOCK: &str = "get-block";
    pub const GET_BLOCK_TREE: &str = "get-block-tree";
}

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://127.0.0.1:18088")
    pub base_url: String,

    /// Bearer token, if the backend requires one
    pub api_token: Option<SecretString>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// First backoff delay between retries
    pub retry_initial_interval: Duration,
}

impl BackendConfig {
    /// Config with defaults for everything but the URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_interval: Duration::from_millis(200),
        }
    }

    /// Config taken from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.backend_url.clone(),
            api_token: settings.api_token.clone().map(SecretString::from),
            timeout: settings.request_timeout(),
            max_retries: settings.max_retries,
            ..Self::new(settings.backend_url.clone())
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_retries(mut self, max_retries: u32, initial_interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_initial_interval = initial_interval;
        self
    }
}

/// HTTP client implementing both backend interfaces.
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
    endpoint: String,
}

impl BackendClient {
    /// Create a new client.
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let base = config.base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "backend URL must be http(s): {}",
                config.base_url
            )));
        }
        let endpoint = format!("{}/api/invoke", base);

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Create a client from application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        Self::new(BackendConfig::from_settings(settings))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call a backend method, retrying transient failures.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let body = json!({ "method": method, "args": args });
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.retry_initial_interval,
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(method = %method, attempt = attempts, "Invoking backend");

            match self.invoke_once(&body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    if attempts > self.config.max_retries {
                        error!(method = %method, error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                method = %method,
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Backend call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(method = %method, error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn invoke_once(&self, body: &Value) -> Result<Value, ClientError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            );
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "Backend returned a non-JSON body, treating as empty");
                Value::Null
            }));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Rejected {
                    status: status.as_u16(),
                    body,
                }
            }
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
            s if s.is_server_error() => ClientError::Server {
                status: s.as_u16(),
                body,
            },
            s => ClientError::Http {
                status: s.as_u16(),
                body,
            },
        })
    }
}

/// Block id from a bare number or an `{id}` record.
fn parse_block_id(value: &Value) -> Option<BlockId> {
    match value {
        Value::Number(n) => n.as_i64().map(BlockId),
        Value::Object(record) => record.get("id").and_then(Value::as_i64).map(BlockId),
        _ => None,
    }
}

#[async_trait]
impl QueryBackend for BackendClient {
    async fn query(&self, query: &QueryDescription) -> Result<Value, QueryError> {
        Ok(self.invoke(methods::QUERY, vec![query.to_value()]).await?)
    }

    async fn search_text(&self, text: &str) -> Result<Value, QueryError> {
        Ok(self.invoke(methods::SEARCH_TEXT, vec![json!(text)]).await?)
    }

    async fn get_block_tree(&self, id: BlockId) -> Result<Option<BlockTree>, QueryError> {
        match self.invoke(methods::GET_BLOCK_TREE, vec![json!(id)]).await? {
            Value::Null => Ok(None),
            value => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| QueryError::MalformedResponse(format!("block tree {}: {}", id, e))),
        }
    }
}

#[async_trait]
impl SchemaSource for BackendClient {
    async fn resolve_tag_id(&self, name: &str) -> Result<Option<BlockId>, QueryError> {
        match self.invoke(methods::RESOLVE_ALIAS, vec![json!(name)]).await? {
            Value::Null => Ok(None),
            value => parse_block_id(&value).map(Some).ok_or_else(|| {
                QueryError::MalformedResponse(format!("unexpected id for alias {}: {}", name, value))
            }),
        }
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<Block>, QueryError> {
        match self.invoke(methods::GET_BLOCK, vec![json!(id)]).await? {
            Value::Null => Ok(None),
            value => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| QueryError::MalformedResponse(format!("block {}: {}", id, e))),
        }
    }
}
