//! Command implementations for the notequery CLI.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use notequery_client::BackendClient;
use notequery_compiler::QueryOptions;
use notequery_search::{SearchResponse, SearchService};
use notequery_types::{
    BlockId, CombineMode, Condition, DateRange, DateSpec, SearchResult, Settings, TagSchema,
    TaskQuery,
};

use crate::cli::{Cli, Commands};

/// Contents of a file passed to `notequery advanced`.
#[derive(Debug, Deserialize)]
pub struct AdvancedRequest {
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub mode: Option<CombineMode>,

    #[serde(flatten)]
    pub options: QueryOptions,
}

impl AdvancedRequest {
    /// Read a request from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid query file {}", path.display()))
    }
}

/// Load settings and apply CLI overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if let Some(url) = &cli.backend_url {
        settings.backend_url = url.clone();
    }
    if cli.no_content {
        settings.results.include_full_content = false;
    }
    if let Some(limit) = cli.limit {
        settings.results.max_results = Some(limit);
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;

    if let Commands::Config = cli.command {
        let rendered =
            toml::to_string_pretty(&settings).context("Failed to render configuration")?;
        print!("{}", rendered);
        return Ok(());
    }

    let client = Arc::new(
        BackendClient::from_settings(&settings).context("Failed to create backend client")?,
    );
    info!(endpoint = %client.endpoint(), "Using backend");
    let service = SearchService::from_settings(client.clone(), client, &settings);

    let response = match cli.command {
        Commands::Tag { tag, filters, page } => {
            service
                .search_by_tag(&tag, &filters, &page.to_options())
                .await?
        }
        Commands::Text { text } => service.search_text(&text).await?,
        Commands::Tasks {
            completed,
            open,
            from,
            to,
            page,
        } => {
            let task = task_query(completed, open, from.zip(to));
            service.search_tasks(&task, &page.to_options()).await?
        }
        Commands::Journal { from, to, page } => {
            service.search_journal(from, to, &page.to_options()).await?
        }
        Commands::Refs { block_id, page } => {
            service
                .search_references(BlockId(block_id), &page.to_options())
                .await?
        }
        Commands::Advanced { file, mode } => {
            let request = AdvancedRequest::load(&file)?;
            let mode = mode.or(request.mode).unwrap_or_default();
            debug!(conditions = request.conditions.len(), mode = %mode, "Advanced query");
            service
                .search_advanced(request.conditions, mode, &request.options)
                .await?
        }
        Commands::Schema { tag } => {
            let schema = service.tag_schema(&tag).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                print!("{}", format_schema(&schema));
            }
            return Ok(());
        }
        Commands::Config => return Ok(()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response.results)?);
    } else {
        print!("{}", format_response(&response));
    }
    Ok(())
}

fn task_query(completed: bool, open: bool, range: Option<(DateSpec, DateSpec)>) -> TaskQuery {
    let completed = match (completed, open) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    };
    TaskQuery {
        completed,
        date_range: range.map(|(start, end)| DateRange { start, end }),
    }
}

/// Human-readable rendering of a search response.
pub fn format_response(response: &SearchResponse) -> String {
    let mut out = String::new();
    if response.is_empty() {
        out.push_str("No results.\n");
        return out;
    }

    let _ = writeln!(out, "{} result(s)", response.len());
    if response.fallback_occurred {
        if let Some(shape) = response.shape_used {
            let _ = writeln!(out, "(answered with {} query shape)", shape.as_str());
        }
    }
    for result in &response.results {
        out.push('\n');
        out.push_str(&format_result(result));
    }
    out
}

fn format_result(result: &SearchResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", result.id, result.title);

    if let Some(tags) = result.tags.as_ref().filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "  tags: {}", tags.join(", "));
    }
    if let Some(props) = &result.property_values {
        for (name, value) in props {
            let _ = writeln!(out, "  {}: {}", name, value);
        }
    }
    if let Some(content) = &result.full_content {
        for line in content.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}

/// Human-readable rendering of a tag schema.
pub fn format_schema(schema: &TagSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{}", schema.tag_name);
    if schema.properties.is_empty() {
        out.push_str("  (no properties)\n");
    }
    for property in &schema.properties {
        let _ = write!(out, "  {} ({})", property.name, property.type_name);
        if let Some(options) = &property.options {
            let labels: Vec<String> = options
                .iter()
                .map(|o| format!("{}={}", o.value, o.label))
                .collect();
            let _ = write!(out, ": {}", labels.join(", "));
        }
        out.push('\n');
    }
    out
}
