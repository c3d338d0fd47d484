//! CLI argument parsing for notequery.
//!
//! CLI flags override every other config source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use notequery_compiler::{QueryOptions, SortSpec};
use notequery_types::{BlockId, CombineMode, DateSpec, Operator, PropertyFilter};

/// Query a note database from the shell.
#[derive(Parser, Debug)]
#[command(name = "notequery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides the default config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the backend URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Skip subtree rendering
    #[arg(long, global = true)]
    pub no_content: bool,

    /// Maximum number of results
    #[arg(long, global = true)]
    pub limit: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Sorting and pagination flags shared by query commands.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Sort key as `field` or `field:asc|desc` (repeatable)
    #[arg(long = "sort")]
    pub sort: Vec<String>,

    /// Page number
    #[arg(long)]
    pub page: Option<u32>,

    /// Results per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Block id to leave out of the results
    #[arg(long)]
    pub exclude: Option<i64>,
}

impl PageArgs {
    /// Query options described by these flags.
    pub fn to_options(&self) -> QueryOptions {
        let mut options = QueryOptions {
            page: self.page,
            page_size: self.page_size,
            exclude_id: self.exclude.map(BlockId),
            ..Default::default()
        };
        for spec in &self.sort {
            if let Ok(spec) = spec.parse::<SortSpec>() {
                options = options.with_sort(spec);
            }
        }
        options
    }
}

/// Search commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Blocks carrying a tag, optionally filtered by properties
    Tag {
        /// Tag name (a leading '#' is ignored)
        tag: String,

        /// Property filter such as "priority >= 8" or "due is null" (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<PropertyFilter>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Full-text search
    Text {
        /// Text to search for
        text: String,
    },

    /// Tasks, optionally within journal entries in a date range
    Tasks {
        /// Only completed tasks
        #[arg(long, conflicts_with = "open")]
        completed: bool,

        /// Only open tasks
        #[arg(long)]
        open: bool,

        /// Range start (e.g. -7d, 2024-01-15)
        #[arg(long, requires = "to", allow_hyphen_values = true)]
        from: Option<DateSpec>,

        /// Range end (e.g. 0d, today)
        #[arg(long, requires = "from", allow_hyphen_values = true)]
        to: Option<DateSpec>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Journal entries dated within a range
    Journal {
        /// Range start (e.g. -1w, 2024-01-01)
        #[arg(long, allow_hyphen_values = true)]
        from: DateSpec,

        /// Range end
        #[arg(long, default_value = "today", allow_hyphen_values = true)]
        to: DateSpec,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Blocks that link to a block
    Refs {
        /// Target block id
        block_id: i64,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Run conditions read from a JSON file
    Advanced {
        /// JSON file with `conditions` and optional `mode`, `sort`, `page`, `pageSize`
        #[arg(long)]
        file: PathBuf,

        /// Combine mode (and, or, chain_and); overrides the file
        #[arg(long)]
        mode: Option<CombineMode>,
    },

    /// Show a tag's property schema
    Schema {
        /// Tag name
        tag: String,
    },

    /// Print the effective configuration
    Config,
}

/// Parse a property filter from `name op [value]`.
///
/// Operators may be written with surrounding spaces (`priority >= 8`,
/// `status not includes done`) or, for symbol operators, without
/// (`priority>=8`). Values that parse as JSON keep their JSON type;
/// anything else is a string.
pub fn parse_filter(input: &str) -> Result<PropertyFilter, String> {
    let (name, op, value) = split_spaced(input)
        .or_else(|| split_compact(input))
        .ok_or_else(|| format!("expected 'name operator [value]', got '{}'", input))?;

    if name.is_empty() {
        return Err(format!("missing property name in '{}'", input));
    }

    let value = match (op.is_null_check(), value.is_empty()) {
        (true, _) => None,
        (false, true) => return Err(format!("operator '{}' needs a value", op)),
        (false, false) => Some(serde_json::from_str(&value).unwrap_or(Value::String(value))),
    };

    Ok(PropertyFilter::new(name, op, value))
}

fn split_spaced(input: &str) -> Option<(String, Operator, String)> {
    let tokens: Vec<&str> = input.split_whitespace().collect();

    for i in 1..tokens.len() {
        // Two-word operators first.
        if let Some(pair) = tokens.get(i..i + 2) {
            if let Ok(op) = pair.join(" ").parse::<Operator>() {
                return Some((tokens[..i].join(" "), op, tokens[i + 2..].join(" ")));
            }
        }
        if let Ok(op) = tokens[i].parse::<Operator>() {
            return Some((tokens[..i].join(" "), op, tokens[i + 1..].join(" ")));
        }
    }
    None
}

fn split_compact(input: &str) -> Option<(String, Operator, String)> {
    for symbol in [">=", "<=", "!=", "==", ">", "<"] {
        if let Some((name, value)) = input.split_once(symbol) {
            let op = symbol.parse::<Operator>().ok()?;
            return Some((name.trim().to_string(), op, value.trim().to_string()));
        }
    }
    None
}
