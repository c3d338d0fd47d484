//! notequery
//!
//! Search a note database from the shell.
//!
//! # Usage
//!
//! ```bash
//! notequery tag task -f "priority >= 8" --sort modified:desc
//! notequery text "release notes"
//! notequery tasks --open --from -7d --to today
//! notequery advanced --file query.json --mode or
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config_dir>/notequery/config.toml)
//! 3. Environment variables (NOTEQUERY_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use notequery_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
