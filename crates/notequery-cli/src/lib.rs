//! notequery CLI library.
//!
//! Exposes argument parsing and command handlers so they can be tested
//! without spawning the binary.

pub mod cli;
pub mod commands;

pub use cli::{parse_filter, Cli, Commands, PageArgs};
pub use commands::{format_response, format_schema, load_settings, run, AdvancedRequest};
