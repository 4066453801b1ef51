//! CLI helper module for the interactive REPL
//!
//! Provides:
//! - Tab completion for keywords, table names, and column names
//! - Syntax highlighting for the query language
//! - Output format options (table, CSV, vertical)

mod helper;
mod output;

pub use helper::ReplHelper;
pub use output::{OutputFormat, OutputFormatter};
