//! CLI module for chartquery
//!
//! Provides command-line interface for:
//! - catalog: Print the column catalog
//! - explain: One-shot plan explanation
//! - run: One-shot query execution

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, RequestArgs};
pub use commands::{catalog, explain, run, run_command, run_query};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_scope, read_query, write_error, write_response, write_text};
