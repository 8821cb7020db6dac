//! CLI argument definitions using clap
//!
//! Commands:
//! - chartquery catalog --config <path> [--entity <type>]
//! - chartquery explain --config <path> --query <file> [--scope T:id]... [--user <login>]
//! - chartquery run --config <path> --query <file> [--page N --size N] [--scope T:id]... [--user <login>]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// chartquery - analytical chart queries over a typed entity catalog
#[derive(Parser, Debug)]
#[command(name = "chartquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the column catalog
    Catalog {
        /// Path to configuration file
        #[arg(long, default_value = "./chartquery.json")]
        config: PathBuf,

        /// Only list the columns of this entity type
        #[arg(long)]
        entity: Option<String>,
    },

    /// Compile a query and print its plan or rejection
    Explain {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Compile and run a query, printing the result set
    Run {
        #[command(flatten)]
        request: RequestArgs,

        /// 0-based page number
        #[arg(long, requires = "size")]
        page: Option<usize>,

        /// Page size
        #[arg(long)]
        size: Option<usize>,
    },
}

/// Arguments shared by commands that take a query
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Path to configuration file
    #[arg(long, default_value = "./chartquery.json")]
    pub config: PathBuf,

    /// Query definition file (JSON)
    #[arg(long)]
    pub query: PathBuf,

    /// Scope reference, as `EntityType:id`; repeatable
    #[arg(long = "scope", value_name = "TYPE:ID")]
    pub scope: Vec<String>,

    /// Caller login; without it the query runs as an administrator
    #[arg(long)]
    pub user: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "chartquery", "run", "--query", "q.json", "--scope", "TestCase:3", "--scope",
            "Folder:1", "--page", "1", "--size", "20",
        ])
        .unwrap();
        match cli.command {
            Command::Run { request, page, size } => {
                assert_eq!(request.scope, vec!["TestCase:3", "Folder:1"]);
                assert_eq!(page, Some(1));
                assert_eq!(size, Some(20));
                assert!(request.user.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_page_requires_size() {
        assert!(Cli::try_parse_from(["chartquery", "run", "--query", "q.json", "--page", "1"]).is_err());
    }
}
