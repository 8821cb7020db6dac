//! File and stdout handling for the CLI
//!
//! - Input: query definition files (JSON)
//! - Output: one JSON object or a text block on stdout, UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::model::QueryDefinition;
use crate::scope::EntityReference;

/// Read a query definition file
pub fn read_query(path: &Path) -> CliResult<QueryDefinition> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    QueryDefinition::from_json(&content).map_err(|e| {
        CliError::invalid_request(format!("Invalid query {}: {}", path.display(), e))
    })
}

/// Parse a `Type:id` scope argument
pub fn parse_scope(arg: &str) -> CliResult<EntityReference> {
    let (entity_type, id) = arg
        .rsplit_once(':')
        .ok_or_else(|| CliError::invalid_request(format!("Scope '{}' is not TYPE:ID", arg)))?;
    if entity_type.is_empty() {
        return Err(CliError::invalid_request(format!("Scope '{}' has no type", arg)));
    }
    let id = id
        .parse()
        .map_err(|_| CliError::invalid_request(format!("Scope '{}' has a non-numeric id", arg)))?;
    Ok(EntityReference::new(entity_type, id))
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write plain text to stdout
pub fn write_text(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_scope() {
        assert_eq!(
            parse_scope("TestCase:42").unwrap(),
            EntityReference::new("TestCase", 42)
        );
        assert!(parse_scope("TestCase").is_err());
        assert!(parse_scope(":4").is_err());
        assert!(parse_scope("TestCase:four").is_err());
    }

    #[test]
    fn test_read_query_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("query.json");
        let query = QueryDefinition::builder().project("CAMPAIGN_NAME").build();
        fs::write(&path, serde_json::to_string(&query).unwrap()).unwrap();
        assert_eq!(read_query(&path).unwrap(), query);

        fs::write(&path, "{ broken").unwrap();
        assert_eq!(
            read_query(&path).unwrap_err().code(),
            &crate::cli::CliErrorCode::InvalidRequest
        );
    }
}
