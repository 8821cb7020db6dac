//! CLI command implementations
//!
//! Every command loads the configuration, builds an engine over the
//! configured in-memory data and exits after one request.

use std::path::Path;

use serde_json::json;

use crate::catalog::{CatalogFile, ColumnCatalog};
use crate::config::EngineConfig;
use crate::engine::ChartEngine;
use crate::model::{ConfiguredQuery, Paging};
use crate::scope::Identity;

use super::args::{Command, RequestArgs};
use super::errors::{CliError, CliResult};
use super::io::{parse_scope, read_query, write_error, write_response, write_text};

const CLI_ADMIN: &str = "cli";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Catalog { config, entity } => catalog(&config, entity.as_deref()),
        Command::Explain { request } => explain(&request),
        Command::Run {
            request,
            page,
            size,
        } => run_query(&request, page, size),
    }
}

fn boot(config_path: &Path) -> CliResult<ChartEngine> {
    let config = EngineConfig::load(config_path)?;
    let (engine, _acl) = ChartEngine::from_config(&config)?;
    Ok(engine)
}

/// Print the catalog, or the columns of one entity type
pub fn catalog(config_path: &Path, entity: Option<&str>) -> CliResult<()> {
    let engine = boot(config_path)?;
    write_response(catalog_json(engine.catalog(), entity)?)
}

fn catalog_json(catalog: &ColumnCatalog, entity: Option<&str>) -> CliResult<serde_json::Value> {
    match entity {
        None => Ok(serde_json::to_value(CatalogFile::from_catalog(catalog))?),
        Some(name) => {
            if catalog.entity(name).is_none() {
                return Err(CliError::invalid_request(format!(
                    "Unknown entity type '{}'",
                    name
                )));
            }
            let columns: Vec<_> = catalog.all_for_entity_type(name).into_iter().collect();
            Ok(json!({ "entity": name, "columns": columns }))
        }
    }
}

/// Print the plan of a query, or why it is rejected
pub fn explain(request: &RequestArgs) -> CliResult<()> {
    let engine = boot(&request.config)?;
    let query = configured_query(request)?;
    write_text(&engine.explain(&query).to_string())
}

/// Run a query and print its result set
pub fn run_query(request: &RequestArgs, page: Option<usize>, size: Option<usize>) -> CliResult<()> {
    let engine = boot(&request.config)?;
    let mut query = configured_query(request)?;
    if let Some(size) = size {
        query = query.with_paging(Paging::new(page.unwrap_or(0), size));
    }
    let result = match engine.execute(&query) {
        Ok(result) => result,
        Err(e) => {
            let err = CliError::from(e);
            write_error(err.code_str(), err.message())?;
            return Err(err);
        }
    };
    write_response(json!({
        "columns": result.columns,
        "tuples": result.tuples,
        "metrics": engine.metrics().snapshot(),
    }))
}

fn configured_query(request: &RequestArgs) -> CliResult<ConfiguredQuery> {
    let definition = read_query(&request.query)?;
    let caller = match &request.user {
        Some(login) => Identity::user(login.as_str()),
        None => Identity::administrator(CLI_ADMIN),
    };
    let mut query = ConfiguredQuery::new(definition).as_caller(caller);
    if !request.scope.is_empty() {
        let scope = request
            .scope
            .iter()
            .map(|arg| parse_scope(arg))
            .collect::<CliResult<Vec<_>>>()?;
        query = query.with_scope(scope);
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin;
    use crate::model::{EntityRole, QueryDefinition};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(dir: &TempDir, scope: Vec<String>, user: Option<String>) -> RequestArgs {
        let query = QueryDefinition::builder()
            .involve(EntityRole::Axis, "Campaign")
            .project("CAMPAIGN_NAME")
            .build();
        let query_path = dir.path().join("query.json");
        fs::write(&query_path, serde_json::to_string(&query).unwrap()).unwrap();
        RequestArgs {
            config: PathBuf::from("unused.json"),
            query: query_path,
            scope,
            user,
        }
    }

    #[test]
    fn test_configured_query_defaults_to_admin() {
        let dir = TempDir::new().unwrap();
        let query = configured_query(&request(&dir, Vec::new(), None)).unwrap();
        assert!(query.caller.administrator);
        assert!(query.scope().is_none());
    }

    #[test]
    fn test_configured_query_with_scope_and_user() {
        let dir = TempDir::new().unwrap();
        let req = request(&dir, vec!["Campaign:1".into()], Some("alice".into()));
        let query = configured_query(&req).unwrap();
        assert_eq!(query.caller, Identity::user("alice"));
        assert_eq!(query.scope().map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_catalog_json_for_entity() {
        let catalog = builtin::test_management().unwrap();
        let value = catalog_json(&catalog, Some("Issue")).unwrap();
        assert_eq!(value["columns"].as_array().unwrap().len(), 2);
        assert!(catalog_json(&catalog, Some("Nope")).is_err());
    }

    #[test]
    fn test_run_against_config() {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data.json");
        fs::write(
            &data_path,
            r#"{"tables": {"Campaign": [{"id": 1, "name": "alpha", "project_id": 1}]}}"#,
        )
        .unwrap();
        let config_path = dir.path().join("chartquery.json");
        fs::write(&config_path, r#"{"data_path": "data.json"}"#).unwrap();

        let mut req = request(&dir, Vec::new(), None);
        req.config = config_path;
        assert!(run_query(&req, None, None).is_ok());
        assert!(explain(&req).is_ok());
    }
}
