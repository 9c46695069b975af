//! CLI command implementations
//!
//! `init` lays down a default configuration and the data directory.
//! `serve` loads the configuration, wires the service state, and runs
//! the HTTP server on a tokio runtime until the process ends.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ServiceConfig;
use crate::observability::Logger;
use crate::service::{ApiServer, AppState};

use super::args::Command;
use super::errors::{CliError, CliResult};

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
        Command::Init { config, data_dir } => init(&config, data_dir),
        Command::Serve { config } => serve(&config),
    }
}

/// Write a default configuration and create the data directory.
///
/// Refuses to overwrite an existing configuration file.
pub fn init(config_path: &Path, data_dir: PathBuf) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::already_initialized(config_path));
    }

    fs::create_dir_all(&data_dir).map_err(|e| {
        CliError::config_error(format!(
            "Failed to create data directory {}: {}",
            data_dir.display(),
            e
        ))
    })?;

    let config = ServiceConfig::sample(data_dir);
    let content = serde_json::to_string_pretty(&config)?;
    fs::write(config_path, content)?;

    Logger::info(
        "initialized",
        &[("config", &config_path.display().to_string())],
    );
    Ok(())
}

/// Load the configuration, build the service, and serve requests
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    let state = AppState::build(config)?;
    let server = ApiServer::new(state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_config_and_data_dir() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("exifwash.json");
        let data_dir = dir.path().join("data");

        init(&config_path, data_dir.clone()).unwrap();

        assert!(data_dir.is_dir());
        let written = ServiceConfig::load(&config_path).unwrap();
        assert_eq!(written.data_dir, data_dir);
        assert_eq!(written.ttl, 600);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("exifwash.json");

        init(&config_path, dir.path().join("data")).unwrap();
        let err = init(&config_path, dir.path().join("data")).unwrap_err();
        assert!(err.to_string().contains("ALREADY_INITIALIZED"));
    }
}
