//! CLI module for exifwash
//!
//! Provides the command-line interface:
//! - init: write a default configuration and create the data directory
//! - serve: load configuration and run the HTTP server

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{init, run, run_command, serve};
pub use errors::{CliError, CliResult};
