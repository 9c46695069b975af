//! CLI argument definitions using clap
//!
//! Commands:
//! - exifwash init --config <path> --data-dir <path>
//! - exifwash serve --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// exifwash - a small web service that strips EXIF metadata from JPEGs
#[derive(Parser, Debug)]
#[command(name = "exifwash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration and create the data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./exifwash.json")]
        config: PathBuf,

        /// Where uploaded images and their artifacts will live
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Start the exifwash server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./exifwash.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
