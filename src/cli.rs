//! Command-line interface for Converse.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Chat with your MySQL database in natural language.
#[derive(Debug, Parser)]
#[command(name = "converse", version, about)]
pub struct Cli {
    /// Path to the config file (defaults to the platform config directory).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen address, overriding the config file (e.g. "127.0.0.1:8080").
    #[arg(long, value_name = "ADDR", env = "CONVERSE_LISTEN")]
    pub listen: Option<String>,
}

impl Cli {
    /// Parses CLI arguments from the environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to load.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
