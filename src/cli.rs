//! Command-line interface for the terminal front end.
//!
//! Flags override whatever `Config` picked up from `.env` and the environment.

use crate::config::{Config, DATA_DIR_VAR, RELAY_URL_VAR, TIMEOUT_VAR};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// parking-assistant - chat with an assistant that helps you contest parking tickets
#[derive(Debug, Parser)]
#[command(name = "parking-assistant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Keep the hourly message counter in memory instead of on disk
    #[arg(long)]
    pub ephemeral: bool,

    /// Base URL of the relay that hosts the chat and analyze-ticket functions
    #[arg(long, value_name = "URL", env = RELAY_URL_VAR)]
    pub relay_url: Option<String>,

    /// Directory for the persisted message counter
    #[arg(long, value_name = "DIR", env = DATA_DIR_VAR)]
    pub data_dir: Option<PathBuf>,

    /// Request timeout for relay calls
    #[arg(long, value_name = "SECONDS", env = TIMEOUT_VAR)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.relay_url {
            config.relay_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}
