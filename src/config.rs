use std::{env, path::PathBuf};

use flvremux::RemuxConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub remux: RemuxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Directory the recordings are written to, created if missing
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// File name prefix, followed by the local start time of each file
    #[serde(default = "default_output_name")]
    pub name: String,
    /// Seconds between two progress log lines, 0 disables them
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            name: default_output_name(),
            progress_interval: default_progress_interval(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_name() -> String {
    "record".to_string()
}

fn default_progress_interval() -> u64 {
    5
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.remux
            .validate()
            .map_err(|e| anyhow::anyhow!("remux config error: {}", e))?;

        if self.output.name.is_empty() {
            return Err(anyhow::anyhow!("output name must not be empty"));
        }
        if self.output.name.contains(['/', '\\']) {
            return Err(anyhow::anyhow!(
                "output name must not contain a path separator: {}",
                self.output.name
            ));
        }
        Ok(())
    }
}
