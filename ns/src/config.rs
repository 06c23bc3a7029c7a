//! Configuration for noticestream

use eyre::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::notices::RewriteOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(default)]
    pub log_level: Option<String>,

    /// Colorize console output
    #[serde(default = "default_color")]
    pub color: bool,

    /// Only show notices flagged for the user
    #[serde(default)]
    pub user_only: bool,

    /// Hide notices that may carry private data
    #[serde(default)]
    pub exclude_sensitive: bool,

    /// File that emitted notices are appended to (stderr when unset)
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_color() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            color: default_color(),
            user_only: false,
            exclude_sensitive: false,
            output: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("noticestream").join("config.yml")),
            Some(PathBuf::from("noticestream.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        Ok(Config::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Console rewriter options from config, before command-line overrides
    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            colorize: self.color,
            user_only: self.user_only,
            exclude_sensitive: self.exclude_sensitive,
        }
    }
}
