use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::github::DEFAULT_API_URL;

/// Bot accounts skipped unless the configuration says otherwise
pub const DEFAULT_SKIP_USERS: &[&str] = &[
    "github-actions[bot]",
    "dependabot[bot]",
    "release-please[bot]",
];

/// Settings loaded from the optional configuration file
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default = "default_skip_users")]
    pub skip_users: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default location or a specified path.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file at an explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    return Ok(Config::default());
                }
                default_path
            }
        };

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("gh-org-scan").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            organization: None,
            prefix: None,
            skip_users: default_skip_users(),
            audience: None,
            github: GitHubConfig::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Default value functions
fn default_skip_users() -> Vec<String> {
    DEFAULT_SKIP_USERS.iter().map(|s| s.to_string()).collect()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
