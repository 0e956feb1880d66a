use crate::error::ConfigError;

mod client;
mod models;

pub use client::*;
pub use models::*;

/// Environment variable holding the GitHub API token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Read the GitHub token from the environment
pub fn token_from_env() -> Result<String, ConfigError> {
    parse_token(std::env::var(TOKEN_ENV).ok())
}

fn parse_token(raw: Option<String>) -> Result<String, ConfigError> {
    raw.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::MissingToken)
}
