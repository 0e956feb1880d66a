use std::fmt;
use thiserror::Error;

/// Errors detected while building a scan configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No organization was given, or it was blank.
    #[error("organization is required (use --org or set `organization` in the config file)")]
    MissingOrganization,

    /// No repository prefix was given, or it was blank.
    #[error("repository prefix is required (use --prefix or set `prefix` in the config file)")]
    MissingPrefix,

    /// The audience value is not one of all, internal or external.
    #[error("invalid audience {0:?} (expected all, internal, or external)")]
    InvalidAudience(String),

    /// `GITHUB_TOKEN` is unset or blank.
    #[error("GITHUB_TOKEN environment variable is required")]
    MissingToken,
}

/// Errors reported by the GitHub API itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitHubError {
    #[error("GitHub API rate limit exceeded: {0}")]
    RateLimited(String),
}

/// User-friendly error wrapper
#[derive(Debug)]
pub struct UserError {
    message: String,
    details: Option<String>,
    suggestion: Option<String>,
}

impl UserError {
    /// Create a new user error
    pub fn new(message: impl Into<String>) -> Self {
        UserError {
            message: message.into(),
            details: None,
            suggestion: None,
        }
    }

    /// Add details about the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Add a suggestion for how to fix the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Format the error for display
    pub fn display(&self) {
        eprintln!("\nError: {}", self.message);

        if let Some(ref details) = self.details {
            eprintln!("\n   {}", details);
        }

        if let Some(ref suggestion) = self.suggestion {
            eprintln!("\n   {}", suggestion);
        }
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for UserError {}

/// Convert common errors to user-friendly messages
pub fn user_friendly_error(error: &anyhow::Error) -> UserError {
    if let Some(config_error) = error.downcast_ref::<ConfigError>() {
        let user_error = UserError::new("Invalid configuration").with_details(config_error.to_string());
        return match config_error {
            ConfigError::MissingToken => user_error
                .with_suggestion("Create a token with `repo` scope and export GITHUB_TOKEN"),
            ConfigError::InvalidAudience(_) => {
                user_error.with_suggestion("Use --audience all, internal, or external")
            }
            _ => user_error.with_suggestion("Run with --help to see the required options"),
        };
    }

    if let Some(GitHubError::RateLimited(details)) = error.downcast_ref::<GitHubError>() {
        return rate_limited(details.clone());
    }

    // Include the context chain so transport errors are matched too
    let error_str = format!("{:#}", error);

    if error_str.contains("authentication failed") {
        return UserError::new("Not authenticated with GitHub")
            .with_details(error_str)
            .with_suggestion("Check that GITHUB_TOKEN is valid and can read the organization");
    }

    // Secondary limits arrive as plain HTTP errors
    if error_str.to_lowercase().contains("rate limit") {
        return rate_limited("Too many requests have been made recently");
    }

    if error_str.contains("Failed to read config") {
        return UserError::new("Configuration file not found")
            .with_details(error_str)
            .with_suggestion("Check the --config path or remove it to use defaults");
    }

    if error_str.contains("Failed to parse config") {
        return UserError::new("Invalid configuration file")
            .with_details(error_str)
            .with_suggestion("Check the TOML syntax of the configuration file");
    }

    if error_str.contains("cancelled") {
        return UserError::new("Scan cancelled").with_details(error_str);
    }

    if error_str.contains("Failed to send request") {
        return UserError::new("Network connection failed")
            .with_details(error_str)
            .with_suggestion("Check your internet connection and try again");
    }

    UserError::new("An unexpected error occurred").with_details(error_str)
}

fn rate_limited(details: impl Into<String>) -> UserError {
    UserError::new("GitHub API rate limit exceeded")
        .with_details(details)
        .with_suggestion("Wait a few minutes and try again")
}

/// Wrap a result with user-friendly error handling
pub trait UserFriendly<T> {
    fn user_friendly(self) -> Result<T, UserError>;
}

impl<T> UserFriendly<T> for anyhow::Result<T> {
    fn user_friendly(self) -> Result<T, UserError> {
        self.map_err(|e| user_friendly_error(&e))
    }
}
