use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::ConfigError;
use crate::scanner::{Audience, ScanConfig};

#[derive(Parser, Debug)]
#[command(
    name = "gh-org-scan",
    about = "Report open external and internal issues and pull requests for a GitHub organization",
    version
)]
pub struct Cli {
    /// GitHub organization to scan
    #[arg(long, env = "GH_ORG_SCAN_ORG")]
    pub org: Option<String>,

    /// Repository name prefix to match
    #[arg(long)]
    pub prefix: Option<String>,

    /// Comma-separated usernames to skip (pass "" to skip nobody)
    #[arg(long, value_delimiter = ',')]
    pub skip: Option<Vec<String>>,

    /// Include issues (default: issues and pull requests)
    #[arg(long)]
    pub issues: bool,

    /// Include pull requests (default: issues and pull requests)
    #[arg(long)]
    pub prs: bool,

    /// Authors to include: all, internal or external
    #[arg(long, value_name = "AUDIENCE")]
    pub audience: Option<Audience>,

    /// Disable bold headings
    #[arg(long)]
    pub no_color: bool,

    /// Print per-page fetch diagnostics to stderr
    #[arg(long)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(short, long, env = "GH_ORG_SCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Combine flags with file settings. Flags win.
    pub fn scan_config(&self, file: &Config) -> Result<ScanConfig, ConfigError> {
        let audience = match self.audience {
            Some(audience) => audience,
            None => file
                .audience
                .as_deref()
                .map(str::parse::<Audience>)
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(ScanConfig {
            organization: self
                .org
                .clone()
                .or_else(|| file.organization.clone())
                .unwrap_or_default(),
            repo_prefix: self
                .prefix
                .clone()
                .or_else(|| file.prefix.clone())
                .unwrap_or_default(),
            skip_users: self.skip.clone().unwrap_or_else(|| file.skip_users.clone()),
            include_issues: self.issues || !self.prs,
            include_prs: self.prs || !self.issues,
            audience,
        })
    }

    /// Log filter directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            return "debug";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Build the log filter from `RUST_LOG`-style directives, falling back
    /// to the verbosity flags. `--debug` raises the default level to debug
    /// even when directives are given.
    pub fn log_filter(&self, env_directives: Option<&str>) -> EnvFilter {
        let filter = env_directives
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.log_level()));

        if self.debug {
            filter.add_directive(LevelFilter::DEBUG.into())
        } else {
            filter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("gh-org-scan").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_parsing_basic() {
        let cli = parse(&["--org", "acme", "--prefix", "infra-"]);

        assert_eq!(cli.org.as_deref(), Some("acme"));
        assert_eq!(cli.prefix.as_deref(), Some("infra-"));
        assert!(cli.skip.is_none());
        assert!(cli.audience.is_none());
        assert!(!cli.debug);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_cli_parsing_flags() {
        let cli = parse(&[
            "--org",
            "acme",
            "--skip",
            "bob,Carol",
            "--audience",
            "External",
            "--prs",
            "-vv",
        ]);

        assert_eq!(cli.skip, Some(vec!["bob".to_string(), "Carol".to_string()]));
        assert_eq!(cli.audience, Some(Audience::External));
        assert!(cli.prs);
        assert!(!cli.issues);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_log_filter() {
        let quiet = parse(&[]);
        assert_eq!(quiet.log_filter(None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(
            quiet.log_filter(Some("info")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
        // Unparsable directives fall back to the flags
        assert_eq!(
            parse(&["-v"]).log_filter(Some("gh_org_scan=loud")).max_level_hint(),
            Some(LevelFilter::INFO)
        );

        let debug = parse(&["--debug"]);
        assert_eq!(debug.log_filter(None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            debug.log_filter(Some("warn")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }

    #[test]
    fn test_cli_rejects_bad_audience() {
        let result = Cli::try_parse_from(["gh-org-scan", "--audience", "everyone"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_config_defaults_both_categories() {
        let config = parse(&["--org", "acme", "--prefix", "infra-"])
            .scan_config(&Config::default())
            .unwrap();

        assert!(config.include_issues);
        assert!(config.include_prs);
        assert_eq!(config.audience, Audience::All);
        assert_eq!(config.skip_users.len(), 3);
    }

    #[test]
    fn test_scan_config_single_category() {
        let config = parse(&["--issues"]).scan_config(&Config::default()).unwrap();
        assert!(config.include_issues);
        assert!(!config.include_prs);

        let config = parse(&["--issues", "--prs"])
            .scan_config(&Config::default())
            .unwrap();
        assert!(config.include_issues);
        assert!(config.include_prs);
    }

    #[test]
    fn test_scan_config_flags_override_file() {
        let file = Config {
            organization: Some("file-org".to_string()),
            prefix: Some("file-".to_string()),
            skip_users: vec!["renovate[bot]".to_string()],
            audience: Some("internal".to_string()),
            ..Config::default()
        };

        let from_file = parse(&[]).scan_config(&file).unwrap();
        assert_eq!(from_file.organization, "file-org");
        assert_eq!(from_file.repo_prefix, "file-");
        assert_eq!(from_file.skip_users, vec!["renovate[bot]"]);
        assert_eq!(from_file.audience, Audience::Internal);

        let from_flags = parse(&["--org", "acme", "--skip", "", "--audience", "all"])
            .scan_config(&file)
            .unwrap();
        assert_eq!(from_flags.organization, "acme");
        assert_eq!(from_flags.repo_prefix, "file-");
        assert!(from_flags.skip_users.iter().all(|user| user.is_empty()));
        assert_eq!(from_flags.audience, Audience::All);
    }

    #[test]
    fn test_scan_config_invalid_file_audience() {
        let file = Config {
            audience: Some("friends".to_string()),
            ..Config::default()
        };

        assert_eq!(
            parse(&[]).scan_config(&file).unwrap_err(),
            ConfigError::InvalidAudience("friends".to_string())
        );
    }
}
