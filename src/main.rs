use anyhow::{Context, Result};
use clap::Parser;
use gh_org_scan::{
    cli::Cli,
    error::UserFriendly,
    github::{self, GraphQlClient, SearchClient},
    report::Printer,
    scanner::{CancelToken, PageStats},
    Config, Scanner,
};
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(&cli);

    if let Err(e) = run(&cli).await.user_friendly() {
        e.display();
        std::process::exit(1);
    }
}

fn setup_logging(cli: &Cli) {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter(env_directives.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    info!("Loading configuration");
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let scan_config = cli.scan_config(&config)?;

    let token = github::token_from_env()?;
    let client = GraphQlClient::with_endpoint(
        &config.github.api_url,
        &token,
        config.github.timeout(),
    )
    .context("Failed to create GitHub client")?;

    let mut scanner = Scanner::new(scan_config, Arc::new(SearchClient::from(client)))?;
    if cli.debug {
        scanner = scanner.with_page_logger(|stats: &PageStats| {
            eprintln!(
                "Fetched {} items (page), total count in search: {}",
                stats.items, stats.total_count
            )
        });
    }

    let shutdown = CancelToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping scan");
                shutdown.cancel();
            }
        });
    }

    let result = scanner.scan_with(&shutdown).await?;

    let stdout = std::io::stdout();
    let color = !cli.no_color && stdout.is_terminal();
    Printer::new(stdout.lock())
        .with_color(color)
        .print(&result)
        .context("Failed to write report")?;

    Ok(())
}
