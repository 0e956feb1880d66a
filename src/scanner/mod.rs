//! Organization-wide scan of open issues and pull requests.
//!
//! A scan runs one worker per enabled category. Each worker walks every page
//! of the search API, filters what it finds, and reports back over a channel.
//! The first worker error cancels the other one and becomes the scan error.

use anyhow::{anyhow, Result};
use jiff::Timestamp;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::github::SearchClient;

mod cancel;
mod search;

pub use cancel::CancelToken;
pub use search::{extract_item, is_internal_association, Partition, PAGE_SIZE};

/// An open issue or pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub repo: String,
    pub number: u64,
    pub title: String,
    /// Empty for deleted or anonymous accounts
    pub author: String,
    pub created_at: Timestamp,
}

/// The two independently paginated search domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchCategory {
    Issue,
    PullRequest,
}

impl SearchCategory {
    /// Search qualifiers appended to the organization filter
    pub fn query_suffix(self) -> &'static str {
        match self {
            SearchCategory::Issue => "is:open is:issue",
            SearchCategory::PullRequest => "is:open is:pr",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchCategory::Issue => write!(f, "issues"),
            SearchCategory::PullRequest => write!(f, "pull requests"),
        }
    }
}

/// Which authors to include in the result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Audience {
    #[default]
    All,
    Internal,
    External,
}

impl Audience {
    /// Whether an author with the given classification passes this filter
    pub fn admits(self, internal: bool) -> bool {
        match self {
            Audience::All => true,
            Audience::Internal => internal,
            Audience::External => !internal,
        }
    }
}

impl FromStr for Audience {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Audience::All),
            "internal" => Ok(Audience::Internal),
            "external" => Ok(Audience::External),
            _ => Err(ConfigError::InvalidAudience(s.to_string())),
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::All => write!(f, "all"),
            Audience::Internal => write!(f, "internal"),
            Audience::External => write!(f, "external"),
        }
    }
}

/// Scan parameters as supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub organization: String,
    pub repo_prefix: String,
    pub skip_users: Vec<String>,
    pub include_issues: bool,
    pub include_prs: bool,
    pub audience: Audience,
}

/// Validated scan parameters
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub organization: String,
    pub repo_prefix: String,
    /// Lower-cased logins
    pub skip_users: HashSet<String>,
    pub include_issues: bool,
    pub include_prs: bool,
    pub audience: Audience,
}

impl ScanSettings {
    /// Categories to search, in dispatch order
    pub fn categories(&self) -> Vec<SearchCategory> {
        let mut categories = Vec::with_capacity(2);
        if self.include_issues {
            categories.push(SearchCategory::Issue);
        }
        if self.include_prs {
            categories.push(SearchCategory::PullRequest);
        }
        categories
    }

    /// Whether items by `author` are dropped. Anonymous authors never are.
    pub fn is_skipped(&self, author: &str) -> bool {
        !self.skip_users.is_empty()
            && !author.is_empty()
            && self.skip_users.contains(&author.to_lowercase())
    }
}

impl TryFrom<ScanConfig> for ScanSettings {
    type Error = ConfigError;

    fn try_from(config: ScanConfig) -> Result<Self, Self::Error> {
        if config.organization.trim().is_empty() {
            return Err(ConfigError::MissingOrganization);
        }
        if config.repo_prefix.trim().is_empty() {
            return Err(ConfigError::MissingPrefix);
        }

        let (include_issues, include_prs) = if !config.include_issues && !config.include_prs {
            (true, true)
        } else {
            (config.include_issues, config.include_prs)
        };

        let skip_users = config
            .skip_users
            .iter()
            .map(|user| user.trim().to_lowercase())
            .filter(|user| !user.is_empty())
            .collect();

        Ok(ScanSettings {
            organization: config.organization.trim().to_string(),
            repo_prefix: config.repo_prefix,
            skip_users,
            include_issues,
            include_prs,
            audience: config.audience,
        })
    }
}

/// Aggregated output of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub external_issues: Vec<Item>,
    pub internal_issues: Vec<Item>,
    pub external_prs: Vec<Item>,
    pub internal_prs: Vec<Item>,
    /// Distinct repositories with at least one prefix-matching item
    pub total_repos: usize,
    pub include_issues: bool,
    pub include_prs: bool,
    pub audience: Audience,
}

impl ScanResult {
    fn empty(settings: &ScanSettings) -> Self {
        ScanResult {
            include_issues: settings.include_issues,
            include_prs: settings.include_prs,
            audience: settings.audience,
            ..Default::default()
        }
    }

    fn merge(&mut self, category: SearchCategory, partition: Partition, repos: &mut HashSet<String>) {
        repos.extend(partition.repos);
        match category {
            SearchCategory::Issue => {
                self.external_issues.extend(partition.external);
                self.internal_issues.extend(partition.internal);
            }
            SearchCategory::PullRequest => {
                self.external_prs.extend(partition.external);
                self.internal_prs.extend(partition.internal);
            }
        }
    }
}

/// Per-page numbers handed to the page logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStats {
    pub category: SearchCategory,
    /// Nodes on this page
    pub items: usize,
    /// Total matches the API reports for the query
    pub total_count: u64,
}

/// Observer invoked after every page fetch
pub type PageLogger = Arc<dyn Fn(&PageStats) + Send + Sync>;

/// One worker's output
struct Segment {
    category: SearchCategory,
    result: Result<Partition>,
}

/// Scans an organization for open issues and pull requests
pub struct Scanner {
    settings: Arc<ScanSettings>,
    client: Arc<SearchClient>,
    page_logger: Option<PageLogger>,
}

impl Scanner {
    /// Validate `config` and create a scanner using `client`
    pub fn new(config: ScanConfig, client: Arc<SearchClient>) -> Result<Self, ConfigError> {
        let settings = ScanSettings::try_from(config)?;
        Ok(Scanner {
            settings: Arc::new(settings),
            client,
            page_logger: None,
        })
    }

    /// Install an observer called after every page fetch
    pub fn with_page_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&PageStats) + Send + Sync + 'static,
    {
        self.page_logger = Some(Arc::new(logger));
        self
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Run a scan to completion
    pub async fn scan(&self) -> Result<ScanResult> {
        self.scan_with(&CancelToken::new()).await
    }

    /// Run a scan that also stops when `shutdown` is cancelled.
    ///
    /// On error the partial result is discarded.
    pub async fn scan_with(&self, shutdown: &CancelToken) -> Result<ScanResult> {
        let cancel = CancelToken::new();
        let categories = self.settings.categories();
        let (tx, mut rx) = mpsc::channel::<Segment>(2);

        info!(
            organization = %self.settings.organization,
            prefix = %self.settings.repo_prefix,
            audience = %self.settings.audience,
            "Scanning {} categories",
            categories.len()
        );

        let mut handles = Vec::with_capacity(categories.len());
        for category in categories {
            let tx = tx.clone();
            let client = Arc::clone(&self.client);
            let settings = Arc::clone(&self.settings);
            let cancel = cancel.clone();
            let page_logger = self.page_logger.clone();

            let handle = tokio::spawn(async move {
                let result = search::search_category(
                    &client,
                    &settings,
                    category,
                    &cancel,
                    page_logger.as_ref(),
                )
                .await;
                if result.is_err() {
                    cancel.cancel();
                }
                // The receiver outlives every worker
                let _ = tx.send(Segment { category, result }).await;
            });
            handles.push((category, handle));
        }
        drop(tx);

        let mut result = ScanResult::empty(&self.settings);
        let mut repos = HashSet::new();
        let mut first_error: Option<anyhow::Error> = None;
        let mut shutdown_seen = false;

        loop {
            let segment = tokio::select! {
                segment = rx.recv() => segment,
                _ = shutdown.cancelled(), if !shutdown_seen => {
                    shutdown_seen = true;
                    cancel.cancel();
                    if first_error.is_none() {
                        first_error = Some(anyhow!("scan cancelled"));
                    }
                    continue;
                }
            };
            let Some(segment) = segment else {
                break;
            };

            match segment.result {
                Ok(partition) => {
                    if first_error.is_none() {
                        result.merge(segment.category, partition, &mut repos);
                    }
                }
                Err(error) => {
                    cancel.cancel();
                    if first_error.is_none() {
                        warn!(category = %segment.category, "Search failed: {:#}", error);
                        first_error = Some(error);
                    } else {
                        debug!(category = %segment.category, "Ignoring later error: {:#}", error);
                    }
                }
            }
        }

        for (category, handle) in handles {
            if let Err(join_error) = handle.await {
                cancel.cancel();
                if first_error.is_none() {
                    first_error = Some(anyhow!("{} search task failed: {}", category, join_error));
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        result.total_repos = repos.len();
        info!(
            repos = result.total_repos,
            external_issues = result.external_issues.len(),
            internal_issues = result.internal_issues.len(),
            external_prs = result.external_prs.len(),
            internal_prs = result.internal_prs.len(),
            "Scan complete"
        );

        Ok(result)
    }
}
