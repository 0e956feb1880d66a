use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::github::{AuthorAssociation, SearchClient, SearchNode};
use crate::scanner::{CancelToken, Item, PageLogger, PageStats, ScanSettings, SearchCategory};

/// Page size requested from the search API (GitHub's maximum)
pub const PAGE_SIZE: u32 = 100;

/// Whether an author association counts as internal to the organization
pub fn is_internal_association(association: AuthorAssociation) -> bool {
    matches!(
        association,
        AuthorAssociation::Owner | AuthorAssociation::Member | AuthorAssociation::Collaborator
    )
}

/// Turn a search node into an item for `category`.
///
/// Returns `None` when the node is not of the category's type or lacks an
/// id or repository name. Returns the item with its internal flag otherwise.
pub fn extract_item(node: &SearchNode, category: SearchCategory) -> Option<(Item, bool)> {
    let fields = match (node, category) {
        (SearchNode::Issue(fields), SearchCategory::Issue) => fields,
        (SearchNode::PullRequest(fields), SearchCategory::PullRequest) => fields,
        _ => return None,
    };

    if fields.id.is_empty() || fields.repository_name().is_empty() {
        return None;
    }

    let item = Item {
        repo: fields.repository_name().to_string(),
        number: fields.number,
        title: fields.title.clone(),
        author: fields.author_login().to_string(),
        created_at: fields.created_at,
    };

    Some((item, is_internal_association(fields.author_association)))
}

/// Items from one category, split by author classification
#[derive(Debug, Default)]
pub struct Partition {
    pub external: Vec<Item>,
    pub internal: Vec<Item>,
    /// Repositories with at least one prefix-matching item
    pub repos: HashSet<String>,
}

impl Partition {
    /// Run one extracted item through the prefix, skip and audience filters
    pub fn accept(&mut self, item: Item, internal: bool, settings: &ScanSettings) {
        if !item.repo.starts_with(&settings.repo_prefix) {
            return;
        }

        // Tracked before the author filters on purpose
        if !self.repos.contains(&item.repo) {
            self.repos.insert(item.repo.clone());
        }

        if settings.is_skipped(&item.author) {
            trace!(repo = %item.repo, number = item.number, author = %item.author, "Skipping user");
            return;
        }

        if !settings.audience.admits(internal) {
            return;
        }

        if internal {
            self.internal.push(item);
        } else {
            self.external.push(item);
        }
    }
}

/// Fetch every page of open items for one category and partition them.
///
/// Stops at the first transport error, or as soon as `cancel` fires.
pub async fn search_category(
    client: &SearchClient,
    settings: &ScanSettings,
    category: SearchCategory,
    cancel: &CancelToken,
    page_logger: Option<&PageLogger>,
) -> Result<Partition> {
    let query = format!("org:{} {}", settings.organization, category.query_suffix());
    let mut partition = Partition::default();
    let mut cursor: Option<String> = None;
    let mut page_number = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(anyhow!("{} search cancelled", category));
        }
        page_number += 1;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            page = client.search_page(&query, PAGE_SIZE, cursor.as_deref()) => Some(page),
        };
        let page = match fetched {
            Some(page) => page
                .with_context(|| format!("Failed to search {} (page {})", category, page_number))?,
            None => return Err(anyhow!("{} search cancelled", category)),
        };

        let stats = PageStats {
            category,
            items: page.nodes.len(),
            total_count: page.issue_count,
        };
        debug!(
            %category,
            page = page_number,
            items = stats.items,
            total = stats.total_count,
            "Fetched page"
        );
        if let Some(logger) = page_logger {
            logger(&stats);
        }

        for node in &page.nodes {
            if let Some((item, internal)) = extract_item(node, category) {
                partition.accept(item, internal, settings);
            }
        }

        if !page.page_info.has_next_page {
            break;
        }
        cursor = match page.page_info.end_cursor {
            Some(next) => Some(next),
            None => {
                return Err(anyhow!(
                    "GitHub reported another {} page but no end cursor (page {})",
                    category,
                    page_number
                ))
            }
        };
    }

    debug!(
        %category,
        external = partition.external.len(),
        internal = partition.internal.len(),
        repos = partition.repos.len(),
        "Search complete"
    );

    Ok(partition)
}
