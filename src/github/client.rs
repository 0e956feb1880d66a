use crate::error::GitHubError;
use crate::github::models::*;
use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::trace;

/// Public GitHub GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GraphQL error `type` reported when the rate limit is exhausted
const RATE_LIMITED: &str = "RATE_LIMITED";

const SEARCH_QUERY: &str = r#"
query($query: String!, $pageSize: Int!, $cursor: String) {
  search(query: $query, type: ISSUE, first: $pageSize, after: $cursor) {
    issueCount
    pageInfo { hasNextPage endCursor }
    nodes {
      __typename
      ... on Issue {
        id number title createdAt authorAssociation
        author { login }
        repository { name }
      }
      ... on PullRequest {
        id number title createdAt authorAssociation
        author { login }
        repository { name }
      }
    }
  }
}
"#;

/// Search transport abstraction
pub enum SearchClient {
    GraphQl(GraphQlClient),
    #[cfg(test)]
    Mock(MockSearch),
}

impl SearchClient {
    /// Create a client for the public GitHub API
    pub fn new(token: &str) -> Result<Self> {
        Ok(SearchClient::GraphQl(GraphQlClient::new(token)?))
    }

    /// Fetch one page of issue search results
    pub async fn search_page(
        &self,
        query: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        match self {
            SearchClient::GraphQl(client) => client.search_page(query, page_size, cursor).await,
            #[cfg(test)]
            SearchClient::Mock(client) => client.search_page(query, page_size, cursor).await,
        }
    }
}

impl From<GraphQlClient> for SearchClient {
    fn from(client: GraphQlClient) -> Self {
        SearchClient::GraphQl(client)
    }
}

/// GitHub GraphQL API client
pub struct GraphQlClient {
    client: HttpClient,
    endpoint: String,
    token: String,
}

impl GraphQlClient {
    /// Create a client for the public GitHub API
    pub fn new(token: &str) -> Result<Self> {
        Self::with_endpoint(DEFAULT_API_URL, token, DEFAULT_TIMEOUT)
    }

    /// Create a client for a specific endpoint (GitHub Enterprise, tests)
    pub fn with_endpoint(endpoint: &str, token: &str, timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(anyhow!("GitHub token is empty"));
        }

        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(GraphQlClient {
            client,
            endpoint: endpoint.to_string(),
            token: token.trim().to_string(),
        })
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gh-org-scan/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Fetch one page of issue search results
    pub async fn search_page(
        &self,
        query: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        trace!(query, ?cursor, "Sending search query");

        let body = json!({
            "query": SEARCH_QUERY,
            "variables": {
                "query": query,
                "pageSize": page_size,
                "cursor": cursor,
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.build_headers())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to GitHub GraphQL API")?;

        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<SearchPage> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read GitHub response body")?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(anyhow!(
                "GitHub authentication failed ({}): {}",
                status.as_u16(),
                body.trim()
            ));
        }

        if !status.is_success() {
            return Err(anyhow!("GitHub API error ({}): {}", status.as_u16(), body.trim()));
        }

        let response: GraphqlResponse<SearchData> =
            serde_json::from_str(&body).context("Failed to parse GitHub GraphQL response")?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let rate_limited = errors
                .iter()
                .any(|e| e.error_type.as_deref() == Some(RATE_LIMITED));
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            if rate_limited {
                return Err(GitHubError::RateLimited(messages.join("; ")).into());
            }
            return Err(anyhow!("GitHub GraphQL query failed: {}", messages.join("; ")));
        }

        response
            .data
            .map(|data| data.search)
            .ok_or_else(|| anyhow!("GitHub GraphQL response contained no data"))
    }
}

/// Mock search transport for testing.
///
/// Pages are scripted per query string. Cursors are page indexes.
#[cfg(test)]
pub struct MockSearch {
    pages: std::collections::HashMap<String, Vec<Vec<SearchNode>>>,
    failures: std::collections::HashMap<String, (usize, String)>,
    delays: std::collections::HashMap<String, Duration>,
    calls: std::sync::Mutex<Vec<(String, Option<String>)>>,
}

#[cfg(test)]
impl MockSearch {
    pub fn new() -> Self {
        MockSearch {
            pages: Default::default(),
            failures: Default::default(),
            delays: Default::default(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Script the pages returned for `query`
    pub fn with_pages(mut self, query: &str, pages: Vec<Vec<SearchNode>>) -> Self {
        self.pages.insert(query.to_string(), pages);
        self
    }

    /// Fail the request for page `page` of `query`
    pub fn with_failure(mut self, query: &str, page: usize, message: &str) -> Self {
        self.failures
            .insert(query.to_string(), (page, message.to_string()));
        self
    }

    /// Delay every response for `query`
    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Number of requests made for `query`
    pub fn call_count(&self, query: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| q == query)
            .count()
    }

    pub async fn search_page(
        &self,
        query: &str,
        _page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), cursor.map(str::to_string)));

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        let index = match cursor {
            Some(c) => c
                .parse::<usize>()
                .with_context(|| format!("Invalid mock cursor: {}", c))?,
            None => 0,
        };

        if let Some((page, message)) = self.failures.get(query) {
            if *page == index {
                return Err(anyhow!("{}", message));
            }
        }

        let pages = match self.pages.get(query) {
            Some(pages) => pages,
            None => {
                return Ok(SearchPage {
                    issue_count: 0,
                    page_info: PageInfo::default(),
                    nodes: vec![],
                })
            }
        };

        let nodes = pages
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("Mock page {} not scripted for {}", index, query))?;
        let has_next_page = index + 1 < pages.len();

        Ok(SearchPage {
            issue_count: pages.iter().map(|p| p.len() as u64).sum(),
            page_info: PageInfo {
                has_next_page,
                end_cursor: has_next_page.then(|| (index + 1).to_string()),
            },
            nodes,
        })
    }
}
