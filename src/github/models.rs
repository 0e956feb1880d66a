use jiff::Timestamp;
use serde::{Deserialize, Deserializer};
use tracing::trace;

/// Envelope returned by the GraphQL endpoint
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphqlError>>,
}

/// A single GraphQL error entry
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

/// `data` payload of the search query
#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchPage,
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Total number of matches the API reports for the query
    pub issue_count: u64,
    pub page_info: PageInfo,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub nodes: Vec<SearchNode>,
}

/// Decode each node on its own. `null` entries (results the token cannot
/// see) and nodes that fail to decode become `Unsupported`.
fn lenient_nodes<'de, D>(deserializer: D) -> Result<Vec<SearchNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|error| {
                trace!(%error, "Skipping undecodable search node");
                SearchNode::Unsupported
            })
        })
        .collect())
}

/// Cursor information for the next page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A search result node. The search endpoint can return types we do not
/// understand; those land in `Unsupported`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum SearchNode {
    Issue(SearchItemNode),
    PullRequest(SearchItemNode),
    #[serde(other)]
    Unsupported,
}

/// Fields shared by issue and pull request nodes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default = "unknown_creation_time")]
    pub created_at: Timestamp,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    /// `None` for deleted or anonymous accounts
    #[serde(default)]
    pub author: Option<Actor>,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

fn unknown_creation_time() -> Timestamp {
    Timestamp::UNIX_EPOCH
}

impl SearchItemNode {
    pub fn author_login(&self) -> &str {
        self.author.as_ref().map(|a| a.login.as_str()).unwrap_or("")
    }

    pub fn repository_name(&self) -> &str {
        self.repository.as_ref().map(|r| r.name.as_str()).unwrap_or("")
    }
}

/// Author of an issue or pull request
#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub login: String,
}

/// Repository the node belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    #[serde(default)]
    pub name: String,
}

/// GitHub's classification of an author's relationship to the repository
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorAssociation {
    Owner,
    Member,
    Collaborator,
    Contributor,
    FirstTimer,
    FirstTimeContributor,
    Mannequin,
    None,
    #[default]
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_deserialization() {
        let json = r#"{
            "issueCount": 3,
            "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjI=" },
            "nodes": [
                {
                    "__typename": "Issue",
                    "id": "I_1",
                    "number": 12,
                    "title": "Broken build",
                    "createdAt": "2024-01-11T00:00:00Z",
                    "authorAssociation": "MEMBER",
                    "author": { "login": "alice" },
                    "repository": { "name": "infra-core" }
                },
                {
                    "__typename": "PullRequest",
                    "id": "PR_1",
                    "number": 13,
                    "title": "Fix build",
                    "createdAt": "2024-01-12T00:00:00Z",
                    "authorAssociation": "FIRST_TIME_CONTRIBUTOR",
                    "author": null,
                    "repository": { "name": "infra-core" }
                },
                { "__typename": "Discussion" }
            ]
        }"#;

        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.issue_count, 3);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("Y3Vyc29yOjI="));
        assert_eq!(page.nodes.len(), 3);

        match &page.nodes[0] {
            SearchNode::Issue(node) => {
                assert_eq!(node.number, 12);
                assert_eq!(node.author_login(), "alice");
                assert_eq!(node.repository_name(), "infra-core");
                assert_eq!(node.author_association, AuthorAssociation::Member);
            }
            other => panic!("Expected issue node, got {:?}", other),
        }

        match &page.nodes[1] {
            SearchNode::PullRequest(node) => {
                assert_eq!(node.author_login(), "");
                assert_eq!(
                    node.author_association,
                    AuthorAssociation::FirstTimeContributor
                );
            }
            other => panic!("Expected pull request node, got {:?}", other),
        }

        assert!(matches!(page.nodes[2], SearchNode::Unsupported));
    }

    #[test]
    fn test_null_and_partial_nodes_do_not_fail_the_page() {
        let json = r#"{
            "issueCount": 3,
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": [
                null,
                { "__typename": "Issue", "id": "" },
                { "__typename": "Issue", "id": "I_2", "number": "not a number" },
                {
                    "__typename": "Issue",
                    "id": "I_3",
                    "number": 7,
                    "title": "Flaky test",
                    "createdAt": "2024-01-11T00:00:00Z",
                    "repository": { "name": "infra-core" }
                }
            ]
        }"#;

        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.nodes.len(), 4);
        assert!(matches!(page.nodes[0], SearchNode::Unsupported));
        assert!(matches!(page.nodes[2], SearchNode::Unsupported));

        match &page.nodes[1] {
            SearchNode::Issue(node) => {
                assert!(node.id.is_empty());
                assert_eq!(node.number, 0);
                assert_eq!(node.created_at, Timestamp::UNIX_EPOCH);
                assert_eq!(node.repository_name(), "");
            }
            other => panic!("Expected issue node, got {:?}", other),
        }

        match &page.nodes[3] {
            SearchNode::Issue(node) => assert_eq!(node.number, 7),
            other => panic!("Expected issue node, got {:?}", other),
        }
    }

    #[test]
    fn test_null_node_list() {
        let json = r#"{ "issueCount": 0, "pageInfo": { "hasNextPage": false }, "nodes": null }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert!(page.nodes.is_empty());
    }

    #[test]
    fn test_unknown_association_falls_back() {
        let assoc: AuthorAssociation = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(assoc, AuthorAssociation::Unknown);
    }

    #[test]
    fn test_graphql_error_envelope() {
        let json = r#"{ "data": null, "errors": [ { "type": "RATE_LIMITED", "message": "API rate limit exceeded" } ] }"#;
        let response: GraphqlResponse<SearchData> = serde_json::from_str(json).unwrap();

        assert!(response.data.is_none());
        let errors = response.errors.unwrap();
        assert_eq!(errors[0].message, "API rate limit exceeded");
        assert_eq!(errors[0].error_type.as_deref(), Some("RATE_LIMITED"));
    }
}
