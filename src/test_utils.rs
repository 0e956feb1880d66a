//! Test utilities for gh-org-scan
#![cfg(test)]

use crate::github::{Actor, AuthorAssociation, RepositoryRef, SearchItemNode, SearchNode};
use crate::scanner::Item;
use jiff::Timestamp;

/// Fixed creation time for test data (2024-01-11)
pub fn test_timestamp() -> Timestamp {
    Timestamp::from_second(1704931200).unwrap()
}

/// Create the shared fields of an issue or PR node
pub fn issue_fields(
    repo: &str,
    number: u64,
    author: &str,
    association: AuthorAssociation,
) -> SearchItemNode {
    SearchItemNode {
        id: format!("node-{}-{}", repo, number),
        number,
        title: format!("Item {} in {}", number, repo),
        created_at: test_timestamp(),
        author_association: association,
        author: Some(Actor {
            login: author.to_string(),
        }),
        repository: Some(RepositoryRef {
            name: repo.to_string(),
        }),
    }
}

/// Create an issue search node
pub fn issue_node(repo: &str, number: u64, author: &str, association: AuthorAssociation) -> SearchNode {
    SearchNode::Issue(issue_fields(repo, number, author, association))
}

/// Create a pull request search node
pub fn pr_node(repo: &str, number: u64, author: &str, association: AuthorAssociation) -> SearchNode {
    SearchNode::PullRequest(issue_fields(repo, number, author, association))
}

/// Create a scanned item
pub fn item(repo: &str, number: u64, author: &str) -> Item {
    Item {
        repo: repo.to_string(),
        number,
        title: format!("Item {} in {}", number, repo),
        author: author.to_string(),
        created_at: test_timestamp(),
    }
}
