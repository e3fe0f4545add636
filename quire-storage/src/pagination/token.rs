//! Pagination tokens and page requests.

use crate::table::PageKey;
use serde::{Deserialize, Serialize};

/// Stored description of one page.
///
/// A token is a node in an append-only chain: it names the query position
/// to start from and the token of the page before it. Tokens are written
/// once and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationToken {
    pub id: String,
    pub limit: usize,
    pub start_key: Option<PageKey>,
    pub previous_id: Option<String>,
    /// Whether a page follows the one that produced this token.
    pub has_next: bool,
}

impl PaginationToken {
    /// Token for the first page: no start key, no previous page.
    pub fn first(limit: usize) -> Self {
        Self {
            id: new_token_id(),
            limit,
            start_key: None,
            previous_id: None,
            has_next: false,
        }
    }

    /// Token for the page after `current`, resuming at `start_key`.
    pub fn next_after(current: &PaginationToken, start_key: PageKey) -> Self {
        Self {
            id: new_token_id(),
            limit: current.limit,
            start_key: Some(start_key),
            previous_id: Some(current.id.clone()),
            has_next: true,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.previous_id.is_none()
    }
}

fn new_token_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// What the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Requested page size; missing or non-positive uses the default.
    pub limit: Option<i64>,
    /// Token id from a previous page's `next` link.
    pub next: Option<String>,
    /// Token id from a previous page's `previous` link.
    pub previous: Option<String>,
}

impl PageRequest {
    pub fn first(limit: Option<i64>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn next(token_id: impl Into<String>) -> Self {
        Self {
            next: Some(token_id.into()),
            ..Self::default()
        }
    }

    pub fn previous(token_id: impl Into<String>) -> Self {
        Self {
            previous: Some(token_id.into()),
            ..Self::default()
        }
    }
}
