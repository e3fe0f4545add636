//! Page token resolution and chaining.

use super::cache::EphemeralCache;
use super::token::{PageRequest, PaginationToken};
use crate::table::PageKey;
use quire_core::{QuireConfig, QuireResult, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// The token a query should run with, plus whether it still has to be
/// persisted once the page is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    token: PaginationToken,
    persisted: bool,
}

impl PageCursor {
    pub fn token(&self) -> &PaginationToken {
        &self.token
    }

    pub fn limit(&self) -> usize {
        self.token.limit
    }

    pub fn start_key(&self) -> Option<PageKey> {
        self.token.start_key.clone()
    }
}

/// Token ids handed back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// One page of results with its navigation links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, links: PageLinks) -> Self {
        Self {
            items,
            next: links.next,
            previous: links.previous,
        }
    }

    /// A page with no navigation, used for results that are not resumable.
    pub fn unlinked(items: Vec<T>) -> Self {
        Self::new(items, PageLinks::default())
    }

    /// Swap in `items`, keeping this page's links.
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            next: self.next,
            previous: self.previous,
        }
    }

    /// Convert items, dropping those `f` rejects. Links are kept.
    pub fn filter_map<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.items.into_iter().filter_map(f).collect(),
            next: self.next,
            previous: self.previous,
        }
    }
}

/// Builds and persists the token chain for paged queries.
pub struct PaginationManager<C: EphemeralCache + ?Sized> {
    cache: Arc<C>,
    default_limit: usize,
    max_limit: usize,
    ttl: Duration,
}

impl<C: EphemeralCache + ?Sized> Clone for PaginationManager<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            ttl: self.ttl,
        }
    }
}

impl<C: EphemeralCache + ?Sized> PaginationManager<C> {
    pub fn new(cache: Arc<C>, config: &QuireConfig) -> Self {
        Self {
            cache,
            default_limit: config.default_page_limit.max(1),
            max_limit: config.max_page_limit.max(1),
            ttl: config.pagination_ttl,
        }
    }

    /// Missing or non-positive limits use the default; large ones are capped.
    pub fn clamp_limit(&self, limit: Option<i64>) -> usize {
        match limit {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX).min(self.max_limit),
            _ => self.default_limit,
        }
    }

    /// Decide which stored (or new) token the next query runs with.
    ///
    /// - no token: a fresh first page with the clamped limit
    /// - `next`: the named token
    /// - `previous`: the token before the named one, replayed; at the first
    ///   page a fresh first page keeping only the limit
    pub async fn resolve(&self, request: &PageRequest) -> QuireResult<PageCursor> {
        match (&request.next, &request.previous) {
            (Some(_), Some(_)) => Err(ValidationError::new(
                "previous",
                "next and previous cannot both be set",
            )
            .into()),
            (Some(next), None) => {
                let token = self.load("next", next).await?;
                Ok(PageCursor {
                    token,
                    persisted: true,
                })
            }
            (None, Some(previous)) => {
                let current = self.load("previous", previous).await?;
                match &current.previous_id {
                    Some(previous_id) => {
                        let token = self.load("previous", previous_id).await?;
                        tracing::debug!(token_id = %token.id, "Replaying previous page");
                        Ok(PageCursor {
                            token,
                            persisted: true,
                        })
                    }
                    None => Ok(PageCursor {
                        token: PaginationToken::first(current.limit),
                        persisted: false,
                    }),
                }
            }
            (None, None) => Ok(PageCursor {
                token: PaginationToken::first(self.clamp_limit(request.limit)),
                persisted: false,
            }),
        }
    }

    /// Record the page just served and return its links.
    ///
    /// A new first-page token is persisted with `has_next` taken from the
    /// query. When the query reported a continuation key, a new token for
    /// the following page is persisted and returned as `next`.
    pub async fn complete(
        &self,
        cursor: &PageCursor,
        last_evaluated_key: Option<PageKey>,
    ) -> QuireResult<PageLinks> {
        let mut current = cursor.token.clone();
        if !cursor.persisted {
            current.has_next = last_evaluated_key.is_some();
            self.store(&current).await?;
        }

        let next = match last_evaluated_key {
            Some(start_key) => {
                let token = PaginationToken::next_after(&current, start_key);
                self.store(&token).await?;
                Some(token.id)
            }
            None => None,
        };

        let previous = current.previous_id.as_ref().map(|_| current.id.clone());

        Ok(PageLinks { next, previous })
    }

    async fn store(&self, token: &PaginationToken) -> QuireResult<()> {
        let value = serde_json::to_string(token).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        tracing::debug!(
            token_id = %token.id,
            previous_id = ?token.previous_id,
            has_next = token.has_next,
            "Storing pagination token"
        );
        self.cache.write(&token.id, value, self.ttl).await
    }

    async fn load(&self, field: &str, id: &str) -> QuireResult<PaginationToken> {
        let Some(raw) = self.cache.read(id).await? else {
            tracing::warn!(token_id = %id, "Pagination token not found or expired");
            return Err(ValidationError::new(field, "pagination token not found or expired").into());
        };
        let token = serde_json::from_str(&raw).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        Ok(token)
    }
}

// =============================================================================
// TESTS
// =============================================================================
