//! Opaque, cache-backed pagination.
//!
//! The backend's native continuation key never leaves the store. Each page
//! a caller is served is described by a [`PaginationToken`] persisted in an
//! [`EphemeralCache`] under a fresh id. Tokens link back to the page before
//! them, so "previous" replays a stored query instead of inverting a key.
//!
//! # Example
//!
//! ```ignore
//! let cursor = manager.resolve(&PageRequest::first(Some(20))).await?;
//! let request = request
//!     .with_limit(cursor.limit())
//!     .with_start_key(cursor.start_key());
//! let page = table.query(&request).await?;
//! let links = manager.complete(&cursor, page.last_evaluated_key).await?;
//! // links.next / links.previous are handed to the caller
//! ```

pub mod cache;
pub mod manager;
pub mod token;

pub use cache::{Clock, EphemeralCache, InMemoryEphemeralCache, ManualClock, SystemClock};
pub use manager::{Page, PageCursor, PageLinks, PaginationManager};
pub use token::{PageRequest, PaginationToken};
