//! QUIRE Storage - Table Trait and Storage Components
//!
//! Defines the partition/sort-key backend contract the store runs against,
//! an in-memory implementation of it, and the stateful components built on
//! top: batch read coalescing, the folder index, the version and soft-delete
//! key mover, and cache-backed pagination.

pub mod batch;
pub mod folders;
pub mod pagination;
pub mod table;
pub mod versions;

pub use batch::{BatchReadCoalescer, BatchReadRequest, BatchReadResult};
pub use folders::{FolderIndex, FolderListing};
pub use pagination::{
    Clock, EphemeralCache, InMemoryEphemeralCache, ManualClock, Page, PageCursor, PageLinks,
    PageRequest, PaginationManager, PaginationToken, SystemClock,
};
pub use table::{
    query_all, DocumentTable, InMemoryTable, PageKey, QueryPage, QueryRequest, SortKeyCondition,
};
pub use versions::KeyMover;
