//! QUIRE Documents - Document Metadata Store
//!
//! The [`DocumentStore`] composes the key layer in `quire-core` with the
//! storage components in `quire-storage` into the operations callers use:
//! saving and versioning documents, tags and attributes, attribute search,
//! folder browsing, and soft delete with restore. Every operation is scoped
//! to a [`Tenant`].

mod attributes;
mod documents;
mod folders;
mod lifecycle;
mod search;
mod store;
mod tags;

pub use store::DocumentStore;

// Re-export the types callers need alongside the store
pub use quire_core::{
    Attribute, AttributeValue, Document, FolderNode, FolderNodeKind, QuireConfig, QuireError,
    QuireResult, RangeKind, SearchAttributeCriteria, SearchCriteria, SearchRange, Tag, TagKind,
    TagValue, Tenant,
};
pub use quire_storage::{
    DocumentTable, EphemeralCache, InMemoryEphemeralCache, InMemoryTable, Page, PageRequest,
};
