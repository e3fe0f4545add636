//! QUIRE Core - Key Layout and Record Types
//!
//! Pure functions and data types shared by every other crate: the
//! tenant-scoped key codec, typed records and the keys they are stored
//! under, folder index generation, soft-delete key transforms, and the
//! multi-attribute search compiler. Nothing in here performs I/O.

pub mod config;
pub mod error;
pub mod folder;
pub mod keys;
pub mod lifecycle;
pub mod record;
pub mod search;

pub use config::{parse_composite_keys, QuireConfig, BACKEND_BATCH_GET_LIMIT};
pub use error::{
    ConfigError, KeyError, QuireError, QuireResult, StorageError, ValidationError,
    ValidationErrors,
};
pub use keys::{
    decode_id, decode_tenant, encode, rebase, CompositeKey, Index, IndexKey, PrimaryKey, Tenant,
    DEFAULT_TENANT,
};
pub use lifecycle::{
    is_soft_deleted, restore, restore_key, soft_delete, soft_delete_key, SOFT_DELETE_MARKER,
};
pub use record::{
    new_document_id, Attribute, AttributeValue, Document, FolderNode, FolderNodeKind, Item,
    Record, RecordKind, Tag, TagKind, TagValue, Timestamp,
};
pub use search::{
    CompiledCriteria, RangeKind, SearchAttributeCriteria, SearchCriteria, SearchRange,
};
