//! Typed records and the keys each one is stored under.

use crate::keys::{
    self, CompositeKey, Tenant, COMPOSITE_KEY_DELIMITER, DELIMITER, KEY_ONLY_VALUE,
    PREFIX_ATTRIBUTE, PREFIX_FOLDER_LOOKUP, PREFIX_TAGS, SK_DOCUMENT, SK_FOLDER_LOOKUP,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new document id (UUIDv7, timestamp-sortable).
pub fn new_document_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Record type discriminator used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum RecordKind {
    Document,
    Tag,
    Attribute,
    FolderNode,
}

fn sortable_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Metadata for one stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Document {
    pub document_id: String,
    #[serde(default)]
    pub tenant: Tenant,
    pub path: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub checksum: Option<String>,
    /// Owner of the document.
    pub user_id: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub inserted_date: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_modified_date: Timestamp,
    /// Parent document when this is a sub-document.
    pub belongs_to_document_id: Option<String>,
    /// Absent until the first overwrite; absent is read as version 1.
    pub version: Option<u32>,
}

impl Document {
    pub fn new(document_id: impl Into<String>, user_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            document_id: document_id.into(),
            tenant: Tenant::Default,
            path: None,
            content_type: None,
            content_length: None,
            checksum: None,
            user_id: user_id.into(),
            inserted_date: now,
            last_modified_date: now,
            belongs_to_document_id: None,
            version: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.belongs_to_document_id = Some(parent_id.into());
        self
    }

    /// Effective version number; absent counts as 1.
    pub fn current_version(&self) -> u32 {
        self.version.unwrap_or(1)
    }

    /// `yyyy-mm-dd` of the insert date, used by the date listing index.
    pub fn inserted_day(&self) -> String {
        self.inserted_date.format("%Y-%m-%d").to_string()
    }

    /// Keys of the live record.
    ///
    /// GSI1 lists documents by insert date. Sub-documents also appear on GSI2
    /// under their parent.
    pub fn composite_key(&self) -> CompositeKey {
        let tenant = &self.tenant;
        let mut key = CompositeKey::new(
            keys::document_partition(tenant, &self.document_id),
            SK_DOCUMENT,
        )
        .with_gsi1(
            keys::document_date_partition(tenant, &self.inserted_day()),
            format!(
                "{}{DELIMITER}{}",
                sortable_timestamp(&self.inserted_date),
                self.document_id
            ),
        );

        if let Some(parent) = &self.belongs_to_document_id {
            key = key.with_gsi2(
                keys::children_partition(tenant, parent),
                self.document_id.clone(),
            );
        }

        key
    }

    /// Keys of an archived copy. Archived versions are not indexed.
    pub fn version_key(&self, version: u32) -> CompositeKey {
        CompositeKey::new(
            keys::document_partition(&self.tenant, &self.document_id),
            keys::version_sort_key(version),
        )
    }

    pub fn into_item(self) -> Item {
        Item {
            key: self.composite_key(),
            record: Record::Document(self),
        }
    }
}

// ============================================================================
// TAGS
// ============================================================================

/// Whether a tag was written by the system or by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TagKind {
    System,
    UserDefined,
}

/// Tag value: absent (key-only), one value, or a value list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TagValue {
    None,
    Single(String),
    Many(Vec<String>),
}

impl TagValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            TagValue::None => Vec::new(),
            TagValue::Single(v) => vec![v.as_str()],
            TagValue::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Tag {
    pub document_id: String,
    pub key: String,
    pub value: TagValue,
    pub kind: TagKind,
    pub user_id: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub inserted_date: Timestamp,
}

impl Tag {
    pub fn new(
        document_id: impl Into<String>,
        key: impl Into<String>,
        value: TagValue,
        user_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            key: key.into(),
            value,
            kind: TagKind::UserDefined,
            user_id: user_id.into(),
            inserted_date: now,
        }
    }

    pub fn system(mut self) -> Self {
        self.kind = TagKind::System;
        self
    }

    /// Sort key prefix shared by every row of this tag key.
    pub fn sort_key_prefix(tag_key: &str) -> String {
        format!("{PREFIX_TAGS}{tag_key}")
    }

    /// One row per value. A single or key-only tag is stored at `tags#key`;
    /// each entry of a value list at `tags#key#0000`, `tags#key#0001`, ...
    ///
    /// Every row carries the whole tag so any one of them rebuilds it.
    pub fn items(&self, tenant: &Tenant) -> Vec<Item> {
        let partition = keys::document_partition(tenant, &self.document_id);
        let stamp = format!(
            "{}{DELIMITER}{}",
            sortable_timestamp(&self.inserted_date),
            self.document_id
        );
        let record = Record::Tag(self.clone());

        let indexed = |sort_key: String, value: &str| {
            CompositeKey::new(partition.clone(), sort_key)
                .with_gsi1(keys::tag_value_partition(tenant, &self.key, value), stamp.clone())
                .with_gsi2(keys::tag_key_partition(tenant, &self.key), value.to_string())
        };

        match &self.value {
            TagValue::None => vec![Item {
                key: CompositeKey::new(partition.clone(), Self::sort_key_prefix(&self.key))
                    .with_gsi2(keys::tag_key_partition(tenant, &self.key), KEY_ONLY_VALUE),
                record,
            }],
            TagValue::Single(value) => vec![Item {
                key: indexed(Self::sort_key_prefix(&self.key), value),
                record,
            }],
            TagValue::Many(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| Item {
                    key: indexed(
                        format!("{}{DELIMITER}{i:04}", Self::sort_key_prefix(&self.key)),
                        value,
                    ),
                    record: record.clone(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Typed attribute value. The variant is the value-kind discriminator the
/// search compiler relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Boolean(bool),
    KeyOnly,
    Classification(String),
    Entity(String),
    Relationship(String),
    /// Joined component values of a composite attribute key.
    Composite(String),
}

impl AttributeValue {
    /// The value as it appears inside keys.
    pub fn index_value(&self) -> String {
        match self {
            AttributeValue::String(s)
            | AttributeValue::Classification(s)
            | AttributeValue::Entity(s)
            | AttributeValue::Relationship(s)
            | AttributeValue::Composite(s) => s.clone(),
            AttributeValue::Number(n) => keys::format_number(*n),
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::KeyOnly => KEY_ONLY_VALUE.to_string(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, AttributeValue::Composite(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Attribute {
    pub document_id: String,
    pub key: String,
    pub value: AttributeValue,
    pub user_id: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub inserted_date: Timestamp,
}

impl Attribute {
    pub fn new(
        document_id: impl Into<String>,
        key: impl Into<String>,
        value: AttributeValue,
        user_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            key: key.into(),
            value,
            user_id: user_id.into(),
            inserted_date: now,
        }
    }

    /// Sort key prefix shared by every value row of `attribute_key`.
    pub fn sort_key_prefix(attribute_key: &str) -> String {
        format!("{PREFIX_ATTRIBUTE}{attribute_key}{DELIMITER}")
    }

    /// Build the composite row for `attribute_keys` from one value per component.
    pub fn composite(
        document_id: &str,
        attribute_keys: &[String],
        values: &[String],
        user_id: &str,
        now: Timestamp,
    ) -> Self {
        Self::new(
            document_id,
            attribute_keys.join(COMPOSITE_KEY_DELIMITER),
            AttributeValue::Composite(values.join(COMPOSITE_KEY_DELIMITER)),
            user_id,
            now,
        )
    }

    /// `attr#key#value` in the document partition, and `docs#attr#key` /
    /// value on GSI1 so all documents with a value can be range-scanned.
    pub fn composite_key(&self, tenant: &Tenant) -> CompositeKey {
        let value = self.value.index_value();
        CompositeKey::new(
            keys::document_partition(tenant, &self.document_id),
            format!("{}{value}", Self::sort_key_prefix(&self.key)),
        )
        .with_gsi1(keys::attribute_partition(tenant, &self.key), value)
    }

    pub fn into_item(self, tenant: &Tenant) -> Item {
        Item {
            key: self.composite_key(tenant),
            record: Record::Attribute(self),
        }
    }
}

// ============================================================================
// FOLDER NODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum FolderNodeKind {
    /// Intermediate path segment.
    Folder,
    /// Terminal segment pointing at a document.
    Leaf,
}

/// One path segment of the folder index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FolderNode {
    pub kind: FolderNodeKind,
    /// The segment itself.
    pub name: String,
    /// Accumulated path from the root, without leading slash.
    pub path: String,
    pub document_id: Option<String>,
    /// Partition key of the containing folder.
    pub parent_key: String,
}

impl FolderNode {
    pub fn is_leaf(&self) -> bool {
        self.kind == FolderNodeKind::Leaf
    }

    /// Keys for this node. Leaves also get a GSI1 entry keyed by their
    /// document so the owning folder can be found with a point lookup.
    pub fn composite_key(&self, tenant: &Tenant) -> CompositeKey {
        let sort_key = crate::folder::node_sort_key(self);
        let key = CompositeKey::new(self.parent_key.clone(), sort_key);
        match (&self.kind, &self.document_id) {
            (FolderNodeKind::Leaf, Some(document_id)) => key.with_gsi1(
                keys::key(tenant, &format!("{PREFIX_FOLDER_LOOKUP}{document_id}")),
                SK_FOLDER_LOOKUP,
            ),
            _ => key,
        }
    }

    pub fn into_item(self, tenant: &Tenant) -> Item {
        Item {
            key: self.composite_key(tenant),
            record: Record::FolderNode(self),
        }
    }
}

// ============================================================================
// RECORD / ITEM
// ============================================================================

/// Closed set of record shapes the store writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Document(Document),
    Tag(Tag),
    Attribute(Attribute),
    FolderNode(FolderNode),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Document(_) => RecordKind::Document,
            Record::Tag(_) => RecordKind::Tag,
            Record::Attribute(_) => RecordKind::Attribute,
            Record::FolderNode(_) => RecordKind::FolderNode,
        }
    }
}

/// A record together with the keys it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: CompositeKey,
    pub record: Record,
}

impl Item {
    pub fn new(key: CompositeKey, record: Record) -> Self {
        Self { key, record }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match &self.record {
            Record::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_document(self) -> Option<Document> {
        match self.record {
            Record::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match &self.record {
            Record::Tag(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match &self.record {
            Record::Attribute(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_folder_node(&self) -> Option<&FolderNode> {
        match &self.record {
            Record::FolderNode(n) => Some(n),
            _ => None,
        }
    }

    /// Document id this row belongs to, if any.
    pub fn document_id(&self) -> Option<&str> {
        match &self.record {
            Record::Document(d) => Some(&d.document_id),
            Record::Tag(t) => Some(&t.document_id),
            Record::Attribute(a) => Some(&a.document_id),
            Record::FolderNode(n) => n.document_id.as_deref(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
