//! Tenant-scoped key codec and composite key layout.
//!
//! Every partition key the store writes goes through [`encode`]. The default
//! tenant writes bare ids; any other tenant writes `tenant/id`, so a tenant's
//! rows always share a common leading segment.

use crate::error::KeyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved marker for the tenant whose keys carry no prefix.
pub const DEFAULT_TENANT: &str = "default";

/// Separator between the tenant segment and the rest of a key.
pub const TENANT_DELIMITER: char = '/';

/// Separator between components of a single key.
pub const DELIMITER: &str = "#";

/// Separator between the components of a composite attribute key or value.
pub const COMPOSITE_KEY_DELIMITER: &str = "::";

// ============================================================================
// KEY PREFIXES
// ============================================================================

pub const PREFIX_DOCS: &str = "docs#";
pub const PREFIX_DOCUMENT_DATE: &str = "docts#";
pub const PREFIX_CHILDREN: &str = "children#";
pub const PREFIX_TAGS: &str = "tags#";
pub const PREFIX_TAG: &str = "tag#";
pub const PREFIX_ATTRIBUTE: &str = "attr#";
pub const PREFIX_DOCS_ATTRIBUTE: &str = "docs#attr#";
pub const PREFIX_FOLDERS: &str = "folders#";
pub const PREFIX_FOLDER_LOOKUP: &str = "folder#";
pub const PREFIX_FOLDER_NODE: &str = "ff#";
pub const PREFIX_LEAF_NODE: &str = "fi#";

pub const SK_DOCUMENT: &str = "document";
pub const SK_DOCUMENT_VERSION_PREFIX: &str = "document#v";
pub const SK_FOLDER_LOOKUP: &str = "folder";

/// Placeholder written where a key-only tag or attribute has no value.
pub const KEY_ONLY_VALUE: &str = "#";

// ============================================================================
// TENANT
// ============================================================================

/// Isolation scope for every key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Tenant {
    /// The reserved tenant whose keys are the bare ids.
    #[default]
    Default,
    /// A named site; keys are `site/id`.
    Site(String),
}

impl Tenant {
    /// Parse an optional site id. `None` and `"default"` map to [`Tenant::Default`].
    ///
    /// Site ids must be non-empty and must not contain `/`, otherwise the
    /// codec could not tell the tenant segment from the id.
    pub fn parse(site_id: Option<&str>) -> Result<Self, KeyError> {
        match site_id {
            None => Ok(Tenant::Default),
            Some(DEFAULT_TENANT) => Ok(Tenant::Default),
            Some(s) => Self::site(s),
        }
    }

    /// Build a named tenant, rejecting ids the codec cannot round-trip.
    pub fn site(site_id: impl Into<String>) -> Result<Self, KeyError> {
        let site_id = site_id.into();
        if site_id.trim().is_empty() {
            return Err(KeyError::InvalidTenant {
                tenant: site_id,
                reason: "site id must not be empty".to_string(),
            });
        }
        if site_id.contains(TENANT_DELIMITER) {
            return Err(KeyError::InvalidTenant {
                tenant: site_id,
                reason: "site id must not contain '/'".to_string(),
            });
        }
        if site_id == DEFAULT_TENANT {
            return Ok(Tenant::Default);
        }
        Ok(Tenant::Site(site_id))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Tenant::Default)
    }

    /// The site id, or `None` for the default tenant.
    pub fn site_id(&self) -> Option<&str> {
        match self {
            Tenant::Default => None,
            Tenant::Site(s) => Some(s),
        }
    }

    pub fn as_str(&self) -> &str {
        self.site_id().unwrap_or(DEFAULT_TENANT)
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CODEC
// ============================================================================

/// Encode a logical id into a tenant-scoped key.
///
/// A missing id encodes to `None`; callers use that as the "no key" sentinel.
pub fn encode(tenant: &Tenant, id: Option<&str>) -> Option<String> {
    id.map(|id| key(tenant, id))
}

/// Non-optional form of [`encode`].
pub fn key(tenant: &Tenant, id: &str) -> String {
    match tenant {
        Tenant::Default => id.to_string(),
        Tenant::Site(site) => format!("{site}{TENANT_DELIMITER}{id}"),
    }
}

/// Strip at most one leading `tenant/` segment.
///
/// Only meaningful for keys whose id has no `/`. A default-tenant key such as
/// the nested folder partition `folders#a/b` reads as tenant `folders#a` with
/// id `b`. When the tenant is known, use [`rebase`] instead.
pub fn decode_id(key: &str) -> &str {
    key.split_once(TENANT_DELIMITER)
        .map(|(_, id)| id)
        .unwrap_or(key)
}

/// The tenant named by the leading segment, or `None` for bare and default keys.
///
/// Same restriction as [`decode_id`]: ids containing `/` are misread.
pub fn decode_tenant(key: &str) -> Option<Tenant> {
    let (segment, _) = key.split_once(TENANT_DELIMITER)?;
    if segment == DEFAULT_TENANT || segment.is_empty() {
        return None;
    }
    Some(Tenant::Site(segment.to_string()))
}

/// Remove `tenant/` from the front of `key` only when `key` already carries
/// exactly that tenant. Anything else passes through, so rebasing twice is
/// the same as rebasing once.
pub fn rebase(tenant: &Tenant, key: &str) -> String {
    match tenant {
        Tenant::Default => key.to_string(),
        Tenant::Site(site) => key
            .strip_prefix(site.as_str())
            .and_then(|rest| rest.strip_prefix(TENANT_DELIMITER))
            .unwrap_or(key)
            .to_string(),
    }
}

/// Render a number so that lexicographic order matches numeric order:
/// 15 zero-padded integer digits, a point, and 4 fractional digits.
pub fn format_number(value: f64) -> String {
    format!("{value:020.4}")
}

// ============================================================================
// COMPOSITE KEYS
// ============================================================================

/// Identity of one stored row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PrimaryKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl PrimaryKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// Key pair a row exposes to one secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IndexKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl IndexKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// Which key a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Index {
    Primary,
    Gsi1,
    Gsi2,
}

/// Every key a stored row carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CompositeKey {
    pub partition_key: String,
    pub sort_key: String,
    pub gsi1: Option<IndexKey>,
    pub gsi2: Option<IndexKey>,
}

impl CompositeKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            gsi1: None,
            gsi2: None,
        }
    }

    pub fn with_gsi1(
        mut self,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        self.gsi1 = Some(IndexKey::new(partition_key, sort_key));
        self
    }

    pub fn with_gsi2(
        mut self,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        self.gsi2 = Some(IndexKey::new(partition_key, sort_key));
        self
    }

    pub fn primary(&self) -> PrimaryKey {
        PrimaryKey::new(self.partition_key.clone(), self.sort_key.clone())
    }

    /// The key pair this row exposes to `index`, if it participates in it.
    pub fn index_key(&self, index: Index) -> Option<IndexKey> {
        match index {
            Index::Primary => Some(IndexKey::new(
                self.partition_key.clone(),
                self.sort_key.clone(),
            )),
            Index::Gsi1 => self.gsi1.clone(),
            Index::Gsi2 => self.gsi2.clone(),
        }
    }
}

// ============================================================================
// LAYOUT HELPERS
// ============================================================================

/// Partition holding a document, its versions, tags and attributes.
pub fn document_partition(tenant: &Tenant, document_id: &str) -> String {
    key(tenant, &format!("{PREFIX_DOCS}{document_id}"))
}

/// GSI1 partition listing documents inserted on `date` (`yyyy-mm-dd`).
pub fn document_date_partition(tenant: &Tenant, date: &str) -> String {
    key(tenant, &format!("{PREFIX_DOCUMENT_DATE}{date}"))
}

/// GSI2 partition listing the sub-documents of `parent_id`.
pub fn children_partition(tenant: &Tenant, parent_id: &str) -> String {
    key(tenant, &format!("{PREFIX_CHILDREN}{parent_id}"))
}

/// GSI1 partition holding every value of an attribute key (or composite key).
pub fn attribute_partition(tenant: &Tenant, attribute_key: &str) -> String {
    key(tenant, &format!("{PREFIX_DOCS_ATTRIBUTE}{attribute_key}"))
}

/// GSI1 partition for an exact tag key/value match.
pub fn tag_value_partition(tenant: &Tenant, tag_key: &str, value: &str) -> String {
    key(tenant, &format!("{PREFIX_TAG}{tag_key}{DELIMITER}{value}"))
}

/// GSI2 partition listing every value of a tag key.
pub fn tag_key_partition(tenant: &Tenant, tag_key: &str) -> String {
    key(tenant, &format!("{PREFIX_TAG}{tag_key}"))
}

/// Sort key of an archived document version.
pub fn version_sort_key(version: u32) -> String {
    format!("{SK_DOCUMENT_VERSION_PREFIX}{version}")
}

/// Parse the version number back out of an archived sort key.
pub fn parse_version_sort_key(sort_key: &str) -> Option<u32> {
    sort_key
        .strip_prefix(SK_DOCUMENT_VERSION_PREFIX)
        .and_then(|n| n.parse().ok())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn site(s: &str) -> Tenant {
        Tenant::site(s).expect("valid site")
    }

    #[test]
    fn test_default_tenant_keys_are_bare() {
        assert_eq!(key(&Tenant::Default, "docs#1"), "docs#1");
        assert_eq!(decode_tenant("docs#1"), None);
    }

    #[test]
    fn test_site_tenant_prefix() {
        let t = site("finance");
        assert_eq!(key(&t, "docs#1"), "finance/docs#1");
        assert_eq!(decode_id("finance/docs#1"), "docs#1");
        assert_eq!(decode_tenant("finance/docs#1"), Some(t));
    }

    #[test]
    fn test_encode_none_is_none() {
        assert_eq!(encode(&site("finance"), None), None);
        assert_eq!(encode(&Tenant::Default, None), None);
        assert_eq!(encode(&Tenant::Default, Some("x")), Some("x".to_string()));
    }

    #[test]
    fn test_decode_strips_one_segment() {
        assert_eq!(decode_id("a/b/c"), "b/c");
        assert_eq!(decode_id("default/abc"), "abc");
        assert_eq!(decode_tenant("default/abc"), None);
    }

    #[test]
    fn test_decode_misreads_default_ids_with_slashes() {
        assert_eq!(decode_id("folders#a/b"), "b");
        assert_eq!(decode_tenant("folders#a/b"), Some(site("folders#a")));
        assert_eq!(rebase(&Tenant::Default, "folders#a/b"), "folders#a/b");
        assert_eq!(rebase(&site("acme"), "acme/folders#a/b"), "folders#a/b");
    }

    #[test]
    fn test_rebase_only_matching_tenant() {
        let t = site("finance");
        assert_eq!(rebase(&t, "finance/docs#1"), "docs#1");
        assert_eq!(rebase(&t, "docs#1"), "docs#1");
        assert_eq!(rebase(&t, "legal/docs#1"), "legal/docs#1");
        assert_eq!(rebase(&t, "financeX/docs#1"), "financeX/docs#1");
        assert_eq!(rebase(&Tenant::Default, "finance/docs#1"), "finance/docs#1");
    }

    #[test]
    fn test_tenant_parse() {
        assert_eq!(Tenant::parse(None), Ok(Tenant::Default));
        assert_eq!(Tenant::parse(Some("default")), Ok(Tenant::Default));
        assert_eq!(Tenant::parse(Some("acme")), Ok(Tenant::Site("acme".into())));
        assert!(Tenant::parse(Some("")).is_err());
        assert!(Tenant::parse(Some("a/b")).is_err());
    }

    #[test]
    fn test_format_number_fixed_width() {
        assert_eq!(format_number(20100101.0), "000000020100101.0000");
        assert_eq!(format_number(0.5), "000000000000000.5000");
        assert_eq!(format_number(123.45678), "000000000000123.4568");
        assert!(format_number(9.0) < format_number(10.0));
    }

    #[test]
    fn test_version_sort_key_roundtrip() {
        assert_eq!(version_sort_key(2), "document#v2");
        assert_eq!(parse_version_sort_key("document#v12"), Some(12));
        assert_eq!(parse_version_sort_key("document"), None);
    }

    #[test]
    fn test_composite_key_index_access() {
        let key = CompositeKey::new("docs#1", "document").with_gsi1("docts#2024-01-01", "t#1");
        assert_eq!(
            key.index_key(Index::Gsi1),
            Some(IndexKey::new("docts#2024-01-01", "t#1"))
        );
        assert_eq!(key.index_key(Index::Gsi2), None);
        assert_eq!(key.primary(), PrimaryKey::new("docs#1", "document"));
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_id() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9#._-]{1,40}"
    }

    fn arb_site() -> impl Strategy<Value = Tenant> {
        "[a-z][a-z0-9-]{0,15}"
            .prop_filter("reserved", |s| s != DEFAULT_TENANT)
            .prop_map(Tenant::Site)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_site_roundtrip(tenant in arb_site(), id in arb_id()) {
            let encoded = key(&tenant, &id);
            prop_assert_eq!(decode_id(&encoded), id.as_str());
            prop_assert_eq!(decode_tenant(&encoded), Some(tenant));
        }

        #[test]
        fn prop_default_roundtrip(id in arb_id()) {
            let encoded = key(&Tenant::Default, &id);
            prop_assert_eq!(&encoded, &id);
            prop_assert_eq!(decode_tenant(&encoded), None);
        }

        #[test]
        fn prop_rebase_idempotent(tenant in arb_site(), id in arb_id()) {
            let encoded = key(&tenant, &id);
            let once = rebase(&tenant, &encoded);
            prop_assert_eq!(&once, &id);
            prop_assert_eq!(rebase(&tenant, &once), once);
        }

        #[test]
        fn prop_number_order_preserved(a in 0.0f64..1.0e12, b in 0.0f64..1.0e12) {
            let (fa, fb) = (format_number(a), format_number(b));
            prop_assert_eq!(fa.len(), 20);
            if b - a > 0.001 {
                prop_assert!(fa < fb);
            }
        }
    }
}
