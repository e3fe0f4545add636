//! QUIRE Test Utilities
//!
//! Centralized test infrastructure for the QUIRE workspace:
//! - Proptest generators for keys, records and search criteria
//! - In-memory backends with a controllable clock
//! - Test fixtures for common scenarios
//! - Custom assertions for QUIRE error shapes
//! - One-time tracing setup for tests

// Re-export in-memory collaborators from their source crate
pub use quire_storage::{
    DocumentTable, EphemeralCache, InMemoryEphemeralCache, InMemoryTable, ManualClock, Page,
    PageRequest,
};

// Re-export core types for convenience
pub use quire_core::{
    Attribute, AttributeValue, CompositeKey, Document, FolderNode, FolderNodeKind, IndexKey, Item,
    QuireConfig, QuireError, QuireResult, RangeKind, RecordKind, SearchAttributeCriteria,
    SearchRange, StorageError, Tag, TagKind, TagValue, Tenant, Timestamp,
};

use chrono::{TimeZone, Utc};
use std::sync::{Arc, Once};

/// Pagination cache driven by a [`ManualClock`].
pub type TestCache = InMemoryEphemeralCache<Arc<ManualClock>>;

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Table, cache and clock wired together for one test.
#[derive(Debug, Clone)]
pub struct TestBackend {
    pub table: Arc<InMemoryTable>,
    pub cache: Arc<TestCache>,
    pub clock: Arc<ManualClock>,
}

impl TestBackend {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(fixtures::fixed_now()));
        Self {
            table: Arc::new(InMemoryTable::default()),
            cache: Arc::new(InMemoryEphemeralCache::with_clock(clock.clone())),
            clock,
        }
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a fmt subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating QUIRE types.

    use super::*;
    use proptest::prelude::*;

    // === Identity Generators ===

    /// Generate a tenant: the default one or a named site.
    pub fn arb_tenant() -> impl Strategy<Value = Tenant> {
        prop_oneof![
            Just(Tenant::Default),
            "[a-z][a-z0-9-]{0,11}".prop_map(|s| Tenant::site(s).unwrap_or_default()),
        ]
    }

    /// Generate a document id without key delimiters.
    pub fn arb_document_id() -> impl Strategy<Value = String> {
        "[a-z0-9]{4,12}"
    }

    /// Generate a Timestamp (DateTime<Utc>) at millisecond precision.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1_577_836_800_000i64..1_893_456_000_000i64).prop_map(|millis| {
            Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
        })
    }

    // === Path Generators ===

    /// Generate one path segment.
    pub fn arb_segment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,10}(\\.[a-z]{2,4})?"
    }

    /// Generate an absolute document path with 1 to 6 segments.
    pub fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_segment(), 1..6).prop_map(|parts| format!("/{}", parts.join("/")))
    }

    // === Record Generators ===

    pub fn arb_document() -> impl Strategy<Value = Document> {
        (
            arb_document_id(),
            arb_timestamp(),
            proptest::option::of(arb_path()),
            proptest::option::of("(application|text|image)/[a-z]{3,6}"),
            proptest::option::of(0u64..10_000_000),
        )
            .prop_map(|(id, at, path, content_type, length)| {
                let mut doc = Document::new(id, "test-user", at);
                doc.path = path;
                doc.content_type = content_type;
                doc.content_length = length;
                doc
            })
    }

    pub fn arb_tag_value() -> impl Strategy<Value = TagValue> {
        prop_oneof![
            Just(TagValue::None),
            "[a-z0-9]{1,8}".prop_map(TagValue::Single),
            prop::collection::vec("[a-z0-9]{1,8}", 1..4).prop_map(TagValue::Many),
        ]
    }

    pub fn arb_tag(document_id: String) -> impl Strategy<Value = Tag> {
        ("[a-z]{1,8}", arb_tag_value(), arb_timestamp()).prop_map(move |(key, value, at)| {
            Tag::new(document_id.clone(), key, value, "test-user", at)
        })
    }

    /// Generate any non-composite attribute value. Numbers are finite.
    pub fn arb_attribute_value() -> impl Strategy<Value = AttributeValue> {
        prop_oneof![
            "[a-z0-9]{1,8}".prop_map(AttributeValue::String),
            (-1.0e9f64..1.0e9f64).prop_map(AttributeValue::Number),
            any::<bool>().prop_map(AttributeValue::Boolean),
            Just(AttributeValue::KeyOnly),
            "[a-z]{1,8}".prop_map(AttributeValue::Classification),
            "[a-z0-9-]{1,8}".prop_map(AttributeValue::Entity),
            "[a-z0-9-]{1,8}".prop_map(AttributeValue::Relationship),
        ]
    }

    pub fn arb_attribute(document_id: String) -> impl Strategy<Value = Attribute> {
        ("[a-z]{1,8}", arb_attribute_value(), arb_timestamp()).prop_map(move |(key, value, at)| {
            Attribute::new(document_id.clone(), key, value, "test-user", at)
        })
    }

    // === Key Generators ===

    /// Generate a composite key whose partitions are tenant-scoped, with or
    /// without index entries.
    pub fn arb_composite_key() -> impl Strategy<Value = CompositeKey> {
        (
            arb_tenant(),
            "[a-z]{2,6}#[a-z0-9]{1,8}",
            "[a-z]{2,8}(#[a-z0-9]{1,4})?",
            proptest::option::of(("[a-z]{2,6}#[a-z0-9]{1,8}", "[a-z0-9#:.-]{1,16}")),
            proptest::option::of(("[a-z]{2,6}#[a-z0-9]{1,8}", "[a-z0-9#]{1,16}")),
        )
            .prop_map(|(tenant, pk, sk, gsi1, gsi2)| {
                let scoped = |id: &str| quire_core::keys::key(&tenant, id);
                let mut key = CompositeKey::new(scoped(&pk), sk);
                if let Some((p, s)) = gsi1 {
                    key = key.with_gsi1(scoped(&p), s);
                }
                if let Some((p, s)) = gsi2 {
                    key = key.with_gsi2(scoped(&p), s);
                }
                key
            })
    }

    // === Search Generators ===

    /// Generate an eq-only search over `keys`.
    pub fn arb_eq_search(keys: Vec<String>) -> impl Strategy<Value = Vec<SearchAttributeCriteria>> {
        prop::collection::vec("[a-z0-9]{1,6}", keys.len()).prop_map(move |values| {
            keys.iter()
                .zip(values)
                .map(|(k, v)| SearchAttributeCriteria::new(k.clone()).eq(v))
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// 2024-03-05T10:30:00Z, the instant every fixture is stamped with.
    pub fn fixed_now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Default config plus a `category::year` composite key.
    pub fn test_config() -> QuireConfig {
        QuireConfig::default().with_composite_key(["category", "year"])
    }

    pub fn acme() -> Tenant {
        Tenant::Site("acme".to_string())
    }

    /// A PDF filed at `/reports/{id}.pdf`.
    pub fn sample_document(document_id: &str) -> Document {
        Document::new(document_id, "joe", fixed_now())
            .with_path(format!("/reports/{document_id}.pdf"))
            .with_content_type("application/pdf")
            .with_content_length(1024)
    }

    /// A document with no path, inserted `minutes` after [`fixed_now`].
    pub fn unfiled_document(document_id: &str, minutes: i64) -> Document {
        Document::new(
            document_id,
            "joe",
            fixed_now() + chrono::Duration::minutes(minutes),
        )
    }

    pub fn string_attribute(document_id: &str, key: &str, value: &str) -> Attribute {
        Attribute::new(
            document_id,
            key,
            AttributeValue::String(value.to_string()),
            "joe",
            fixed_now(),
        )
    }

    pub fn number_attribute(document_id: &str, key: &str, value: f64) -> Attribute {
        Attribute::new(document_id, key, AttributeValue::Number(value), "joe", fixed_now())
    }

    pub fn single_tag(document_id: &str, key: &str, value: &str) -> Tag {
        Tag::new(
            document_id,
            key,
            TagValue::Single(value.to_string()),
            "joe",
            fixed_now(),
        )
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for QUIRE-specific validation.

    use super::*;

    /// Assert that a QuireResult is a Validation error reported against `key`.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &QuireResult<T>, key: &str) {
        match result {
            Err(QuireError::Validation(errors)) => {
                assert!(
                    errors.has_key(key),
                    "Expected validation error on {key}, got: {errors}"
                );
            }
            other => panic!("Expected Validation error on {key}, got: {other:?}"),
        }
    }

    /// Assert that a QuireResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &QuireResult<T>, entity: RecordKind) {
        match result {
            Err(QuireError::Storage(StorageError::NotFound { entity: e, .. })) => {
                assert_eq!(*e, entity, "Wrong entity in NotFound error");
            }
            other => panic!("Expected NotFound error for {entity:?}, got: {other:?}"),
        }
    }

    /// Assert that a QuireResult is a Precondition storage error.
    #[track_caller]
    pub fn assert_precondition<T: std::fmt::Debug>(result: &QuireResult<T>) {
        match result {
            Err(QuireError::Storage(StorageError::Precondition { .. })) => {}
            other => panic!("Expected Precondition error, got: {other:?}"),
        }
    }

    /// Assert that every key in `items` belongs to `tenant`.
    #[track_caller]
    pub fn assert_tenant_scoped(items: &[Item], tenant: &Tenant) {
        for item in items {
            let key = &item.key;
            let partitions = std::iter::once(key.partition_key.as_str())
                .chain(key.gsi1.as_ref().map(|k| k.partition_key.as_str()))
                .chain(key.gsi2.as_ref().map(|k| k.partition_key.as_str()));
            for partition in partitions {
                assert!(
                    scoped_to(tenant, partition),
                    "Partition {partition} is not scoped to {tenant}"
                );
            }
        }
    }

    /// Site keys open with `site/`. Default keys open with a key prefix, so
    /// whatever precedes their first `/` still contains a `#`.
    fn scoped_to(tenant: &Tenant, partition: &str) -> bool {
        match tenant.site_id() {
            Some(site) => partition
                .strip_prefix(site)
                .map_or(false, |rest| rest.starts_with('/')),
            None => partition
                .split('/')
                .next()
                .map_or(false, |head| head.contains('#')),
        }
    }
}
