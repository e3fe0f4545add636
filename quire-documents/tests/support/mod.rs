//! Store construction shared by the integration suites.

#![allow(dead_code)]

use chrono::NaiveDate;
use quire_documents::{DocumentStore, InMemoryTable, QuireConfig};
use quire_test_utils::fixtures::test_config;
use quire_test_utils::{init_test_tracing, TestBackend, TestCache};

pub type TestStore = DocumentStore<InMemoryTable, TestCache>;

/// Store over a fresh backend with the fixture config.
pub fn store() -> (TestStore, TestBackend) {
    store_with(test_config())
}

pub fn store_with(config: QuireConfig) -> (TestStore, TestBackend) {
    init_test_tracing();
    let backend = TestBackend::new();
    let store = DocumentStore::new(backend.table.clone(), backend.cache.clone(), config)
        .expect("valid test config");
    (store, backend)
}

/// The calendar day every fixture is inserted on.
pub fn fixture_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date")
}

pub fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| id(item).to_string()).collect()
}
