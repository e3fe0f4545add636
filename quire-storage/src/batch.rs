//! Batch read coalescing.
//!
//! Keys are collected per collection, de-duplicated, split into chunks no
//! larger than the backend's batch limit, and fetched concurrently.

use crate::table::DocumentTable;
use futures_util::future::try_join_all;
use quire_core::{Item, PrimaryKey, QuireResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Keys to read, grouped by collection. Adding a key twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReadRequest {
    keys: BTreeMap<String, BTreeSet<PrimaryKey>>,
}

impl BatchReadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, collection: &str, key: PrimaryKey) -> &mut Self {
        self.keys
            .entry(collection.to_string())
            .or_default()
            .insert(key);
        self
    }

    pub fn extend<I>(&mut self, collection: &str, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = PrimaryKey>,
    {
        self.keys
            .entry(collection.to_string())
            .or_default()
            .extend(keys);
        self
    }

    /// Distinct keys across all collections.
    pub fn len(&self) -> usize {
        self.keys.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows found, by collection. Collections with no hits are absent.
pub type BatchReadResult = HashMap<String, Vec<Item>>;

/// Issues chunked batch reads against a table.
#[derive(Debug, Clone, Copy)]
pub struct BatchReadCoalescer {
    chunk_size: usize,
}

impl BatchReadCoalescer {
    /// `chunk_size` is clamped to at least 1.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fetch every requested key. Chunks run concurrently; the first failed
    /// chunk fails the whole read. Each collection's rows come back in
    /// primary key order.
    pub async fn execute<T: DocumentTable + ?Sized>(
        &self,
        table: &T,
        request: &BatchReadRequest,
    ) -> QuireResult<BatchReadResult> {
        let chunk_size = self.chunk_size.min(table.max_batch_size().max(1));

        let calls = request.keys.iter().flat_map(|(collection, keys)| {
            let keys: Vec<PrimaryKey> = keys.iter().cloned().collect();
            keys.chunks(chunk_size)
                .map(|chunk| (collection.clone(), chunk.to_vec()))
                .collect::<Vec<_>>()
        });

        let fetches = calls.map(|(collection, chunk)| async move {
            tracing::debug!(
                collection = %collection,
                keys = chunk.len(),
                "Batch get chunk"
            );
            let items = table.batch_get(&collection, &chunk).await?;
            Ok::<_, quire_core::QuireError>((collection, items))
        });

        let mut merged: HashMap<String, BTreeMap<PrimaryKey, Item>> = HashMap::new();
        for (collection, items) in try_join_all(fetches).await? {
            if items.is_empty() {
                continue;
            }
            let rows = merged.entry(collection).or_default();
            for item in items {
                rows.insert(item.key.primary(), item);
            }
        }

        Ok(merged
            .into_iter()
            .map(|(collection, rows)| (collection, rows.into_values().collect()))
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================


// =============================================================================
// PROPERTY TESTS
// =============================================================================
