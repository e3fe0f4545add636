//! Partition/sort-key table contract and its in-memory implementation.

use async_trait::async_trait;
use quire_core::{
    CompositeKey, Index, IndexKey, Item, PrimaryKey, QuireResult, StorageError,
    BACKEND_BATCH_GET_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

// ============================================================================
// QUERY TYPES
// ============================================================================

/// Condition on the sort key of the queried index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    Equals(String),
    BeginsWith(String),
    /// Inclusive on both ends.
    Between(String, String),
}

impl SortKeyCondition {
    pub fn matches(&self, sort_key: &str) -> bool {
        match self {
            SortKeyCondition::Equals(v) => sort_key == v,
            SortKeyCondition::BeginsWith(prefix) => sort_key.starts_with(prefix.as_str()),
            SortKeyCondition::Between(start, end) => {
                sort_key >= start.as_str() && sort_key <= end.as_str()
            }
        }
    }
}

/// Position to resume a query after. Opaque to API consumers; only the
/// pagination layer stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageKey {
    pub primary: PrimaryKey,
    /// Index position when the query ran against a secondary index.
    pub index: Option<IndexKey>,
}

/// Single-partition query. The partition key must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub index: Index,
    pub partition_key: String,
    pub condition: Option<SortKeyCondition>,
    pub limit: usize,
    pub start_key: Option<PageKey>,
    pub scan_forward: bool,
}

impl QueryRequest {
    pub fn new(index: Index, partition_key: impl Into<String>) -> Self {
        Self {
            index,
            partition_key: partition_key.into(),
            condition: None,
            limit: BACKEND_BATCH_GET_LIMIT,
            start_key: None,
            scan_forward: true,
        }
    }

    pub fn with_condition(mut self, condition: SortKeyCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_start_key(mut self, start_key: Option<PageKey>) -> Self {
        self.start_key = start_key;
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Set when more rows follow this page.
    pub last_evaluated_key: Option<PageKey>,
}

// ============================================================================
// TABLE TRAIT
// ============================================================================

/// Partition/sort-key backend the store runs against.
///
/// Implementations must be thread-safe. `batch_get` may be called
/// concurrently with up to `max_batch_size()` keys per call.
#[async_trait]
pub trait DocumentTable: Send + Sync {
    /// Collection that `put_item`, `get_item`, `delete_item` and `query` use.
    fn table_name(&self) -> &str;

    /// Most keys accepted by one `batch_get` call.
    fn max_batch_size(&self) -> usize {
        BACKEND_BATCH_GET_LIMIT
    }

    /// Insert or overwrite the row at the item's primary key.
    async fn put_item(&self, item: Item) -> QuireResult<()>;

    async fn get_item(&self, key: &PrimaryKey) -> QuireResult<Option<Item>>;

    /// Returns whether a row was removed.
    async fn delete_item(&self, key: &PrimaryKey) -> QuireResult<bool>;

    /// Range query within one partition of `request.index`, ordered by that
    /// index's sort key.
    async fn query(&self, request: &QueryRequest) -> QuireResult<QueryPage>;

    /// Fetch up to `max_batch_size()` rows from `collection`. Missing keys
    /// are simply absent from the result.
    async fn batch_get(&self, collection: &str, keys: &[PrimaryKey]) -> QuireResult<Vec<Item>>;
}

/// Drain every page of `request`.
pub async fn query_all<T: DocumentTable + ?Sized>(
    table: &T,
    request: QueryRequest,
) -> QuireResult<Vec<Item>> {
    let mut request = request;
    let mut items = Vec::new();
    loop {
        let page = table.query(&request).await?;
        items.extend(page.items);
        match page.last_evaluated_key {
            Some(key) => request.start_key = Some(key),
            None => return Ok(items),
        }
    }
}

// ============================================================================
// IN-MEMORY TABLE
// ============================================================================

type Rows = BTreeMap<PrimaryKey, Item>;

/// In-memory table for tests and local development.
///
/// Holds the primary collection plus any number of side collections that
/// only `batch_get` reads. Counts batch calls so tests can assert chunking.
#[derive(Debug)]
pub struct InMemoryTable {
    name: String,
    max_batch_size: usize,
    collections: RwLock<HashMap<String, Rows>>,
    batch_calls: AtomicUsize,
}

impl Default for InMemoryTable {
    fn default() -> Self {
        Self::new("documents")
    }
}

impl InMemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_batch_size: BACKEND_BATCH_GET_LIMIT,
            collections: RwLock::new(HashMap::new()),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Write a row into any collection, bypassing the primary-table API.
    pub async fn seed(&self, collection: &str, item: Item) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(item.key.primary(), item);
    }

    /// Number of `batch_get` calls served so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Rows currently in the primary collection.
    pub async fn len(&self) -> usize {
        let collections = self.collections.read().await;
        collections.get(&self.name).map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every row of the primary collection, in primary key order.
    pub async fn dump(&self) -> Vec<Item> {
        let collections = self.collections.read().await;
        collections
            .get(&self.name)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}

fn position(key: &CompositeKey, index: Index) -> Option<(IndexKey, PrimaryKey)> {
    key.index_key(index).map(|ik| (ik, key.primary()))
}

#[async_trait]
impl DocumentTable for InMemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn put_item(&self, item: Item) -> QuireResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(self.name.clone())
            .or_default()
            .insert(item.key.primary(), item);
        Ok(())
    }

    async fn get_item(&self, key: &PrimaryKey) -> QuireResult<Option<Item>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&self.name)
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    async fn delete_item(&self, key: &PrimaryKey) -> QuireResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&self.name)
            .and_then(|rows| rows.remove(key))
            .is_some())
    }

    async fn query(&self, request: &QueryRequest) -> QuireResult<QueryPage> {
        let collections = self.collections.read().await;
        let Some(rows) = collections.get(&self.name) else {
            return Ok(QueryPage::default());
        };

        let mut matched: Vec<((IndexKey, PrimaryKey), &Item)> = rows
            .values()
            .filter_map(|item| position(&item.key, request.index).map(|pos| (pos, item)))
            .filter(|((ik, _), _)| ik.partition_key == request.partition_key)
            .filter(|((ik, _), _)| {
                request
                    .condition
                    .as_ref()
                    .map_or(true, |c| c.matches(&ik.sort_key))
            })
            .collect();

        matched.sort_by(|(a, _), (b, _)| (&a.0.sort_key, &a.1).cmp(&(&b.0.sort_key, &b.1)));
        if !request.scan_forward {
            matched.reverse();
        }

        if let Some(start) = &request.start_key {
            let start_index = start.index.clone().unwrap_or_else(|| {
                IndexKey::new(
                    start.primary.partition_key.clone(),
                    start.primary.sort_key.clone(),
                )
            });
            let start_pos = (start_index, start.primary.clone());
            let resume_at = matched
                .iter()
                .position(|(pos, _)| {
                    let ordering =
                        (&pos.0.sort_key, &pos.1).cmp(&(&start_pos.0.sort_key, &start_pos.1));
                    if request.scan_forward {
                        ordering.is_gt()
                    } else {
                        ordering.is_lt()
                    }
                })
                .unwrap_or(matched.len());
            matched.drain(..resume_at);
        }

        let limit = request.limit.max(1);
        let has_more = matched.len() > limit;
        matched.truncate(limit);

        let last_evaluated_key = if has_more {
            matched.last().map(|((ik, pk), _)| PageKey {
                primary: pk.clone(),
                index: (request.index != Index::Primary).then(|| ik.clone()),
            })
        } else {
            None
        };

        Ok(QueryPage {
            items: matched.into_iter().map(|(_, item)| item.clone()).collect(),
            last_evaluated_key,
        })
    }

    async fn batch_get(&self, collection: &str, keys: &[PrimaryKey]) -> QuireResult<Vec<Item>> {
        if keys.len() > self.max_batch_size {
            return Err(StorageError::BatchTooLarge {
                requested: keys.len(),
                max: self.max_batch_size,
            }
            .into());
        }
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        let collections = self.collections.read().await;
        let Some(rows) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(keys.iter().filter_map(|k| rows.get(k).cloned()).collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
