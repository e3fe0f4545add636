//! The store type and the plumbing its operations share.

use quire_core::keys;
use quire_core::{
    Document, Index, Item, PrimaryKey, QuireConfig, QuireError, QuireResult, RecordKind,
    StorageError, Tenant,
};
use quire_storage::{
    query_all, BatchReadCoalescer, DocumentTable, EphemeralCache, FolderIndex, KeyMover, Page,
    PageRequest, PaginationManager, QueryRequest, SortKeyCondition,
};
use std::sync::Arc;

/// Document metadata store over a partition/sort-key table.
///
/// Holds no state of its own beyond the injected table and pagination
/// cache. Writes to one document are read-then-write; callers must not run
/// two writers for the same document at once.
pub struct DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    pub(crate) table: Arc<T>,
    pub(crate) config: QuireConfig,
    pub(crate) batch: BatchReadCoalescer,
    pub(crate) folders: FolderIndex<T>,
    pub(crate) mover: KeyMover<T>,
    pub(crate) pages: PaginationManager<C>,
}

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Build a store, rejecting an invalid configuration.
    pub fn new(table: Arc<T>, cache: Arc<C>, config: QuireConfig) -> QuireResult<Self> {
        config.validate()?;
        tracing::debug!(
            table = %table.table_name(),
            batch_get_max = config.batch_get_max,
            composite_keys = config.composite_keys.len(),
            "Creating document store"
        );
        Ok(Self {
            batch: BatchReadCoalescer::new(config.batch_get_max),
            folders: FolderIndex::new(Arc::clone(&table)),
            mover: KeyMover::new(Arc::clone(&table)),
            pages: PaginationManager::new(cache, &config),
            table,
            config,
        })
    }

    pub fn config(&self) -> &QuireConfig {
        &self.config
    }

    pub fn table(&self) -> &T {
        self.table.as_ref()
    }

    /// Run `request` as one page of a paginated listing.
    pub(crate) async fn paged_query(
        &self,
        request: QueryRequest,
        page: &PageRequest,
    ) -> QuireResult<Page<Item>> {
        let cursor = self.pages.resolve(page).await?;
        let request = request
            .with_limit(cursor.limit())
            .with_start_key(cursor.start_key());
        let result = self.table.query(&request).await?;
        let links = self.pages.complete(&cursor, result.last_evaluated_key).await?;
        Ok(Page::new(result.items, links))
    }

    /// Every row in a document's partition whose sort key starts with `prefix`.
    pub(crate) async fn partition_rows(
        &self,
        partition_key: String,
        prefix: &str,
    ) -> QuireResult<Vec<Item>> {
        let request = QueryRequest::new(Index::Primary, partition_key)
            .with_condition(SortKeyCondition::BeginsWith(prefix.to_string()));
        query_all(self.table.as_ref(), request).await
    }

    /// The live document, or `NotFound`.
    pub(crate) async fn require_document(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Document> {
        self.load_document(tenant, document_id)
            .await?
            .ok_or_else(|| {
                QuireError::from(StorageError::NotFound {
                    entity: RecordKind::Document,
                    id: document_id.to_string(),
                })
            })
    }

    pub(crate) async fn load_document(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Option<Document>> {
        let key = PrimaryKey::new(
            keys::document_partition(tenant, document_id),
            keys::SK_DOCUMENT,
        );
        Ok(self.table.get_item(&key).await?.and_then(Item::into_document))
    }

    pub(crate) async fn delete_rows(&self, items: &[Item]) -> QuireResult<usize> {
        let mut removed = 0;
        for item in items {
            if self.table.delete_item(&item.key.primary()).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
