//! Document versioning and the soft-delete key mover.

use crate::table::{query_all, DocumentTable, QueryRequest, SortKeyCondition};
use quire_core::keys::{
    self, parse_version_sort_key, version_sort_key, SK_DOCUMENT_VERSION_PREFIX,
};
use quire_core::{lifecycle, Document, Index, Item, PrimaryKey, QuireResult, Record, Tenant};
use std::sync::Arc;

/// Moves rows between their live, archived and soft-deleted keys.
///
/// Every operation is read-then-write. Callers serialize writers per
/// document.
pub struct KeyMover<T: DocumentTable + ?Sized> {
    table: Arc<T>,
}

impl<T: DocumentTable + ?Sized> Clone for KeyMover<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T: DocumentTable + ?Sized> KeyMover<T> {
    pub fn new(table: Arc<T>) -> Self {
        Self { table }
    }

    /// Copy `current` to its version key and return the version number the
    /// replacing live record must carry.
    pub async fn archive(&self, current: &Document) -> QuireResult<u32> {
        let version = current.current_version();
        let archived = Item::new(current.version_key(version), Record::Document(current.clone()));
        self.table.put_item(archived).await?;
        tracing::debug!(
            tenant = %current.tenant,
            document_id = %current.document_id,
            version,
            "Archived document version"
        );
        Ok(version + 1)
    }

    /// Archived versions of a document, oldest first.
    pub async fn list_versions(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Vec<Document>> {
        let partition = keys::document_partition(tenant, document_id);
        let request = QueryRequest::new(Index::Primary, partition)
            .with_condition(SortKeyCondition::BeginsWith(
                SK_DOCUMENT_VERSION_PREFIX.to_string(),
            ));

        let mut versions: Vec<(u32, Document)> = query_all(self.table.as_ref(), request)
            .await?
            .into_iter()
            .filter_map(|item| {
                let n = parse_version_sort_key(&item.key.sort_key)?;
                item.into_document().map(|doc| (n, doc))
            })
            .collect();
        // sort keys are unpadded, so v10 sorts before v2 as a string
        versions.sort_by_key(|(n, _)| *n);
        Ok(versions.into_iter().map(|(_, doc)| doc).collect())
    }

    /// The archived copy holding `version`.
    pub async fn find_version(
        &self,
        tenant: &Tenant,
        document_id: &str,
        version: u32,
    ) -> QuireResult<Option<Document>> {
        let key = PrimaryKey::new(
            keys::document_partition(tenant, document_id),
            version_sort_key(version),
        );
        Ok(self
            .table
            .get_item(&key)
            .await?
            .and_then(Item::into_document))
    }

    /// Move every item of `tenant` into the soft-deleted namespace. Returns
    /// how many rows moved.
    pub async fn soft_delete(&self, tenant: &Tenant, items: Vec<Item>) -> QuireResult<usize> {
        let moves: Vec<(PrimaryKey, Item)> = items
            .into_iter()
            .filter(|item| !lifecycle::is_soft_deleted(tenant, &item.key.partition_key))
            .map(|item| {
                let from = item.key.primary();
                let moved = Item::new(lifecycle::soft_delete(tenant, &item.key), item.record);
                (from, moved)
            })
            .collect();
        self.apply(moves, "Soft-deleted row").await
    }

    /// Move soft-deleted items back to their live keys.
    ///
    /// All keys are computed before anything is written; a single item
    /// without the marker fails the whole restore.
    pub async fn restore(&self, tenant: &Tenant, items: Vec<Item>) -> QuireResult<usize> {
        let mut moves = Vec::with_capacity(items.len());
        for item in items {
            let restored = match lifecycle::restore(tenant, &item.key) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(
                        partition_key = %item.key.partition_key,
                        sort_key = %item.key.sort_key,
                        error = %e,
                        "Rejected restore"
                    );
                    return Err(e.into());
                }
            };
            moves.push((item.key.primary(), Item::new(restored, item.record)));
        }
        self.apply(moves, "Restored row").await
    }

    async fn apply(
        &self,
        moves: Vec<(PrimaryKey, Item)>,
        action: &'static str,
    ) -> QuireResult<usize> {
        let count = moves.len();
        for (from, item) in moves {
            let to = item.key.primary();
            self.table.put_item(item).await?;
            self.table.delete_item(&from).await?;
            tracing::debug!(
                from_partition = %from.partition_key,
                from_sort = %from.sort_key,
                to_partition = %to.partition_key,
                to_sort = %to.sort_key,
                "{action}"
            );
        }
        Ok(count)
    }
}

// =============================================================================
// TESTS
// =============================================================================


// =============================================================================
// PROPERTY TESTS
// =============================================================================
