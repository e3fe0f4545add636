//! Delete, soft delete and restore.

use crate::documents::documents_only;
use crate::store::DocumentStore;
use chrono::NaiveDate;
use quire_core::keys::{self, SK_DOCUMENT};
use quire_core::{soft_delete_key, Document, Index, Item, QuireResult, StorageError, Tenant};
use quire_storage::{query_all, DocumentTable, EphemeralCache, Page, PageRequest, QueryRequest};

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Delete a document with its versions, tags, attributes, folder leaf
    /// and sub-documents.
    ///
    /// A soft delete moves every row under the soft-delete marker so
    /// [`DocumentStore::restore_document`] can bring it back; otherwise the
    /// rows are removed. Returns `false` when no live document exists.
    pub async fn delete_document(
        &self,
        tenant: &Tenant,
        document_id: &str,
        soft: bool,
    ) -> QuireResult<bool> {
        if self.load_document(tenant, document_id).await?.is_none() {
            return Ok(false);
        }

        let mut ids = vec![document_id.to_string()];
        let mut next = 0;
        while next < ids.len() {
            for child in self.find_child_documents(tenant, &ids[next]).await? {
                if !ids.contains(&child.document_id) {
                    ids.push(child.document_id);
                }
            }
            next += 1;
        }

        for id in &ids {
            let mut rows = self
                .owned_rows(keys::document_partition(tenant, id))
                .await?;
            if let Some(leaf) = self.folders.leaf_item(tenant, id).await? {
                rows.push(leaf);
            }

            if soft {
                self.mover.soft_delete(tenant, rows).await?;
            } else {
                self.delete_rows(&rows).await?;
            }
        }

        tracing::debug!(
            tenant = %tenant,
            document_id,
            documents = ids.len(),
            soft,
            "Deleted document"
        );
        Ok(true)
    }

    /// Bring back a soft-deleted document and its soft-deleted sub-documents.
    ///
    /// Every row key is checked before anything is written. Folder ancestors
    /// removed while the document was deleted are recreated. Returns `false`
    /// when nothing is soft-deleted under `document_id`.
    pub async fn restore_document(&self, tenant: &Tenant, document_id: &str) -> QuireResult<bool> {
        if self.load_document(tenant, document_id).await?.is_some() {
            return Err(StorageError::Precondition {
                reason: format!("document {document_id} already exists"),
            }
            .into());
        }

        let mut ids = vec![document_id.to_string()];
        let mut rows: Vec<Item> = Vec::new();
        let mut restored: Vec<Document> = Vec::new();
        let mut next = 0;

        while next < ids.len() {
            let id = ids[next].clone();
            next += 1;

            let owned = self
                .owned_rows(soft_delete_key(tenant, &keys::document_partition(tenant, &id)))
                .await?;
            if owned.is_empty() {
                continue;
            }
            let deleted_sort_key = soft_delete_key(&Tenant::Default, SK_DOCUMENT);
            restored.extend(
                owned
                    .iter()
                    .filter(|item| item.key.sort_key == deleted_sort_key)
                    .filter_map(Item::as_document)
                    .cloned(),
            );
            rows.extend(owned);
            if let Some(leaf) = self.folders.deleted_leaf_item(tenant, &id).await? {
                rows.push(leaf);
            }

            let children = QueryRequest::new(
                Index::Gsi2,
                soft_delete_key(tenant, &keys::children_partition(tenant, &id)),
            );
            for child in query_all(self.table.as_ref(), children).await? {
                if let Some(child_id) = child.document_id() {
                    if !ids.iter().any(|known| known == child_id) {
                        ids.push(child_id.to_string());
                    }
                }
            }
        }

        if rows.is_empty() {
            return Ok(false);
        }

        let moved = self.mover.restore(tenant, rows).await?;
        for document in &restored {
            self.folders
                .index(tenant, &document.document_id, document.path.as_deref())
                .await?;
        }

        tracing::debug!(
            tenant = %tenant,
            document_id,
            documents = restored.len(),
            rows = moved,
            "Restored document"
        );
        Ok(true)
    }

    /// Soft-deleted documents originally inserted on `date`.
    pub async fn list_deleted_documents(
        &self,
        tenant: &Tenant,
        date: NaiveDate,
        page: &PageRequest,
    ) -> QuireResult<Page<Document>> {
        let day = date.format("%Y-%m-%d").to_string();
        let partition = soft_delete_key(tenant, &keys::document_date_partition(tenant, &day));
        let page = self
            .paged_query(QueryRequest::new(Index::Gsi1, partition), page)
            .await?;
        Ok(documents_only(page))
    }

    async fn owned_rows(&self, partition_key: String) -> QuireResult<Vec<Item>> {
        query_all(
            self.table.as_ref(),
            QueryRequest::new(Index::Primary, partition_key),
        )
        .await
    }
}
