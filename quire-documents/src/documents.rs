//! Document records: save, lookups, versions and listings.

use crate::store::DocumentStore;
use chrono::NaiveDate;
use quire_core::keys::{self, TENANT_DELIMITER};
use quire_core::{
    Document, Index, Item, PrimaryKey, QuireResult, RecordKind, StorageError, Tenant,
    ValidationError, ValidationErrors,
};
use quire_storage::{
    query_all, BatchReadRequest, DocumentTable, EphemeralCache, Page, PageRequest, QueryRequest,
};
use std::collections::{HashMap, HashSet};

fn validate_document(document: &Document) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if document.document_id.trim().is_empty() {
        errors.push(ValidationError::new("documentId", "documentId is required"));
    } else if document.document_id.contains(TENANT_DELIMITER) {
        errors.push(ValidationError::new("documentId", "documentId must not contain '/'"));
    }
    if document.user_id.trim().is_empty() {
        errors.push(ValidationError::new("userId", "userId is required"));
    }
    if document.belongs_to_document_id.as_deref() == Some(document.document_id.as_str()) {
        errors.push(ValidationError::new(
            "belongsToDocumentId",
            "a document cannot belong to itself",
        ));
    }
    errors.into_result()
}

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Write `document` as the live record for its id.
    ///
    /// Overwriting an existing document archives the stored record as its
    /// current version and bumps the live version. The original insert date
    /// is kept so the date listing does not move. When the path changes the
    /// old folder leaf is removed before the new path is indexed.
    pub async fn save_document(
        &self,
        tenant: &Tenant,
        document: Document,
    ) -> QuireResult<Document> {
        validate_document(&document)?;
        let mut document = document;
        document.tenant = tenant.clone();

        if let Some(parent) = &document.belongs_to_document_id {
            if self.load_document(tenant, parent).await?.is_none() {
                return Err(StorageError::NotFound {
                    entity: RecordKind::Document,
                    id: parent.clone(),
                }
                .into());
            }
        }

        if let Some(existing) = self.load_document(tenant, &document.document_id).await? {
            document.version = Some(self.mover.archive(&existing).await?);
            document.inserted_date = existing.inserted_date;

            if let Some(old_path) = existing.path.as_deref() {
                if existing.path != document.path {
                    self.folders
                        .remove_leaf(tenant, &document.document_id, old_path)
                        .await?;
                }
            }
        }

        self.folders
            .index(tenant, &document.document_id, document.path.as_deref())
            .await?;
        self.table.put_item(document.clone().into_item()).await?;

        tracing::debug!(
            tenant = %tenant,
            document_id = %document.document_id,
            version = document.current_version(),
            "Saved document"
        );
        Ok(document)
    }

    pub async fn find_document(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Option<Document>> {
        self.load_document(tenant, document_id).await
    }

    /// Batch lookup. Missing ids are skipped; the rest come back in the
    /// order requested, once each.
    pub async fn find_documents(
        &self,
        tenant: &Tenant,
        document_ids: &[String],
    ) -> QuireResult<Vec<Document>> {
        let collection = self.config.documents_table.as_str();
        let mut request = BatchReadRequest::new();
        request.extend(
            collection,
            document_ids.iter().map(|id| {
                PrimaryKey::new(keys::document_partition(tenant, id), keys::SK_DOCUMENT)
            }),
        );

        let mut found: HashMap<String, Document> = self
            .batch
            .execute(self.table.as_ref(), &request)
            .await?
            .remove(collection)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Item::into_document)
            .map(|doc| (doc.document_id.clone(), doc))
            .collect();

        Ok(document_ids
            .iter()
            .filter_map(|id| found.remove(id))
            .collect())
    }

    /// The document as it was at `version`, whether archived or live.
    pub async fn find_document_version(
        &self,
        tenant: &Tenant,
        document_id: &str,
        version: u32,
    ) -> QuireResult<Option<Document>> {
        if let Some(live) = self.load_document(tenant, document_id).await? {
            if live.current_version() == version {
                return Ok(Some(live));
            }
        }
        self.mover.find_version(tenant, document_id, version).await
    }

    /// Archived versions, oldest first. The live record is not included.
    pub async fn list_document_versions(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Vec<Document>> {
        self.mover.list_versions(tenant, document_id).await
    }

    /// Live sub-documents of `parent_id`.
    pub async fn find_child_documents(
        &self,
        tenant: &Tenant,
        parent_id: &str,
    ) -> QuireResult<Vec<Document>> {
        let request = QueryRequest::new(Index::Gsi2, keys::children_partition(tenant, parent_id));
        Ok(query_all(self.table.as_ref(), request)
            .await?
            .into_iter()
            .filter_map(Item::into_document)
            .collect())
    }

    /// Documents inserted on `date`, oldest first.
    pub async fn list_documents_by_date(
        &self,
        tenant: &Tenant,
        date: NaiveDate,
        page: &PageRequest,
    ) -> QuireResult<Page<Document>> {
        let partition = keys::document_date_partition(tenant, &date.format("%Y-%m-%d").to_string());
        let page = self
            .paged_query(QueryRequest::new(Index::Gsi1, partition), page)
            .await?;
        Ok(documents_only(page))
    }
}

/// Keep the document rows of a page, once per id.
pub(crate) fn documents_only(page: Page<Item>) -> Page<Document> {
    let mut seen = HashSet::new();
    page.filter_map(|item| {
        item.into_document()
            .filter(|doc| seen.insert(doc.document_id.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_validate_document() {
        let ok = Document::new("d1", "joe", Utc::now());
        assert!(validate_document(&ok).is_ok());

        let blank = Document::new(" ", "", Utc::now());
        let errors = validate_document(&blank).expect_err("invalid");
        assert!(errors.has_key("documentId"));
        assert!(errors.has_key("userId"));

        let slash = Document::new("a/b", "joe", Utc::now());
        assert!(validate_document(&slash).is_err());

        let own_parent = Document::new("d1", "joe", Utc::now()).with_parent("d1");
        assert!(validate_document(&own_parent)
            .expect_err("invalid")
            .has_key("belongsToDocumentId"));
    }
}
