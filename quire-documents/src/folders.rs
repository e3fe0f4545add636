//! Folder browsing.

use crate::store::DocumentStore;
use quire_core::{FolderNode, QuireResult, Tenant};
use quire_storage::{DocumentTable, EphemeralCache, Page, PageRequest};

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Direct children of the folder at `path`, folders before files.
    /// An empty path lists the root.
    pub async fn list_folder(
        &self,
        tenant: &Tenant,
        path: &str,
        page: &PageRequest,
    ) -> QuireResult<Page<FolderNode>> {
        let cursor = self.pages.resolve(page).await?;
        let listing = self
            .folders
            .list_folder(tenant, path, cursor.limit(), cursor.start_key())
            .await?;
        let links = self
            .pages
            .complete(&cursor, listing.last_evaluated_key)
            .await?;
        Ok(Page::new(listing.nodes, links))
    }

    /// The leaf node filing `document_id`, if it has a path.
    pub async fn folder_of_document(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Option<FolderNode>> {
        self.folders.folder_of_document(tenant, document_id).await
    }

    pub async fn delete_empty_folder(&self, tenant: &Tenant, path: &str) -> QuireResult<()> {
        self.folders.delete_empty_folder(tenant, path).await
    }
}
