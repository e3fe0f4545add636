//! Folder hierarchy index over a [`DocumentTable`].
//!
//! Row generation lives in `quire_core::folder`; this module writes, lists,
//! looks up and removes those rows.

use crate::table::{query_all, DocumentTable, PageKey, QueryRequest, SortKeyCondition};
use quire_core::folder::{self, decode_item, folder_key, leaf_for, split_parent};
use quire_core::keys::{self, PREFIX_FOLDER_LOOKUP, PREFIX_FOLDER_NODE, SK_FOLDER_LOOKUP};
use quire_core::{
    soft_delete_key, FolderNode, Index, Item, PrimaryKey, QuireResult, RecordKind, StorageError,
    Tenant, ValidationError,
};
use std::sync::Arc;

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListing {
    /// Folders first, then files, each by name.
    pub nodes: Vec<FolderNode>,
    pub last_evaluated_key: Option<PageKey>,
}

/// Reads and writes folder and leaf rows.
pub struct FolderIndex<T: DocumentTable + ?Sized> {
    table: Arc<T>,
}

impl<T: DocumentTable + ?Sized> Clone for FolderIndex<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T: DocumentTable + ?Sized> FolderIndex<T> {
    pub fn new(table: Arc<T>) -> Self {
        Self { table }
    }

    /// Write the folder chain and leaf for `document_id` at `path`.
    /// Existing folder rows are overwritten with identical content.
    pub async fn index(
        &self,
        tenant: &Tenant,
        document_id: &str,
        path: Option<&str>,
    ) -> QuireResult<usize> {
        let items = folder::index_path(tenant, document_id, path);
        let written = items.len();
        for item in items {
            self.table.put_item(item).await?;
        }
        if written > 0 {
            tracing::debug!(
                tenant = %tenant,
                document_id,
                nodes = written,
                "Indexed folder path"
            );
        }
        Ok(written)
    }

    /// Remove the leaf for `document_id` at `path`. Ancestor folders stay.
    pub async fn remove_leaf(
        &self,
        tenant: &Tenant,
        document_id: &str,
        path: &str,
    ) -> QuireResult<bool> {
        let Some(leaf) = leaf_for(tenant, document_id, path) else {
            return Ok(false);
        };
        let removed = self.table.delete_item(&leaf.key.primary()).await?;
        tracing::debug!(tenant = %tenant, document_id, path, removed, "Removed folder leaf");
        Ok(removed)
    }

    /// One page of the direct children of the folder at `path`.
    pub async fn list_folder(
        &self,
        tenant: &Tenant,
        path: &str,
        limit: usize,
        start_key: Option<PageKey>,
    ) -> QuireResult<FolderListing> {
        let request = QueryRequest::new(Index::Primary, folder_key(tenant, path))
            .with_limit(limit)
            .with_start_key(start_key);
        let page = self.table.query(&request).await?;
        Ok(FolderListing {
            nodes: page.items.iter().filter_map(decode_item).collect(),
            last_evaluated_key: page.last_evaluated_key,
        })
    }

    /// The leaf row pointing at `document_id`.
    pub async fn leaf_item(&self, tenant: &Tenant, document_id: &str) -> QuireResult<Option<Item>> {
        self.lookup(lookup_partition(tenant, document_id)).await
    }

    /// The leaf row of a soft-deleted `document_id`.
    pub async fn deleted_leaf_item(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Option<Item>> {
        self.lookup(soft_delete_key(tenant, &lookup_partition(tenant, document_id)))
            .await
    }

    /// Leaf node of `document_id`; its `parent_key` names the owning folder.
    pub async fn folder_of_document(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Option<FolderNode>> {
        Ok(self
            .leaf_item(tenant, document_id)
            .await?
            .as_ref()
            .and_then(decode_item))
    }

    /// Delete the folder node at `path` if nothing is filed under it.
    pub async fn delete_empty_folder(&self, tenant: &Tenant, path: &str) -> QuireResult<()> {
        let Some((parent, name)) = split_parent(path) else {
            return Err(ValidationError::new("path", "the root folder cannot be deleted").into());
        };

        let children = self
            .table
            .query(&QueryRequest::new(Index::Primary, folder_key(tenant, path)).with_limit(1))
            .await?;
        if !children.items.is_empty() {
            return Err(ValidationError::new("path", "folder is not empty").into());
        }

        let parent_key = folder_key(tenant, &parent);
        let canonical = PrimaryKey::new(parent_key.clone(), format!("{PREFIX_FOLDER_NODE}{name}"));
        let legacy = PrimaryKey::new(parent_key, name);

        if self.table.delete_item(&canonical).await? || self.table.delete_item(&legacy).await? {
            tracing::debug!(tenant = %tenant, path, "Deleted empty folder");
            return Ok(());
        }

        Err(StorageError::NotFound {
            entity: RecordKind::FolderNode,
            id: folder::normalize_path(path),
        }
        .into())
    }

    async fn lookup(&self, partition_key: String) -> QuireResult<Option<Item>> {
        let request = QueryRequest::new(Index::Gsi1, partition_key)
            .with_condition(SortKeyCondition::Equals(SK_FOLDER_LOOKUP.to_string()));
        Ok(query_all(self.table.as_ref(), request).await?.into_iter().next())
    }
}

fn lookup_partition(tenant: &Tenant, document_id: &str) -> String {
    keys::key(tenant, &format!("{PREFIX_FOLDER_LOOKUP}{document_id}"))
}

// =============================================================================
// TESTS
// =============================================================================
