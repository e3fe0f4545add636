//! Document tags.

use crate::store::DocumentStore;
use quire_core::keys::{self, PREFIX_TAGS};
use quire_core::{
    Index, Item, QuireResult, Tag, TagValue, Tenant, ValidationError, ValidationErrors,
};
use quire_storage::{DocumentTable, EphemeralCache, Page, PageRequest, QueryRequest};
use std::collections::HashSet;

fn validate_tags(tags: &[Tag]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for tag in tags {
        if tag.key.trim().is_empty() {
            errors.push(ValidationError::new("key", "tag key is required"));
        }
        if let TagValue::Many(values) = &tag.value {
            if values.is_empty() {
                errors.push(ValidationError::new(&tag.key, "tag value list must not be empty"));
            }
        }
        if tag.user_id.trim().is_empty() {
            errors.push(ValidationError::new("userId", "userId is required"));
        }
    }
    errors.into_result()
}

/// Rows of `tag_key` only; the sort key prefix alone would also match
/// longer keys sharing the same start.
fn rows_of(items: Vec<Item>, tag_key: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item.as_tag().is_some_and(|t| t.key == tag_key))
        .collect()
}

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Write tags on an existing document. A tag replaces every stored row
    /// of the same key.
    pub async fn add_tags(
        &self,
        tenant: &Tenant,
        document_id: &str,
        tags: Vec<Tag>,
    ) -> QuireResult<()> {
        validate_tags(&tags)?;
        self.require_document(tenant, document_id).await?;

        for mut tag in tags {
            tag.document_id = document_id.to_string();
            self.delete_tag_rows(tenant, document_id, &tag.key).await?;
            for item in tag.items(tenant) {
                self.table.put_item(item).await?;
            }
            tracing::debug!(tenant = %tenant, document_id, tag_key = %tag.key, "Wrote tag");
        }
        Ok(())
    }

    /// Every tag on a document, by key.
    pub async fn find_tags(&self, tenant: &Tenant, document_id: &str) -> QuireResult<Vec<Tag>> {
        let rows = self
            .partition_rows(keys::document_partition(tenant, document_id), PREFIX_TAGS)
            .await?;
        let mut tags: Vec<Tag> = rows.iter().filter_map(Item::as_tag).cloned().collect();
        tags.dedup_by(|a, b| a.key == b.key);
        Ok(tags)
    }

    pub async fn find_tag(
        &self,
        tenant: &Tenant,
        document_id: &str,
        tag_key: &str,
    ) -> QuireResult<Option<Tag>> {
        let rows = self
            .partition_rows(
                keys::document_partition(tenant, document_id),
                &Tag::sort_key_prefix(tag_key),
            )
            .await?;
        Ok(rows_of(rows, tag_key)
            .into_iter()
            .next()
            .and_then(|item| item.as_tag().cloned()))
    }

    /// Remove a tag. Returns whether anything was stored under the key.
    pub async fn delete_tag(
        &self,
        tenant: &Tenant,
        document_id: &str,
        tag_key: &str,
    ) -> QuireResult<bool> {
        Ok(self.delete_tag_rows(tenant, document_id, tag_key).await? > 0)
    }

    /// Tags with `tag_key` across documents; with `value`, only exact matches.
    pub async fn search_tags(
        &self,
        tenant: &Tenant,
        tag_key: &str,
        value: Option<&str>,
        page: &PageRequest,
    ) -> QuireResult<Page<Tag>> {
        let request = match value {
            Some(value) => {
                QueryRequest::new(Index::Gsi1, keys::tag_value_partition(tenant, tag_key, value))
            }
            None => QueryRequest::new(Index::Gsi2, keys::tag_key_partition(tenant, tag_key)),
        };
        let page = self.paged_query(request, page).await?;

        let mut seen = HashSet::new();
        Ok(page.filter_map(|item| {
            let tag = item.as_tag()?;
            seen.insert(tag.document_id.clone()).then(|| tag.clone())
        }))
    }

    async fn delete_tag_rows(
        &self,
        tenant: &Tenant,
        document_id: &str,
        tag_key: &str,
    ) -> QuireResult<usize> {
        let rows = self
            .partition_rows(
                keys::document_partition(tenant, document_id),
                &Tag::sort_key_prefix(tag_key),
            )
            .await?;
        self.delete_rows(&rows_of(rows, tag_key)).await
    }
}
