//! Attribute search.

use crate::store::DocumentStore;
use futures_util::future::try_join_all;
use quire_core::keys;
use quire_core::{
    CompiledCriteria, Document, Index, Item, QuireResult, SearchAttributeCriteria, SearchCriteria,
    Tenant, ValidationError,
};
use quire_storage::{
    query_all, DocumentTable, EphemeralCache, Page, PageRequest, QueryRequest, SortKeyCondition,
};
use std::collections::HashSet;

/// Which single-index query a compiled search runs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchPlan {
    /// One paginated query.
    Single(SortKeyCondition),
    /// One equality query per value, merged without continuation.
    Expand(Vec<String>),
}

fn plan(compiled: &CompiledCriteria) -> SearchPlan {
    if let Some(values) = &compiled.eq_or {
        return SearchPlan::Expand(values.clone());
    }
    if let Some(range) = &compiled.range {
        return SearchPlan::Single(SortKeyCondition::Between(
            range.start.clone(),
            range.end.clone(),
        ));
    }
    if let Some(prefix) = &compiled.begins_with {
        return SearchPlan::Single(SortKeyCondition::BeginsWith(prefix.clone()));
    }
    SearchPlan::Single(SortKeyCondition::Equals(
        compiled.eq.clone().unwrap_or_default(),
    ))
}

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Validate `attributes` against this store's limits.
    pub fn search_criteria(
        &self,
        attributes: Vec<SearchAttributeCriteria>,
    ) -> QuireResult<SearchCriteria> {
        Ok(SearchCriteria::new(
            attributes,
            self.config.max_eq_or_combinations,
        )?)
    }

    /// Documents whose attributes match `criteria`.
    ///
    /// Several attributes are answered from the composite index of their
    /// keys, which must be configured. eqOr searches run one query per
    /// combination, merge, drop repeated documents and stop at the page
    /// limit; they never return continuation links.
    pub async fn search(
        &self,
        tenant: &Tenant,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> QuireResult<Page<Document>> {
        if criteria.is_composite() && !self.config.has_composite_key(&criteria.keys()) {
            return Err(ValidationError::new(
                "attributes",
                format!(
                    "no composite key configured for '{}'",
                    criteria.keys().join(", ")
                ),
            )
            .into());
        }

        let compiled = criteria.compile();
        let partition = keys::attribute_partition(tenant, &compiled.key);
        tracing::debug!(
            tenant = %tenant,
            attribute_key = %compiled.key,
            "Running attribute search"
        );

        match plan(&compiled) {
            SearchPlan::Single(condition) => {
                let request = QueryRequest::new(Index::Gsi1, partition).with_condition(condition);
                let page = self.paged_query(request, page).await?;

                let ids = matched_ids(&page.items);
                let documents = self.find_documents(tenant, &ids).await?;
                Ok(page.with_items(documents))
            }
            SearchPlan::Expand(values) => {
                let limit = self.pages.clamp_limit(page.limit);
                let queries = values.into_iter().map(|value| {
                    let request = QueryRequest::new(Index::Gsi1, partition.clone())
                        .with_condition(SortKeyCondition::Equals(value));
                    query_all(self.table.as_ref(), request)
                });
                let merged: Vec<Item> = try_join_all(queries)
                    .await?
                    .into_iter()
                    .flatten()
                    .collect();

                let mut ids = matched_ids(&merged);
                ids.truncate(limit);
                Ok(Page::unlinked(self.find_documents(tenant, &ids).await?))
            }
        }
    }
}

/// Document ids of attribute rows, first occurrence kept.
fn matched_ids(items: &[Item]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| item.as_attribute())
        .filter(|a| seen.insert(a.document_id.clone()))
        .map(|a| a.document_id.clone())
        .collect()
}
