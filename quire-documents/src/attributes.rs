//! Document attributes and their composite index rows.

use crate::store::DocumentStore;
use quire_core::keys::{self, COMPOSITE_KEY_DELIMITER, PREFIX_ATTRIBUTE};
use quire_core::{
    Attribute, AttributeValue, Item, QuireResult, Tenant, Timestamp, ValidationError,
    ValidationErrors,
};
use quire_storage::{DocumentTable, EphemeralCache};
use std::collections::BTreeMap;

fn validate_attributes(attributes: &[Attribute]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for attribute in attributes {
        let key = attribute.key.trim();
        if key.is_empty() {
            errors.push(ValidationError::new("key", "attribute key is required"));
            continue;
        }
        if key.contains(COMPOSITE_KEY_DELIMITER) {
            errors.push(ValidationError::new(
                key,
                format!("attribute key must not contain '{COMPOSITE_KEY_DELIMITER}'"),
            ));
        }
        if attribute.value.is_composite() {
            errors.push(ValidationError::new(key, "composite values are maintained by the store"));
        }
        if let AttributeValue::Number(n) = attribute.value {
            if !n.is_finite() {
                errors.push(ValidationError::new(key, "number must be finite"));
            }
        }
        if attribute.user_id.trim().is_empty() {
            errors.push(ValidationError::new("userId", "userId is required"));
        }
    }
    errors.into_result()
}

fn rows_of(items: Vec<Item>, attribute_key: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item.as_attribute().is_some_and(|a| a.key == attribute_key))
        .collect()
}

/// Every combination of one value per component, first component slowest.
fn combinations(components: &[Vec<String>]) -> Vec<Vec<String>> {
    components.iter().fold(vec![Vec::new()], |acc, values| {
        acc.into_iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect()
    })
}

impl<T, C> DocumentStore<T, C>
where
    T: DocumentTable + ?Sized,
    C: EphemeralCache + ?Sized,
{
    /// Write attributes on an existing document.
    ///
    /// Each key present in `attributes` replaces all stored values of that
    /// key; several entries with the same key form a value list. Composite
    /// rows of every configured composite key touching a written key are
    /// rebuilt afterwards.
    pub async fn set_attributes(
        &self,
        tenant: &Tenant,
        document_id: &str,
        attributes: Vec<Attribute>,
    ) -> QuireResult<()> {
        validate_attributes(&attributes)?;
        self.require_document(tenant, document_id).await?;

        let mut by_key: BTreeMap<String, Vec<Attribute>> = BTreeMap::new();
        for mut attribute in attributes {
            attribute.document_id = document_id.to_string();
            by_key.entry(attribute.key.clone()).or_default().push(attribute);
        }

        for (key, values) in &by_key {
            self.delete_attribute_rows(tenant, document_id, key).await?;
            for attribute in values {
                self.table.put_item(attribute.clone().into_item(tenant)).await?;
            }
            tracing::debug!(
                tenant = %tenant,
                document_id,
                attribute_key = %key,
                values = values.len(),
                "Wrote attribute"
            );
        }

        let touched: Vec<&str> = by_key.keys().map(String::as_str).collect();
        self.refresh_composites(tenant, document_id, &touched).await
    }

    /// Every plain attribute value on a document, by key then value.
    pub async fn find_attributes(
        &self,
        tenant: &Tenant,
        document_id: &str,
    ) -> QuireResult<Vec<Attribute>> {
        let rows = self
            .partition_rows(keys::document_partition(tenant, document_id), PREFIX_ATTRIBUTE)
            .await?;
        Ok(rows
            .iter()
            .filter_map(Item::as_attribute)
            .filter(|a| !a.value.is_composite())
            .cloned()
            .collect())
    }

    /// Values stored under one attribute key.
    pub async fn find_attribute(
        &self,
        tenant: &Tenant,
        document_id: &str,
        attribute_key: &str,
    ) -> QuireResult<Vec<Attribute>> {
        let rows = self
            .partition_rows(
                keys::document_partition(tenant, document_id),
                &Attribute::sort_key_prefix(attribute_key),
            )
            .await?;
        Ok(rows_of(rows, attribute_key)
            .iter()
            .filter_map(Item::as_attribute)
            .cloned()
            .collect())
    }

    /// Remove an attribute key and the composite rows built from it.
    /// Returns how many value rows were removed.
    pub async fn delete_attribute(
        &self,
        tenant: &Tenant,
        document_id: &str,
        attribute_key: &str,
    ) -> QuireResult<usize> {
        let removed = self
            .delete_attribute_rows(tenant, document_id, attribute_key)
            .await?;
        if removed > 0 {
            self.refresh_composites(tenant, document_id, &[attribute_key])
                .await?;
        }
        Ok(removed)
    }

    /// Rebuild composite rows for every configured group containing one of
    /// `touched`. A group gets rows only when each component has a value.
    async fn refresh_composites(
        &self,
        tenant: &Tenant,
        document_id: &str,
        touched: &[&str],
    ) -> QuireResult<()> {
        let mut groups: Vec<&[String]> = Vec::new();
        for key in touched {
            for group in self.config.composite_keys_for(key) {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }

        for group in groups {
            let composite_key = group.join(COMPOSITE_KEY_DELIMITER);
            self.delete_attribute_rows(tenant, document_id, &composite_key)
                .await?;

            let mut components: Vec<Vec<String>> = Vec::with_capacity(group.len());
            let mut owner: Option<(String, Timestamp)> = None;
            for component in group {
                let values = self.find_attribute(tenant, document_id, component).await?;
                if owner.is_none() {
                    owner = values.first().map(|a| (a.user_id.clone(), a.inserted_date));
                }
                components.push(values.iter().map(|a| a.value.index_value()).collect());
            }

            let Some((user_id, inserted_date)) = owner else {
                continue;
            };
            if components.iter().any(Vec::is_empty) {
                continue;
            }

            let rows = combinations(&components);
            for values in &rows {
                let composite =
                    Attribute::composite(document_id, group, values, &user_id, inserted_date);
                self.table.put_item(composite.into_item(tenant)).await?;
            }
            tracing::debug!(
                tenant = %tenant,
                document_id,
                composite_key = %composite_key,
                rows = rows.len(),
                "Refreshed composite attribute"
            );
        }
        Ok(())
    }

    async fn delete_attribute_rows(
        &self,
        tenant: &Tenant,
        document_id: &str,
        attribute_key: &str,
    ) -> QuireResult<usize> {
        let rows = self
            .partition_rows(
                keys::document_partition(tenant, document_id),
                &Attribute::sort_key_prefix(attribute_key),
            )
            .await?;
        self.delete_rows(&rows_of(rows, attribute_key)).await
    }
}
