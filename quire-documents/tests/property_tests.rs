//! Property-Based Tests for the Document Store
//!
//! - A saved path is browsable from its parent folder
//! - Soft delete followed by restore leaves the table exactly as it was
//! - Attributes read back as written
//! - An eq search over a configured composite key finds the document

mod support;

use proptest::prelude::*;
use quire_documents::{PageRequest, Tenant};
use quire_test_utils::fixtures::{string_attribute, test_config, unfiled_document};
use quire_test_utils::generators::{arb_attribute, arb_eq_search, arb_path, arb_tag, arb_tenant};
use support::{store, store_with};
use tokio::runtime::Runtime;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn parent_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    trimmed
        .rsplit_once('/')
        .map(|(parent, _)| parent.to_string())
        .unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_saved_path_is_listed_under_parent(tenant in arb_tenant(), path in arb_path()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, _) = store();
            store
                .save_document(&tenant, unfiled_document("d0", 0).with_path(path.clone()))
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let listing = store
                .list_folder(&tenant, &parent_of(&path), &PageRequest::first(None))
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(listing
                .items
                .iter()
                .any(|node| node.document_id.as_deref() == Some("d0")));

            let leaf = store
                .folder_of_document(&tenant, "d0")
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(leaf.map(|n| format!("/{}", n.path)), Some(path));
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_soft_delete_then_restore_is_identity(
        tenant in arb_tenant(),
        path in arb_path(),
        tags in prop::collection::vec(arb_tag("d0".to_string()), 0..4),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, backend) = store();
            let fail = |e: quire_documents::QuireError| TestCaseError::fail(e.to_string());

            store
                .save_document(&tenant, unfiled_document("d0", 0).with_path(path.clone()))
                .await
                .map_err(fail)?;
            if !tags.is_empty() {
                store.add_tags(&tenant, "d0", tags).await.map_err(fail)?;
            }
            let before = backend.table.dump().await;

            prop_assert!(store.delete_document(&tenant, "d0", true).await.map_err(fail)?);
            prop_assert!(store.find_document(&tenant, "d0").await.map_err(fail)?.is_none());
            let listing = store
                .list_folder(&tenant, &parent_of(&path), &PageRequest::first(None))
                .await
                .map_err(fail)?;
            prop_assert!(listing.items.iter().all(|node| node.document_id.is_none()));
            prop_assert!(store.restore_document(&tenant, "d0").await.map_err(fail)?);

            prop_assert_eq!(backend.table.dump().await, before);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_attribute_reads_back(attribute in arb_attribute("d0".to_string())) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, _) = store();
            let fail = |e: quire_documents::QuireError| TestCaseError::fail(e.to_string());
            let tenant = Tenant::Default;

            store
                .save_document(&tenant, unfiled_document("d0", 0))
                .await
                .map_err(fail)?;
            store
                .set_attributes(&tenant, "d0", vec![attribute.clone()])
                .await
                .map_err(fail)?;

            let read = store
                .find_attribute(&tenant, "d0", &attribute.key)
                .await
                .map_err(fail)?;
            prop_assert_eq!(read, vec![attribute]);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_composite_eq_search_finds_document(
        criteria in arb_eq_search(vec!["category".to_string(), "region".to_string()]),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, _) = store_with(test_config().with_composite_key(["category", "region"]));
            let fail = |e: quire_documents::QuireError| TestCaseError::fail(e.to_string());
            let tenant = Tenant::Default;

            let attributes = criteria
                .iter()
                .map(|c| string_attribute("d0", &c.key, c.eq.as_deref().unwrap_or_default()))
                .collect();
            store
                .save_document(&tenant, unfiled_document("d0", 0))
                .await
                .map_err(fail)?;
            store
                .set_attributes(&tenant, "d0", attributes)
                .await
                .map_err(fail)?;

            let criteria = store.search_criteria(criteria).map_err(fail)?;
            let found = store
                .search(&tenant, &criteria, &PageRequest::first(None))
                .await
                .map_err(fail)?;
            prop_assert_eq!(found.items.len(), 1);
            prop_assert_eq!(found.items[0].document_id.as_str(), "d0");
            Ok::<(), TestCaseError>(())
        })?;
    }
}
