//! Integration tests for delete, soft delete and restore.

mod support;

use quire_documents::{Document, PageRequest, Tenant};
use quire_test_utils::assertions::{assert_precondition, assert_tenant_scoped};
use quire_test_utils::fixtures::{
    acme, sample_document, single_tag, string_attribute, unfiled_document,
};
use support::{fixture_day, ids, store, TestStore};

fn document_ids(documents: &[Document]) -> Vec<String> {
    ids(documents, |d| d.document_id.as_str())
}

/// Parent with one child and one grandchild, each tagged, the parent also
/// carrying an attribute and an archived version.
async fn seed_family(store: &TestStore, tenant: &Tenant) {
    store
        .save_document(tenant, sample_document("parent"))
        .await
        .expect("parent v1");
    store
        .save_document(tenant, sample_document("parent").with_content_length(2048))
        .await
        .expect("parent v2");
    store
        .save_document(tenant, sample_document("child").with_parent("parent"))
        .await
        .expect("child");
    store
        .save_document(tenant, sample_document("grandchild").with_parent("child"))
        .await
        .expect("grandchild");

    for id in ["parent", "child", "grandchild"] {
        store
            .add_tags(tenant, id, vec![single_tag(id, "status", "draft")])
            .await
            .expect("tag");
    }
    store
        .set_attributes(tenant, "parent", vec![string_attribute("parent", "category", "report")])
        .await
        .expect("attribute");
}

async fn assert_family_live(store: &TestStore, tenant: &Tenant) {
    for id in ["parent", "child", "grandchild"] {
        assert!(
            store.find_document(tenant, id).await.expect("find").is_some(),
            "{id} should be live"
        );
        assert!(store
            .find_tag(tenant, id, "status")
            .await
            .expect("tag")
            .is_some());
    }
}

#[tokio::test]
async fn test_soft_delete_and_restore_family() {
    let (store, backend) = store();
    let tenant = acme();
    seed_family(&store, &tenant).await;
    let rows_before = backend.table.len().await;

    assert!(store
        .delete_document(&tenant, "parent", true)
        .await
        .expect("soft delete"));

    for id in ["parent", "child", "grandchild"] {
        assert!(store.find_document(&tenant, id).await.expect("find").is_none());
        assert!(store
            .folder_of_document(&tenant, id)
            .await
            .expect("leaf")
            .is_none());
    }
    let hits = store
        .search_tags(&tenant, "status", Some("draft"), &PageRequest::first(None))
        .await
        .expect("search");
    assert!(hits.items.is_empty());
    assert_eq!(backend.table.len().await, rows_before);

    let deleted = store
        .list_deleted_documents(&tenant, fixture_day(), &PageRequest::first(None))
        .await
        .expect("deleted listing");
    let mut deleted_ids = document_ids(&deleted.items);
    deleted_ids.sort();
    assert_eq!(deleted_ids, vec!["child", "grandchild", "parent"]);

    assert!(store
        .restore_document(&tenant, "parent")
        .await
        .expect("restore"));
    assert_family_live(&store, &tenant).await;

    let parent = store
        .find_document(&tenant, "parent")
        .await
        .expect("find")
        .expect("parent");
    assert_eq!(parent.current_version(), 2);
    assert_eq!(
        store
            .list_document_versions(&tenant, "parent")
            .await
            .expect("versions")
            .len(),
        1
    );
    assert_eq!(
        store
            .find_attribute(&tenant, "parent", "category")
            .await
            .expect("attribute")
            .len(),
        1
    );
    assert!(store
        .folder_of_document(&tenant, "child")
        .await
        .expect("leaf")
        .is_some());
    assert_eq!(backend.table.len().await, rows_before);
    assert!(store
        .list_deleted_documents(&tenant, fixture_day(), &PageRequest::first(None))
        .await
        .expect("deleted listing")
        .items
        .is_empty());

    assert_tenant_scoped(&backend.table.dump().await, &tenant);
}

#[tokio::test]
async fn test_restore_rejects_live_document() {
    let (store, _) = store();
    let tenant = Tenant::Default;
    seed_family(&store, &tenant).await;

    let result = store.restore_document(&tenant, "parent").await;
    assert_precondition(&result);

    assert!(!store
        .restore_document(&tenant, "never-existed")
        .await
        .expect("nothing to restore"));
}

#[tokio::test]
async fn test_hard_delete_removes_everything_owned() {
    let (store, backend) = store();
    let tenant = Tenant::Default;
    seed_family(&store, &tenant).await;

    assert!(store
        .delete_document(&tenant, "parent", false)
        .await
        .expect("delete"));
    assert!(!store
        .delete_document(&tenant, "parent", false)
        .await
        .expect("delete again"));

    for id in ["parent", "child", "grandchild"] {
        assert!(store.find_document(&tenant, id).await.expect("find").is_none());
    }
    assert!(!store
        .restore_document(&tenant, "parent")
        .await
        .expect("restore after hard delete"));

    // only the shared folder ancestor remains
    let remaining = backend.table.dump().await;
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].as_folder_node().is_some());
}

#[tokio::test]
async fn test_soft_delete_is_tenant_isolated() {
    let (store, _) = store();
    seed_family(&store, &acme()).await;
    seed_family(&store, &Tenant::Default).await;

    store
        .delete_document(&acme(), "parent", true)
        .await
        .expect("soft delete");

    assert_family_live(&store, &Tenant::Default).await;
    assert!(store
        .list_deleted_documents(&Tenant::Default, fixture_day(), &PageRequest::first(None))
        .await
        .expect("listing")
        .items
        .is_empty());
}

#[tokio::test]
async fn test_restore_recreates_removed_folders() {
    let (store, _) = store();
    let tenant = acme();
    store
        .save_document(&tenant, sample_document("d1"))
        .await
        .expect("save");

    store
        .delete_document(&tenant, "d1", true)
        .await
        .expect("soft delete");
    store
        .delete_empty_folder(&tenant, "/reports")
        .await
        .expect("folder emptied by soft delete");

    store.restore_document(&tenant, "d1").await.expect("restore");

    let reports = store
        .list_folder(&tenant, "/reports", &PageRequest::first(None))
        .await
        .expect("list");
    assert_eq!(reports.items.len(), 1);
    assert_eq!(reports.items[0].document_id.as_deref(), Some("d1"));
    let root = store
        .list_folder(&tenant, "", &PageRequest::first(None))
        .await
        .expect("root");
    assert_eq!(root.items.len(), 1);
}

#[tokio::test]
async fn test_default_tenant_soft_delete_in_nested_folder() {
    let (store, backend) = store();
    let tenant = Tenant::Default;
    store
        .save_document(&tenant, unfiled_document("d1", 0).with_path("/a/b/x.pdf"))
        .await
        .expect("save");
    let before = backend.table.dump().await;

    store
        .delete_document(&tenant, "d1", true)
        .await
        .expect("soft delete");

    // nothing surfaces in a live folder named like the marker
    let lookalike = store
        .list_folder(&tenant, "/a/softdelete#b", &PageRequest::first(None))
        .await
        .expect("list");
    assert!(lookalike.items.is_empty());
    let b = store
        .list_folder(&tenant, "/a/b", &PageRequest::first(None))
        .await
        .expect("list");
    assert!(b.items.is_empty());
    assert!(store
        .folder_of_document(&tenant, "d1")
        .await
        .expect("leaf")
        .is_none());
    assert_tenant_scoped(&backend.table.dump().await, &tenant);

    assert!(store.restore_document(&tenant, "d1").await.expect("restore"));
    assert_eq!(backend.table.dump().await, before);
}

#[tokio::test]
async fn test_soft_delete_leaf_under_marker_named_folder() {
    let (store, _) = store();
    let tenant = Tenant::Default;
    store
        .save_document(
            &tenant,
            unfiled_document("d1", 0).with_path("/a/softdelete#b/x.pdf"),
        )
        .await
        .expect("save");

    store
        .delete_document(&tenant, "d1", true)
        .await
        .expect("soft delete");

    let folder = store
        .list_folder(&tenant, "/a/softdelete#b", &PageRequest::first(None))
        .await
        .expect("list");
    assert!(folder.items.is_empty());

    store.restore_document(&tenant, "d1").await.expect("restore");
    let folder = store
        .list_folder(&tenant, "/a/softdelete#b", &PageRequest::first(None))
        .await
        .expect("list");
    assert_eq!(folder.items.len(), 1);
    assert_eq!(folder.items[0].document_id.as_deref(), Some("d1"));
}
