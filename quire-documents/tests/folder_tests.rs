//! Integration tests for the folder index as seen through the store.

mod support;

use quire_documents::{FolderNode, FolderNodeKind, PageRequest, Tenant};
use quire_test_utils::assertions::{assert_not_found, assert_validation_error};
use quire_test_utils::fixtures::{acme, unfiled_document};
use quire_test_utils::RecordKind;
use support::{store, TestStore};

fn names(nodes: &[FolderNode]) -> Vec<(FolderNodeKind, String)> {
    nodes.iter().map(|n| (n.kind, n.name.clone())).collect()
}

async fn file(store: &TestStore, tenant: &Tenant, id: &str, path: &str) {
    store
        .save_document(tenant, unfiled_document(id, 0).with_path(path))
        .await
        .expect("save");
}

#[tokio::test]
async fn test_list_folder_orders_folders_before_files() {
    let (store, _) = store();
    let tenant = acme();
    file(&store, &tenant, "d1", "/b.txt").await;
    file(&store, &tenant, "d2", "/reports/q1.pdf").await;
    file(&store, &tenant, "d3", "/a.txt").await;
    file(&store, &tenant, "d4", "/archive/").await;

    let root = store
        .list_folder(&tenant, "", &PageRequest::first(None))
        .await
        .expect("root");
    assert_eq!(
        names(&root.items),
        vec![
            (FolderNodeKind::Folder, "archive".to_string()),
            (FolderNodeKind::Folder, "reports".to_string()),
            (FolderNodeKind::Leaf, "a.txt".to_string()),
            (FolderNodeKind::Leaf, "b.txt".to_string()),
        ]
    );

    let reports = store
        .list_folder(&tenant, "/reports/", &PageRequest::first(None))
        .await
        .expect("reports");
    assert_eq!(reports.items.len(), 1);
    assert_eq!(reports.items[0].document_id.as_deref(), Some("d2"));

    // folder-only paths file no leaf
    assert!(store
        .folder_of_document(&tenant, "d4")
        .await
        .expect("lookup")
        .is_none());

    let other = store
        .list_folder(&Tenant::Default, "", &PageRequest::first(None))
        .await
        .expect("other tenant");
    assert!(other.items.is_empty());
}

#[tokio::test]
async fn test_list_folder_pages_next_and_previous() {
    let (store, _) = store();
    let tenant = Tenant::Default;
    for i in 0..5 {
        file(&store, &tenant, &format!("d{i}"), &format!("/inbox/f{i}.txt")).await;
    }

    let first = store
        .list_folder(&tenant, "/inbox", &PageRequest::first(Some(2)))
        .await
        .expect("page 1");
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].name, "f0.txt");

    let second = store
        .list_folder(
            &tenant,
            "/inbox",
            &PageRequest::next(first.next.clone().expect("next link")),
        )
        .await
        .expect("page 2");
    assert_eq!(second.items[0].name, "f2.txt");

    let back = store
        .list_folder(
            &tenant,
            "/inbox",
            &PageRequest::previous(second.previous.clone().expect("previous link")),
        )
        .await
        .expect("back");
    assert_eq!(back.items, first.items);
    assert!(back.previous.is_none());
    assert!(back.next.is_some());
}

#[tokio::test]
async fn test_delete_empty_folder() {
    let (store, _) = store();
    let tenant = acme();
    file(&store, &tenant, "d1", "/reports/2024/q1.pdf").await;

    let busy = store.delete_empty_folder(&tenant, "/reports").await;
    assert_validation_error(&busy, "path");

    let root = store.delete_empty_folder(&tenant, "/").await;
    assert_validation_error(&root, "path");

    store
        .delete_document(&tenant, "d1", false)
        .await
        .expect("delete");
    store
        .delete_empty_folder(&tenant, "/reports/2024")
        .await
        .expect("delete 2024");
    store
        .delete_empty_folder(&tenant, "reports")
        .await
        .expect("delete reports");

    let missing = store.delete_empty_folder(&tenant, "/reports").await;
    assert_not_found(&missing, RecordKind::FolderNode);

    let root = store
        .list_folder(&tenant, "", &PageRequest::first(None))
        .await
        .expect("root");
    assert!(root.items.is_empty());
}
