//! Fuzz test for folder index generation
//!
//! Arbitrary paths must index without panicking, every generated row must
//! decode back into a folder node, and at most one leaf may be produced.
//!
//! Run with: cargo +nightly fuzz run folder_index_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use quire_core::folder::{decode_item, index_path, leaf_for};
use quire_core::{FolderNodeKind, Tenant};

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };
    let tenant = Tenant::Site("fuzz".to_string());

    let items = index_path(&tenant, "doc", Some(path));
    let mut leaves = 0;
    for item in &items {
        let node = decode_item(item).expect("generated rows decode");
        if node.kind == FolderNodeKind::Leaf {
            leaves += 1;
            assert_eq!(node.document_id.as_deref(), Some("doc"));
        }
    }
    assert!(leaves <= 1, "at most one leaf per path");

    if let Some(leaf) = leaf_for(&tenant, "doc", path) {
        assert!(items.iter().any(|item| item.key == leaf.key));
    }
});
