//! Folder hierarchy index generation.
//!
//! A path such as `/a/b/c/test.pdf` becomes one folder node per intermediate
//! segment and one leaf node for the file. Each node lives in the partition
//! of its parent folder, so listing a folder is a single range query.

use crate::keys::{self, Tenant, DELIMITER, PREFIX_FOLDERS, PREFIX_FOLDER_NODE, PREFIX_LEAF_NODE};
use crate::record::{FolderNode, FolderNodeKind, Item};

/// Path separator for document paths.
pub const PATH_DELIMITER: char = '/';

/// Partition key of the tenant's root folder.
pub fn root_key(tenant: &Tenant) -> String {
    keys::key(tenant, PREFIX_FOLDERS)
}

/// Partition key holding the children of the folder at `path`.
/// An empty path (or `/`) is the root.
pub fn folder_key(tenant: &Tenant, path: &str) -> String {
    let normalized = normalize_path(path);
    if normalized.is_empty() {
        root_key(tenant)
    } else {
        keys::key(tenant, &format!("{PREFIX_FOLDERS}{normalized}"))
    }
}

/// Non-empty segments joined without leading or trailing slashes.
pub fn normalize_path(path: &str) -> String {
    segments(path).join("/")
}

/// Non-empty path segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(PATH_DELIMITER).filter(|s| !s.is_empty()).collect()
}

/// Parent folder path and final segment of `path`, if it has any segment.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let mut parts = segments(path);
    let last = parts.pop()?;
    Some((parts.join("/"), last.to_string()))
}

/// Sort key a node is stored under.
pub fn node_sort_key(node: &FolderNode) -> String {
    match (&node.kind, &node.document_id) {
        (FolderNodeKind::Leaf, Some(document_id)) => {
            format!("{PREFIX_LEAF_NODE}{}{DELIMITER}{document_id}", node.name)
        }
        (FolderNodeKind::Leaf, None) => format!("{PREFIX_LEAF_NODE}{}", node.name),
        (FolderNodeKind::Folder, _) => format!("{PREFIX_FOLDER_NODE}{}", node.name),
    }
}

/// Build every folder and leaf row needed to index `document_id` at `path`.
///
/// A trailing `/` makes the final segment a folder and no leaf is written.
/// No path, or a path with no segments, writes nothing.
pub fn index_path(tenant: &Tenant, document_id: &str, path: Option<&str>) -> Vec<Item> {
    let Some(path) = path else {
        return Vec::new();
    };

    let parts = segments(path);
    let ends_with_folder = path.ends_with(PATH_DELIMITER);

    let mut items = Vec::with_capacity(parts.len());
    let mut parent_key = root_key(tenant);
    let mut accumulated = String::new();

    for (i, segment) in parts.iter().enumerate() {
        if !accumulated.is_empty() {
            accumulated.push(PATH_DELIMITER);
        }
        accumulated.push_str(segment);

        let is_last = i + 1 == parts.len();
        if is_last && !ends_with_folder {
            let leaf = FolderNode {
                kind: FolderNodeKind::Leaf,
                name: segment.to_string(),
                path: accumulated.clone(),
                document_id: Some(document_id.to_string()),
                parent_key: parent_key.clone(),
            };
            items.push(leaf.into_item(tenant));
        } else {
            let folder = FolderNode {
                kind: FolderNodeKind::Folder,
                name: segment.to_string(),
                path: accumulated.clone(),
                document_id: None,
                parent_key: parent_key.clone(),
            };
            items.push(folder.into_item(tenant));
            parent_key = folder_key(tenant, &accumulated);
        }
    }

    items
}

/// The leaf row `document_id` would occupy at `path`, without its ancestors.
pub fn leaf_for(tenant: &Tenant, document_id: &str, path: &str) -> Option<Item> {
    if path.ends_with(PATH_DELIMITER) {
        return None;
    }
    let (parent, name) = split_parent(path)?;
    let leaf = FolderNode {
        kind: FolderNodeKind::Leaf,
        path: if parent.is_empty() {
            name.clone()
        } else {
            format!("{parent}/{name}")
        },
        name,
        document_id: Some(document_id.to_string()),
        parent_key: folder_key(tenant, &parent),
    };
    Some(leaf.into_item(tenant))
}

// ============================================================================
// DECODING
// ============================================================================

/// Rows written before sort keys carried a type prefix store the bare
/// segment name. The kind is inferred from whether a document is attached.
fn legacy_decode(sort_key: &str, document_id: Option<&str>) -> Option<(FolderNodeKind, String)> {
    if sort_key.starts_with(PREFIX_FOLDER_NODE) || sort_key.starts_with(PREFIX_LEAF_NODE) {
        return None;
    }
    let kind = if document_id.is_some() {
        FolderNodeKind::Leaf
    } else {
        FolderNodeKind::Folder
    };
    Some((kind, sort_key.to_string()))
}

fn canonical_decode(sort_key: &str, document_id: Option<&str>) -> Option<(FolderNodeKind, String)> {
    if let Some(name) = sort_key.strip_prefix(PREFIX_FOLDER_NODE) {
        return Some((FolderNodeKind::Folder, name.to_string()));
    }
    let rest = sort_key.strip_prefix(PREFIX_LEAF_NODE)?;
    let name = document_id
        .and_then(|id| rest.strip_suffix(id))
        .and_then(|r| r.strip_suffix(DELIMITER))
        .unwrap_or(rest);
    Some((FolderNodeKind::Leaf, name.to_string()))
}

/// Rebuild a node from its stored keys and attributes, accepting both the
/// prefixed and the legacy bare sort key.
pub fn decode_node(
    parent_key: &str,
    sort_key: &str,
    path: &str,
    document_id: Option<&str>,
) -> Option<FolderNode> {
    let (kind, name) = legacy_decode(sort_key, document_id)
        .or_else(|| canonical_decode(sort_key, document_id))?;
    if name.is_empty() {
        return None;
    }
    Some(FolderNode {
        kind,
        name,
        path: path.to_string(),
        document_id: document_id.map(str::to_string),
        parent_key: parent_key.to_string(),
    })
}

/// [`decode_node`] applied to a stored row.
pub fn decode_item(item: &Item) -> Option<FolderNode> {
    let stored = item.as_folder_node()?;
    decode_node(
        &item.key.partition_key,
        &item.key.sort_key,
        &stored.path,
        stored.document_id.as_deref(),
    )
}

// =============================================================================
// TESTS
// =============================================================================


// =============================================================================
// PROPERTY TESTS
// =============================================================================
