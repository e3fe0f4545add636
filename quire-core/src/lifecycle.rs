//! Soft-delete and restore key transforms.
//!
//! Soft delete inserts `softdelete#` right after the tenant segment, so the
//! tenant stays the outermost component and tenant-wide scans still reach
//! soft-deleted rows. Default-tenant keys and sort keys take the marker at
//! the front. Restore is the exact inverse and refuses keys that do not carry
//! the marker.
//!
//! The tenant is always passed in. Default-tenant keys may contain `/` (nested
//! folder partitions, tag values), so the first `/` says nothing about where
//! the tenant segment ends.

use crate::error::KeyError;
use crate::keys::{CompositeKey, IndexKey, Tenant, TENANT_DELIMITER};

/// Segment inserted into every partition key of a soft-deleted row.
pub const SOFT_DELETE_MARKER: &str = "softdelete#";

/// Split `key` after the `site/` segment of `tenant`. Keys that do not start
/// with that segment are treated as unscoped.
fn split_tenant<'a>(tenant: &Tenant, key: &'a str) -> (&'a str, &'a str) {
    let scoped = tenant.site_id().and_then(|site| {
        key.strip_prefix(site)?.strip_prefix(TENANT_DELIMITER)?;
        Some(site.len() + TENANT_DELIMITER.len_utf8())
    });
    match scoped {
        Some(pos) => key.split_at(pos),
        None => ("", key),
    }
}

/// Insert the soft-delete marker after the tenant segment of `key`.
pub fn soft_delete_key(tenant: &Tenant, key: &str) -> String {
    let (scope, rest) = split_tenant(tenant, key);
    format!("{scope}{SOFT_DELETE_MARKER}{rest}")
}

/// Remove the soft-delete marker from its tenant-aware position.
pub fn restore_key(tenant: &Tenant, key: &str) -> Result<String, KeyError> {
    let (scope, rest) = split_tenant(tenant, key);
    rest.strip_prefix(SOFT_DELETE_MARKER)
        .map(|rest| format!("{scope}{rest}"))
        .ok_or_else(|| KeyError::MissingSoftDeleteMarker {
            key: key.to_string(),
        })
}

/// True when `key` carries the marker at its tenant-aware position.
pub fn is_soft_deleted(tenant: &Tenant, key: &str) -> bool {
    split_tenant(tenant, key).1.starts_with(SOFT_DELETE_MARKER)
}

/// Move every key of a row into the soft-deleted namespace.
///
/// Partition keys of the table and both indexes are moved, as is the primary
/// sort key. Index sort keys keep their ordering values unchanged. Sort keys
/// carry no tenant segment and take the marker at the front.
pub fn soft_delete(tenant: &Tenant, key: &CompositeKey) -> CompositeKey {
    CompositeKey {
        partition_key: soft_delete_key(tenant, &key.partition_key),
        sort_key: soft_delete_key(&Tenant::Default, &key.sort_key),
        gsi1: key.gsi1.as_ref().map(|k| soft_delete_index(tenant, k)),
        gsi2: key.gsi2.as_ref().map(|k| soft_delete_index(tenant, k)),
    }
}

/// Inverse of [`soft_delete`]. Fails without touching anything if any
/// moved component lacks the marker.
pub fn restore(tenant: &Tenant, key: &CompositeKey) -> Result<CompositeKey, KeyError> {
    Ok(CompositeKey {
        partition_key: restore_key(tenant, &key.partition_key)?,
        sort_key: restore_key(&Tenant::Default, &key.sort_key)?,
        gsi1: key.gsi1.as_ref().map(|k| restore_index(tenant, k)).transpose()?,
        gsi2: key.gsi2.as_ref().map(|k| restore_index(tenant, k)).transpose()?,
    })
}

fn soft_delete_index(tenant: &Tenant, key: &IndexKey) -> IndexKey {
    IndexKey::new(soft_delete_key(tenant, &key.partition_key), key.sort_key.clone())
}

fn restore_index(tenant: &Tenant, key: &IndexKey) -> Result<IndexKey, KeyError> {
    Ok(IndexKey::new(
        restore_key(tenant, &key.partition_key)?,
        key.sort_key.clone(),
    ))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Tenant {
        Tenant::site("acme").expect("tenant")
    }

    #[test]
    fn test_soft_delete_default_key() {
        let t = Tenant::Default;
        assert_eq!(soft_delete_key(&t, "docs#1"), "softdelete#docs#1");
        assert_eq!(restore_key(&t, "softdelete#docs#1"), Ok("docs#1".to_string()));
    }

    #[test]
    fn test_soft_delete_tenant_key() {
        let t = acme();
        assert_eq!(soft_delete_key(&t, "acme/docs#1"), "acme/softdelete#docs#1");
        assert_eq!(
            restore_key(&t, "acme/softdelete#docs#1"),
            Ok("acme/docs#1".to_string())
        );
        assert!(is_soft_deleted(&t, "acme/softdelete#docs#1"));
        assert!(!is_soft_deleted(&t, "softdelete/docs#1"));
    }

    #[test]
    fn test_default_key_with_slashes_marks_front() {
        let t = Tenant::Default;
        assert_eq!(soft_delete_key(&t, "folders#a/b"), "softdelete#folders#a/b");
        assert_eq!(
            restore_key(&t, "softdelete#folders#a/b"),
            Ok("folders#a/b".to_string())
        );

        // a live folder that happens to be named like the marker
        assert!(!is_soft_deleted(&t, "folders#a/softdelete#b"));
        assert!(restore_key(&t, "folders#a/softdelete#b").is_err());
    }

    #[test]
    fn test_site_key_with_nested_slashes() {
        let t = acme();
        assert_eq!(
            soft_delete_key(&t, "acme/folders#a/b"),
            "acme/softdelete#folders#a/b"
        );
        assert!(!is_soft_deleted(&t, "acme/folders#a/softdelete#b"));
    }

    #[test]
    fn test_other_site_prefix_is_not_a_scope() {
        assert_eq!(
            soft_delete_key(&acme(), "acmeco/docs#1"),
            "softdelete#acmeco/docs#1"
        );
    }

    #[test]
    fn test_restore_without_marker_fails() {
        let err = restore_key(&acme(), "acme/docs#1").expect_err("missing marker");
        assert_eq!(
            err,
            KeyError::MissingSoftDeleteMarker {
                key: "acme/docs#1".to_string()
            }
        );
        assert!(restore_key(&Tenant::Default, "docs#1").is_err());
    }

    #[test]
    fn test_composite_soft_delete_moves_partitions() {
        let key = CompositeKey::new("acme/docs#1", "document")
            .with_gsi1("acme/docts#2024-01-01", "2024-01-01T00:00:00.000Z#1")
            .with_gsi2("acme/children#p", "1");

        let moved = soft_delete(&acme(), &key);
        assert_eq!(moved.partition_key, "acme/softdelete#docs#1");
        assert_eq!(moved.sort_key, "softdelete#document");
        let gsi1 = moved.gsi1.as_ref().expect("gsi1");
        assert_eq!(gsi1.partition_key, "acme/softdelete#docts#2024-01-01");
        assert_eq!(gsi1.sort_key, "2024-01-01T00:00:00.000Z#1");
        assert_eq!(
            moved.gsi2.as_ref().map(|k| k.partition_key.as_str()),
            Some("acme/softdelete#children#p")
        );

        assert_eq!(restore(&acme(), &moved), Ok(key));
    }

    #[test]
    fn test_composite_leaf_row_in_nested_folder() {
        let key =
            CompositeKey::new("folders#a/b", "fi#x.pdf#d1").with_gsi1("folder#d1", "folder");
        let moved = soft_delete(&Tenant::Default, &key);
        assert_eq!(moved.partition_key, "softdelete#folders#a/b");
        assert_eq!(moved.sort_key, "softdelete#fi#x.pdf#d1");
        assert_eq!(restore(&Tenant::Default, &moved), Ok(key));
    }

    #[test]
    fn test_composite_restore_rejects_partial() {
        let t = Tenant::Default;
        let key = CompositeKey::new("docs#1", "document").with_gsi1("x", "y");
        let mut moved = soft_delete(&t, &key);
        moved.gsi1 = Some(IndexKey::new("x", "y"));
        assert!(restore(&t, &moved).is_err());
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_tenant() -> impl Strategy<Value = Tenant> {
        prop_oneof![
            Just(Tenant::Default),
            "[a-z]{1,10}".prop_map(Tenant::Site),
        ]
    }

    /// A tenant-scoped partition key whose id may itself contain `/`.
    fn arb_scoped(tenant: Tenant) -> impl Strategy<Value = String> {
        "[a-z#0-9._-]{1,12}(/[a-z#0-9._-]{1,12}){0,3}"
            .prop_map(move |id| crate::keys::key(&tenant, &id))
    }

    fn arb_composite() -> impl Strategy<Value = (Tenant, CompositeKey)> {
        arb_tenant().prop_flat_map(|tenant| {
            (
                Just(tenant.clone()),
                arb_scoped(tenant.clone()),
                "[a-z#0-9/]{1,20}",
                prop::option::of((arb_scoped(tenant.clone()), "[a-z#0-9]{0,20}")),
                prop::option::of((arb_scoped(tenant), "[a-z#0-9]{0,20}")),
            )
                .prop_map(|(tenant, pk, sk, g1, g2)| {
                    let key = CompositeKey {
                        partition_key: pk,
                        sort_key: sk,
                        gsi1: g1.map(|(p, s)| IndexKey::new(p, s)),
                        gsi2: g2.map(|(p, s)| IndexKey::new(p, s)),
                    };
                    (tenant, key)
                })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_restore_inverts_soft_delete(
            (tenant, key) in arb_tenant().prop_flat_map(|t| (Just(t.clone()), arb_scoped(t))),
        ) {
            let moved = soft_delete_key(&tenant, &key);
            prop_assert!(is_soft_deleted(&tenant, &moved));
            prop_assert_eq!(restore_key(&tenant, &moved), Ok(key));
        }

        #[test]
        fn prop_marker_follows_tenant_segment(
            (tenant, key) in arb_tenant().prop_flat_map(|t| (Just(t.clone()), arb_scoped(t))),
        ) {
            let moved = soft_delete_key(&tenant, &key);
            let expected_prefix = match tenant.site_id() {
                Some(site) => format!("{site}/{SOFT_DELETE_MARKER}"),
                None => SOFT_DELETE_MARKER.to_string(),
            };
            prop_assert!(moved.starts_with(&expected_prefix));
        }

        #[test]
        fn prop_live_keys_are_not_soft_deleted(
            (tenant, key) in arb_tenant().prop_flat_map(|t| (Just(t.clone()), arb_scoped(t))),
        ) {
            prop_assume!(!key.contains(SOFT_DELETE_MARKER));
            prop_assert!(!is_soft_deleted(&tenant, &key));
        }

        #[test]
        fn prop_composite_restore_inverts((tenant, key) in arb_composite()) {
            prop_assert_eq!(restore(&tenant, &soft_delete(&tenant, &key)), Ok(key));
        }
    }
}
