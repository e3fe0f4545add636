//! Fuzz test for the tenant key codec and soft-delete transforms
//!
//! Input is split on the first NUL byte into a site id and a raw id; without
//! a NUL the default tenant is used.
//!
//! Run with: cargo +nightly fuzz run key_codec_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use quire_core::keys::{self, Tenant};
use quire_core::{is_soft_deleted, restore_key, soft_delete_key};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (site, id) = match input.split_once('\0') {
        Some((site, id)) => (Some(site), id),
        None => (None, input),
    };

    // Invalid site ids are rejected, never panicked on
    let Ok(tenant) = Tenant::parse(site) else {
        return;
    };

    let key = keys::key(&tenant, id);
    if !tenant.is_default() {
        assert_eq!(keys::decode_tenant(&key), Some(tenant.clone()));
        assert_eq!(keys::decode_id(&key), id);
        assert_eq!(keys::rebase(&tenant, &key), id);
    }

    let deleted = soft_delete_key(&tenant, &key);
    assert!(is_soft_deleted(&tenant, &deleted));
    assert_eq!(restore_key(&tenant, &deleted).ok(), Some(key.clone()));

    // The marker sits right after the tenant segment, wherever `/` appears in the id
    let scope = keys::key(&tenant, "");
    assert!(deleted.starts_with(&format!("{scope}{}", quire_core::SOFT_DELETE_MARKER)));

    // Restoring a key that never carried the marker must fail cleanly
    if !is_soft_deleted(&tenant, &key) {
        assert!(restore_key(&tenant, &key).is_err());
    }
});
