use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::json;
use session_store::{
    now_epoch_seconds, session_checksum, CredentialStore, Session, SessionStoreError,
    LOGIN_INTERVAL_SECS,
};
use tempfile::TempDir;

fn store_in_tempdir() -> (TempDir, CredentialStore) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = CredentialStore::in_cache_dir(dir.path());
    (dir, store)
}

fn cas_cookies() -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    cookies.insert("__Secure-Login-State-cas".to_string(), "ticket-1".to_string());
    cookies.insert("route".to_string(), "node-3".to_string());
    cookies
}

fn write_raw(path: &Path, value: serde_json::Value) {
    fs::create_dir_all(path.parent().expect("cache file has a parent"))
        .expect("cache dir should be created");
    fs::write(path, value.to_string()).expect("raw record should be written");
}

#[test]
fn save_then_load_round_trips_session() {
    let (_dir, store) = store_in_tempdir();
    let session = Session::issued_now(cas_cookies());

    store.try_save(&session).expect("session should be saved");
    let loaded = store.try_load().expect("saved session should load");

    assert_eq!(loaded, session);
    assert_eq!(store.load(), Some(session));
}

#[test]
fn load_rejects_tampered_checksum() {
    let (_dir, store) = store_in_tempdir();
    let session = Session::issued_now(cas_cookies());
    store.try_save(&session).expect("session should be saved");

    let mut record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).expect("cache should be readable"))
            .expect("cache should be JSON");
    record["checksum"] = json!("0".repeat(64));
    fs::write(store.path(), record.to_string()).expect("tampered record should be written");

    assert!(matches!(
        store.try_load(),
        Err(SessionStoreError::ChecksumMismatch { .. })
    ));
    assert_eq!(store.load(), None);
}

#[test]
fn load_rejects_tampered_cookie_value() {
    let (_dir, store) = store_in_tempdir();
    store
        .try_save(&Session::issued_now(cas_cookies()))
        .expect("session should be saved");

    let mut record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).expect("cache should be readable"))
            .expect("cache should be JSON");
    record["cookies"]["route"] = json!("node-9");
    fs::write(store.path(), record.to_string()).expect("tampered record should be written");

    assert_eq!(store.load(), None);
}

#[test]
fn load_rejects_entry_older_than_login_interval() {
    let (_dir, store) = store_in_tempdir();
    let stale = Session::new(cas_cookies(), now_epoch_seconds() - LOGIN_INTERVAL_SECS - 1);
    store.try_save(&stale).expect("stale session should still be written");

    assert!(matches!(
        store.try_load(),
        Err(SessionStoreError::Expired { .. })
    ));
    assert_eq!(store.load(), None);
}

#[test]
fn custom_login_interval_is_honoured() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = CredentialStore::in_cache_dir(dir.path()).with_login_interval(60);
    let session = Session::new(cas_cookies(), 1_000);
    store.try_save(&session).expect("session should be saved");

    assert!(store.try_load_at(1_060).is_ok());
    assert!(matches!(
        store.try_load_at(1_061),
        Err(SessionStoreError::Expired { age_secs: 61, .. })
    ));
}

#[test]
fn load_reports_missing_file_as_absent() {
    let (_dir, store) = store_in_tempdir();

    assert!(matches!(
        store.try_load(),
        Err(SessionStoreError::Missing { .. })
    ));
    assert_eq!(store.load(), None);
}

#[test]
fn load_rejects_unknown_fields() {
    let (_dir, store) = store_in_tempdir();
    let now = now_epoch_seconds();
    let cookies = cas_cookies();
    write_raw(
        store.path(),
        json!({
            "version": 1,
            "cookies": cookies,
            "last_login_time": now,
            "checksum": session_checksum(&cookies, now),
            "payload": "__reduce__",
        }),
    );

    let error = store.try_load().expect_err("unknown fields must fail");
    assert!(matches!(error, SessionStoreError::Parse { .. }));
    assert!(error.is_corruption());
}

#[test]
fn load_rejects_missing_fields_and_garbage() {
    let (_dir, store) = store_in_tempdir();
    write_raw(
        store.path(),
        json!({"version": 1, "cookies": {}}),
    );
    assert!(matches!(
        store.try_load(),
        Err(SessionStoreError::Parse { .. })
    ));

    fs::write(store.path(), b"\x80\x04\x95not json").expect("garbage should be written");
    assert_eq!(store.load(), None);
}

#[test]
fn load_rejects_unsupported_version() {
    let (_dir, store) = store_in_tempdir();
    let now = now_epoch_seconds();
    let cookies = cas_cookies();
    write_raw(
        store.path(),
        json!({
            "version": 2,
            "cookies": cookies,
            "last_login_time": now,
            "checksum": session_checksum(&cookies, now),
        }),
    );

    assert!(matches!(
        store.try_load(),
        Err(SessionStoreError::UnsupportedVersion {
            found: 2,
            expected: 1,
            ..
        })
    ));
}

#[test]
fn save_creates_missing_cache_directory() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = CredentialStore::in_cache_dir(&dir.path().join("nested").join("cache"));

    store.save(&Session::issued_now(cas_cookies()));

    assert!(store.path().exists());
    assert!(store.load().is_some());
}

#[test]
fn save_overwrites_previous_record() {
    let (_dir, store) = store_in_tempdir();
    store.save(&Session::issued_now(cas_cookies()));

    let anonymous = Session::issued_now(BTreeMap::new());
    store.save(&anonymous);

    assert_eq!(store.load(), Some(anonymous));
}

#[test]
fn save_failure_is_swallowed() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").expect("blocker file should be written");
    let store = CredentialStore::in_cache_dir(&blocker);

    assert!(store.try_save(&Session::issued_now(cas_cookies())).is_err());
    store.save(&Session::issued_now(cas_cookies()));
    assert_eq!(store.load(), None);
}

#[test]
fn clear_removes_cache_and_tolerates_absence() {
    let (_dir, store) = store_in_tempdir();
    store.save(&Session::issued_now(cas_cookies()));

    store.clear().expect("clear should succeed");
    assert!(!store.path().exists());
    store.clear().expect("clearing twice should succeed");
}
