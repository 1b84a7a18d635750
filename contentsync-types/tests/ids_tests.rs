use contentsync_types::{ObjectUid, RemoteId};
use serde_json::json;
use std::collections::HashSet;
use std::str::FromStr;

// ── ObjectUid ─────────────────────────────────────────────────────

#[test]
fn object_uid_new_is_unique() {
    let a = ObjectUid::new();
    let b = ObjectUid::new();
    assert_ne!(a, b);
}

#[test]
fn object_uid_display_and_parse() {
    let uid = ObjectUid::new();
    let parsed = ObjectUid::parse(&uid.to_string()).unwrap();
    assert_eq!(uid, parsed);
}

#[test]
fn object_uid_from_str() {
    let uid = ObjectUid::new();
    let parsed = ObjectUid::from_str(&uid.to_string()).unwrap();
    assert_eq!(uid, parsed);
}

#[test]
fn object_uid_parse_invalid() {
    assert!(ObjectUid::parse("not-a-uuid").is_err());
}

#[test]
fn object_uid_is_time_ordered() {
    let a = ObjectUid::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = ObjectUid::new();
    assert!(a < b);
}

#[test]
fn object_uid_serde_is_transparent() {
    let uid = ObjectUid::new();
    let json = serde_json::to_string(&uid).unwrap();
    assert_eq!(json, format!("\"{uid}\""));
}

// ── RemoteId ──────────────────────────────────────────────────────

#[test]
fn remote_id_trims_whitespace() {
    let id = RemoteId::new("  a1 ").unwrap();
    assert_eq!(id.as_str(), "a1");
    assert_eq!(id, RemoteId::new("a1").unwrap());
}

#[test]
fn remote_id_rejects_blank() {
    assert!(RemoteId::new("").is_none());
    assert!(RemoteId::new("   ").is_none());
}

#[test]
fn remote_id_from_json_string_and_integer() {
    assert_eq!(RemoteId::from_json(&json!("abc")).unwrap().as_str(), "abc");
    assert_eq!(RemoteId::from_json(&json!(42)).unwrap().as_str(), "42");
}

#[test]
fn remote_id_from_json_rejects_other_types() {
    assert!(RemoteId::from_json(&json!(null)).is_none());
    assert!(RemoteId::from_json(&json!(1.5)).is_none());
    assert!(RemoteId::from_json(&json!({"id": "x"})).is_none());
    assert!(RemoteId::from_json(&json!(["x"])).is_none());
}

#[test]
fn remote_id_borrows_as_str_in_sets() {
    let mut set = HashSet::new();
    set.insert(RemoteId::new("a1").unwrap());
    assert!(set.contains("a1"));
    assert!(!set.contains("a2"));
}
