use contentsync_types::{BlobValue, FieldValue, ModificationDate, ObjectUid, RelationValue};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Conversion from JSON ─────────────────────────────────────────

#[test]
fn from_json_maps_scalars() {
    assert_eq!(FieldValue::from_json(&json!("hi")), Some(FieldValue::Text("hi".into())));
    assert_eq!(FieldValue::from_json(&json!(3)), Some(FieldValue::Number(3.0)));
    assert_eq!(FieldValue::from_json(&json!(false)), Some(FieldValue::Bool(false)));
}

#[test]
fn from_json_keeps_structures_as_json() {
    let value = json!({"street": "Via Roma", "number": 1});
    assert_eq!(FieldValue::from_json(&value), Some(FieldValue::Json(value.clone())));
    let list = json!(["a", "b"]);
    assert_eq!(FieldValue::from_json(&list), Some(FieldValue::Json(list.clone())));
}

#[test]
fn from_json_null_is_no_value() {
    assert_eq!(FieldValue::from_json(&json!(null)), None);
}

#[test]
fn upload_shape_decodes_base64() {
    let value = json!({"data": "AQID", "encoding": "base64", "filename": "a.png", "content-type": "image/png"});
    let blob = BlobValue::from_upload(&value).unwrap().unwrap();
    assert_eq!(blob, BlobValue::new("a.png", "image/png", vec![1, 2, 3]));
}

#[test]
fn plain_objects_are_not_uploads() {
    assert_eq!(BlobValue::from_upload(&json!({"data": "x"})).unwrap(), None);
    assert_eq!(BlobValue::from_upload(&json!("AQID")).unwrap(), None);
}

#[test]
fn bad_base64_upload_is_an_error() {
    let value = json!({"data": "%%%", "encoding": "base64"});
    assert!(matches!(
        BlobValue::from_upload(&value),
        Err(contentsync_types::Error::InvalidBlob(_))
    ));
}

// ── Relation semantics ───────────────────────────────────────────

#[test]
fn relation_wrappers_are_distinct_but_equivalent() {
    let target = ObjectUid::new();
    let a = FieldValue::Relation(RelationValue::new(target));
    let b = FieldValue::Relation(RelationValue::new(target));

    assert_ne!(a, b);
    assert!(a.is_equivalent(&b));
}

#[test]
fn relations_to_different_targets_are_not_equivalent() {
    let a = FieldValue::Relation(RelationValue::new(ObjectUid::new()));
    let b = FieldValue::Relation(RelationValue::new(ObjectUid::new()));
    assert!(!a.is_equivalent(&b));
}

#[test]
fn relation_is_not_equivalent_to_text_of_its_target() {
    let target = ObjectUid::new();
    let relation = FieldValue::Relation(RelationValue::new(target));
    let text = FieldValue::Text(target.to_string());
    assert!(!relation.is_equivalent(&text));
}

#[test]
fn equivalence_matches_equality_for_plain_values() {
    let a = FieldValue::Text("x".into());
    assert!(a.is_equivalent(&FieldValue::Text("x".into())));
    assert!(!a.is_equivalent(&FieldValue::Text("y".into())));

    let date = ModificationDate::parse("2024-01-01").unwrap();
    assert!(FieldValue::Timestamp(date).is_equivalent(&FieldValue::Timestamp(date)));
}

// ── Serialization ────────────────────────────────────────────────

#[test]
fn blob_serializes_data_as_base64() {
    let blob = FieldValue::Blob(BlobValue::new("logo.png", "image/png", vec![1, 2, 3]));
    let json = serde_json::to_value(&blob).unwrap();
    assert_eq!(json["type"], "blob");
    assert_eq!(json["value"]["data"], "AQID");
    assert_eq!(json["value"]["filename"], "logo.png");

    let back: FieldValue = serde_json::from_value(json).unwrap();
    assert_eq!(back, blob);
}

#[test]
fn relation_survives_serialization_with_wrapper() {
    let relation = FieldValue::Relation(RelationValue::new(ObjectUid::new()));
    let json = serde_json::to_string(&relation).unwrap();
    let back: FieldValue = serde_json::from_str(&json).unwrap();
    assert_eq!(back, relation);
}

#[test]
fn accessors() {
    let text = FieldValue::from("hello");
    assert_eq!(text.as_text(), Some("hello"));
    assert!(text.as_relation().is_none());

    let target = ObjectUid::new();
    let relation = FieldValue::from(RelationValue::new(target));
    assert_eq!(relation.as_relation().unwrap().to_id, target);
    assert!(relation.as_text().is_none());
}
