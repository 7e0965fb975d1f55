use pretty_assertions::assert_eq;
use serde_json::json;
use tollgate_types::Fields;

// ── Ordering ──────────────────────────────────────────────────────

#[test]
fn serialization_keeps_insertion_order() {
    let fields = Fields::new()
        .with("typ", "Trial")
        .with("alg", "HS256")
        .with("product", "acme");
    let json = String::from_utf8(fields.to_canonical_json().unwrap()).unwrap();
    assert_eq!(json, r#"{"typ":"Trial","alg":"HS256","product":"acme"}"#);
}

#[test]
fn deserialization_keeps_document_order() {
    let fields = Fields::from_json(br#"{"zeta":1,"alpha":2,"mid":3}"#).unwrap();
    let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    assert_eq!(
        fields.to_canonical_json().unwrap(),
        br#"{"zeta":1,"alpha":2,"mid":3}"#.to_vec()
    );
}

#[test]
fn overwrite_keeps_original_position() {
    let mut fields = Fields::new().with("alg", "RS256").with("typ", "JWT");
    fields.set("alg", "HS512");
    let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["alg", "typ"]);
    assert_eq!(fields.get("alg"), Some(&json!("HS512")));
}

#[test]
fn identical_content_identical_bytes() {
    let a = Fields::new().with("name", "Furkan").with("seats", 3);
    let b: Fields = vec![("name", json!("Furkan")), ("seats", json!(3))]
        .into_iter()
        .collect();
    assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());
}

// ── Accessors ─────────────────────────────────────────────────────

#[test]
fn get_str_ignores_empty_and_non_strings() {
    let fields = Fields::new()
        .with("empty", "")
        .with("number", 7)
        .with("name", "acme");
    assert_eq!(fields.get_str("empty"), None);
    assert_eq!(fields.get_str("number"), None);
    assert_eq!(fields.get_str("missing"), None);
    assert_eq!(fields.get_str("name"), Some("acme"));
}

#[test]
fn len_and_is_empty() {
    let mut fields = Fields::new();
    assert!(fields.is_empty());
    fields.set("a", 1);
    fields.set("a", 2);
    assert_eq!(fields.len(), 1);
    assert!(fields.contains_key("a"));
}
