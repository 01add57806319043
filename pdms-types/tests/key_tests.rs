use pdms_types::{CompoundKey, DocumentId, ShapeId};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

fn key(doc: u32, shape: u32) -> CompoundKey {
    CompoundKey::new(DocumentId::new(doc), ShapeId::new(shape))
}

// ── Construction & accessors ─────────────────────────────────────

#[test]
fn top_level_key_has_no_sub_path() {
    let k = key(1, 42);
    assert_eq!(k.document(), DocumentId::new(1));
    assert_eq!(k.shape(), ShapeId::new(42));
    assert!(k.sub_path().is_empty());
    assert!(!k.is_nested());
    assert_eq!(k.leaf(), ShapeId::new(42));
    assert_eq!(k.parent(), None);
}

#[test]
fn child_extends_sub_path() {
    let group = key(1, 42);
    let inner = group.child(ShapeId::new(7)).child(ShapeId::new(3));

    assert!(inner.is_nested());
    assert_eq!(inner.sub_path(), &[ShapeId::new(7), ShapeId::new(3)]);
    assert_eq!(inner.leaf(), ShapeId::new(3));
    assert_eq!(inner.parent(), Some(group.child(ShapeId::new(7))));
    assert_eq!(inner.parent().and_then(|p| p.parent()), Some(group.clone()));
    // the original is untouched
    assert!(!group.is_nested());
}

// ── Equality & ordering ──────────────────────────────────────────

#[test]
fn keys_differing_in_any_component_are_distinct() {
    let base = key(1, 10);
    let mut set = HashSet::new();
    set.insert(base.clone());
    set.insert(key(2, 10));
    set.insert(key(1, 11));
    set.insert(base.child(ShapeId::new(1)));
    set.insert(base.clone());
    assert_eq!(set.len(), 4);
}

#[test]
fn nested_keys_sort_after_their_container() {
    let mut set = BTreeSet::new();
    set.insert(key(1, 11));
    set.insert(key(1, 10).child(ShapeId::new(5)));
    set.insert(key(1, 10));
    set.insert(key(0, 99));

    let ordered: Vec<String> = set.iter().map(ToString::to_string).collect();
    assert_eq!(ordered, vec!["0:99", "1:10", "1:10/5", "1:11"]);
}

// ── Display / FromStr ────────────────────────────────────────────

#[test]
fn display_format() {
    assert_eq!(key(3, 17).to_string(), "3:17");
    assert_eq!(key(3, 17).child(ShapeId::new(2)).to_string(), "3:17/2");
}

#[test]
fn parse_rejects_malformed_input() {
    for bad in ["", "3", "3:", ":17", "a:17", "3:b", "3:17/", "3:17/x", "3:-1"] {
        assert!(CompoundKey::from_str(bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn parse_error_names_input() {
    let err = CompoundKey::from_str("oops").unwrap_err();
    assert!(err.to_string().contains("oops"));
}

#[test]
fn serde_omits_empty_sub_path() {
    let json = serde_json::to_string(&key(1, 2)).unwrap();
    assert_eq!(json, r#"{"document":1,"shape":2}"#);

    let nested: CompoundKey =
        serde_json::from_str(r#"{"document":1,"shape":2,"sub_path":[4]}"#).unwrap();
    assert_eq!(nested, key(1, 2).child(ShapeId::new(4)));
}

proptest! {
    #[test]
    fn display_parse_preserves_identity(
        doc in any::<u32>(),
        shape in any::<u32>(),
        subs in prop::collection::vec(any::<u32>(), 0..4),
    ) {
        let k = CompoundKey::nested(
            DocumentId::new(doc),
            ShapeId::new(shape),
            subs.into_iter().map(ShapeId::new).collect(),
        );
        let parsed = CompoundKey::from_str(&k.to_string()).unwrap();
        prop_assert_eq!(parsed, k);
    }
}
