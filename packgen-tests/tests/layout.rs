//! Flattened fields, recursive types and generic instantiation.

use packgen::{append, decode, encode, from_slice, to_vec, Sizer, Value};
use packgen_tests::layout::{Envelope, Listing, Meta, Page, Tree};

fn keys(bytes: &[u8]) -> Vec<String> {
    let mut b = bytes;
    match Value::read_from(&mut b).unwrap() {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, _)| match k {
                Value::Str(s) => s,
                other => panic!("expected a str key, got {other:?}"),
            })
            .collect(),
        other => panic!("expected a map, got {other:?}"),
    }
}

fn round_trip<T>(v: &T) -> T
where
    T: packgen::Msgp + std::fmt::Debug + PartialEq,
{
    let bytes = to_vec(v).unwrap();
    assert!(bytes.len() <= v.msgsize());
    let streamed = encode(v, Vec::new()).unwrap();
    assert_eq!(streamed, bytes);
    let streamed: T = decode(streamed.as_slice()).unwrap();
    let buffered: T = from_slice(&bytes).unwrap();
    assert_eq!(streamed, buffered);
    buffered
}

// =============================================================================
// Flatten
// =============================================================================

#[test]
fn test_flattened_fields_share_the_outer_map() {
    let env = Envelope {
        meta: Meta {
            id: 7,
            kind: "inner".into(),
        },
        kind: "outer".into(),
        body: "hello".into(),
    };
    let bytes = to_vec(&env).unwrap();
    assert_eq!(keys(&bytes), vec!["id", "kind", "kind", "body"]);
}

#[test]
fn test_later_field_wins_a_repeated_key() {
    let env = Envelope {
        meta: Meta {
            id: 7,
            kind: "inner".into(),
        },
        kind: "outer".into(),
        body: String::new(),
    };
    let back = round_trip(&env);
    assert_eq!(back.meta.id, 7);
    assert_eq!(back.meta.kind, "");
    assert_eq!(back.kind, "outer");
}

#[test]
fn test_repeated_key_on_the_wire_keeps_the_last_value() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 3);
    append::append_str(&mut b, "kind");
    append::append_str(&mut b, "first");
    append::append_str(&mut b, "id");
    append::append_uint(&mut b, 3);
    append::append_str(&mut b, "kind");
    append::append_str(&mut b, "second");

    let env: Envelope = from_slice(&b).unwrap();
    assert_eq!(env.meta.id, 3);
    assert_eq!(env.kind, "second");
    assert_eq!(env.meta.kind, "");
}

#[test]
fn test_flattened_omitempty_still_applies() {
    let bytes = to_vec(&Envelope::default()).unwrap();
    assert_eq!(keys(&bytes), vec!["id", "kind", "kind"]);
}

// =============================================================================
// Recursion
// =============================================================================

fn leaf(label: &str) -> Tree {
    Tree {
        label: label.into(),
        ..Tree::default()
    }
}

#[test]
fn test_recursive_tree_round_trips() {
    let tree = Tree {
        label: "root".into(),
        kids: vec![
            leaf("a"),
            Tree {
                label: "b".into(),
                kids: vec![leaf("b1"), leaf("b2")],
                next: Some(Box::new(leaf("b-next"))),
            },
        ],
        next: Some(Box::new(Tree {
            label: "sibling".into(),
            kids: Vec::new(),
            next: Some(Box::new(leaf("tail"))),
        })),
    };
    assert_eq!(round_trip(&tree), tree);
}

#[test]
fn test_deep_chain_round_trips() {
    let mut tree = leaf("0");
    for i in 1..64 {
        tree = Tree {
            label: i.to_string(),
            kids: Vec::new(),
            next: Some(Box::new(tree)),
        };
    }
    assert_eq!(round_trip(&tree), tree);
}

// =============================================================================
// Generics
// =============================================================================

#[test]
fn test_generic_page_instantiates_per_element_type() {
    let listing = Listing {
        trees: Page {
            items: vec![leaf("x"), leaf("y")],
            cursor: Some("next".into()),
        },
        labels: Page {
            items: vec!["one".into(), "two".into()],
            cursor: None,
        },
    };
    assert_eq!(round_trip(&listing), listing);

    let labels = to_vec(&listing.labels).unwrap();
    assert_eq!(keys(&labels), vec!["items"]);
}

#[test]
fn test_generic_page_standalone() {
    let page: Page<u64> = Page {
        items: vec![1, 1 << 40],
        cursor: Some(String::new()),
    };
    assert_eq!(round_trip(&page), page);
}
