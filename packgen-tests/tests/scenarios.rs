//! Wire-level scenarios for generated codecs.

use packgen::{append, decode, encode, from_slice, to_vec, ErrorKind, Value};
use packgen_tests::scenarios::{Foo, Lists, Message, Profile, Row};
use serde_json::json;

fn to_json(bytes: &[u8]) -> serde_json::Value {
    let mut b = bytes;
    let value = Value::read_from(&mut b).unwrap();
    assert!(b.is_empty());
    value.to_json()
}

// =============================================================================
// Nil And Empty Containers
// =============================================================================

#[test]
fn test_nil_decodes_to_empty_unless_allownil() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 2);
    append::append_str(&mut b, "a");
    append::append_nil(&mut b);
    append::append_str(&mut b, "b");
    append::append_nil(&mut b);

    let lists: Lists = from_slice(&b).unwrap();
    assert_eq!(lists.a, Some(Vec::new()));
    assert_eq!(lists.b, None);

    let streamed: Lists = decode(b.as_slice()).unwrap();
    assert_eq!(streamed, lists);
}

#[test]
fn test_absent_optional_container_encodes_as_empty_unless_allownil() {
    let bytes = to_vec(&Lists::default()).unwrap();
    assert_eq!(bytes, vec![0x82, 0xa1, b'a', 0x90, 0xa1, b'b', 0xc0]);
}

#[test]
fn test_allownil_round_trips_both_states() {
    for b in [None, Some(Vec::new()), Some(vec!["x".to_string()])] {
        let lists = Lists {
            a: Some(vec!["y".into()]),
            b,
        };
        let back: Lists = from_slice(&to_vec(&lists).unwrap()).unwrap();
        assert_eq!(back, lists);
    }
}

// =============================================================================
// Omission
// =============================================================================

#[test]
fn test_tuple_layout_keeps_empty_slot() {
    let row = Row {
        x: String::new(),
        y: "b".into(),
    };
    let bytes = to_vec(&row).unwrap();
    assert_eq!(bytes, vec![0x92, 0xa0, 0xa1, b'b']);
    assert_eq!(from_slice::<Row>(&bytes).unwrap(), row);
}

#[test]
fn test_tuple_arity_is_checked() {
    let bytes = vec![0x93, 0xa0, 0xa0, 0xa0];
    let err = from_slice::<Row>(&bytes).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::ArityMismatch {
            expected: 2,
            found: 3
        }
    ));
}

#[test]
fn test_map_layout_omits_empty_fields() {
    let bytes = to_vec(&Profile::default()).unwrap();
    assert_eq!(bytes, vec![0x81, 0xa4, b'n', b'a', b'm', b'e', 0xa0]);

    let full = Profile {
        name: "ada".into(),
        nickname: "al".into(),
        tags: vec!["x".into()],
        visits: 3,
        cached: false,
    };
    assert_eq!(
        to_json(&to_vec(&full).unwrap()),
        json!({"name": "ada", "nickname": "al", "tags": ["x"], "n": 3})
    );
}

#[test]
fn test_skipped_field_and_unknown_keys_are_ignored() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 3);
    append::append_str(&mut b, "name");
    append::append_str(&mut b, "bob");
    append::append_str(&mut b, "cached");
    append::append_bool(&mut b, true);
    append::append_str(&mut b, "extra");
    append::append_array_header(&mut b, 1);
    append::append_uint(&mut b, 9);

    let profile: Profile = from_slice(&b).unwrap();
    assert_eq!(profile.name, "bob");
    assert!(!profile.cached);
}

// =============================================================================
// Interface Enums
// =============================================================================

#[test]
fn test_interface_renders_as_tagged_pair() {
    let msg = Message::Foo(Foo {
        foo: "hello".into(),
    });
    let bytes = to_vec(&msg).unwrap();
    assert_eq!(to_json(&bytes), json!(["Foo", {"foo": "hello"}]));
    assert_eq!(from_slice::<Message>(&bytes).unwrap(), msg);
}

#[test]
fn test_renamed_and_unit_variants() {
    let text = to_vec(&Message::Text("hi".into())).unwrap();
    assert_eq!(to_json(&text), json!(["txt", "hi"]));
    assert_eq!(from_slice::<Message>(&text).unwrap(), Message::Text("hi".into()));

    let empty = to_vec(&Message::Empty).unwrap();
    assert_eq!(to_json(&empty), json!(["Empty", null]));
}

#[test]
fn test_decoding_switches_variants() {
    let mut msg = Message::Text("old".into());
    let bytes = to_vec(&Message::Foo(Foo { foo: "new".into() })).unwrap();
    let rest = packgen::Unmarshaler::unmarshal_msg(&mut msg, &bytes).unwrap();
    assert!(rest.is_empty());
    assert_eq!(msg, Message::Foo(Foo { foo: "new".into() }));
}

#[test]
fn test_skipped_variant_cannot_cross_the_wire() {
    let err = to_vec(&Message::Local(5)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownVariant { .. }));

    let mut b = Vec::new();
    append::append_array_header(&mut b, 2);
    append::append_str(&mut b, "Local");
    append::append_uint(&mut b, 5);
    let err = from_slice::<Message>(&b).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnknownVariant { discriminator } if discriminator == "Local"
    ));
}

#[test]
fn test_stream_and_buffer_agree() {
    let msg = Message::Foo(Foo { foo: "s".into() });
    let streamed = encode(&msg, Vec::new()).unwrap();
    assert_eq!(streamed, to_vec(&msg).unwrap());
    assert_eq!(decode::<Message, _>(streamed.as_slice()).unwrap(), msg);
}
