//! Custom zero and emptiness tests, wide omission masks and nil newtypes.

use packgen::{append, decode, encode, from_slice, to_vec, Sizer, Value};
use packgen_tests::omission::{Aliases, Bag, Labels, Sparse, Tagged, Wide, Window};

fn keys(bytes: &[u8]) -> Vec<String> {
    let mut b = bytes;
    let Value::Map(entries) = Value::read_from(&mut b).unwrap() else {
        panic!("expected a map");
    };
    assert!(b.is_empty());
    entries
        .into_iter()
        .map(|(k, _)| match k {
            Value::Str(s) => s,
            other => panic!("expected a str key, got {other:?}"),
        })
        .collect()
}

// =============================================================================
// Custom Tests
// =============================================================================

#[test]
fn test_custom_tests_omit_structurally_nonzero_values() {
    let v = Sparse {
        window: Window { start: 5, end: 5 },
        bag: Bag {
            items: Vec::new(),
            label: "kept locally".into(),
        },
        spare: Some(Bag {
            items: Vec::new(),
            label: "y".into(),
        }),
        count: 0,
        always: 0,
    };
    let bytes = to_vec(&v).unwrap();
    assert_eq!(keys(&bytes), vec!["always"]);

    let back: Sparse = from_slice(&bytes).unwrap();
    assert_eq!(back, Sparse::default());
}

#[test]
fn test_custom_tests_keep_meaningful_values() {
    let v = Sparse {
        window: Window { start: 1, end: 4 },
        bag: Bag {
            items: vec!["a".into()],
            label: String::new(),
        },
        spare: None,
        count: 3,
        always: 9,
    };
    let bytes = to_vec(&v).unwrap();
    assert_eq!(keys(&bytes), vec!["window", "bag", "count", "always"]);
    assert!(bytes.len() <= v.msgsize());
    assert_eq!(from_slice::<Sparse>(&bytes).unwrap(), v);
    assert_eq!(decode::<Sparse, _>(bytes.as_slice()).unwrap(), v);
}

#[test]
fn test_zero_without_capability_falls_back_to_structural() {
    let v = Sparse {
        window: Window { start: 0, end: 1 },
        count: 0,
        ..Sparse::default()
    };
    assert_eq!(keys(&to_vec(&v).unwrap()), vec!["window", "always"]);
}

// =============================================================================
// Wide Structs
// =============================================================================

#[test]
fn test_default_wide_struct_is_an_empty_map() {
    assert_eq!(to_vec(&Wide::default()).unwrap(), vec![0x80]);
    assert_eq!(encode(&Wide::default(), Vec::new()).unwrap(), vec![0x80]);
}

#[test]
fn test_omission_mask_spans_words() {
    let v = Wide {
        f03: 1,
        f63: 2,
        f64: 3,
        f69: 4,
        ..Wide::default()
    };
    let bytes = to_vec(&v).unwrap();
    assert_eq!(keys(&bytes), vec!["f03", "f63", "f64", "f69"]);
    assert_eq!(encode(&v, Vec::new()).unwrap(), bytes);
    assert_eq!(from_slice::<Wide>(&bytes).unwrap(), v);
}

#[test]
fn test_full_wide_struct_uses_map16() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 70);
    for i in 0..70u8 {
        append::append_str(&mut b, &format!("f{i:02}"));
        append::append_uint(&mut b, u64::from(i) + 1);
    }
    let v: Wide = from_slice(&b).unwrap();
    assert_eq!(v.f00, 1);
    assert_eq!(v.f69, 70);

    let bytes = to_vec(&v).unwrap();
    assert_eq!(&bytes[..3], &[0xde, 0x00, 70]);
    assert_eq!(bytes, b);
    assert!(bytes.len() <= v.msgsize());
    assert_eq!(decode::<Wide, _>(bytes.as_slice()).unwrap(), v);
}

// =============================================================================
// Nil Newtypes
// =============================================================================

#[test]
fn test_allownil_newtype_writes_nil() {
    let mut want = Vec::new();
    append::append_map_header(&mut want, 2);
    append::append_str(&mut want, "labels");
    append::append_nil(&mut want);
    append::append_str(&mut want, "aliases");
    append::append_array_header(&mut want, 0);

    assert_eq!(to_vec(&Tagged::default()).unwrap(), want);
}

#[test]
fn test_allownil_newtype_keeps_nil_and_empty_apart() {
    for labels in [None, Some(Vec::new()), Some(vec!["x".to_string()])] {
        let v = Tagged {
            labels: Labels(labels),
            aliases: Aliases(Some(vec!["y".into()])),
        };
        let bytes = to_vec(&v).unwrap();
        assert_eq!(from_slice::<Tagged>(&bytes).unwrap(), v);
        assert_eq!(decode::<Tagged, _>(bytes.as_slice()).unwrap(), v);
    }
}

#[test]
fn test_plain_newtype_reads_nil_as_empty() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 2);
    append::append_str(&mut b, "labels");
    append::append_nil(&mut b);
    append::append_str(&mut b, "aliases");
    append::append_nil(&mut b);

    let v: Tagged = from_slice(&b).unwrap();
    assert_eq!(v.labels, Labels(None));
    assert_eq!(v.aliases, Aliases(Some(Vec::new())));
}
