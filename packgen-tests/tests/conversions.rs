//! Replaced, shimmed, binary, text and intercepted field types.

use packgen::{append, decode, encode, from_slice, to_vec, ErrorKind, PathSegment, Sizer, Value};
use packgen_tests::conversions::Reading;
use packgen_tests::domain::{
    Celsius, Fingerprint, LegacyId, Locale, Money, Port, Token, Version,
};

fn reading() -> Reading {
    Reading {
        source: LegacyId {
            namespace: "plant-3".into(),
            serial: 90_210,
        },
        temp: Celsius(21.5),
        port: Port(8080),
        token: Token(*b"abcdefgh"),
        print: Fingerprint {
            algo: 2,
            digest: vec![0xde, 0xad, 0xbe, 0xef],
        },
        locale: Locale("en-GB".into()),
        firmware: Version {
            major: 1,
            minor: 12,
            patch: 3,
        },
        price: Money {
            cents: -1250,
            currency: "EUR".into(),
        },
        history: vec![Celsius(-4.0), Celsius(0.25)],
        budget: Some(Money {
            cents: 99_900,
            currency: "USD".into(),
        }),
    }
}

/// Wire value under `key` in an encoded map.
fn field(bytes: &[u8], key: &str) -> Value {
    let mut b = bytes;
    let Value::Map(entries) = Value::read_from(&mut b).unwrap() else {
        panic!("expected a map");
    };
    entries
        .into_iter()
        .find(|(k, _)| *k == Value::Str(key.into()))
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("no key {key}"))
}

/// A one-field map holding `key` and whatever `value` appends.
fn single(key: &str, value: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 1);
    append::append_str(&mut b, key);
    value(&mut b);
    b
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_every_conversion_round_trips() {
    let v = reading();
    let bytes = to_vec(&v).unwrap();
    assert!(bytes.len() <= v.msgsize());
    assert_eq!(from_slice::<Reading>(&bytes).unwrap(), v);

    let streamed = encode(&v, Vec::new()).unwrap();
    assert_eq!(streamed, bytes);
    assert_eq!(decode::<Reading, _>(streamed.as_slice()).unwrap(), v);
}

#[test]
fn test_absent_budget_round_trips() {
    let v = Reading {
        budget: None,
        ..reading()
    };
    assert_eq!(from_slice::<Reading>(&to_vec(&v).unwrap()).unwrap(), v);
}

// =============================================================================
// Wire Forms
// =============================================================================

#[test]
fn test_replacement_is_encoded_as_its_stand_in() {
    let bytes = to_vec(&reading()).unwrap();
    let Value::Map(entries) = field(&bytes, "source") else {
        panic!("replacement should be a map");
    };
    assert_eq!(
        entries,
        vec![
            (Value::Str("ns".into()), Value::Str("plant-3".into())),
            (Value::Str("serial".into()), Value::Uint(90_210)),
        ]
    );
}

#[test]
fn test_shims_write_their_wire_type() {
    let bytes = to_vec(&reading()).unwrap();
    assert_eq!(field(&bytes, "temp"), Value::F64(21.5));
    assert_eq!(field(&bytes, "port"), Value::Uint(8080));
    assert_eq!(
        field(&bytes, "history"),
        Value::Array(vec![Value::F64(-4.0), Value::F64(0.25)])
    );
}

#[test]
fn test_binary_capabilities_write_bin() {
    let bytes = to_vec(&reading()).unwrap();
    assert_eq!(field(&bytes, "token"), Value::Bin(b"abcdefgh".to_vec()));
    assert_eq!(
        field(&bytes, "print"),
        Value::Bin(vec![2, 0xde, 0xad, 0xbe, 0xef])
    );
}

#[test]
fn test_text_capabilities_pick_bin_or_str() {
    let bytes = to_vec(&reading()).unwrap();
    assert_eq!(field(&bytes, "locale"), Value::Bin(b"en-GB".to_vec()));
    assert_eq!(field(&bytes, "firmware"), Value::Str("1.12.3".into()));
}

#[test]
fn test_text_is_accepted_as_str_or_bin() {
    let b = single("locale", |b| append::append_str(b, "fr-CA"));
    assert_eq!(from_slice::<Reading>(&b).unwrap().locale, Locale("fr-CA".into()));

    let b = single("firmware", |b| append::append_bin(b, b"2.0.1"));
    let v: Reading = decode(b.as_slice()).unwrap();
    assert_eq!(
        v.firmware,
        Version {
            major: 2,
            minor: 0,
            patch: 1
        }
    );
}

#[test]
fn test_interceptor_owns_the_encoding() {
    let bytes = to_vec(&reading()).unwrap();
    assert_eq!(
        field(&bytes, "price"),
        Value::Array(vec![Value::Int(-1250), Value::Str("EUR".into())])
    );
}

// =============================================================================
// Conversion Failures
// =============================================================================

fn assert_conversion(bytes: &[u8], key: &'static str) {
    let err = from_slice::<Reading>(bytes).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Conversion(_)), "{err:?}");
    assert_eq!(err.path(), &[PathSegment::Field(key)]);

    let err = decode::<Reading, _>(bytes).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Conversion(_)), "{err:?}");
    assert_eq!(err.path(), &[PathSegment::Field(key)]);
}

#[test]
fn test_fallible_shim_reports_out_of_range() {
    assert_conversion(&single("port", |b| append::append_uint(b, 70_000)), "port");
}

#[test]
fn test_bad_binary_payloads_are_conversion_errors() {
    assert_conversion(&single("token", |b| append::append_bin(b, b"short")), "token");
    assert_conversion(&single("print", |b| append::append_bin(b, &[])), "print");
}

#[test]
fn test_bad_text_is_a_conversion_error() {
    assert_conversion(&single("firmware", |b| append::append_str(b, "1.x.3")), "firmware");
    assert_conversion(&single("firmware", |b| append::append_str(b, "1.2")), "firmware");
}

#[test]
fn test_interceptor_errors_carry_the_field() {
    let b = single("price", |b| {
        append::append_array_header(b, 3);
        append::append_int(b, 1);
        append::append_str(b, "EUR");
        append::append_nil(b);
    });
    let err = from_slice::<Reading>(&b).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::ArityMismatch {
            expected: 2,
            found: 3
        }
    ));
    assert_eq!(err.path(), &[PathSegment::Field("price")]);
}
