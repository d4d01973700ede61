//! Map keys routed through shims.

use packgen::{append, from_slice, to_vec, ErrorKind, Sizer, Value};
use packgen_tests::counters::Counters;
use packgen_tests::keys::Routes;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

fn arb_routes() -> impl Strategy<Value = Routes> {
    prop_oneof![Just(0usize), Just(1usize), Just(50usize)].prop_flat_map(|n| {
        prop::collection::btree_map(any::<[u8; 4]>().prop_map(Ipv4Addr::from), any::<u32>(), n..=n)
            .prop_map(|hops| Routes { hops })
    })
}

proptest! {
    #[test]
    fn prop_shimmed_keys_round_trip(routes in arb_routes()) {
        let bytes = to_vec(&routes).unwrap();
        prop_assert!(bytes.len() <= routes.msgsize());
        prop_assert_eq!(from_slice::<Routes>(&bytes).unwrap(), routes);
    }
}

#[test]
fn test_shimmed_keys_are_strings_on_the_wire() {
    let routes = Routes {
        hops: BTreeMap::from([(Ipv4Addr::new(10, 0, 0, 1), 7)]),
    };
    let bytes = to_vec(&routes).unwrap();
    let value = Value::read_from(&mut bytes.as_slice()).unwrap();
    assert_eq!(
        value.to_json(),
        serde_json::json!({"hops": {"10.0.0.1": 7}})
    );
}

#[test]
fn test_failed_key_shim_is_a_conversion_error() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 1);
    append::append_str(&mut b, "hops");
    append::append_map_header(&mut b, 1);
    append::append_str(&mut b, "not-an-ip");
    append::append_uint(&mut b, 1);

    let err = from_slice::<Routes>(&b).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Conversion(_)));
}

#[test]
fn test_auto_shimmed_integer_keys() {
    let counters = Counters {
        by_code: BTreeMap::from([(404, 3), (500, 1)]),
        by_offset: [(-2, "neg".to_string())].into_iter().collect(),
    };
    let bytes = to_vec(&counters).unwrap();
    let value = Value::read_from(&mut bytes.as_slice()).unwrap();
    assert_eq!(
        value.to_json(),
        serde_json::json!({"by_code": {"404": 3, "500": 1}, "by_offset": {"-2": "neg"}})
    );
    assert_eq!(from_slice::<Counters>(&bytes).unwrap(), counters);
}

#[test]
fn test_auto_shimmed_key_must_parse() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 1);
    append::append_str(&mut b, "by_code");
    append::append_map_header(&mut b, 1);
    append::append_str(&mut b, "70000");
    append::append_uint(&mut b, 1);

    let err = from_slice::<Counters>(&b).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Conversion(_)));
}
