//! Property tests for the runtime primitives.

use packgen::{bytes, decode, encode, from_slice, to_vec, Reader, Sizer, Value};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::time::{Duration, UNIX_EPOCH};

proptest! {
    #[test]
    fn signed_integers_round_trip(v in any::<i64>()) {
        let b = to_vec(&v).unwrap();
        prop_assert!(b.len() <= v.msgsize());
        prop_assert_eq!(from_slice::<i64>(&b).unwrap(), v);
    }

    #[test]
    fn unsigned_integers_round_trip(v in any::<u64>()) {
        let b = to_vec(&v).unwrap();
        prop_assert_eq!(from_slice::<u64>(&b).unwrap(), v);
    }

    #[test]
    fn integer_width_follows_magnitude(v in 0u64..128) {
        prop_assert_eq!(to_vec(&v).unwrap().len(), 1);
    }

    #[test]
    fn strings_round_trip(s in ".{0,300}") {
        let b = to_vec(&s).unwrap();
        prop_assert!(b.len() <= s.msgsize());
        prop_assert_eq!(from_slice::<String>(&b).unwrap(), s);
    }

    #[test]
    fn maps_round_trip(m in prop::collection::btree_map(".{0,8}", any::<i32>(), 0..20)) {
        let b = to_vec(&m).unwrap();
        prop_assert!(b.len() <= m.msgsize());
        prop_assert_eq!(from_slice::<BTreeMap<String, i32>>(&b).unwrap(), m);
    }

    #[test]
    fn stream_matches_buffer(v in prop::collection::vec(any::<Option<u16>>(), 0..40)) {
        let streamed = encode(&v, Vec::new()).unwrap();
        prop_assert_eq!(&streamed, &to_vec(&v).unwrap());
        prop_assert_eq!(decode::<Vec<Option<u16>>, _>(&streamed[..]).unwrap(), v);
    }

    #[test]
    fn skip_consumes_exactly_one_value(v in prop::collection::vec(".{0,4}", 0..10), tail in any::<u8>()) {
        let mut b = to_vec(&v).unwrap();
        let value_len = b.len();
        b.push(tail & 0x7f);
        let mut cur: &[u8] = &b;
        bytes::skip(&mut cur).unwrap();
        prop_assert_eq!(cur.len(), b.len() - value_len);
    }

    #[test]
    fn times_round_trip(secs in -1_000_000_000i64..4_000_000_000, nanos in 0u32..1_000_000_000) {
        let t = if secs >= 0 {
            UNIX_EPOCH + Duration::new(secs as u64, nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(u64::from(nanos))
        };
        let mut legacy = Vec::new();
        packgen::append::append_time(&mut legacy, t);
        let mut standard = Vec::new();
        packgen::append::append_timestamp(&mut standard, t);
        prop_assert_eq!(bytes::read_time(&mut &legacy[..]).unwrap(), t);
        prop_assert_eq!(bytes::read_time(&mut &standard[..]).unwrap(), t);
    }
}

#[test]
fn value_reads_from_stream() {
    let b = to_vec(&vec![true, false]).unwrap();
    let mut r = Reader::new(&b[..]);
    assert_eq!(
        Value::decode(&mut r).unwrap(),
        Value::Array(vec![Value::Bool(true), Value::Bool(false)])
    );
}
