//! Limits enforced on both sides when `marshal` is set.

use packgen::{append, decode, encode, from_slice, to_vec, Container, Error, ErrorKind, PathSegment};
use packgen_tests::bounded::Grid;
use std::collections::BTreeMap;

fn assert_limit(err: &Error, want: Container, count: u32, limit: u32, path: &[PathSegment]) {
    match err.kind() {
        ErrorKind::CardinalityLimitExceeded {
            container,
            count: got,
            limit: max,
        } => {
            assert_eq!(*container, want);
            assert_eq!(*got, count);
            assert_eq!(*max, limit);
        }
        other => panic!("expected a limit error, got {other:?}"),
    }
    assert_eq!(err.path(), path);
}

/// Runs both encoders; they must fail alike.
fn encode_err(grid: &Grid) -> Error {
    let buffered = to_vec(grid).unwrap_err();
    let streamed = encode(grid, Vec::new()).unwrap_err();
    assert_eq!(buffered.path(), streamed.path());
    buffered
}

#[test]
fn test_within_limits_round_trips() {
    let grid = Grid {
        rows: vec![vec![1, 2, 3], vec![], vec![4]],
        index: BTreeMap::from([("a".into(), vec![1, 2, 3]), ("b".into(), vec![])]),
    };
    let bytes = to_vec(&grid).unwrap();
    assert_eq!(from_slice::<Grid>(&bytes).unwrap(), grid);
    assert_eq!(decode::<Grid, _>(bytes.as_slice()).unwrap(), grid);
}

#[test]
fn test_outer_array_over_limit_names_the_field() {
    let grid = Grid {
        rows: vec![vec![]; 4],
        ..Grid::default()
    };
    let err = encode_err(&grid);
    assert_limit(&err, Container::Array, 4, 3, &[PathSegment::Field("rows")]);
}

#[test]
fn test_nested_array_over_limit_names_the_element() {
    let grid = Grid {
        rows: vec![vec![1], vec![1, 2, 3, 4]],
        ..Grid::default()
    };
    let err = encode_err(&grid);
    assert_limit(
        &err,
        Container::Array,
        4,
        3,
        &[PathSegment::Field("rows"), PathSegment::Index(1)],
    );
}

#[test]
fn test_map_over_limit_names_the_field() {
    let grid = Grid {
        index: BTreeMap::from([("a".into(), vec![]), ("b".into(), vec![]), ("c".into(), vec![])]),
        ..Grid::default()
    };
    let err = encode_err(&grid);
    assert_limit(&err, Container::Map, 3, 2, &[PathSegment::Field("index")]);
}

#[test]
fn test_map_value_over_limit_names_the_entry() {
    let grid = Grid {
        index: BTreeMap::from([("a".into(), vec![1]), ("b".into(), vec![1, 2, 3, 4, 5])]),
        ..Grid::default()
    };
    let err = encode_err(&grid);
    assert_limit(
        &err,
        Container::Array,
        5,
        3,
        &[PathSegment::Field("index"), PathSegment::Entry(1)],
    );
}

#[test]
fn test_decode_applies_the_same_limits() {
    let mut b = Vec::new();
    append::append_map_header(&mut b, 1);
    append::append_str(&mut b, "rows");
    append::append_array_header(&mut b, 1);
    append::append_array_header(&mut b, 4);
    for i in 0..4 {
        append::append_uint(&mut b, i);
    }

    let err = from_slice::<Grid>(&b).unwrap_err();
    assert!(err.is_limit_exceeded());
    assert_eq!(err.path()[0], PathSegment::Field("rows"));

    let err = decode::<Grid, _>(b.as_slice()).unwrap_err();
    assert!(err.is_limit_exceeded());
}
