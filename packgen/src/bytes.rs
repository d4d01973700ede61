//! Buffer-consuming decoders.
//!
//! Each function reads one value from the front of `b` and advances it past
//! the consumed bytes. Generated `unmarshal_msg` code threads one cursor
//! through these calls and returns what is left.

use crate::error::{Error, ErrorKind, Result};
use crate::ext::{Complex128, Complex64};
use crate::read;
use crate::wire::WireType;
use std::time::{Duration, SystemTime};

macro_rules! bytes_readers {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(b: &mut &[u8]) -> Result<$ty> {
                read::$name(b)
            }
        )*
    };
}

bytes_readers! {
    /// Classifies the next value without consuming it.
    peek_type -> WireType;
    read_nil -> ();
    /// Consumes a nil marker if one is next.
    try_read_nil -> bool;
    read_bool -> bool;
    read_i8 -> i8;
    read_i16 -> i16;
    read_i32 -> i32;
    read_i64 -> i64;
    read_isize -> isize;
    read_u8 -> u8;
    read_u16 -> u16;
    read_u32 -> u32;
    read_u64 -> u64;
    read_usize -> usize;
    read_f32 -> f32;
    /// Reads a float64, accepting a float32.
    read_f64 -> f64;
    read_char -> char;
    read_string -> String;
    /// Reads a map key sent as str or bin.
    read_map_key -> String;
    /// Reads text sent as str or bin.
    read_text -> String;
    read_bytes -> Vec<u8>;
    read_array_header -> u32;
    read_map_header -> u32;
    read_time -> SystemTime;
    read_duration -> Duration;
    read_complex64 -> Complex64;
    read_complex128 -> Complex128;
    /// Skips one complete value.
    skip -> ();
}

pub fn read_bin_exact(b: &mut &[u8], out: &mut [u8]) -> Result<()> {
    read::read_bin_exact(b, out)
}

pub fn read_ext(b: &mut &[u8], ty: i8) -> Result<Vec<u8>> {
    read::read_ext(b, ty)
}

/// Reads a map key without copying it out of the buffer.
pub fn read_map_key_ref<'a>(b: &mut &'a [u8]) -> Result<&'a str> {
    let mut cur: &'a [u8] = *b;
    let len = read::read_str_or_bin_header(&mut cur)? as usize;
    if cur.len() < len {
        return Err(Error::short_buffer(len, cur.len()));
    }
    let (key, rest) = cur.split_at(len);
    *b = rest;
    std::str::from_utf8(key).map_err(|_| Error::new(ErrorKind::InvalidUtf8))
}

/// Rejects a container header whose count cannot possibly fit in the
/// remaining input, since every element takes at least one byte.
pub fn guard_count(b: &[u8], count: u32) -> Result<()> {
    if count as usize > b.len() {
        return Err(Error::short_buffer(count as usize, b.len()));
    }
    Ok(())
}
