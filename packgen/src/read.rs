//! Decoding core shared by the streaming [`Reader`](crate::Reader) and the
//! buffer-consuming [`bytes`](crate::bytes) functions.
//!
//! Both sides implement [`Source`]; every decoder here is written once,
//! generic over it.

use crate::error::{Error, ErrorKind, Result};
use crate::ext::{self, Complex128, Complex64};
use crate::wire::{ext as ext_type, marker, WireType};
use std::time::{Duration, SystemTime};

/// A byte source that supports one byte of lookahead.
pub(crate) trait Source {
    /// Returns the next byte without consuming it.
    fn peek(&mut self) -> Result<u8>;

    /// Consumes exactly `n` bytes.
    fn take(&mut self, n: usize) -> Result<&[u8]>;
}

impl Source for &[u8] {
    fn peek(&mut self) -> Result<u8> {
        self.first()
            .copied()
            .ok_or_else(|| Error::short_buffer(1, 0))
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.len() < n {
            return Err(Error::short_buffer(n, self.len()));
        }
        let data = *self;
        let (head, tail) = data.split_at(n);
        *self = tail;
        Ok(head)
    }
}

fn byte<S: Source>(s: &mut S) -> Result<u8> {
    Ok(s.take(1)?[0])
}

fn array<S: Source, const N: usize>(s: &mut S) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(s.take(N)?);
    Ok(out)
}

fn mismatch(expected: WireType, found: u8) -> Error {
    Error::type_mismatch(expected, WireType::of(found))
}

pub(crate) fn peek_type<S: Source>(s: &mut S) -> Result<WireType> {
    Ok(WireType::of(s.peek()?))
}

pub(crate) fn read_nil<S: Source>(s: &mut S) -> Result<()> {
    match byte(s)? {
        marker::NIL => Ok(()),
        m => Err(mismatch(WireType::Nil, m)),
    }
}

/// Consumes a nil marker if one is next.
pub(crate) fn try_read_nil<S: Source>(s: &mut S) -> Result<bool> {
    if s.peek()? == marker::NIL {
        s.take(1)?;
        return Ok(true);
    }
    Ok(false)
}

pub(crate) fn read_bool<S: Source>(s: &mut S) -> Result<bool> {
    match byte(s)? {
        marker::TRUE => Ok(true),
        marker::FALSE => Ok(false),
        m => Err(mismatch(WireType::Bool, m)),
    }
}

/// Reads any integer encoding into an `i128` wide enough for all of them.
fn read_integer<S: Source>(s: &mut S, expected: WireType) -> Result<i128> {
    let m = byte(s)?;
    let v = match m {
        0x00..=marker::POS_FIXINT_MAX => i128::from(m),
        marker::NEG_FIXINT_MIN..=0xff => i128::from(m as i8),
        marker::UINT8 => i128::from(byte(s)?),
        marker::UINT16 => i128::from(u16::from_be_bytes(array(s)?)),
        marker::UINT32 => i128::from(u32::from_be_bytes(array(s)?)),
        marker::UINT64 => i128::from(u64::from_be_bytes(array(s)?)),
        marker::INT8 => i128::from(byte(s)? as i8),
        marker::INT16 => i128::from(i16::from_be_bytes(array(s)?)),
        marker::INT32 => i128::from(i32::from_be_bytes(array(s)?)),
        marker::INT64 => i128::from(i64::from_be_bytes(array(s)?)),
        m => return Err(mismatch(expected, m)),
    };
    Ok(v)
}

macro_rules! narrow_readers {
    ($($name:ident -> $ty:ty, $expected:expr;)*) => {
        $(
            pub(crate) fn $name<S: Source>(s: &mut S) -> Result<$ty> {
                let v = read_integer(s, $expected)?;
                <$ty>::try_from(v).map_err(|_| Error::int_overflow(v, stringify!($ty)))
            }
        )*
    };
}

narrow_readers! {
    read_i8 -> i8, WireType::Int;
    read_i16 -> i16, WireType::Int;
    read_i32 -> i32, WireType::Int;
    read_i64 -> i64, WireType::Int;
    read_isize -> isize, WireType::Int;
    read_u8 -> u8, WireType::Uint;
    read_u16 -> u16, WireType::Uint;
    read_u32 -> u32, WireType::Uint;
    read_u64 -> u64, WireType::Uint;
    read_usize -> usize, WireType::Uint;
}

pub(crate) fn read_f32<S: Source>(s: &mut S) -> Result<f32> {
    match byte(s)? {
        marker::FLOAT32 => Ok(f32::from_bits(u32::from_be_bytes(array(s)?))),
        m => Err(mismatch(WireType::Float32, m)),
    }
}

/// Reads a float64, widening a float32 written by compact encoders.
pub(crate) fn read_f64<S: Source>(s: &mut S) -> Result<f64> {
    match byte(s)? {
        marker::FLOAT64 => Ok(f64::from_bits(u64::from_be_bytes(array(s)?))),
        marker::FLOAT32 => Ok(f64::from(f32::from_bits(u32::from_be_bytes(array(s)?)))),
        m => Err(mismatch(WireType::Float64, m)),
    }
}

pub(crate) fn read_char<S: Source>(s: &mut S) -> Result<char> {
    let v = read_u32(s)?;
    char::from_u32(v).ok_or_else(|| Error::conversion(format!("{v:#x} is not a char")))
}

fn str_len<S: Source>(s: &mut S, m: u8) -> Result<Option<u32>> {
    let len = match m {
        marker::FIXSTR..=0xbf => u32::from(m & 0x1f),
        marker::STR8 => u32::from(byte(s)?),
        marker::STR16 => u32::from(u16::from_be_bytes(array(s)?)),
        marker::STR32 => u32::from_be_bytes(array(s)?),
        _ => return Ok(None),
    };
    Ok(Some(len))
}

fn bin_len<S: Source>(s: &mut S, m: u8) -> Result<Option<u32>> {
    let len = match m {
        marker::BIN8 => u32::from(byte(s)?),
        marker::BIN16 => u32::from(u16::from_be_bytes(array(s)?)),
        marker::BIN32 => u32::from_be_bytes(array(s)?),
        _ => return Ok(None),
    };
    Ok(Some(len))
}

pub(crate) fn read_str_header<S: Source>(s: &mut S) -> Result<u32> {
    let m = byte(s)?;
    str_len(s, m)?.ok_or_else(|| mismatch(WireType::Str, m))
}

pub(crate) fn read_bin_header<S: Source>(s: &mut S) -> Result<u32> {
    let m = byte(s)?;
    bin_len(s, m)?.ok_or_else(|| mismatch(WireType::Bin, m))
}

/// Reads a str or bin header; map keys and text accept either.
pub(crate) fn read_str_or_bin_header<S: Source>(s: &mut S) -> Result<u32> {
    let m = byte(s)?;
    if let Some(len) = str_len(s, m)? {
        return Ok(len);
    }
    bin_len(s, m)?.ok_or_else(|| mismatch(WireType::Str, m))
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| Error::new(ErrorKind::InvalidUtf8))
}

pub(crate) fn read_string<S: Source>(s: &mut S) -> Result<String> {
    let len = read_str_header(s)? as usize;
    utf8(s.take(len)?)
}

/// Reads a map key, which may arrive as str or bin.
pub(crate) fn read_map_key<S: Source>(s: &mut S) -> Result<String> {
    let len = read_str_or_bin_header(s)? as usize;
    utf8(s.take(len)?)
}

/// Reads text stored as either str or bin.
pub(crate) fn read_text<S: Source>(s: &mut S) -> Result<String> {
    read_map_key(s)
}

pub(crate) fn read_bytes<S: Source>(s: &mut S) -> Result<Vec<u8>> {
    let len = read_bin_header(s)? as usize;
    Ok(s.take(len)?.to_vec())
}

/// Reads a bin blob whose length must equal `out.len()`.
pub(crate) fn read_bin_exact<S: Source>(s: &mut S, out: &mut [u8]) -> Result<()> {
    let len = read_bin_header(s)?;
    if len as usize != out.len() {
        return Err(Error::arity(out.len() as u32, len));
    }
    out.copy_from_slice(s.take(out.len())?);
    Ok(())
}

pub(crate) fn read_array_header<S: Source>(s: &mut S) -> Result<u32> {
    match byte(s)? {
        m @ marker::FIXARRAY..=0x9f => Ok(u32::from(m & 0x0f)),
        marker::ARRAY16 => Ok(u32::from(u16::from_be_bytes(array(s)?))),
        marker::ARRAY32 => Ok(u32::from_be_bytes(array(s)?)),
        m => Err(mismatch(WireType::Array, m)),
    }
}

pub(crate) fn read_map_header<S: Source>(s: &mut S) -> Result<u32> {
    match byte(s)? {
        m @ marker::FIXMAP..=0x8f => Ok(u32::from(m & 0x0f)),
        marker::MAP16 => Ok(u32::from(u16::from_be_bytes(array(s)?))),
        marker::MAP32 => Ok(u32::from_be_bytes(array(s)?)),
        m => Err(mismatch(WireType::Map, m)),
    }
}

fn ext_len<S: Source>(s: &mut S, m: u8) -> Result<Option<u32>> {
    let len = match m {
        marker::FIXEXT1 => 1,
        marker::FIXEXT2 => 2,
        marker::FIXEXT4 => 4,
        marker::FIXEXT8 => 8,
        marker::FIXEXT16 => 16,
        marker::EXT8 => u32::from(byte(s)?),
        marker::EXT16 => u32::from(u16::from_be_bytes(array(s)?)),
        marker::EXT32 => u32::from_be_bytes(array(s)?),
        _ => return Ok(None),
    };
    Ok(Some(len))
}

/// Reads any extension block, returning its type and payload.
pub(crate) fn read_any_ext<S: Source>(s: &mut S) -> Result<(i8, Vec<u8>)> {
    let m = byte(s)?;
    let len = ext_len(s, m)?.ok_or_else(|| mismatch(WireType::Ext, m))? as usize;
    let ty = byte(s)? as i8;
    Ok((ty, s.take(len)?.to_vec()))
}

/// Reads an extension block of type `expected`.
pub(crate) fn read_ext<S: Source>(s: &mut S, expected: i8) -> Result<Vec<u8>> {
    let (ty, data) = read_any_ext(s)?;
    if ty != expected {
        return Err(Error::invalid_extension(format!(
            "expected extension type {expected}, found {ty}"
        )));
    }
    Ok(data)
}

/// Reads a time in either the legacy or the standard timestamp form.
pub(crate) fn read_time<S: Source>(s: &mut S) -> Result<SystemTime> {
    let (ty, data) = read_any_ext(s)?;
    ext::time_from_ext(ty, &data)
}

pub(crate) fn read_duration<S: Source>(s: &mut S) -> Result<Duration> {
    let nanos = read_i64(s)?;
    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .map_err(|_| Error::conversion(format!("negative duration: {nanos}ns")))
}

pub(crate) fn read_complex64<S: Source>(s: &mut S) -> Result<Complex64> {
    ext::complex64_from(&read_ext(s, ext_type::COMPLEX64)?)
}

pub(crate) fn read_complex128<S: Source>(s: &mut S) -> Result<Complex128> {
    ext::complex128_from(&read_ext(s, ext_type::COMPLEX128)?)
}

/// Skips one complete value, including nested containers.
pub(crate) fn skip<S: Source>(s: &mut S) -> Result<()> {
    let mut pending: u64 = 1;
    while pending > 0 {
        pending -= 1;
        let m = byte(s)?;
        let data_len: usize = match m {
            0x00..=marker::POS_FIXINT_MAX | marker::NEG_FIXINT_MIN..=0xff => 0,
            marker::NIL | marker::FALSE | marker::TRUE => 0,
            marker::FIXMAP..=0x8f => {
                pending += 2 * u64::from(m & 0x0f);
                0
            }
            marker::FIXARRAY..=0x9f => {
                pending += u64::from(m & 0x0f);
                0
            }
            marker::MAP16 => {
                pending += 2 * u64::from(u16::from_be_bytes(array(s)?));
                0
            }
            marker::MAP32 => {
                pending += 2 * u64::from(u32::from_be_bytes(array(s)?));
                0
            }
            marker::ARRAY16 => {
                pending += u64::from(u16::from_be_bytes(array(s)?));
                0
            }
            marker::ARRAY32 => {
                pending += u64::from(u32::from_be_bytes(array(s)?));
                0
            }
            marker::UINT8 | marker::INT8 => 1,
            marker::UINT16 | marker::INT16 => 2,
            marker::UINT32 | marker::INT32 | marker::FLOAT32 => 4,
            marker::UINT64 | marker::INT64 | marker::FLOAT64 => 8,
            _ => {
                if let Some(len) = str_len(s, m)? {
                    len as usize
                } else if let Some(len) = bin_len(s, m)? {
                    len as usize
                } else if let Some(len) = ext_len(s, m)? {
                    // the type byte precedes the payload
                    len as usize + 1
                } else {
                    return Err(Error::type_mismatch(WireType::Nil, WireType::Invalid));
                }
            }
        };
        if data_len > 0 {
            s.take(data_len)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append;

    #[test]
    fn integers_cross_signedness_when_in_range() {
        let mut b = Vec::new();
        append::append_uint(&mut b, 300);
        append::append_int(&mut b, -5);
        let mut s: &[u8] = &b;
        assert_eq!(read_i32(&mut s).ok(), Some(300));
        assert!(read_u8(&mut s).is_err());
    }

    #[test]
    fn narrowing_reports_overflow() {
        let mut b = Vec::new();
        append::append_uint(&mut b, 70_000);
        let mut s: &[u8] = &b;
        let err = read_u16(&mut s).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IntOverflow { target: "u16", .. }));
    }

    #[test]
    fn short_input_is_reported() {
        let mut s: &[u8] = &[marker::UINT32, 0, 0];
        assert!(read_u32(&mut s).unwrap_err().is_short_buffer());
    }

    #[test]
    fn skip_walks_nested_containers() {
        let mut b = Vec::new();
        append::append_map_header(&mut b, 2);
        append::append_str(&mut b, "a");
        append::append_array_header(&mut b, 3);
        append::append_nil(&mut b);
        append::append_bin(&mut b, &[1, 2, 3]);
        append::append_ext(&mut b, 7, &[9; 5]);
        append::append_str(&mut b, "b");
        append::append_f64(&mut b, 2.5);
        append::append_bool(&mut b, true);

        let mut s: &[u8] = &b;
        skip(&mut s).unwrap();
        assert_eq!(s, &[marker::TRUE]);
    }

    #[test]
    fn try_read_nil_only_consumes_nil() {
        let mut s: &[u8] = &[marker::NIL, 0x01];
        assert!(try_read_nil(&mut s).unwrap());
        assert!(!try_read_nil(&mut s).unwrap());
        assert_eq!(read_u8(&mut s).ok(), Some(1));
    }

    #[test]
    fn map_keys_accept_bin() {
        let mut b = Vec::new();
        append::append_bin(&mut b, b"key");
        let mut s: &[u8] = &b;
        assert_eq!(read_map_key(&mut s).ok().as_deref(), Some("key"));
    }
}
