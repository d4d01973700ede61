//! Buffer-append encoders.
//!
//! Each function appends one value in its shortest wire form to a
//! caller-owned `Vec<u8>`. Generated `marshal_msg` code calls these
//! directly; [`Writer`](crate::Writer) buffers through them.

use crate::error::{Error, Result};
use crate::ext::{self, Complex128, Complex64};
use crate::wire::{ext as ext_type, marker};
use std::time::{Duration, SystemTime};

pub fn append_nil(b: &mut Vec<u8>) {
    b.push(marker::NIL);
}

pub fn append_bool(b: &mut Vec<u8>, v: bool) {
    b.push(if v { marker::TRUE } else { marker::FALSE });
}

/// Appends a signed integer. Non-negative values use the unsigned forms.
pub fn append_int(b: &mut Vec<u8>, v: i64) {
    if v >= 0 {
        return append_uint(b, v as u64);
    }
    if v >= -32 {
        b.push(v as i8 as u8);
    } else if v >= i64::from(i8::MIN) {
        b.push(marker::INT8);
        b.push(v as i8 as u8);
    } else if v >= i64::from(i16::MIN) {
        b.push(marker::INT16);
        b.extend_from_slice(&(v as i16).to_be_bytes());
    } else if v >= i64::from(i32::MIN) {
        b.push(marker::INT32);
        b.extend_from_slice(&(v as i32).to_be_bytes());
    } else {
        b.push(marker::INT64);
        b.extend_from_slice(&v.to_be_bytes());
    }
}

pub fn append_uint(b: &mut Vec<u8>, v: u64) {
    if v <= u64::from(marker::POS_FIXINT_MAX) {
        b.push(v as u8);
    } else if v <= u64::from(u8::MAX) {
        b.push(marker::UINT8);
        b.push(v as u8);
    } else if v <= u64::from(u16::MAX) {
        b.push(marker::UINT16);
        b.extend_from_slice(&(v as u16).to_be_bytes());
    } else if v <= u64::from(u32::MAX) {
        b.push(marker::UINT32);
        b.extend_from_slice(&(v as u32).to_be_bytes());
    } else {
        b.push(marker::UINT64);
        b.extend_from_slice(&v.to_be_bytes());
    }
}

pub fn append_f32(b: &mut Vec<u8>, v: f32) {
    b.push(marker::FLOAT32);
    b.extend_from_slice(&v.to_bits().to_be_bytes());
}

pub fn append_f64(b: &mut Vec<u8>, v: f64) {
    b.push(marker::FLOAT64);
    b.extend_from_slice(&v.to_bits().to_be_bytes());
}

/// Appends an `f64`, demoted to `f32` when that loses nothing.
pub fn append_f64_compact(b: &mut Vec<u8>, v: f64) {
    let narrow = v as f32;
    if f64::from(narrow) == v || v.is_nan() {
        append_f32(b, narrow);
    } else {
        append_f64(b, v);
    }
}

pub fn append_char(b: &mut Vec<u8>, v: char) {
    append_uint(b, u64::from(u32::from(v)));
}

pub fn append_str_header(b: &mut Vec<u8>, len: u32) {
    if len < 32 {
        b.push(marker::FIXSTR | len as u8);
    } else if len <= u32::from(u8::MAX) {
        b.push(marker::STR8);
        b.push(len as u8);
    } else if len <= u32::from(u16::MAX) {
        b.push(marker::STR16);
        b.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        b.push(marker::STR32);
        b.extend_from_slice(&len.to_be_bytes());
    }
}

pub fn append_str(b: &mut Vec<u8>, v: &str) {
    append_str_header(b, v.len() as u32);
    b.extend_from_slice(v.as_bytes());
}

pub fn append_bin_header(b: &mut Vec<u8>, len: u32) {
    if len <= u32::from(u8::MAX) {
        b.push(marker::BIN8);
        b.push(len as u8);
    } else if len <= u32::from(u16::MAX) {
        b.push(marker::BIN16);
        b.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        b.push(marker::BIN32);
        b.extend_from_slice(&len.to_be_bytes());
    }
}

pub fn append_bin(b: &mut Vec<u8>, v: &[u8]) {
    append_bin_header(b, v.len() as u32);
    b.extend_from_slice(v);
}

pub fn append_array_header(b: &mut Vec<u8>, len: u32) {
    if len < 16 {
        b.push(marker::FIXARRAY | len as u8);
    } else if len <= u32::from(u16::MAX) {
        b.push(marker::ARRAY16);
        b.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        b.push(marker::ARRAY32);
        b.extend_from_slice(&len.to_be_bytes());
    }
}

pub fn append_map_header(b: &mut Vec<u8>, len: u32) {
    if len < 16 {
        b.push(marker::FIXMAP | len as u8);
    } else if len <= u32::from(u16::MAX) {
        b.push(marker::MAP16);
        b.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        b.push(marker::MAP32);
        b.extend_from_slice(&len.to_be_bytes());
    }
}

/// Appends an extension block, using the fixext forms where they fit.
pub fn append_ext(b: &mut Vec<u8>, ty: i8, data: &[u8]) {
    let fixed = match data.len() {
        1 => Some(marker::FIXEXT1),
        2 => Some(marker::FIXEXT2),
        4 => Some(marker::FIXEXT4),
        8 => Some(marker::FIXEXT8),
        16 => Some(marker::FIXEXT16),
        _ => None,
    };
    match fixed {
        Some(m) => b.push(m),
        None => {
            let len = data.len();
            if len <= usize::from(u8::MAX) {
                b.push(marker::EXT8);
                b.push(len as u8);
            } else if len <= usize::from(u16::MAX) {
                b.push(marker::EXT16);
                b.extend_from_slice(&(len as u16).to_be_bytes());
            } else {
                b.push(marker::EXT32);
                b.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
    }
    b.push(ty as u8);
    b.extend_from_slice(data);
}

/// Appends a time in the legacy 12-byte extension form.
pub fn append_time(b: &mut Vec<u8>, t: SystemTime) {
    append_ext(b, ext_type::TIME, &ext::time_payload(t));
}

/// Appends a time as a standard MessagePack timestamp.
pub fn append_timestamp(b: &mut Vec<u8>, t: SystemTime) {
    append_ext(b, ext_type::TIMESTAMP, &ext::timestamp_payload(t));
}

/// Appends a duration as int64 nanoseconds.
pub fn append_duration(b: &mut Vec<u8>, d: Duration) -> Result<()> {
    let nanos = i64::try_from(d.as_nanos())
        .map_err(|_| Error::int_overflow(d.as_nanos() as i128, "i64"))?;
    append_int(b, nanos);
    Ok(())
}

pub fn append_complex64(b: &mut Vec<u8>, c: Complex64) {
    append_ext(b, ext_type::COMPLEX64, &ext::complex64_payload(c));
}

pub fn append_complex128(b: &mut Vec<u8>, c: Complex128) {
    append_ext(b, ext_type::COMPLEX128, &ext::complex128_payload(c));
}
