//! Trait implementations for standard types.
//!
//! These serve generic code (`Page<T: Msgp>` instantiated with `String`,
//! `Vec<u64>`, ...) and top-level calls. Fields of generated types are
//! emitted inline and do not go through these impls, so per-field
//! directives such as limits never apply here.

use crate::append;
use crate::bytes;
use crate::error::{PathSegment, Result};
use crate::ext::{Complex128, Complex64};
use crate::reader::Reader;
use crate::traits::{Decodable, Encodable, IsDefault, Marshaler, Sizer, Unmarshaler};
use crate::wire::size;
use crate::writer::Writer;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::io::{Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

macro_rules! impl_scalar {
    ($($ty:ty => $write:ident, $append:ident, $read:ident, $size:expr, $wire:ty;)*) => {
        $(
            impl Encodable for $ty {
                fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
                    w.$write(*self as $wire)
                }
            }

            impl Decodable for $ty {
                fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
                    *self = r.$read()?;
                    Ok(())
                }
            }

            impl Marshaler for $ty {
                fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
                    append::$append(buf, *self as $wire);
                    Ok(())
                }
            }

            impl Unmarshaler for $ty {
                fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
                    let mut bts = bts;
                    *self = bytes::$read(&mut bts)?;
                    Ok(bts)
                }
            }

            impl Sizer for $ty {
                fn msgsize(&self) -> usize {
                    $size
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => write_int, append_int, read_i8, size::INT, i64;
    i16 => write_int, append_int, read_i16, size::INT, i64;
    i32 => write_int, append_int, read_i32, size::INT, i64;
    i64 => write_int, append_int, read_i64, size::INT, i64;
    isize => write_int, append_int, read_isize, size::INT, i64;
    u8 => write_uint, append_uint, read_u8, size::UINT, u64;
    u16 => write_uint, append_uint, read_u16, size::UINT, u64;
    u32 => write_uint, append_uint, read_u32, size::UINT, u64;
    u64 => write_uint, append_uint, read_u64, size::UINT, u64;
    usize => write_uint, append_uint, read_usize, size::UINT, u64;
    f32 => write_f32, append_f32, read_f32, size::F32, f32;
    f64 => write_f64, append_f64, read_f64, size::F64, f64;
}

macro_rules! impl_copy_value {
    ($($ty:ty => $write:ident, $append:ident, $read:ident, $size:expr;)*) => {
        $(
            impl Encodable for $ty {
                fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
                    w.$write(*self)
                }
            }

            impl Decodable for $ty {
                fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
                    *self = r.$read()?;
                    Ok(())
                }
            }

            impl Marshaler for $ty {
                fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
                    append::$append(buf, *self);
                    Ok(())
                }
            }

            impl Unmarshaler for $ty {
                fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
                    let mut bts = bts;
                    *self = bytes::$read(&mut bts)?;
                    Ok(bts)
                }
            }

            impl Sizer for $ty {
                fn msgsize(&self) -> usize {
                    $size
                }
            }
        )*
    };
}

impl_copy_value! {
    bool => write_bool, append_bool, read_bool, size::BOOL;
    char => write_char, append_char, read_char, size::CHAR;
    SystemTime => write_time, append_time, read_time, size::TIME;
    Complex64 => write_complex64, append_complex64, read_complex64, size::COMPLEX64;
    Complex128 => write_complex128, append_complex128, read_complex128, size::COMPLEX128;
}

impl Encodable for Duration {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_duration(*self)
    }
}

impl Decodable for Duration {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        *self = r.read_duration()?;
        Ok(())
    }
}

impl Marshaler for Duration {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        append::append_duration(buf, *self)
    }
}

impl Unmarshaler for Duration {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        *self = bytes::read_duration(&mut bts)?;
        Ok(bts)
    }
}

impl Sizer for Duration {
    fn msgsize(&self) -> usize {
        size::DURATION
    }
}

impl Encodable for String {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_str(self)
    }
}

impl Decodable for String {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        *self = r.read_string()?;
        Ok(())
    }
}

impl Marshaler for String {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        append::append_str(buf, self);
        Ok(())
    }
}

impl Unmarshaler for String {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        *self = bytes::read_string(&mut bts)?;
        Ok(bts)
    }
}

impl Sizer for String {
    fn msgsize(&self) -> usize {
        size::STR_PREFIX + self.len()
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        match self {
            Some(v) => v.encode_msg(w),
            None => w.write_nil(),
        }
    }
}

impl<T: Decodable + Default> Decodable for Option<T> {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        if r.try_read_nil()? {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).decode_msg(r)
    }
}

impl<T: Marshaler> Marshaler for Option<T> {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(v) => v.marshal_msg(buf),
            None => {
                append::append_nil(buf);
                Ok(())
            }
        }
    }
}

impl<T: Unmarshaler + Default> Unmarshaler for Option<T> {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        if bytes::try_read_nil(&mut bts)? {
            *self = None;
            return Ok(bts);
        }
        self.get_or_insert_with(T::default).unmarshal_msg(bts)
    }
}

impl<T: Sizer> Sizer for Option<T> {
    fn msgsize(&self) -> usize {
        self.as_ref().map_or(size::NIL, Sizer::msgsize)
    }
}

impl<T: Encodable + ?Sized> Encodable for Box<T> {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        (**self).encode_msg(w)
    }
}

impl<T: Decodable + ?Sized> Decodable for Box<T> {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        (**self).decode_msg(r)
    }
}

impl<T: Marshaler + ?Sized> Marshaler for Box<T> {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        (**self).marshal_msg(buf)
    }
}

impl<T: Unmarshaler + ?Sized> Unmarshaler for Box<T> {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        (**self).unmarshal_msg(bts)
    }
}

impl<T: Sizer + ?Sized> Sizer for Box<T> {
    fn msgsize(&self) -> usize {
        (**self).msgsize()
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_array_header(self.len() as u32)?;
        for v in self {
            v.encode_msg(w)?;
        }
        Ok(())
    }
}

impl<T: Decodable + Default> Decodable for Vec<T> {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        if r.try_read_nil()? {
            self.clear();
            return Ok(());
        }
        let n = r.read_array_header()? as usize;
        self.clear();
        for i in 0..n {
            let mut v = T::default();
            v.decode_msg(r)
                .map_err(|e| e.prefixed([PathSegment::Index(i)]))?;
            self.push(v);
        }
        Ok(())
    }
}

impl<T: Marshaler> Marshaler for Vec<T> {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        append::append_array_header(buf, self.len() as u32);
        for v in self {
            v.marshal_msg(buf)?;
        }
        Ok(())
    }
}

impl<T: Unmarshaler + Default> Unmarshaler for Vec<T> {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        if bytes::try_read_nil(&mut bts)? {
            self.clear();
            return Ok(bts);
        }
        let n = bytes::read_array_header(&mut bts)?;
        bytes::guard_count(bts, n)?;
        self.clear();
        self.reserve(n as usize);
        for i in 0..n as usize {
            let mut v = T::default();
            bts = v
                .unmarshal_msg(bts)
                .map_err(|e| e.prefixed([PathSegment::Index(i)]))?;
            self.push(v);
        }
        Ok(bts)
    }
}

impl<T: Sizer> Sizer for Vec<T> {
    fn msgsize(&self) -> usize {
        size::ARRAY_HEADER + self.iter().map(Sizer::msgsize).sum::<usize>()
    }
}

impl<T: Encodable, const N: usize> Encodable for [T; N] {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_array_header(N as u32)?;
        for v in self {
            v.encode_msg(w)?;
        }
        Ok(())
    }
}

impl<T: Decodable, const N: usize> Decodable for [T; N] {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        let n = r.read_array_header()?;
        if n as usize != N {
            return Err(crate::Error::arity(N as u32, n));
        }
        for (i, v) in self.iter_mut().enumerate() {
            v.decode_msg(r)
                .map_err(|e| e.prefixed([PathSegment::Index(i)]))?;
        }
        Ok(())
    }
}

impl<T: Marshaler, const N: usize> Marshaler for [T; N] {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        append::append_array_header(buf, N as u32);
        for v in self {
            v.marshal_msg(buf)?;
        }
        Ok(())
    }
}

impl<T: Unmarshaler, const N: usize> Unmarshaler for [T; N] {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        let n = bytes::read_array_header(&mut bts)?;
        if n as usize != N {
            return Err(crate::Error::arity(N as u32, n));
        }
        for (i, v) in self.iter_mut().enumerate() {
            bts = v
                .unmarshal_msg(bts)
                .map_err(|e| e.prefixed([PathSegment::Index(i)]))?;
        }
        Ok(bts)
    }
}

impl<T: Sizer, const N: usize> Sizer for [T; N] {
    fn msgsize(&self) -> usize {
        size::ARRAY_HEADER + self.iter().map(Sizer::msgsize).sum::<usize>()
    }
}

impl<V: Encodable, S> Encodable for HashMap<String, V, S> {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_map_header(self.len() as u32)?;
        for (k, v) in self {
            w.write_str(k)?;
            v.encode_msg(w)?;
        }
        Ok(())
    }
}

impl<V: Decodable + Default, S: BuildHasher> Decodable for HashMap<String, V, S> {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        self.clear();
        if r.try_read_nil()? {
            return Ok(());
        }
        let n = r.read_map_header()?;
        for _ in 0..n {
            let k = r.read_map_key()?;
            let mut v = V::default();
            v.decode_msg(r)
                .map_err(|e| e.prefixed([PathSegment::Key(k.clone())]))?;
            self.insert(k, v);
        }
        Ok(())
    }
}

impl<V: Marshaler, S> Marshaler for HashMap<String, V, S> {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        append::append_map_header(buf, self.len() as u32);
        for (k, v) in self {
            append::append_str(buf, k);
            v.marshal_msg(buf)?;
        }
        Ok(())
    }
}

impl<V: Unmarshaler + Default, S: BuildHasher> Unmarshaler for HashMap<String, V, S> {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        self.clear();
        if bytes::try_read_nil(&mut bts)? {
            return Ok(bts);
        }
        let n = bytes::read_map_header(&mut bts)?;
        bytes::guard_count(bts, n)?;
        for _ in 0..n {
            let k = bytes::read_map_key(&mut bts)?;
            let mut v = V::default();
            bts = v
                .unmarshal_msg(bts)
                .map_err(|e| e.prefixed([PathSegment::Key(k.clone())]))?;
            self.insert(k, v);
        }
        Ok(bts)
    }
}

impl<V: Sizer, S> Sizer for HashMap<String, V, S> {
    fn msgsize(&self) -> usize {
        size::MAP_HEADER
            + self
                .iter()
                .map(|(k, v)| size::STR_PREFIX + k.len() + v.msgsize())
                .sum::<usize>()
    }
}

impl<V: Encodable> Encodable for BTreeMap<String, V> {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_map_header(self.len() as u32)?;
        for (k, v) in self {
            w.write_str(k)?;
            v.encode_msg(w)?;
        }
        Ok(())
    }
}

impl<V: Decodable + Default> Decodable for BTreeMap<String, V> {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()> {
        self.clear();
        if r.try_read_nil()? {
            return Ok(());
        }
        let n = r.read_map_header()?;
        for _ in 0..n {
            let k = r.read_map_key()?;
            let mut v = V::default();
            v.decode_msg(r)
                .map_err(|e| e.prefixed([PathSegment::Key(k.clone())]))?;
            self.insert(k, v);
        }
        Ok(())
    }
}

impl<V: Marshaler> Marshaler for BTreeMap<String, V> {
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()> {
        append::append_map_header(buf, self.len() as u32);
        for (k, v) in self {
            append::append_str(buf, k);
            v.marshal_msg(buf)?;
        }
        Ok(())
    }
}

impl<V: Unmarshaler + Default> Unmarshaler for BTreeMap<String, V> {
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]> {
        let mut bts = bts;
        self.clear();
        if bytes::try_read_nil(&mut bts)? {
            return Ok(bts);
        }
        let n = bytes::read_map_header(&mut bts)?;
        bytes::guard_count(bts, n)?;
        for _ in 0..n {
            let k = bytes::read_map_key(&mut bts)?;
            let mut v = V::default();
            bts = v
                .unmarshal_msg(bts)
                .map_err(|e| e.prefixed([PathSegment::Key(k.clone())]))?;
            self.insert(k, v);
        }
        Ok(bts)
    }
}

impl<V: Sizer> Sizer for BTreeMap<String, V> {
    fn msgsize(&self) -> usize {
        size::MAP_HEADER
            + self
                .iter()
                .map(|(k, v)| size::STR_PREFIX + k.len() + v.msgsize())
                .sum::<usize>()
    }
}

macro_rules! impl_numeric_default {
    ($($ty:ty),*) => {
        $(
            impl IsDefault for $ty {
                fn is_default(&self) -> bool {
                    *self == <$ty>::default()
                }
            }
        )*
    };
}

impl_numeric_default!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char);

impl IsDefault for String {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl IsDefault for str {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl IsDefault for SystemTime {
    fn is_default(&self) -> bool {
        *self == UNIX_EPOCH
    }
}

impl IsDefault for Duration {
    fn is_default(&self) -> bool {
        self.is_zero()
    }
}

impl IsDefault for Complex64 {
    fn is_default(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

impl IsDefault for Complex128 {
    fn is_default(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

impl<T> IsDefault for Option<T> {
    fn is_default(&self) -> bool {
        self.is_none()
    }
}

impl<T: IsDefault + ?Sized> IsDefault for Box<T> {
    fn is_default(&self) -> bool {
        (**self).is_default()
    }
}

impl<T> IsDefault for Vec<T> {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

/// Only zero-length arrays count as empty.
impl<T, const N: usize> IsDefault for [T; N] {
    fn is_default(&self) -> bool {
        N == 0
    }
}

impl<K, V, S> IsDefault for HashMap<K, V, S> {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsDefault for BTreeMap<K, V> {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}
