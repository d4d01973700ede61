//! # packgen
//!
//! Runtime support for MessagePack codecs generated by `packgen-codegen`.
//!
//! Generated code implements five operation families per type, and this
//! crate provides the wire primitives those implementations call:
//!
//! | Trait | Direction | Primitive layer |
//! |-------|-----------|-----------------|
//! | [`Encodable`] | value → stream | [`Writer`] |
//! | [`Decodable`] | stream → value | [`Reader`] |
//! | [`Marshaler`] | value → `Vec<u8>` (append) | [`append`] |
//! | [`Unmarshaler`] | `&[u8]` → value (consume) | [`bytes`] |
//! | [`Sizer`] | worst-case size | [`size`] |
//!
//! ## Quick Start
//!
//! ```rust
//! use packgen::{from_slice, to_vec};
//!
//! let tags = vec!["a".to_string(), "b".to_string()];
//! let bytes = to_vec(&tags).unwrap();
//! let back: Vec<String> = from_slice(&bytes).unwrap();
//! assert_eq!(back, tags);
//! ```
//!
//! ## Capability Traits
//!
//! Directives in a schema file route particular types through user code:
//!
//! | Directive | Trait |
//! |-----------|-------|
//! | `zero_test(T)` | [`IsZero`] |
//! | `empty_test(T)` | [`IsEmpty`] |
//! | `binary(T)` | [`BinaryMarshal`] |
//! | `binary_append(T)` | [`BinaryAppend`] |
//! | `text(T)`, `text_string(T)` | [`TextMarshal`] |
//! | `intercept(ty = T, using = P)` | [`Interceptor`] |
//! | `map_keys = "auto_shim"` | [`MapKey`] |
//!
//! ## Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `json` | Render [`Value`] as JSON text | ✅ |

pub mod append;
pub mod bytes;
mod error;
mod ext;
mod impls;
mod keys;
mod read;
mod reader;
mod traits;
mod value;
mod wire;
mod writer;

pub use error::{BoxError, Container, Error, ErrorKind, PathSegment, Result};
pub use ext::{Complex128, Complex64};
pub use keys::MapKey;
pub use reader::Reader;
pub use traits::{
    BinaryAppend, BinaryMarshal, Decodable, Encodable, Interceptor, IsDefault, IsEmpty, IsZero,
    Marshaler, Msgp, Sizer, TextMarshal, Unmarshaler,
};
pub use value::Value;
pub use wire::{ext as ext_type, marker, size, WireType};
pub use writer::Writer;

use std::io::{Read, Write};

/// Marshals a value into a fresh buffer sized by its estimate.
pub fn to_vec<T: Marshaler + Sizer + ?Sized>(v: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(v.msgsize());
    v.marshal_msg(&mut buf)?;
    Ok(buf)
}

/// Unmarshals a complete value, rejecting trailing bytes.
pub fn from_slice<T: Unmarshaler + Default>(b: &[u8]) -> Result<T> {
    let mut v = T::default();
    let rest = v.unmarshal_msg(b)?;
    if !rest.is_empty() {
        return Err(Error::new(ErrorKind::TrailingBytes(rest.len())));
    }
    Ok(v)
}

/// Encodes a value to a writer and flushes it.
pub fn encode<T: Encodable + ?Sized, W: Write>(v: &T, w: W) -> Result<W> {
    let mut writer = Writer::new(w);
    v.encode_msg(&mut writer)?;
    writer.into_inner()
}

/// Decodes one value from a reader.
pub fn decode<T: Decodable + Default, R: Read>(r: R) -> Result<T> {
    let mut reader = Reader::new(r);
    let mut v = T::default();
    v.decode_msg(&mut reader)?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut b = to_vec(&7u32).unwrap();
        b.push(0);
        let err = from_slice::<u32>(&b).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TrailingBytes(1)));
    }

    #[test]
    fn stream_and_buffer_agree() {
        let v = vec![1u64, 1 << 40];
        let streamed = encode(&v, Vec::new()).unwrap();
        assert_eq!(streamed, to_vec(&v).unwrap());
        assert_eq!(decode::<Vec<u64>, _>(&streamed[..]).unwrap(), v);
    }
}
