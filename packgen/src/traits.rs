//! The operation families implemented by generated code, plus the
//! capability traits user types opt into through directives.

use crate::error::{BoxError, Result};
use crate::reader::Reader;
use crate::writer::Writer;
use std::io::{Read, Write};

/// Streaming encode.
pub trait Encodable {
    fn encode_msg<W: Write>(&self, w: &mut Writer<W>) -> Result<()>;
}

/// Streaming decode into an existing value.
///
/// Map-layout fields absent from the input keep their current value.
pub trait Decodable {
    fn decode_msg<R: Read>(&mut self, r: &mut Reader<R>) -> Result<()>;
}

/// Buffer-append encode.
pub trait Marshaler {
    /// Appends the encoded value to `buf`.
    fn marshal_msg(&self, buf: &mut Vec<u8>) -> Result<()>;
}

/// Buffer-consume decode.
pub trait Unmarshaler {
    /// Decodes from the front of `bts` and returns the unconsumed rest.
    fn unmarshal_msg<'a>(&mut self, bts: &'a [u8]) -> Result<&'a [u8]>;
}

/// Worst-case encoded size.
pub trait Sizer {
    /// An upper bound on the bytes `marshal_msg` appends. Never less.
    fn msgsize(&self) -> usize;
}

/// Structural zero test used by `omitempty`.
pub trait IsDefault {
    fn is_default(&self) -> bool;
}

/// Everything generated code implements for a type, plus `Default` so
/// containers can allocate elements before decoding into them.
pub trait Msgp:
    Encodable + Decodable + Marshaler + Unmarshaler + Sizer + IsDefault + Default
{
}

impl<T> Msgp for T where
    T: Encodable + Decodable + Marshaler + Unmarshaler + Sizer + IsDefault + Default
{
}

/// User-defined zero test, selected by `omitzero`.
pub trait IsZero {
    fn is_zero(&self) -> bool;
}

/// User-defined emptiness test, selected by `omitisempty`.
pub trait IsEmpty {
    fn is_empty_value(&self) -> bool;
}

/// Conversion to and from an opaque binary blob.
pub trait BinaryMarshal {
    fn marshal_binary(&self) -> std::result::Result<Vec<u8>, BoxError>;
    fn unmarshal_binary(&mut self, data: &[u8]) -> std::result::Result<(), BoxError>;
}

/// Binary encoding that appends to a caller buffer.
pub trait BinaryAppend {
    fn append_binary(&self, buf: &mut Vec<u8>) -> std::result::Result<(), BoxError>;
}

/// Conversion to and from text.
pub trait TextMarshal {
    fn marshal_text(&self) -> std::result::Result<String, BoxError>;
    fn unmarshal_text(&mut self, text: &str) -> std::result::Result<(), BoxError>;
}

/// Replaces generated code for values of type `T`.
///
/// The provider is named by path in the `intercept` directive and passed
/// by reference at every call site; it owns whatever state it needs.
pub trait Interceptor<T> {
    fn encode<W: Write>(&self, v: &T, w: &mut Writer<W>) -> Result<()>;
    fn decode<R: Read>(&self, v: &mut T, r: &mut Reader<R>) -> Result<()>;
    fn marshal(&self, v: &T, buf: &mut Vec<u8>) -> Result<()>;
    fn unmarshal<'a>(&self, v: &mut T, bts: &'a [u8]) -> Result<&'a [u8]>;
    fn msgsize(&self, v: &T) -> usize;
}
