//! Wire-level constants: format markers, extension type numbers and
//! worst-case encoded sizes.

use std::fmt;

/// MessagePack format markers.
pub mod marker {
    pub const POS_FIXINT_MAX: u8 = 0x7f;
    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXSTR: u8 = 0xa0;
    pub const NIL: u8 = 0xc0;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const EXT8: u8 = 0xc7;
    pub const EXT16: u8 = 0xc8;
    pub const EXT32: u8 = 0xc9;
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const FIXEXT1: u8 = 0xd4;
    pub const FIXEXT2: u8 = 0xd5;
    pub const FIXEXT4: u8 = 0xd6;
    pub const FIXEXT8: u8 = 0xd7;
    pub const FIXEXT16: u8 = 0xd8;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;
    pub const NEG_FIXINT_MIN: u8 = 0xe0;
}

/// Extension type numbers used by the runtime.
pub mod ext {
    /// Legacy time: 12 bytes, big-endian i64 seconds then u32 nanoseconds.
    pub const TIME: i8 = 5;
    /// Standard MessagePack timestamp (4, 8 or 12 bytes).
    pub const TIMESTAMP: i8 = -1;
    pub const COMPLEX64: i8 = 3;
    pub const COMPLEX128: i8 = 4;
}

/// Upper bounds on encoded sizes, used by generated `msgsize` code.
///
/// Every constant is the largest encoding the corresponding writer can
/// produce, so sums of these never under-report.
pub mod size {
    pub const NIL: usize = 1;
    pub const BOOL: usize = 1;
    pub const INT: usize = 9;
    pub const UINT: usize = 9;
    pub const F32: usize = 5;
    pub const F64: usize = 9;
    pub const CHAR: usize = 5;
    pub const STR_PREFIX: usize = 5;
    pub const BIN_PREFIX: usize = 5;
    pub const ARRAY_HEADER: usize = 5;
    pub const MAP_HEADER: usize = 5;
    pub const EXT_PREFIX: usize = 6;
    pub const TIME: usize = 15;
    pub const DURATION: usize = 9;
    pub const COMPLEX64: usize = 10;
    pub const COMPLEX128: usize = 18;
    /// Longest textual form of an auto-shimmed map key (`i64::MIN`) plus prefix.
    pub const AUTO_KEY: usize = STR_PREFIX + 20;
}

/// Coarse classification of a value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Nil,
    Bool,
    Int,
    Uint,
    Float32,
    Float64,
    Str,
    Bin,
    Array,
    Map,
    Ext,
    /// The reserved marker `0xc1`.
    Invalid,
}

impl WireType {
    /// Classifies a leading marker byte.
    pub fn of(m: u8) -> WireType {
        use marker::*;
        match m {
            0x00..=POS_FIXINT_MAX => WireType::Uint,
            FIXMAP..=0x8f => WireType::Map,
            FIXARRAY..=0x9f => WireType::Array,
            FIXSTR..=0xbf => WireType::Str,
            NIL => WireType::Nil,
            FALSE | TRUE => WireType::Bool,
            BIN8 | BIN16 | BIN32 => WireType::Bin,
            EXT8 | EXT16 | EXT32 => WireType::Ext,
            FLOAT32 => WireType::Float32,
            FLOAT64 => WireType::Float64,
            UINT8..=UINT64 => WireType::Uint,
            INT8..=INT64 => WireType::Int,
            FIXEXT1..=FIXEXT16 => WireType::Ext,
            STR8..=STR32 => WireType::Str,
            ARRAY16 | ARRAY32 => WireType::Array,
            MAP16 | MAP32 => WireType::Map,
            NEG_FIXINT_MIN..=0xff => WireType::Int,
            _ => WireType::Invalid,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Nil => "nil",
            WireType::Bool => "bool",
            WireType::Int => "int",
            WireType::Uint => "uint",
            WireType::Float32 => "float32",
            WireType::Float64 => "float64",
            WireType::Str => "str",
            WireType::Bin => "bin",
            WireType::Array => "array",
            WireType::Map => "map",
            WireType::Ext => "ext",
            WireType::Invalid => "invalid",
        };
        f.write_str(name)
    }
}
