//! Schema-less view of wire data.
//!
//! [`Value`] decodes any well-formed input without a target type. It is
//! meant for inspection and tests; with the `json` feature it renders as
//! JSON-like text.

use crate::error::{Error, ErrorKind, Result};
use crate::read::{self, Source};
use crate::reader::Reader;
use crate::wire::WireType;
use std::io::Read;

const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Ext(i8, Vec<u8>),
}

impl Value {
    /// Decodes one value from the front of `b`, advancing it.
    pub fn read_from(b: &mut &[u8]) -> Result<Value> {
        read_value(b, 0)
    }

    /// Decodes one value from a stream.
    pub fn decode<R: Read>(r: &mut Reader<R>) -> Result<Value> {
        read_value(r, 0)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

fn read_value<S: Source>(s: &mut S, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(Error::new(ErrorKind::DepthExceeded(MAX_DEPTH)));
    }
    let m = s.peek()?;
    let value = match WireType::of(m) {
        WireType::Nil => {
            read::read_nil(s)?;
            Value::Nil
        }
        WireType::Bool => Value::Bool(read::read_bool(s)?),
        WireType::Uint => Value::Uint(read::read_u64(s)?),
        WireType::Int => Value::Int(read::read_i64(s)?),
        WireType::Float32 => Value::F32(read::read_f32(s)?),
        WireType::Float64 => Value::F64(read::read_f64(s)?),
        WireType::Str => Value::Str(read::read_string(s)?),
        WireType::Bin => Value::Bin(read::read_bytes(s)?),
        WireType::Array => {
            let n = read::read_array_header(s)?;
            let mut items = Vec::new();
            for _ in 0..n {
                items.push(read_value(s, depth + 1)?);
            }
            Value::Array(items)
        }
        WireType::Map => {
            let n = read::read_map_header(s)?;
            let mut entries = Vec::new();
            for _ in 0..n {
                let k = read_value(s, depth + 1)?;
                let v = read_value(s, depth + 1)?;
                entries.push((k, v));
            }
            Value::Map(entries)
        }
        WireType::Ext => {
            let (ty, data) = read::read_any_ext(s)?;
            Value::Ext(ty, data)
        }
        WireType::Invalid => return Err(Error::type_mismatch(WireType::Nil, WireType::Invalid)),
    };
    Ok(value)
}

#[cfg(feature = "json")]
mod json {
    use super::Value;
    use serde_json::{json, Map, Number};
    use std::fmt;

    impl Value {
        /// Projects the value onto JSON. Non-string map keys are rendered
        /// as their JSON text; binary data becomes an array of bytes.
        pub fn to_json(&self) -> serde_json::Value {
            match self {
                Value::Nil => serde_json::Value::Null,
                Value::Bool(b) => serde_json::Value::Bool(*b),
                Value::Int(i) => json!(i),
                Value::Uint(u) => json!(u),
                Value::F32(f) => Number::from_f64(f64::from(*f))
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
                Value::F64(f) => Number::from_f64(*f)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
                Value::Str(s) => serde_json::Value::String(s.clone()),
                Value::Bin(b) => json!(b),
                Value::Array(items) => {
                    serde_json::Value::Array(items.iter().map(Value::to_json).collect())
                }
                Value::Map(entries) => {
                    let mut out = Map::new();
                    for (k, v) in entries {
                        let key = match k {
                            Value::Str(s) => s.clone(),
                            other => other.to_json().to_string(),
                        };
                        out.insert(key, v.to_json());
                    }
                    serde_json::Value::Object(out)
                }
                Value::Ext(ty, data) => json!({ "type": ty, "data": data }),
            }
        }
    }

    impl fmt::Display for Value {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.to_json())
        }
    }
}
