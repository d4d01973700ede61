//! Textual map keys for non-string key types.
//!
//! Integer, bool and char keys are written as their decimal or literal text
//! and parsed back on decode. Generated code uses this for auto-shimmed map
//! keys and for generic key parameters bounded by [`MapKey`].

use crate::error::{Error, Result};

pub trait MapKey: Sized {
    fn to_key(&self) -> String;
    fn from_key(key: &str) -> Result<Self>;
}

macro_rules! parsed_keys {
    ($($ty:ty),*) => {
        $(
            impl MapKey for $ty {
                fn to_key(&self) -> String {
                    self.to_string()
                }

                fn from_key(key: &str) -> Result<Self> {
                    key.parse().map_err(Error::conversion)
                }
            }
        )*
    };
}

parsed_keys!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool, char);

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Result<Self> {
        Ok(key.to_owned())
    }
}
