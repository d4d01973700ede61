//! Streaming decoder over any [`std::io::Read`].

use crate::error::{Error, Result};
use crate::ext::{Complex128, Complex64};
use crate::read::{self, Source};
use crate::wire::WireType;
use std::io::{self, Read};
use std::time::{Duration, SystemTime};

const CHUNK: usize = 4 * 1024;
const MAX_CHUNK: usize = 64 * 1024;

/// Buffered streaming decoder.
///
/// Reads ahead in small chunks so that a length prefix alone never causes
/// a large allocation: storage grows only as bytes actually arrive.
pub struct Reader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
}

macro_rules! read_methods {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> Result<$ty> {
                read::$name(self)
            }
        )*
    };
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Bytes read from the source but not yet decoded.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, n: usize) -> Result<()> {
        if self.buf.len() - self.pos >= n {
            return Ok(());
        }
        self.buf.drain(..self.pos);
        self.pos = 0;
        while self.buf.len() < n {
            let start = self.buf.len();
            let want = (n - start).clamp(CHUNK, MAX_CHUNK);
            self.buf.resize(start + want, 0);
            let got = match self.inner.read(&mut self.buf[start..]) {
                Ok(got) => got,
                Err(e) => {
                    self.buf.truncate(start);
                    if e.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(e.into());
                }
            };
            self.buf.truncate(start + got);
            if got == 0 {
                return Err(Error::from(io::Error::from(io::ErrorKind::UnexpectedEof)));
            }
        }
        Ok(())
    }

    read_methods! {
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

    /// Reads a bin blob of exactly `out.len()` bytes.
    pub fn read_bin_exact(&mut self, out: &mut [u8]) -> Result<()> {
        read::read_bin_exact(self, out)
    }

    /// Reads an extension block of the given type.
    pub fn read_ext(&mut self, ty: i8) -> Result<Vec<u8>> {
        read::read_ext(self, ty)
    }
}

impl<R: Read> Source for Reader<R> {
    fn peek(&mut self) -> Result<u8> {
        self.fill(1)?;
        Ok(self.buf[self.pos])
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        self.fill(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }
}
