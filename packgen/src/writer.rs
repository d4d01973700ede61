//! Streaming encoder over any [`std::io::Write`].

use crate::append;
use crate::error::Result;
use crate::ext::{Complex128, Complex64};
use std::io::Write;
use std::time::{Duration, SystemTime};

const FLUSH_THRESHOLD: usize = 8 * 1024;

/// Buffered streaming encoder.
///
/// Values are appended to an internal buffer that is handed to the
/// underlying writer once it grows past a threshold. Call [`Writer::flush`]
/// when done; dropping a writer discards anything still buffered.
pub struct Writer<W: Write> {
    inner: W,
    buf: Vec<u8>,
}

macro_rules! write_methods {
    ($($(#[$doc:meta])* $name:ident => $append:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, $($arg: $ty),*) -> Result<()> {
                append::$append(&mut self.buf, $($arg),*);
                self.maybe_flush()
            }
        )*
    };
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(FLUSH_THRESHOLD),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }

    fn drain(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.buf.len() >= FLUSH_THRESHOLD {
            self.drain()?;
        }
        Ok(())
    }

    /// Writes everything buffered and flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Writes pre-encoded bytes verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        self.maybe_flush()
    }

    write_methods! {
        write_nil => append_nil();
        write_bool => append_bool(v: bool);
        write_int => append_int(v: i64);
        write_uint => append_uint(v: u64);
        write_f32 => append_f32(v: f32);
        write_f64 => append_f64(v: f64);
        /// Writes an `f64`, demoted to `f32` when lossless.
        write_f64_compact => append_f64_compact(v: f64);
        write_char => append_char(v: char);
        write_str => append_str(v: &str);
        write_bin => append_bin(v: &[u8]);
        write_array_header => append_array_header(len: u32);
        write_map_header => append_map_header(len: u32);
        write_ext => append_ext(ty: i8, data: &[u8]);
        /// Writes a time in the legacy extension form.
        write_time => append_time(t: SystemTime);
        /// Writes a time as a standard timestamp.
        write_timestamp => append_timestamp(t: SystemTime);
        write_complex64 => append_complex64(c: Complex64);
        write_complex128 => append_complex128(c: Complex128);
    }

    pub fn write_duration(&mut self, d: Duration) -> Result<()> {
        append::append_duration(&mut self.buf, d)?;
        self.maybe_flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_matches_append() {
        let mut w = Writer::new(Vec::new());
        w.write_map_header(1).unwrap();
        w.write_str("n").unwrap();
        w.write_int(-7).unwrap();
        let streamed = w.into_inner().unwrap();

        let mut b = Vec::new();
        append::append_map_header(&mut b, 1);
        append::append_str(&mut b, "n");
        append::append_int(&mut b, -7);
        assert_eq!(streamed, b);
    }

    #[test]
    fn large_output_is_flushed_in_pieces() {
        let mut w = Writer::new(Vec::new());
        for _ in 0..1000 {
            w.write_str("0123456789abcdef").unwrap();
        }
        assert!(!w.get_ref().is_empty());
        assert_eq!(w.into_inner().unwrap().len(), 17 * 1000);
    }
}
