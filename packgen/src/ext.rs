//! Extension-backed value types: time, complex numbers.

use crate::error::{Error, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Complex number with `f32` parts, encoded as extension type 3.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Complex64 {
    pub re: f32,
    pub im: f32,
}

impl Complex64 {
    pub fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }
}

/// Complex number with `f64` parts, encoded as extension type 4.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Complex128 {
    pub re: f64,
    pub im: f64,
}

impl Complex128 {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Splits a time into seconds since the epoch and a non-negative
/// nanosecond remainder.
pub(crate) fn split_time(t: SystemTime) -> (i64, u32) {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
        Err(before) => {
            let d = before.duration();
            let secs = d.as_secs() as i64;
            match d.subsec_nanos() {
                0 => (-secs, 0),
                nanos => (-secs - 1, NANOS_PER_SEC - nanos),
            }
        }
    }
}

pub(crate) fn join_time(secs: i64, nanos: u32) -> Result<SystemTime> {
    if nanos >= NANOS_PER_SEC {
        return Err(Error::invalid_extension(format!(
            "nanoseconds out of range: {nanos}"
        )));
    }
    let t = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::new(secs as u64, nanos))
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(secs.unsigned_abs()))
            .and_then(|t| t.checked_add(Duration::from_nanos(u64::from(nanos))))
    };
    t.ok_or_else(|| Error::invalid_extension("time out of range"))
}

/// Legacy 12-byte payload: i64 seconds, u32 nanoseconds, big-endian.
pub(crate) fn time_payload(t: SystemTime) -> [u8; 12] {
    let (secs, nanos) = split_time(t);
    let mut out = [0u8; 12];
    out[..8].copy_from_slice(&secs.to_be_bytes());
    out[8..].copy_from_slice(&nanos.to_be_bytes());
    out
}

/// Standard timestamp payload in its shortest form.
pub(crate) fn timestamp_payload(t: SystemTime) -> Vec<u8> {
    let (secs, nanos) = split_time(t);
    if secs >> 34 == 0 {
        let packed = (u64::from(nanos) << 34) | secs as u64;
        if packed & 0xffff_ffff_0000_0000 == 0 {
            return (packed as u32).to_be_bytes().to_vec();
        }
        return packed.to_be_bytes().to_vec();
    }
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&nanos.to_be_bytes());
    out.extend_from_slice(&secs.to_be_bytes());
    out
}

/// Decodes either time representation.
pub(crate) fn time_from_ext(ty: i8, data: &[u8]) -> Result<SystemTime> {
    match (ty, data.len()) {
        (crate::wire::ext::TIME, 12) => {
            let secs = i64::from_be_bytes(fixed(&data[..8])?);
            let nanos = u32::from_be_bytes(fixed(&data[8..])?);
            join_time(secs, nanos)
        }
        (crate::wire::ext::TIMESTAMP, 4) => {
            let secs = u32::from_be_bytes(fixed(data)?);
            join_time(i64::from(secs), 0)
        }
        (crate::wire::ext::TIMESTAMP, 8) => {
            let packed = u64::from_be_bytes(fixed(data)?);
            join_time((packed & 0x3_ffff_ffff) as i64, (packed >> 34) as u32)
        }
        (crate::wire::ext::TIMESTAMP, 12) => {
            let nanos = u32::from_be_bytes(fixed(&data[..4])?);
            let secs = i64::from_be_bytes(fixed(&data[4..])?);
            join_time(secs, nanos)
        }
        (ty, len) => Err(Error::invalid_extension(format!(
            "extension {ty} with {len} byte(s) is not a time"
        ))),
    }
}

pub(crate) fn complex64_payload(c: Complex64) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&c.re.to_bits().to_be_bytes());
    out[4..].copy_from_slice(&c.im.to_bits().to_be_bytes());
    out
}

pub(crate) fn complex128_payload(c: Complex128) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&c.re.to_bits().to_be_bytes());
    out[8..].copy_from_slice(&c.im.to_bits().to_be_bytes());
    out
}

pub(crate) fn complex64_from(data: &[u8]) -> Result<Complex64> {
    if data.len() != 8 {
        return Err(Error::invalid_extension("complex64 payload must be 8 bytes"));
    }
    Ok(Complex64 {
        re: f32::from_bits(u32::from_be_bytes(fixed(&data[..4])?)),
        im: f32::from_bits(u32::from_be_bytes(fixed(&data[4..])?)),
    })
}

pub(crate) fn complex128_from(data: &[u8]) -> Result<Complex128> {
    if data.len() != 16 {
        return Err(Error::invalid_extension("complex128 payload must be 16 bytes"));
    }
    Ok(Complex128 {
        re: f64::from_bits(u64::from_be_bytes(fixed(&data[..8])?)),
        im: f64::from_bits(u64::from_be_bytes(fixed(&data[8..])?)),
    })
}

fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N]> {
    data.try_into()
        .map_err(|_| Error::short_buffer(N, data.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ext;

    #[test]
    fn split_handles_pre_epoch() {
        let t = UNIX_EPOCH - Duration::new(1, 250);
        let (secs, nanos) = split_time(t);
        assert_eq!((secs, nanos), (-2, NANOS_PER_SEC - 250));
        assert_eq!(join_time(secs, nanos).ok(), Some(t));
    }

    #[test]
    fn timestamp_picks_shortest_form() {
        let whole = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(timestamp_payload(whole).len(), 4);

        let fractional = whole + Duration::from_nanos(5);
        assert_eq!(timestamp_payload(fractional).len(), 8);

        let far = UNIX_EPOCH + Duration::from_secs(1 << 35);
        assert_eq!(timestamp_payload(far).len(), 12);

        for t in [whole, fractional, far] {
            let back = time_from_ext(ext::TIMESTAMP, &timestamp_payload(t));
            assert_eq!(back.ok(), Some(t));
        }
    }

    #[test]
    fn legacy_time_round_trips() {
        let t = UNIX_EPOCH + Duration::new(42, 999);
        assert_eq!(time_from_ext(ext::TIME, &time_payload(t)).ok(), Some(t));
    }

    #[test]
    fn rejects_foreign_extension() {
        assert!(time_from_ext(9, &[0; 12]).is_err());
    }
}
