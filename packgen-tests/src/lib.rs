//! Fixture crate for end-to-end tests.
//!
//! `build.rs` runs the generator over `schema/*.rs`; each schema becomes a
//! module here, with its emitted round-trip tests compiled alongside.

macro_rules! schema {
    ($name:ident) => {
        pub mod $name {
            include!(concat!(env!("OUT_DIR"), "/", stringify!($name), "_msgp.rs"));

            #[cfg(test)]
            mod generated_tests {
                include!(concat!(env!("OUT_DIR"), "/", stringify!($name), "_msgp_test.rs"));
            }
        }
    };
}

schema!(scenarios);
schema!(keys);
schema!(counters);
schema!(limits);
schema!(records);
schema!(times);
schema!(stamps);
schema!(layout);
schema!(conversions);
schema!(omission);
schema!(bounded);

/// Key shims referenced by `schema/keys.rs`.
pub mod shims {
    use std::convert::Infallible;
    use std::net::{AddrParseError, Ipv4Addr};

    pub fn ip_to_key(ip: &Ipv4Addr) -> Result<String, Infallible> {
        Ok(ip.to_string())
    }

    pub fn ip_from_key(key: String) -> Result<Ipv4Addr, AddrParseError> {
        key.parse()
    }
}

/// Types no schema declares, reached through `schema/conversions.rs`.
pub mod domain {
    use packgen::{
        append, bytes, size, BinaryAppend, BinaryMarshal, BoxError, Error, Interceptor, Reader,
        TextMarshal, Writer,
    };
    use std::convert::Infallible;
    use std::io::{Read, Write};
    use std::num::TryFromIntError;

    /// Owned by another crate in real life; mirrored by `IdRecord`.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct LegacyId {
        pub namespace: String,
        pub serial: u64,
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    pub struct Celsius(pub f64);

    pub fn celsius_to_f64(c: &Celsius) -> f64 {
        c.0
    }

    pub fn celsius_from_f64(v: f64) -> Celsius {
        Celsius(v)
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Port(pub u16);

    pub fn port_to_wire(p: &Port) -> Result<u32, Infallible> {
        Ok(u32::from(p.0))
    }

    pub fn port_from_wire(v: u32) -> Result<Port, TryFromIntError> {
        u16::try_from(v).map(Port)
    }

    /// Opaque session token, sent as 8 raw bytes.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Token(pub [u8; 8]);

    impl BinaryMarshal for Token {
        fn marshal_binary(&self) -> Result<Vec<u8>, BoxError> {
            Ok(self.0.to_vec())
        }

        fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), BoxError> {
            self.0 = <[u8; 8]>::try_from(data)?;
            Ok(())
        }
    }

    /// Algorithm id followed by digest bytes.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct Fingerprint {
        pub algo: u8,
        pub digest: Vec<u8>,
    }

    impl BinaryAppend for Fingerprint {
        fn append_binary(&self, buf: &mut Vec<u8>) -> Result<(), BoxError> {
            buf.push(self.algo);
            buf.extend_from_slice(&self.digest);
            Ok(())
        }
    }

    impl BinaryMarshal for Fingerprint {
        fn marshal_binary(&self) -> Result<Vec<u8>, BoxError> {
            let mut buf = Vec::with_capacity(1 + self.digest.len());
            self.append_binary(&mut buf)?;
            Ok(buf)
        }

        fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), BoxError> {
            let (algo, digest) = data.split_first().ok_or("empty fingerprint")?;
            self.algo = *algo;
            self.digest = digest.to_vec();
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct Locale(pub String);

    impl TextMarshal for Locale {
        fn marshal_text(&self) -> Result<String, BoxError> {
            Ok(self.0.clone())
        }

        fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError> {
            self.0 = text.to_string();
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Version {
        pub major: u16,
        pub minor: u16,
        pub patch: u16,
    }

    impl TextMarshal for Version {
        fn marshal_text(&self) -> Result<String, BoxError> {
            Ok(format!("{}.{}.{}", self.major, self.minor, self.patch))
        }

        fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError> {
            let mut parts = text.split('.').map(str::parse::<u16>);
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(major), Some(minor), Some(patch), None) => {
                    *self = Version {
                        major: major?,
                        minor: minor?,
                        patch: patch?,
                    };
                    Ok(())
                }
                _ => Err(format!("`{text}` is not major.minor.patch").into()),
            }
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct Money {
        pub cents: i64,
        pub currency: String,
    }

    /// Writes [`Money`] as `[cents, currency]`.
    #[derive(Debug)]
    pub struct MoneyCodec;

    pub static MONEY: MoneyCodec = MoneyCodec;

    impl Interceptor<Money> for MoneyCodec {
        fn encode<W: Write>(&self, v: &Money, w: &mut Writer<W>) -> packgen::Result<()> {
            w.write_array_header(2)?;
            w.write_int(v.cents)?;
            w.write_str(&v.currency)
        }

        fn decode<R: Read>(&self, v: &mut Money, r: &mut Reader<R>) -> packgen::Result<()> {
            let n = r.read_array_header()?;
            if n != 2 {
                return Err(Error::arity(2, n));
            }
            v.cents = r.read_i64()?;
            v.currency = r.read_string()?;
            Ok(())
        }

        fn marshal(&self, v: &Money, buf: &mut Vec<u8>) -> packgen::Result<()> {
            append::append_array_header(buf, 2);
            append::append_int(buf, v.cents);
            append::append_str(buf, &v.currency);
            Ok(())
        }

        fn unmarshal<'a>(&self, v: &mut Money, mut bts: &'a [u8]) -> packgen::Result<&'a [u8]> {
            let n = bytes::read_array_header(&mut bts)?;
            if n != 2 {
                return Err(Error::arity(2, n));
            }
            v.cents = bytes::read_i64(&mut bts)?;
            v.currency = bytes::read_string(&mut bts)?;
            Ok(bts)
        }

        fn msgsize(&self, v: &Money) -> usize {
            size::ARRAY_HEADER + size::INT + size::STR_PREFIX + v.currency.len()
        }
    }
}
