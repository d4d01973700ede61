#![packgen(replace(ty = "crate::domain::LegacyId", with = "IdRecord"))]
#![packgen(shim(
    ty = "crate::domain::Celsius",
    wire = "f64",
    encode = "crate::domain::celsius_to_f64",
    decode = "crate::domain::celsius_from_f64"
))]
#![packgen(shim(
    ty = "crate::domain::Port",
    wire = "u32",
    encode = "crate::domain::port_to_wire",
    decode = "crate::domain::port_from_wire",
    fallible
))]
#![packgen(binary(crate::domain::Token), binary_append(crate::domain::Fingerprint))]
#![packgen(text(crate::domain::Locale), text_string(crate::domain::Version))]
#![packgen(intercept(ty = "crate::domain::Money", using = "crate::domain::MONEY"))]

use crate::domain::LegacyId;

/// Wire form of `LegacyId`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdRecord {
    pub ns: String,
    pub serial: u64,
}

impl From<&LegacyId> for IdRecord {
    fn from(id: &LegacyId) -> Self {
        IdRecord {
            ns: id.namespace.clone(),
            serial: id.serial,
        }
    }
}

impl From<IdRecord> for LegacyId {
    fn from(r: IdRecord) -> Self {
        LegacyId {
            namespace: r.ns,
            serial: r.serial,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reading {
    pub source: crate::domain::LegacyId,
    pub temp: crate::domain::Celsius,
    pub port: crate::domain::Port,
    pub token: crate::domain::Token,
    pub print: crate::domain::Fingerprint,
    pub locale: crate::domain::Locale,
    pub firmware: crate::domain::Version,
    pub price: crate::domain::Money,
    pub history: Vec<crate::domain::Celsius>,
    pub budget: Option<crate::domain::Money>,
}
