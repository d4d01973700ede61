#![packgen(map_keys = "shim")]
#![packgen(shim(
    ty = "std::net::Ipv4Addr",
    wire = "String",
    encode = "crate::shims::ip_to_key",
    decode = "crate::shims::ip_from_key",
    fallible
))]

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Routes {
    pub hops: std::collections::BTreeMap<std::net::Ipv4Addr, u32>,
}
