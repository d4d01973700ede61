#![packgen(map_keys = "auto_shim")]

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Counters {
    pub by_code: std::collections::BTreeMap<u16, u64>,
    pub by_offset: std::collections::HashMap<i32, String>,
}
