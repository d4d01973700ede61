#![packgen(limit(arrays = 8, maps = 2))]

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
    #[msg(limit = 4)]
    pub ids: Vec<u32>,
    pub names: Vec<String>,
    pub attrs: std::collections::BTreeMap<String, String>,
}
