#![packgen(limit(arrays = 3, maps = 2, marshal))]

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Grid {
    pub rows: Vec<Vec<u32>>,
    pub index: std::collections::BTreeMap<String, Vec<u16>>,
}
