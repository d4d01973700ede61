#![packgen(map_keys = "auto_shim")]

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Child {
    pub label: String,
    pub weight: i8,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    pub id: u64,
    pub delta: i32,
    pub score: f64,
    pub ratio: f32,
    pub active: bool,
    pub name: String,
    #[msg(omitempty)]
    pub note: Option<String>,
    pub payload: Vec<u8>,
    pub digest: [u8; 4],
    #[msg(omitempty)]
    pub tags: Vec<String>,
    pub counts: std::collections::BTreeMap<u16, i64>,
    pub children: Vec<Child>,
    pub parent: Option<Box<Child>>,
}
