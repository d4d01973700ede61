#[derive(Debug, Default, Clone, PartialEq)]
pub struct Meta {
    pub id: u64,
    pub kind: String,
}

/// `kind` repeats a key of the flattened `meta`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Envelope {
    #[msg(flatten)]
    pub meta: Meta,
    pub kind: String,
    #[msg(omitempty)]
    pub body: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tree {
    pub label: String,
    pub kids: Vec<Tree>,
    pub next: Option<Box<Tree>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Page<T: packgen::Msgp> {
    pub items: Vec<T>,
    #[msg(omitempty)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Listing {
    pub trees: Page<Tree>,
    pub labels: Page<String>,
}
