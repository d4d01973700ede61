#[derive(Debug, Default, Clone, PartialEq)]
pub struct Lists {
    pub a: Option<Vec<String>>,
    #[msg(allownil)]
    pub b: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
#[packgen(tuple)]
pub struct Row {
    #[msg(omitempty)]
    pub x: String,
    pub y: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Foo {
    pub foo: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub enum Message {
    #[default]
    Empty,
    Foo(Foo),
    #[msg(rename = "txt")]
    Text(String),
    #[msg(skip)]
    Local(u64),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    #[msg(omitempty)]
    pub nickname: String,
    #[msg(omitempty)]
    pub tags: Vec<String>,
    #[msg(rename = "n", omitempty)]
    pub visits: u32,
    #[msg(skip)]
    pub cached: bool,
}
