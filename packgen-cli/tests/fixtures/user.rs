#![packgen(limit(arrays = 256))]

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[msg(omitempty)]
    pub email: Option<String>,
    #[msg(allownil, limit = 16)]
    pub roles: Option<Vec<String>>,
}
