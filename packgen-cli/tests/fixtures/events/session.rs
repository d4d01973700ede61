#[derive(Debug, Default, Clone, PartialEq)]
pub struct Login {
    pub user: String,
    #[msg(rename = "ts")]
    pub timestamp: i64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub enum Session {
    #[default]
    Anonymous,
    Active(Login),
}
