#![packgen(new_time)]

use std::time::SystemTime;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stamped {
    pub at: Option<SystemTime>,
    pub history: Vec<SystemTime>,
}
