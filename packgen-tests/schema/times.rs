use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Timeline {
    pub started: Option<SystemTime>,
    pub ticks: Vec<SystemTime>,
    pub marks: HashMap<String, SystemTime>,
    #[msg(omitempty)]
    pub finished: Option<Box<SystemTime>>,
}
