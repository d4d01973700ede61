#![packgen(zero_test(Window), empty_test(Bag))]

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

/// A window is zero when it covers nothing.
impl packgen::IsZero for Window {
    fn is_zero(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bag {
    pub items: Vec<String>,
    pub label: String,
}

impl packgen::IsEmpty for Bag {
    fn is_empty_value(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sparse {
    #[msg(omitzero)]
    pub window: Window,
    #[msg(omitisempty)]
    pub bag: Bag,
    #[msg(omitisempty)]
    pub spare: Option<Bag>,
    #[msg(omitzero)]
    pub count: u32,
    pub always: u8,
}

/// More omittable fields than one mask word holds.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Wide {
    #[msg(omitempty)]
    pub f00: u8,
    #[msg(omitempty)]
    pub f01: u8,
    #[msg(omitempty)]
    pub f02: u8,
    #[msg(omitempty)]
    pub f03: u8,
    #[msg(omitempty)]
    pub f04: u8,
    #[msg(omitempty)]
    pub f05: u8,
    #[msg(omitempty)]
    pub f06: u8,
    #[msg(omitempty)]
    pub f07: u8,
    #[msg(omitempty)]
    pub f08: u8,
    #[msg(omitempty)]
    pub f09: u8,
    #[msg(omitempty)]
    pub f10: u8,
    #[msg(omitempty)]
    pub f11: u8,
    #[msg(omitempty)]
    pub f12: u8,
    #[msg(omitempty)]
    pub f13: u8,
    #[msg(omitempty)]
    pub f14: u8,
    #[msg(omitempty)]
    pub f15: u8,
    #[msg(omitempty)]
    pub f16: u8,
    #[msg(omitempty)]
    pub f17: u8,
    #[msg(omitempty)]
    pub f18: u8,
    #[msg(omitempty)]
    pub f19: u8,
    #[msg(omitempty)]
    pub f20: u8,
    #[msg(omitempty)]
    pub f21: u8,
    #[msg(omitempty)]
    pub f22: u8,
    #[msg(omitempty)]
    pub f23: u8,
    #[msg(omitempty)]
    pub f24: u8,
    #[msg(omitempty)]
    pub f25: u8,
    #[msg(omitempty)]
    pub f26: u8,
    #[msg(omitempty)]
    pub f27: u8,
    #[msg(omitempty)]
    pub f28: u8,
    #[msg(omitempty)]
    pub f29: u8,
    #[msg(omitempty)]
    pub f30: u8,
    #[msg(omitempty)]
    pub f31: u8,
    #[msg(omitempty)]
    pub f32: u8,
    #[msg(omitempty)]
    pub f33: u8,
    #[msg(omitempty)]
    pub f34: u8,
    #[msg(omitempty)]
    pub f35: u8,
    #[msg(omitempty)]
    pub f36: u8,
    #[msg(omitempty)]
    pub f37: u8,
    #[msg(omitempty)]
    pub f38: u8,
    #[msg(omitempty)]
    pub f39: u8,
    #[msg(omitempty)]
    pub f40: u8,
    #[msg(omitempty)]
    pub f41: u8,
    #[msg(omitempty)]
    pub f42: u8,
    #[msg(omitempty)]
    pub f43: u8,
    #[msg(omitempty)]
    pub f44: u8,
    #[msg(omitempty)]
    pub f45: u8,
    #[msg(omitempty)]
    pub f46: u8,
    #[msg(omitempty)]
    pub f47: u8,
    #[msg(omitempty)]
    pub f48: u8,
    #[msg(omitempty)]
    pub f49: u8,
    #[msg(omitempty)]
    pub f50: u8,
    #[msg(omitempty)]
    pub f51: u8,
    #[msg(omitempty)]
    pub f52: u8,
    #[msg(omitempty)]
    pub f53: u8,
    #[msg(omitempty)]
    pub f54: u8,
    #[msg(omitempty)]
    pub f55: u8,
    #[msg(omitempty)]
    pub f56: u8,
    #[msg(omitempty)]
    pub f57: u8,
    #[msg(omitempty)]
    pub f58: u8,
    #[msg(omitempty)]
    pub f59: u8,
    #[msg(omitempty)]
    pub f60: u8,
    #[msg(omitempty)]
    pub f61: u8,
    #[msg(omitempty)]
    pub f62: u8,
    #[msg(omitempty)]
    pub f63: u8,
    #[msg(omitempty)]
    pub f64: u8,
    #[msg(omitempty)]
    pub f65: u8,
    #[msg(omitempty)]
    pub f66: u8,
    #[msg(omitempty)]
    pub f67: u8,
    #[msg(omitempty)]
    pub f68: u8,
    #[msg(omitempty)]
    pub f69: u8,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Labels(#[msg(allownil)] pub Option<Vec<String>>);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aliases(pub Option<Vec<String>>);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tagged {
    pub labels: Labels,
    pub aliases: Aliases,
}
