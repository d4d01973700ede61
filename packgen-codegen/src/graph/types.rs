//! Type graph definitions.
//!
//! The graph is an arena of declarations addressed by [`DeclId`]. Fields
//! hold [`TypeNode`] trees whose leaves are primitives, generic parameters,
//! external types, or handles back into the arena. Handles make recursive
//! types representable without owning cycles.

use crate::directives::FieldAttrs;
use bitflags::bitflags;
use quote::ToTokens;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Stable handle to a declaration in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name", content = "arg", rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    F32,
    F64,
    Char,
    String,
    /// `Vec<u8>`, written as bin.
    Bytes,
    /// `[u8; N]`, written as bin of exactly N bytes.
    ByteArray(usize),
    Complex64,
    Complex128,
    Time,
    Duration,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = |w: &IntWidth| match w {
            IntWidth::W8 => "8",
            IntWidth::W16 => "16",
            IntWidth::W32 => "32",
            IntWidth::W64 => "64",
            IntWidth::Size => "size",
        };
        match self {
            Primitive::Bool => f.write_str("bool"),
            Primitive::Int(w) => write!(f, "i{}", width(w)),
            Primitive::Uint(w) => write!(f, "u{}", width(w)),
            Primitive::F32 => f.write_str("f32"),
            Primitive::F64 => f.write_str("f64"),
            Primitive::Char => f.write_str("char"),
            Primitive::String => f.write_str("String"),
            Primitive::Bytes => f.write_str("Vec<u8>"),
            Primitive::ByteArray(n) => write!(f, "[u8; {n}]"),
            Primitive::Complex64 => f.write_str("Complex64"),
            Primitive::Complex128 => f.write_str("Complex128"),
            Primitive::Time => f.write_str("SystemTime"),
            Primitive::Duration => f.write_str("Duration"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapFlavor {
    HashMap,
    BTreeMap,
}

bitflags! {
    /// What a type or generic parameter is known to support.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct CapabilitySet: u32 {
        /// All five operation families (`Msgp` bound on a parameter).
        const MSGP = 1 << 0;
        const MAP_KEY = 1 << 1;
        /// Declared with `external(..)`: the type implements the operation traits itself.
        const FULL = 1 << 2;
        const BINARY = 1 << 3;
        const BINARY_APPEND = 1 << 4;
        const TEXT = 1 << 5;
        const TEXT_STRING = 1 << 6;
        const ZERO_TEST = 1 << 7;
        const EMPTY_TEST = 1 << 8;
        const INTERCEPT = 1 << 9;
        const REPLACE = 1 << 10;
        const SHIM = 1 << 11;
    }
}

impl CapabilitySet {
    /// Capabilities that decide how a value is encoded.
    pub const ENCODING: Self = Self::FULL
        .union(Self::BINARY)
        .union(Self::BINARY_APPEND)
        .union(Self::TEXT)
        .union(Self::TEXT_STRING)
        .union(Self::INTERCEPT)
        .union(Self::REPLACE)
        .union(Self::SHIM);
}

pub(crate) fn tokens<T: ToTokens, S: Serializer>(v: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&v.to_token_stream())
}

/// How an external type reaches the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum ExternalBehavior {
    /// Through the traits named by its capability set.
    Capabilities,
    /// Converted to and from a local type with `From`.
    Replace {
        #[serde(serialize_with = "tokens")]
        with: syn::Type,
    },
    /// Converted to and from a wire type by user functions.
    Shim {
        wire: Box<TypeNode>,
        #[serde(serialize_with = "tokens")]
        wire_ty: syn::Type,
        #[serde(serialize_with = "tokens")]
        encode: syn::Path,
        #[serde(serialize_with = "tokens")]
        decode: syn::Path,
        fallible: bool,
    },
    /// Handed to an `Interceptor` provider value.
    Intercept {
        #[serde(serialize_with = "tokens")]
        using: syn::Path,
    },
}

/// One node of a field's type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    Primitive {
        prim: Primitive,
    },
    /// `Option<T>`.
    Pointer {
        elem: Box<TypeNode>,
    },
    /// `Box<T>`.
    Boxed {
        elem: Box<TypeNode>,
    },
    /// `Vec<T>`.
    Slice {
        elem: Box<TypeNode>,
    },
    /// `[T; N]`.
    Array {
        elem: Box<TypeNode>,
        len: usize,
    },
    Map {
        flavor: MapFlavor,
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },
    Declared {
        id: DeclId,
        name: String,
    },
    GenericParameter {
        name: String,
        capabilities: CapabilitySet,
    },
    GenericInstance {
        base: DeclId,
        name: String,
        args: Vec<TypeNode>,
        instance: DeclId,
    },
    ExternalOpaque {
        path: String,
        behavior: ExternalBehavior,
        capabilities: CapabilitySet,
    },
}

impl TypeNode {
    pub fn primitive(prim: Primitive) -> Self {
        TypeNode::Primitive { prim }
    }

    /// The declaration this node hands off to, if any.
    pub fn decl(&self) -> Option<DeclId> {
        match self {
            TypeNode::Declared { id, .. } => Some(*id),
            TypeNode::GenericInstance { instance, .. } => Some(*instance),
            _ => None,
        }
    }

    /// Declarations reached without heap indirection.
    pub fn by_value_decls(&self, out: &mut Vec<DeclId>) {
        match self {
            TypeNode::Declared { id, .. } => out.push(*id),
            TypeNode::GenericInstance { instance, args, .. } => {
                out.push(*instance);
                for arg in args {
                    arg.by_value_decls(out);
                }
            }
            TypeNode::Pointer { elem } | TypeNode::Array { elem, .. } => elem.by_value_decls(out),
            _ => {}
        }
    }

    /// Every declaration mentioned anywhere in the node.
    pub fn referenced_decls(&self, out: &mut Vec<DeclId>) {
        match self {
            TypeNode::Declared { id, .. } => out.push(*id),
            TypeNode::GenericInstance {
                base,
                instance,
                args,
                ..
            } => {
                out.push(*base);
                out.push(*instance);
                for arg in args {
                    arg.referenced_decls(out);
                }
            }
            TypeNode::Pointer { elem }
            | TypeNode::Boxed { elem }
            | TypeNode::Slice { elem }
            | TypeNode::Array { elem, .. } => elem.referenced_decls(out),
            TypeNode::Map { key, value, .. } => {
                key.referenced_decls(out);
                value.referenced_decls(out);
            }
            TypeNode::ExternalOpaque {
                behavior: ExternalBehavior::Shim { wire, .. },
                ..
            } => wire.referenced_decls(out),
            _ => {}
        }
    }

    /// Whether the node is one of the types generated impls cover, so it
    /// can stand in for a `Msgp` generic argument.
    pub fn implements_msgp(&self, graph: &TypeGraph) -> bool {
        match self {
            TypeNode::Primitive { .. } => true,
            TypeNode::Pointer { elem }
            | TypeNode::Boxed { elem }
            | TypeNode::Slice { elem }
            | TypeNode::Array { elem, .. } => elem.implements_msgp(graph),
            TypeNode::Map { key, value, .. } => {
                matches!(
                    key.as_ref(),
                    TypeNode::Primitive {
                        prim: Primitive::String
                    }
                ) && value.implements_msgp(graph)
            }
            TypeNode::Declared { .. } | TypeNode::GenericInstance { .. } => true,
            TypeNode::GenericParameter { capabilities, .. } => {
                capabilities.contains(CapabilitySet::MSGP)
            }
            TypeNode::ExternalOpaque { .. } => false,
        }
    }

    pub fn implements_map_key(&self) -> bool {
        match self {
            TypeNode::Primitive { prim } => matches!(
                prim,
                Primitive::Bool
                    | Primitive::Int(_)
                    | Primitive::Uint(_)
                    | Primitive::Char
                    | Primitive::String
            ),
            TypeNode::GenericParameter { capabilities, .. } => {
                capabilities.contains(CapabilitySet::MAP_KEY)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Primitive { prim } => write!(f, "{prim}"),
            TypeNode::Pointer { elem } => write!(f, "Option<{elem}>"),
            TypeNode::Boxed { elem } => write!(f, "Box<{elem}>"),
            TypeNode::Slice { elem } => write!(f, "Vec<{elem}>"),
            TypeNode::Array { elem, len } => write!(f, "[{elem}; {len}]"),
            TypeNode::Map { flavor, key, value } => {
                let name = match flavor {
                    MapFlavor::HashMap => "HashMap",
                    MapFlavor::BTreeMap => "BTreeMap",
                };
                write!(f, "{name}<{key}, {value}>")
            }
            TypeNode::Declared { name, .. } | TypeNode::GenericInstance { name, .. } => {
                f.write_str(name)
            }
            TypeNode::GenericParameter { name, .. } => f.write_str(name),
            TypeNode::ExternalOpaque { path, .. } => f.write_str(path),
        }
    }
}

/// A struct field after flattening.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    /// Wire key.
    pub key: String,
    /// Member path from `self`; tuple members are decimal indices.
    pub access: Vec<String>,
    pub node: TypeNode,
    /// Position in tuple layout.
    pub ordinal: usize,
    pub attrs: FieldAttrs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flattened_from: Option<String>,
}

impl Field {
    /// Dotted member path, for diagnostics.
    pub fn display_name(&self) -> String {
        self.access.join(".")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StructNode {
    pub fields: Vec<Field>,
    /// Declared with unnamed fields.
    pub is_tuple: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub ident: String,
    /// Discriminator written on the wire.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<TypeNode>,
    pub skip: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum DeclKind {
    /// Placeholder while fields are still resolving.
    Pending,
    Struct(StructNode),
    /// Single-field tuple struct, encoded as its field.
    Identifier {
        underlying: TypeNode,
        attrs: FieldAttrs,
    },
    /// Enum encoded as `[discriminator, payload]`.
    Interface { variants: Vec<Variant> },
}

#[derive(Debug, Clone, Serialize)]
pub struct GenericParam {
    pub name: String,
    pub capabilities: CapabilitySet,
}

#[derive(Debug, Clone, Serialize)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<GenericParam>,
    /// Base declaration, for monomorphized instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_of: Option<DeclId>,
    /// Item-level `#[packgen(tuple)]`.
    pub tuple: bool,
    pub failed: bool,
    #[serde(skip)]
    pub generics: syn::Generics,
}

impl Decl {
    pub fn is_generic(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn is_instance(&self) -> bool {
        self.instance_of.is_some()
    }

    pub fn as_struct(&self) -> Option<&StructNode> {
        match &self.kind {
            DeclKind::Struct(s) => Some(s),
            _ => None,
        }
    }
}

/// Arena of declarations for one input unit.
#[derive(Debug, Default, Serialize)]
pub struct TypeGraph {
    pub decls: Vec<Decl>,
    #[serde(skip)]
    pub(crate) by_name: BTreeMap<String, DeclId>,
    #[serde(skip)]
    pub(crate) instances: BTreeMap<String, DeclId>,
}

impl TypeGraph {
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0]
    }

    pub(crate) fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0]
    }

    /// Finds a declaration by its Rust name.
    pub fn lookup(&self, name: &str) -> Option<&Decl> {
        self.by_name.get(name).map(|id| self.decl(*id))
    }

    /// Declarations written in the source, in arena order.
    pub fn declared(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter().filter(|d| !d.is_instance())
    }

    /// Monomorphized instances.
    pub fn instances(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter().filter(|d| d.is_instance())
    }

    /// A newtype's underlying node, looking through nested newtypes.
    pub fn underlying<'a>(&'a self, node: &'a TypeNode) -> &'a TypeNode {
        let mut current = node;
        for _ in 0..self.decls.len() {
            match current
                .decl()
                .map(|id| &self.decl(id).kind)
            {
                Some(DeclKind::Identifier { underlying, .. }) => current = underlying,
                _ => break,
            }
        }
        current
    }

    /// Whether the node's default bit pattern can be tested structurally.
    pub fn zero_knowable(&self, node: &TypeNode) -> bool {
        match node {
            TypeNode::ExternalOpaque { .. } => false,
            TypeNode::Boxed { elem } => self.zero_knowable(elem),
            _ => true,
        }
    }
}
