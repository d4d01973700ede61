//! The type graph: declarations resolved into a closed arena of nodes.

mod builder;
mod generics;
mod types;

pub use builder::{BuildOutput, TypeGraphBuilder};
pub(crate) use builder::decl_nodes;
pub use types::{
    CapabilitySet, Decl, DeclId, DeclKind, ExternalBehavior, Field, GenericParam, IntWidth,
    MapFlavor, Primitive, StructNode, TypeGraph, TypeNode, Variant,
};
