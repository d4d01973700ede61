//! Code generation engine.
//!
//! Turns each resolved declaration into six trait impls: `Encodable`,
//! `Decodable`, `Marshaler`, `Unmarshaler`, `Sizer` and `IsDefault`.
//! Generic declarations get generic impls; their monomorphized instances
//! in the graph only serve resolution and are not emitted.

mod family;
mod interface;
mod node;
mod structs;

use crate::error::GenerateError;
use crate::graph::{decl_nodes, Decl, DeclId, DeclKind, ExternalBehavior, MapFlavor, TypeGraph, TypeNode};
use crate::resolver::{ResolvedType, ResolvedUnit};
use interface::InterfaceEmitter;
use node::NodeEmitter;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use std::collections::BTreeSet;
use structs::{newtype_bodies, StructEmitter};
use tracing::{debug, debug_span, warn};

/// Method bodies for one declaration.
pub(crate) struct Bodies {
    pub encode: TokenStream,
    pub marshal: TokenStream,
    pub decode: TokenStream,
    pub unmarshal: TokenStream,
    /// A `usize` expression.
    pub size: TokenStream,
    /// A `bool` expression.
    pub is_default: TokenStream,
}

/// Impls emitted for one declaration.
#[derive(Debug, Clone)]
pub struct GeneratedType {
    pub id: DeclId,
    pub name: String,
    pub generic: bool,
    pub impls: TokenStream,
}

/// Everything emitted for one unit.
#[derive(Debug, Default)]
pub struct GeneratedTypes {
    pub types: Vec<GeneratedType>,
    /// Types that could not be emitted. The rest of the unit is unaffected.
    pub errors: Vec<GenerateError>,
}

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Path of the runtime crate in emitted code.
    pub runtime: TokenStream,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            runtime: quote!(::packgen),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different path for the runtime, e.g. when it is re-exported.
    pub fn with_runtime(mut self, path: &syn::Path) -> Self {
        self.runtime = quote!(#path);
        self
    }
}

/// Emits impls for every resolved type of a unit.
pub struct Generator<'a> {
    graph: &'a TypeGraph,
    unit: &'a ResolvedUnit,
    config: GeneratorConfig,
}

impl<'a> Generator<'a> {
    pub fn new(graph: &'a TypeGraph, unit: &'a ResolvedUnit) -> Self {
        Self {
            graph,
            unit,
            config: GeneratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generate(&self) -> GeneratedTypes {
        let mut out = GeneratedTypes::default();
        for resolved in &self.unit.types {
            let decl = self.graph.decl(resolved.id);
            if decl.is_instance() {
                continue;
            }
            let span = debug_span!("generate", ty = %decl.name);
            let _enter = span.enter();
            match self.generate_type(decl, resolved) {
                Ok(generated) => out.types.push(generated),
                Err(e) => {
                    warn!("{e}");
                    out.errors.push(e);
                }
            }
        }
        debug!(
            generated = out.types.len(),
            failed = out.errors.len(),
            "generation finished"
        );
        out
    }

    fn generate_type(&self, decl: &'a Decl, resolved: &'a ResolvedType) -> Result<GeneratedType, GenerateError> {
        let emitter = NodeEmitter {
            graph: self.graph,
            options: self.unit.options,
            rt: &self.config.runtime,
            owner: &decl.name,
        };
        let bodies = match &decl.kind {
            DeclKind::Struct(_) => StructEmitter::new(&emitter, decl, resolved)?.bodies()?,
            DeclKind::Identifier { .. } => newtype_bodies(&emitter, decl, resolved)?,
            DeclKind::Interface { .. } => InterfaceEmitter::new(&emitter, decl)?.bodies()?,
            DeclKind::Pending => return Err(GenerateError::new(&decl.name, "declaration never resolved")),
        };
        Ok(GeneratedType {
            id: decl.id,
            name: decl.name.clone(),
            generic: decl.is_generic(),
            impls: self.impl_blocks(decl, bodies)?,
        })
    }

    fn impl_blocks(&self, decl: &Decl, bodies: Bodies) -> Result<TokenStream, GenerateError> {
        let rt = &self.config.runtime;
        let name: Ident = syn::parse_str(&decl.name)
            .map_err(|e| GenerateError::new(&decl.name, format!("not an identifier: {e}")))?;
        let mut generics = decl.generics.clone();
        for (param, flavor) in key_params(decl) {
            let param = Ident::new(&param, proc_macro2::Span::call_site());
            let bound: syn::WherePredicate = match flavor {
                MapFlavor::HashMap => syn::parse_quote!(#param: ::std::hash::Hash + ::std::cmp::Eq),
                MapFlavor::BTreeMap => syn::parse_quote!(#param: ::std::cmp::Ord),
            };
            generics.make_where_clause().predicates.push(bound);
        }
        let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
        let Bodies {
            encode,
            marshal,
            decode,
            unmarshal,
            size,
            is_default,
        } = bodies;
        let allow = quote!(#[allow(clippy::all, unused_mut, unused_assignments, unused_variables, unused_parens)]);

        Ok(quote! {
            #allow
            impl #impl_generics #rt::Encodable for #name #ty_generics #where_clause {
                fn encode_msg<__W: ::std::io::Write>(&self, w: &mut #rt::Writer<__W>) -> #rt::Result<()> {
                    #encode
                    Ok(())
                }
            }

            #allow
            impl #impl_generics #rt::Decodable for #name #ty_generics #where_clause {
                fn decode_msg<__R: ::std::io::Read>(&mut self, r: &mut #rt::Reader<__R>) -> #rt::Result<()> {
                    #decode
                    Ok(())
                }
            }

            #allow
            impl #impl_generics #rt::Marshaler for #name #ty_generics #where_clause {
                fn marshal_msg(&self, buf: &mut Vec<u8>) -> #rt::Result<()> {
                    #marshal
                    Ok(())
                }
            }

            #allow
            impl #impl_generics #rt::Unmarshaler for #name #ty_generics #where_clause {
                fn unmarshal_msg<'bts>(&mut self, bts: &'bts [u8]) -> #rt::Result<&'bts [u8]> {
                    let mut bts = bts;
                    #unmarshal
                    Ok(bts)
                }
            }

            #allow
            impl #impl_generics #rt::Sizer for #name #ty_generics #where_clause {
                fn msgsize(&self) -> usize {
                    #size
                }
            }

            #allow
            impl #impl_generics #rt::IsDefault for #name #ty_generics #where_clause {
                fn is_default(&self) -> bool {
                    #is_default
                }
            }
        })
    }
}

/// Generic parameters used as map keys, with the map flavor that needs
/// extra bounds on them.
fn key_params(decl: &Decl) -> BTreeSet<(String, MapFlavor)> {
    fn walk(node: &TypeNode, out: &mut BTreeSet<(String, MapFlavor)>) {
        match node {
            TypeNode::Map { flavor, key, value } => {
                if let TypeNode::GenericParameter { name, .. } = key.as_ref() {
                    out.insert((name.clone(), *flavor));
                }
                walk(key, out);
                walk(value, out);
            }
            TypeNode::Pointer { elem }
            | TypeNode::Boxed { elem }
            | TypeNode::Slice { elem }
            | TypeNode::Array { elem, .. } => walk(elem, out),
            TypeNode::GenericInstance { args, .. } => args.iter().for_each(|a| walk(a, out)),
            TypeNode::ExternalOpaque {
                behavior: ExternalBehavior::Shim { wire, .. },
                ..
            } => walk(wire, out),
            _ => {}
        }
    }

    let mut out = BTreeSet::new();
    for node in decl_nodes(decl) {
        walk(node, &mut out);
    }
    out
}
