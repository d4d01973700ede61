//! Per-node emission strategies.
//!
//! Every function here takes a [`TypeNode`] and an [`Access`] to the value
//! and returns tokens for one operation on it. Declared types and generic
//! parameters are never inlined: they delegate to the type's own trait
//! impl, which is what keeps recursive types finite.

use super::family::{local, Access, Family};
use crate::error::GenerateError;
use crate::graph::{
    CapabilitySet, DeclKind, ExternalBehavior, IntWidth, Primitive, TypeGraph, TypeNode,
};
use crate::resolver::{key_strategy, nullable_container, ContainerKind, KeyStrategy, UnitOptions};
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

type Emitted = Result<TokenStream, GenerateError>;

/// Field-scope settings that reach only the outermost node of a field.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Outer {
    /// Overrides the file limit for the outermost `Vec` or map.
    pub limit: Option<u32>,
    pub allownil: bool,
}

impl Outer {
    fn inner(self) -> Self {
        Outer {
            limit: self.limit,
            allownil: false,
        }
    }
}

pub(crate) struct NodeEmitter<'a> {
    pub graph: &'a TypeGraph,
    pub options: UnitOptions,
    pub rt: &'a TokenStream,
    /// Declaration being emitted, for diagnostics.
    pub owner: &'a str,
}

impl<'a> NodeEmitter<'a> {
    fn error(&self, message: impl Into<String>) -> GenerateError {
        GenerateError::new(self.owner, message)
    }

    /// `.map_err(..)` that prefixes errors with a structural path.
    pub fn wrap(&self, path: &[TokenStream]) -> TokenStream {
        if path.is_empty() {
            quote!()
        } else {
            quote!(.map_err(|e| e.prefixed([#(#path),*])))
        }
    }

    fn prefix(&self, path: &[TokenStream]) -> TokenStream {
        if path.is_empty() {
            quote!()
        } else {
            quote!(.prefixed([#(#path),*]))
        }
    }

    fn file_limit(&self, kind: ContainerKind) -> Option<u32> {
        match kind {
            ContainerKind::Array => self.options.limits.arrays,
            ContainerKind::Map => self.options.limits.maps,
            ContainerKind::Bin => None,
        }
    }

    fn container(&self, kind: ContainerKind) -> TokenStream {
        let rt = self.rt;
        match kind {
            ContainerKind::Map => quote!(#rt::Container::Map),
            _ => quote!(#rt::Container::Array),
        }
    }

    /// The newtype a node hands off to, when it should be inlined so a
    /// field limit reaches the wrapped container.
    fn inlined_newtype(&self, node: &TypeNode, outer: Outer) -> Option<&'a TypeNode> {
        outer.limit?;
        match &self.graph.decl(node.decl()?).kind {
            DeclKind::Identifier { underlying, .. } => Some(underlying),
            _ => None,
        }
    }

    fn conversion(&self, fallible: bool, wrap: &TokenStream) -> TokenStream {
        let rt = self.rt;
        if fallible {
            quote!(.map_err(#rt::Error::conversion) #wrap ?)
        } else {
            quote!()
        }
    }

    // ---- encode and marshal ----

    pub fn encode(
        &self,
        fam: Family,
        node: &TypeNode,
        v: &Access,
        path: &[TokenStream],
        outer: Outer,
        depth: usize,
    ) -> Emitted {
        let rt = self.rt;
        if let Some(underlying) = self.inlined_newtype(node, outer) {
            return self.encode(fam, underlying, &v.member(&zero_member()), path, outer, depth);
        }
        Ok(match node {
            TypeNode::Primitive { prim } => self.encode_primitive(fam, *prim, v),
            TypeNode::Pointer { elem } => {
                let inner = local("v", depth);
                let some = self.encode(
                    fam,
                    elem,
                    &Access::binding(inner.clone()),
                    path,
                    outer.inner(),
                    depth + 1,
                )?;
                let none = match nullable_container(self.graph, elem) {
                    Some(kind) if !outer.allownil => self.empty_container(fam, kind),
                    _ => fam.write(rt, "nil", quote!()),
                };
                let target = v.by_ref();
                quote! {
                    match #target {
                        Some(#inner) => { #some }
                        None => { #none }
                    }
                }
            }
            TypeNode::Boxed { elem } => {
                let inner = local("b", depth);
                let body = self.encode(fam, elem, &Access::binding(inner.clone()), path, outer, depth + 1)?;
                let target = v.deref();
                quote! {{
                    let #inner = &*#target;
                    #body
                }}
            }
            TypeNode::Slice { elem } => {
                let e = local("e", depth);
                let i = local("i", depth);
                let mut elem_path = path.to_vec();
                elem_path.push(quote!(#rt::PathSegment::Index(#i)));
                let body = self.encode(fam, elem, &Access::binding(e.clone()), &elem_path, Outer::default(), depth + 1)?;
                let recv = v.recv();
                let check = self.encode_limit(ContainerKind::Array, outer.limit, &recv, path);
                let header = fam.write(rt, "array_header", quote!(#recv.len() as u32));
                let each = self.each(&i, quote!(#e), &recv);
                quote! {
                    #check
                    #header
                    for #each {
                        #body
                    }
                }
            }
            TypeNode::Array { elem, len } => {
                let e = local("e", depth);
                let i = local("i", depth);
                let mut elem_path = path.to_vec();
                elem_path.push(quote!(#rt::PathSegment::Index(#i)));
                let body = self.encode(fam, elem, &Access::binding(e.clone()), &elem_path, Outer::default(), depth + 1)?;
                let recv = v.recv();
                let header = fam.write(rt, "array_header", u32_lit(*len, self)?);
                let each = self.each(&i, quote!(#e), &recv);
                quote! {
                    #header
                    for #each {
                        #body
                    }
                }
            }
            TypeNode::Map { key, value, .. } => {
                let k = local("k", depth);
                let val = local("v", depth);
                let i = local("i", depth);
                let mut entry_path = path.to_vec();
                entry_path.push(quote!(#rt::PathSegment::Entry(#i)));
                let key_code = self.encode_key(fam, key, &k, depth)?;
                let value_code = self.encode(fam, value, &Access::binding(val.clone()), &entry_path, Outer::default(), depth + 1)?;
                let recv = v.recv();
                let check = self.encode_limit(ContainerKind::Map, outer.limit, &recv, path);
                let header = fam.write(rt, "map_header", quote!(#recv.len() as u32));
                let each = self.each(&i, quote!((#k, #val)), &recv);
                quote! {
                    #check
                    #header
                    for #each {
                        #key_code
                        #value_code
                    }
                }
            }
            TypeNode::Declared { .. }
            | TypeNode::GenericInstance { .. }
            | TypeNode::GenericParameter { .. } => fam.delegate(rt, v.by_ref(), &quote!()),
            TypeNode::ExternalOpaque {
                path: ext,
                behavior,
                capabilities,
            } => self.encode_external(fam, ext, behavior, *capabilities, v, path, depth)?,
        })
    }

    fn encode_primitive(&self, fam: Family, prim: Primitive, v: &Access) -> TokenStream {
        let val = v.deref();
        let (op, arg) = match prim {
            Primitive::Bool => ("bool", val),
            Primitive::Int(_) => ("int", quote!(#val as i64)),
            Primitive::Uint(_) => ("uint", quote!(#val as u64)),
            Primitive::F32 => ("f32", val),
            Primitive::F64 if self.options.compact_floats => ("f64_compact", val),
            Primitive::F64 => ("f64", val),
            Primitive::Char => ("char", val),
            Primitive::String => ("str", v.by_ref()),
            Primitive::Bytes | Primitive::ByteArray(_) => ("bin", v.by_ref()),
            Primitive::Complex64 => ("complex64", val),
            Primitive::Complex128 => ("complex128", val),
            Primitive::Time if self.options.new_time => ("timestamp", val),
            Primitive::Time => ("time", val),
            Primitive::Duration => ("duration", val),
        };
        fam.write(self.rt, op, arg)
    }

    fn empty_container(&self, fam: Family, kind: ContainerKind) -> TokenStream {
        match kind {
            ContainerKind::Array => fam.write(self.rt, "array_header", quote!(0)),
            ContainerKind::Map => fam.write(self.rt, "map_header", quote!(0)),
            ContainerKind::Bin => fam.write(self.rt, "bin", quote!(&[])),
        }
    }

    /// Loop head over a container. Limit errors name the element, so the
    /// index is only bound when marshal-time limits are on.
    fn each(&self, i: &proc_macro2::Ident, pat: TokenStream, recv: &TokenStream) -> TokenStream {
        if self.options.limits.marshal {
            quote!((#i, #pat) in #recv.iter().enumerate())
        } else {
            quote!(#pat in #recv.iter())
        }
    }

    fn encode_limit(
        &self,
        kind: ContainerKind,
        outer: Option<u32>,
        recv: &TokenStream,
        path: &[TokenStream],
    ) -> TokenStream {
        if !self.options.limits.marshal {
            return quote!();
        }
        let Some(limit) = outer.or_else(|| self.file_limit(kind)) else {
            return quote!();
        };
        let rt = self.rt;
        let container = self.container(kind);
        let limit = Literal::u32_unsuffixed(limit);
        let prefix = self.prefix(path);
        quote! {
            if #recv.len() > #limit {
                return Err(#rt::Error::limit_exceeded(#container, #recv.len() as u32, #limit) #prefix);
            }
        }
    }

    fn encode_key(&self, fam: Family, key: &TypeNode, k: &proc_macro2::Ident, depth: usize) -> Emitted {
        let rt = self.rt;
        let newtype = matches!(key, TypeNode::Declared { .. });
        Ok(match key_strategy(self.graph, key, self.options.map_keys) {
            KeyStrategy::Native if newtype => fam.write(rt, "str", quote!(&#k.0)),
            KeyStrategy::Native => fam.write(rt, "str", quote!(#k)),
            KeyStrategy::BinaryKey if newtype => fam.write(rt, "bin", quote!(&#k.0)),
            KeyStrategy::BinaryKey => fam.write(rt, "bin", quote!(#k)),
            KeyStrategy::ShimmedKey => {
                let (encode, fallible, op) = self.key_shim(key)?;
                let t = local("t", depth);
                let conv = self.conversion(fallible, &quote!());
                let write = fam.write(rt, op, quote!(&#t));
                quote! {
                    let #t = #encode(#k) #conv;
                    #write
                }
            }
            KeyStrategy::AutoShimmedKey => {
                fam.write(rt, "str", quote!(&#rt::MapKey::to_key(#k)))
            }
            KeyStrategy::Unsupported => {
                return Err(self.error(format!("no key strategy for `{key}`")))
            }
        })
    }

    /// Encoder, fallibility and wire op of a shimmed key type.
    fn key_shim(&self, key: &TypeNode) -> Result<(syn::Path, bool, &'static str), GenerateError> {
        match key {
            TypeNode::ExternalOpaque {
                behavior:
                    ExternalBehavior::Shim {
                        wire,
                        encode,
                        fallible,
                        ..
                    },
                ..
            } => {
                let op = match wire.as_ref() {
                    TypeNode::Primitive {
                        prim: Primitive::String,
                    } => "str",
                    _ => "bin",
                };
                Ok((encode.clone(), *fallible, op))
            }
            other => Err(self.error(format!("`{other}` is not a shimmed key"))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_external(
        &self,
        fam: Family,
        ext: &str,
        behavior: &ExternalBehavior,
        caps: CapabilitySet,
        v: &Access,
        path: &[TokenStream],
        depth: usize,
    ) -> Emitted {
        let rt = self.rt;
        let t = local("t", depth);
        let value = v.by_ref();
        Ok(match behavior {
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::FULL) => {
                fam.delegate(rt, value, &quote!())
            }
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::BINARY_APPEND) => {
                let write = fam.write(rt, "bin", quote!(&#t));
                quote! {
                    let mut #t = Vec::new();
                    #rt::BinaryAppend::append_binary(#value, &mut #t).map_err(#rt::Error::conversion)?;
                    #write
                }
            }
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::BINARY) => {
                let write = fam.write(rt, "bin", quote!(&#t));
                quote! {
                    let #t = #rt::BinaryMarshal::marshal_binary(#value).map_err(#rt::Error::conversion)?;
                    #write
                }
            }
            ExternalBehavior::Capabilities
                if caps.intersects(CapabilitySet::TEXT | CapabilitySet::TEXT_STRING) =>
            {
                let write = if caps.contains(CapabilitySet::TEXT_STRING) {
                    fam.write(rt, "str", quote!(&#t))
                } else {
                    fam.write(rt, "bin", quote!(#t.as_bytes()))
                };
                quote! {
                    let #t = #rt::TextMarshal::marshal_text(#value).map_err(#rt::Error::conversion)?;
                    #write
                }
            }
            ExternalBehavior::Capabilities => {
                return Err(self.error(format!("`{ext}` has no encoding capability")))
            }
            ExternalBehavior::Replace { with } => {
                let delegate = fam.delegate(rt, quote!(&#t), &quote!());
                quote! {
                    let #t: #with = ::std::convert::From::from(#value);
                    #delegate
                }
            }
            ExternalBehavior::Shim {
                wire,
                encode,
                fallible,
                ..
            } => {
                let conv = self.conversion(*fallible, &quote!());
                let body = self.encode(fam, wire, &Access::place(quote!(#t)), path, Outer::default(), depth + 1)?;
                quote! {
                    let #t = #encode(#value) #conv;
                    #body
                }
            }
            ExternalBehavior::Intercept { using } => fam.intercept(rt, using, value, &quote!()),
        })
    }

    // ---- decode and unmarshal ----

    pub fn decode(
        &self,
        fam: Family,
        node: &TypeNode,
        p: &Access,
        path: &[TokenStream],
        outer: Outer,
        depth: usize,
    ) -> Emitted {
        let rt = self.rt;
        let wrap = self.wrap(path);
        if let Some(underlying) = self.inlined_newtype(node, outer) {
            return self.decode(fam, underlying, &p.member(&zero_member()), path, outer, depth);
        }
        Ok(match node {
            TypeNode::Primitive { prim } => self.decode_primitive(fam, *prim, p, &wrap),
            TypeNode::Pointer { elem } => {
                let nil = fam.read(rt, "try_read_nil");
                let target = p.deref();
                let on_nil = match nullable_container(self.graph, elem) {
                    Some(_) if !outer.allownil => quote!(#target = Some(Default::default());),
                    _ => quote!(#target = None;),
                };
                let inner = local("p", depth);
                let body = self.decode(
                    fam,
                    elem,
                    &Access::binding(inner.clone()),
                    path,
                    outer.inner(),
                    depth + 1,
                )?;
                let recv = p.recv();
                let fill = match self.slot(elem) {
                    Some(slot) => quote!(|| #slot),
                    None => quote!(Default::default),
                };
                quote! {
                    if #nil #wrap ? {
                        #on_nil
                    } else {
                        let #inner = #recv.get_or_insert_with(#fill);
                        #body
                    }
                }
            }
            TypeNode::Boxed { elem } => {
                let inner = local("b", depth);
                let body = self.decode(fam, elem, &Access::binding(inner.clone()), path, outer, depth + 1)?;
                let target = p.deref();
                quote! {{
                    let #inner = &mut *#target;
                    #body
                }}
            }
            TypeNode::Slice { elem } => {
                let n = local("n", depth);
                let i = local("i", depth);
                let e = local("e", depth);
                let mut elem_path = path.to_vec();
                elem_path.push(quote!(#rt::PathSegment::Index(#i)));
                let body = self.decode(fam, elem, &Access::binding(e.clone()), &elem_path, Outer::default(), depth + 1)?;
                let nil = fam.read(rt, "try_read_nil");
                let header = fam.read(rt, "read_array_header");
                let check = self.decode_limit(ContainerKind::Array, outer.limit, &n, path);
                let guard = self.guard(fam, &n, &wrap);
                let recv = p.recv();
                let fresh = self.slot(elem).unwrap_or_else(|| quote!(Default::default()));
                let reserve = if fam.is_buffer() {
                    quote!(#recv.reserve(#n as usize);)
                } else {
                    quote!()
                };
                quote! {
                    if #nil #wrap ? {
                        #recv.clear();
                    } else {
                        let #n = #header #wrap ?;
                        #check
                        #guard
                        #recv.clear();
                        #reserve
                        for #i in 0..#n as usize {
                            #recv.push(#fresh);
                            let #e = &mut #recv[#i];
                            #body
                        }
                    }
                }
            }
            TypeNode::Array { elem, len } => {
                let n = local("n", depth);
                let i = local("i", depth);
                let e = local("e", depth);
                let mut elem_path = path.to_vec();
                elem_path.push(quote!(#rt::PathSegment::Index(#i)));
                let body = self.decode(fam, elem, &Access::binding(e.clone()), &elem_path, Outer::default(), depth + 1)?;
                let header = fam.read(rt, "read_array_header");
                let len = u32_lit(*len, self)?;
                let prefix = self.prefix(path);
                let recv = p.recv();
                quote! {
                    let #n = #header #wrap ?;
                    if #n != #len {
                        return Err(#rt::Error::arity(#len, #n) #prefix);
                    }
                    for (#i, #e) in #recv.iter_mut().enumerate() {
                        #body
                    }
                }
            }
            TypeNode::Map { key, value, .. } => {
                let n = local("n", depth);
                let i = local("i", depth);
                let k = local("k", depth);
                let e = local("e", depth);
                let mut entry_path = path.to_vec();
                entry_path.push(quote!(#rt::PathSegment::Entry(#i)));
                let key_code = self.decode_key(fam, key, &k, &self.wrap(&entry_path), depth)?;
                let body = self.decode(fam, value, &Access::binding(e.clone()), &entry_path, Outer::default(), depth + 1)?;
                let nil = fam.read(rt, "try_read_nil");
                let header = fam.read(rt, "read_map_header");
                let check = self.decode_limit(ContainerKind::Map, outer.limit, &n, path);
                let guard = self.guard(fam, &n, &wrap);
                let recv = p.recv();
                let insert = match self.slot(value) {
                    Some(slot) => quote!(or_insert_with(|| #slot)),
                    None => quote!(or_default()),
                };
                quote! {
                    if #nil #wrap ? {
                        #recv.clear();
                    } else {
                        let #n = #header #wrap ?;
                        #check
                        #guard
                        #recv.clear();
                        for #i in 0..#n as usize {
                            #key_code
                            let #e = #recv.entry(#k).#insert;
                            #body
                        }
                    }
                }
            }
            TypeNode::Declared { .. }
            | TypeNode::GenericInstance { .. }
            | TypeNode::GenericParameter { .. } => fam.delegate(rt, p.by_mut(), &wrap),
            TypeNode::ExternalOpaque {
                path: ext,
                behavior,
                capabilities,
            } => self.decode_external(fam, ext, behavior, *capabilities, p, path, depth)?,
        })
    }

    fn decode_primitive(&self, fam: Family, prim: Primitive, p: &Access, wrap: &TokenStream) -> TokenStream {
        if let Primitive::ByteArray(_) = prim {
            let read = fam.read_with(self.rt, "read_bin_exact", p.by_mut());
            return quote!(#read #wrap ?;);
        }
        let read = fam.read(self.rt, read_op(prim));
        let target = p.deref();
        quote!(#target = #read #wrap ?;)
    }

    /// Initial value of a decode slot for types without `Default`.
    /// `None` means `Default::default()` will do.
    fn slot(&self, node: &TypeNode) -> Option<TokenStream> {
        match node {
            TypeNode::Primitive {
                prim: Primitive::Time,
            } => Some(quote!(::std::time::UNIX_EPOCH)),
            TypeNode::Boxed { elem } => {
                let inner = self.slot(elem)?;
                Some(quote!(Box::new(#inner)))
            }
            TypeNode::Array { elem, .. } => {
                let inner = self.slot(elem)?;
                Some(quote!(::std::array::from_fn(|_| #inner)))
            }
            _ => None,
        }
    }

    fn guard(&self, fam: Family, n: &proc_macro2::Ident, wrap: &TokenStream) -> TokenStream {
        let rt = self.rt;
        if fam.is_buffer() {
            quote!(#rt::bytes::guard_count(bts, #n) #wrap ?;)
        } else {
            quote!()
        }
    }

    fn decode_limit(
        &self,
        kind: ContainerKind,
        outer: Option<u32>,
        n: &proc_macro2::Ident,
        path: &[TokenStream],
    ) -> TokenStream {
        let Some(limit) = outer.or_else(|| self.file_limit(kind)) else {
            return quote!();
        };
        let rt = self.rt;
        let container = self.container(kind);
        let limit = Literal::u32_unsuffixed(limit);
        let prefix = self.prefix(path);
        quote! {
            if #n > #limit {
                return Err(#rt::Error::limit_exceeded(#container, #n, #limit) #prefix);
            }
        }
    }

    fn decode_key(
        &self,
        fam: Family,
        key: &TypeNode,
        k: &proc_macro2::Ident,
        wrap: &TokenStream,
        depth: usize,
    ) -> Emitted {
        let rt = self.rt;
        let newtype = match key {
            TypeNode::Declared { name, .. } => Some(self.path_of(name)?),
            _ => None,
        };
        Ok(match key_strategy(self.graph, key, self.options.map_keys) {
            KeyStrategy::Native => {
                let read = fam.read(rt, "read_map_key");
                match newtype {
                    Some(ty) => quote!(let #k = #ty(#read #wrap ?);),
                    None => quote!(let #k = #read #wrap ?;),
                }
            }
            KeyStrategy::BinaryKey => {
                let len = match self.graph.underlying(key) {
                    TypeNode::Primitive {
                        prim: Primitive::ByteArray(len),
                    } => Literal::usize_unsuffixed(*len),
                    other => return Err(self.error(format!("`{other}` is not a byte array key"))),
                };
                let read = fam.read_with(rt, "read_bin_exact", quote!(&mut #k));
                let wrapped = newtype.map(|ty| quote!(let #k = #ty(#k);));
                quote! {
                    let mut #k = [0u8; #len];
                    #read #wrap ?;
                    #wrapped
                }
            }
            KeyStrategy::ShimmedKey => {
                let (decode, fallible, op) = match key {
                    TypeNode::ExternalOpaque {
                        behavior:
                            ExternalBehavior::Shim {
                                wire,
                                decode,
                                fallible,
                                ..
                            },
                        ..
                    } => {
                        let op = match wire.as_ref() {
                            TypeNode::Primitive {
                                prim: Primitive::String,
                            } => "read_map_key",
                            _ => "read_bytes",
                        };
                        (decode, *fallible, op)
                    }
                    other => return Err(self.error(format!("`{other}` is not a shimmed key"))),
                };
                let t = local("t", depth);
                let read = fam.read(rt, op);
                let conv = self.conversion(fallible, wrap);
                quote! {
                    let #t = #read #wrap ?;
                    let #k = #decode(#t) #conv;
                }
            }
            KeyStrategy::AutoShimmedKey => {
                let read = fam.read(rt, "read_map_key");
                let parse = match type_tokens(key) {
                    Some(ty) => quote!(<#ty as #rt::MapKey>::from_key),
                    None => quote!(#rt::MapKey::from_key),
                };
                quote!(let #k = #parse(&#read #wrap ?) #wrap ?;)
            }
            KeyStrategy::Unsupported => {
                return Err(self.error(format!("no key strategy for `{key}`")))
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_external(
        &self,
        fam: Family,
        ext: &str,
        behavior: &ExternalBehavior,
        caps: CapabilitySet,
        p: &Access,
        path: &[TokenStream],
        depth: usize,
    ) -> Emitted {
        let rt = self.rt;
        let wrap = self.wrap(path);
        let t = local("t", depth);
        let place = p.by_mut();
        let target = p.deref();
        Ok(match behavior {
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::FULL) => {
                fam.delegate(rt, place, &wrap)
            }
            ExternalBehavior::Capabilities
                if caps.intersects(CapabilitySet::BINARY | CapabilitySet::BINARY_APPEND) =>
            {
                let read = fam.read(rt, "read_bytes");
                quote! {
                    let #t = #read #wrap ?;
                    #rt::BinaryMarshal::unmarshal_binary(#place, &#t)
                        .map_err(#rt::Error::conversion) #wrap ?;
                }
            }
            ExternalBehavior::Capabilities
                if caps.intersects(CapabilitySet::TEXT | CapabilitySet::TEXT_STRING) =>
            {
                let read = fam.read(rt, "read_text");
                quote! {
                    let #t = #read #wrap ?;
                    #rt::TextMarshal::unmarshal_text(#place, &#t)
                        .map_err(#rt::Error::conversion) #wrap ?;
                }
            }
            ExternalBehavior::Capabilities => {
                return Err(self.error(format!("`{ext}` has no decoding capability")))
            }
            ExternalBehavior::Replace { with } => {
                let delegate = fam.delegate(rt, quote!(&mut #t), &wrap);
                quote! {
                    let mut #t: #with = Default::default();
                    #delegate
                    #target = ::std::convert::From::from(#t);
                }
            }
            ExternalBehavior::Shim {
                wire,
                wire_ty,
                decode,
                fallible,
                ..
            } => {
                let body = self.decode(fam, wire, &Access::place(quote!(#t)), path, Outer::default(), depth + 1)?;
                let conv = self.conversion(*fallible, &wrap);
                let fresh = self.slot(wire).unwrap_or_else(|| quote!(Default::default()));
                quote! {
                    let mut #t: #wire_ty = #fresh;
                    #body
                    #target = #decode(#t) #conv;
                }
            }
            ExternalBehavior::Intercept { using } => fam.intercept(rt, using, place, &wrap),
        })
    }

    // ---- size ----

    /// Worst-case encoded size of the value, as a `usize` expression.
    pub fn size(&self, node: &TypeNode, v: &Access, outer: Outer, depth: usize) -> Emitted {
        let rt = self.rt;
        if let Some(fixed) = self.fixed_size(node) {
            return Ok(fixed);
        }
        if let Some(underlying) = self.inlined_newtype(node, outer) {
            return self.size(underlying, &v.member(&zero_member()), outer, depth);
        }
        Ok(match node {
            TypeNode::Primitive { prim } => {
                let recv = v.recv();
                match prim {
                    Primitive::String => quote!(#rt::size::STR_PREFIX + #recv.len()),
                    _ => quote!(#rt::size::BIN_PREFIX + #recv.len()),
                }
            }
            TypeNode::Pointer { elem } => {
                let inner = local("v", depth);
                let some = self.size(elem, &Access::binding(inner.clone()), outer.inner(), depth + 1)?;
                let none = match nullable_container(self.graph, elem) {
                    Some(ContainerKind::Array) if !outer.allownil => quote!(#rt::size::ARRAY_HEADER),
                    Some(ContainerKind::Map) if !outer.allownil => quote!(#rt::size::MAP_HEADER),
                    Some(ContainerKind::Bin) if !outer.allownil => quote!(#rt::size::BIN_PREFIX),
                    _ => quote!(#rt::size::NIL),
                };
                let target = v.by_ref();
                quote! {
                    match #target {
                        Some(#inner) => #some,
                        None => #none,
                    }
                }
            }
            TypeNode::Boxed { elem } => {
                let inner = local("b", depth);
                let body = self.size(elem, &Access::binding(inner.clone()), outer, depth + 1)?;
                let target = v.deref();
                quote! {{
                    let #inner = &*#target;
                    #body
                }}
            }
            TypeNode::Slice { elem } | TypeNode::Array { elem, .. } => {
                let recv = v.recv();
                let count = match node {
                    TypeNode::Array { len, .. } => {
                        let len = Literal::usize_unsuffixed(*len);
                        quote!(#len)
                    }
                    _ => quote!(#recv.len()),
                };
                match self.fixed_size(elem) {
                    Some(each) => quote!(#rt::size::ARRAY_HEADER + #count * (#each)),
                    None => {
                        let e = local("e", depth);
                        let each = self.size(elem, &Access::binding(e.clone()), Outer::default(), depth + 1)?;
                        quote!(#rt::size::ARRAY_HEADER + #recv.iter().map(|#e| #each).sum::<usize>())
                    }
                }
            }
            TypeNode::Map { key, value, .. } => {
                let k = local("k", depth);
                let val = local("v", depth);
                let key_size = self.key_size(key, &k)?;
                let value_size = self.size(value, &Access::binding(val.clone()), Outer::default(), depth + 1)?;
                let recv = v.recv();
                quote! {
                    #rt::size::MAP_HEADER
                        + #recv.iter().map(|(#k, #val)| #key_size + #value_size).sum::<usize>()
                }
            }
            TypeNode::Declared { .. }
            | TypeNode::GenericInstance { .. }
            | TypeNode::GenericParameter { .. } => {
                let target = v.by_ref();
                quote!(#rt::Sizer::msgsize(#target))
            }
            TypeNode::ExternalOpaque {
                path,
                behavior,
                capabilities,
            } => self.external_size(path, behavior, *capabilities, v, depth)?,
        })
    }

    /// Size of a node whose encoding never varies.
    fn fixed_size(&self, node: &TypeNode) -> Option<TokenStream> {
        let rt = self.rt;
        match node {
            TypeNode::Primitive { prim } => Some(match prim {
                Primitive::Bool => quote!(#rt::size::BOOL),
                Primitive::Int(_) => quote!(#rt::size::INT),
                Primitive::Uint(_) => quote!(#rt::size::UINT),
                Primitive::F32 => quote!(#rt::size::F32),
                Primitive::F64 => quote!(#rt::size::F64),
                Primitive::Char => quote!(#rt::size::CHAR),
                Primitive::ByteArray(n) => {
                    let n = Literal::usize_unsuffixed(*n);
                    quote!(#rt::size::BIN_PREFIX + #n)
                }
                Primitive::Complex64 => quote!(#rt::size::COMPLEX64),
                Primitive::Complex128 => quote!(#rt::size::COMPLEX128),
                Primitive::Time => quote!(#rt::size::TIME),
                Primitive::Duration => quote!(#rt::size::DURATION),
                Primitive::String | Primitive::Bytes => return None,
            }),
            TypeNode::Array { elem, len } => {
                let each = self.fixed_size(elem)?;
                let len = Literal::usize_unsuffixed(*len);
                Some(quote!(#rt::size::ARRAY_HEADER + #len * (#each)))
            }
            _ => None,
        }
    }

    fn key_size(&self, key: &TypeNode, k: &proc_macro2::Ident) -> Emitted {
        let rt = self.rt;
        let newtype = matches!(key, TypeNode::Declared { .. });
        Ok(match key_strategy(self.graph, key, self.options.map_keys) {
            KeyStrategy::Native if newtype => quote!(#rt::size::STR_PREFIX + #k.0.len()),
            KeyStrategy::Native => quote!(#rt::size::STR_PREFIX + #k.len()),
            KeyStrategy::BinaryKey => match self.graph.underlying(key) {
                TypeNode::Primitive {
                    prim: Primitive::ByteArray(n),
                } => {
                    let n = Literal::usize_unsuffixed(*n);
                    quote!(#rt::size::BIN_PREFIX + #n)
                }
                other => return Err(self.error(format!("`{other}` is not a byte array key"))),
            },
            KeyStrategy::ShimmedKey => {
                let (encode, fallible, _) = self.key_shim(key)?;
                if fallible {
                    quote!(#rt::size::STR_PREFIX + #encode(#k).map_or(0, |__t| __t.len()))
                } else {
                    quote!(#rt::size::STR_PREFIX + #encode(#k).len())
                }
            }
            KeyStrategy::AutoShimmedKey => {
                quote!(#rt::size::STR_PREFIX + #rt::MapKey::to_key(#k).len())
            }
            KeyStrategy::Unsupported => {
                return Err(self.error(format!("no key strategy for `{key}`")))
            }
        })
    }

    fn external_size(
        &self,
        path: &str,
        behavior: &ExternalBehavior,
        caps: CapabilitySet,
        v: &Access,
        depth: usize,
    ) -> Emitted {
        let rt = self.rt;
        let t = local("t", depth);
        let value = v.by_ref();
        Ok(match behavior {
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::FULL) => {
                quote!(#rt::Sizer::msgsize(#value))
            }
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::BINARY_APPEND) => {
                quote! {{
                    let mut #t = Vec::new();
                    match #rt::BinaryAppend::append_binary(#value, &mut #t) {
                        Ok(()) => #rt::size::BIN_PREFIX + #t.len(),
                        Err(_) => #rt::size::BIN_PREFIX,
                    }
                }}
            }
            ExternalBehavior::Capabilities if caps.contains(CapabilitySet::BINARY) => {
                quote! {
                    #rt::size::BIN_PREFIX
                        + #rt::BinaryMarshal::marshal_binary(#value).map_or(0, |#t| #t.len())
                }
            }
            ExternalBehavior::Capabilities
                if caps.intersects(CapabilitySet::TEXT | CapabilitySet::TEXT_STRING) =>
            {
                quote! {
                    #rt::size::STR_PREFIX
                        + #rt::TextMarshal::marshal_text(#value).map_or(0, |#t| #t.len())
                }
            }
            ExternalBehavior::Capabilities => {
                return Err(self.error(format!("`{path}` has no encoding capability")))
            }
            ExternalBehavior::Replace { with } => quote! {{
                let #t: #with = ::std::convert::From::from(#value);
                #rt::Sizer::msgsize(&#t)
            }},
            ExternalBehavior::Shim {
                wire,
                encode,
                fallible,
                ..
            } => {
                let body = self.size(wire, &Access::place(quote!(#t)), Outer::default(), depth + 1)?;
                if *fallible {
                    quote! {
                        match #encode(#value) {
                            Ok(#t) => #body,
                            Err(_) => 0,
                        }
                    }
                } else {
                    quote! {{
                        let #t = #encode(#value);
                        #body
                    }}
                }
            }
            ExternalBehavior::Intercept { using } => {
                quote!(#rt::Interceptor::msgsize(&#using, #value))
            }
        })
    }

    // ---- zero tests ----

    /// Structural zero test, as a `bool` expression.
    pub fn is_zero(&self, node: &TypeNode, v: &Access, allownil: bool, depth: usize) -> TokenStream {
        let rt = self.rt;
        let val = v.deref();
        let recv = v.recv();
        match node {
            TypeNode::Primitive { prim } => match prim {
                Primitive::Bool => quote!(!#val),
                Primitive::Int(_) | Primitive::Uint(_) => quote!(#val == 0),
                Primitive::F32 | Primitive::F64 => quote!(#val == 0.0),
                Primitive::Char => quote!(#val == '\0'),
                Primitive::String | Primitive::Bytes => quote!(#recv.is_empty()),
                Primitive::ByteArray(n) => {
                    let empty = *n == 0;
                    quote!(#empty)
                }
                Primitive::Complex64
                | Primitive::Complex128
                | Primitive::Time
                | Primitive::Duration => {
                    let target = v.by_ref();
                    quote!(#rt::IsDefault::is_default(#target))
                }
            },
            TypeNode::Pointer { elem } => match nullable_container(self.graph, elem) {
                Some(_) if !allownil => {
                    let inner = local("v", depth);
                    let test = self.is_zero(elem, &Access::binding(inner.clone()), false, depth + 1);
                    quote!(#recv.as_ref().map_or(true, |#inner| #test))
                }
                _ => quote!(#recv.is_none()),
            },
            TypeNode::Boxed { elem } => {
                let inner = local("b", depth);
                let test = self.is_zero(elem, &Access::binding(inner.clone()), allownil, depth + 1);
                quote! {{
                    let #inner = &*#val;
                    #test
                }}
            }
            TypeNode::Slice { .. } | TypeNode::Map { .. } => quote!(#recv.is_empty()),
            TypeNode::Array { len, .. } => {
                let empty = *len == 0;
                quote!(#empty)
            }
            TypeNode::Declared { .. }
            | TypeNode::GenericInstance { .. }
            | TypeNode::GenericParameter { .. } => {
                let target = v.by_ref();
                quote!(#rt::IsDefault::is_default(#target))
            }
            TypeNode::ExternalOpaque { .. } => quote!(false),
        }
    }

    /// A user-defined test through `IsZero` or `IsEmpty`, looking through
    /// `Option` and `Box`.
    pub fn custom_test(&self, node: &TypeNode, v: &Access, empty: bool, depth: usize) -> TokenStream {
        let rt = self.rt;
        match node {
            TypeNode::Pointer { elem } => {
                let inner = local("v", depth);
                let test = self.custom_test(elem, &Access::binding(inner.clone()), empty, depth + 1);
                let recv = v.recv();
                quote!(#recv.as_ref().map_or(true, |#inner| #test))
            }
            TypeNode::Boxed { elem } => {
                let inner = local("b", depth);
                let test = self.custom_test(elem, &Access::binding(inner.clone()), empty, depth + 1);
                let target = v.deref();
                quote! {{
                    let #inner = &*#target;
                    #test
                }}
            }
            _ => {
                let target = v.by_ref();
                if empty {
                    quote!(#rt::IsEmpty::is_empty_value(#target))
                } else {
                    quote!(#rt::IsZero::is_zero(#target))
                }
            }
        }
    }

    /// Parses a declaration name into a path.
    pub fn path_of(&self, name: &str) -> Result<syn::Path, GenerateError> {
        syn::parse_str(name).map_err(|e| self.error(format!("`{name}` is not a path: {e}")))
    }
}

fn zero_member() -> syn::Member {
    syn::Member::Unnamed(syn::Index::from(0))
}

fn u32_lit(n: usize, emitter: &NodeEmitter<'_>) -> Emitted {
    let n = u32::try_from(n).map_err(|_| emitter.error(format!("array length {n} exceeds u32")))?;
    let lit = Literal::u32_unsuffixed(n);
    Ok(quote!(#lit))
}

fn read_op(prim: Primitive) -> &'static str {
    match prim {
        Primitive::Bool => "read_bool",
        Primitive::Int(IntWidth::W8) => "read_i8",
        Primitive::Int(IntWidth::W16) => "read_i16",
        Primitive::Int(IntWidth::W32) => "read_i32",
        Primitive::Int(IntWidth::W64) => "read_i64",
        Primitive::Int(IntWidth::Size) => "read_isize",
        Primitive::Uint(IntWidth::W8) => "read_u8",
        Primitive::Uint(IntWidth::W16) => "read_u16",
        Primitive::Uint(IntWidth::W32) => "read_u32",
        Primitive::Uint(IntWidth::W64) => "read_u64",
        Primitive::Uint(IntWidth::Size) => "read_usize",
        Primitive::F32 => "read_f32",
        Primitive::F64 => "read_f64",
        Primitive::Char => "read_char",
        Primitive::String => "read_string",
        Primitive::Bytes | Primitive::ByteArray(_) => "read_bytes",
        Primitive::Complex64 => "read_complex64",
        Primitive::Complex128 => "read_complex128",
        Primitive::Time => "read_time",
        Primitive::Duration => "read_duration",
    }
}

/// Rust type tokens for key types that can be named without context.
fn type_tokens(node: &TypeNode) -> Option<TokenStream> {
    match node {
        TypeNode::Primitive { prim } => {
            let name = match prim {
                Primitive::Bool | Primitive::Int(_) | Primitive::Uint(_) | Primitive::Char => {
                    prim.to_string()
                }
                _ => return None,
            };
            let ident = format_ident!("{}", name);
            Some(quote!(#ident))
        }
        TypeNode::GenericParameter { name, .. } => {
            let ident = format_ident!("{}", name);
            Some(quote!(#ident))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::FileDirectives;
    use crate::graph::TypeGraphBuilder;
    use crate::resolver::DirectiveResolver;

    fn graph(src: &str) -> (TypeGraph, UnitOptions) {
        let file: syn::File = syn::parse_str(src).unwrap();
        let directives = FileDirectives::from_attrs(&file.attrs).unwrap();
        let out = TypeGraphBuilder::build(&file, &directives);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let unit = DirectiveResolver::resolve(&out.graph, &directives);
        (out.graph, unit.options)
    }

    fn field_node<'g>(graph: &'g TypeGraph, ty: &str, index: usize) -> &'g TypeNode {
        &graph.lookup(ty).unwrap().as_struct().unwrap().fields[index].node
    }

    fn text(tokens: TokenStream) -> String {
        tokens.to_string()
    }

    fn has(code: &str, fragment: TokenStream) -> bool {
        code.contains(&fragment.to_string())
    }

    #[test]
    fn primitives_write_with_widening_casts() {
        let (g, options) = graph("struct A { n: u16, s: String }");
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let n = e
            .encode(Family::Encode, field_node(&g, "A", 0), &Access::place(quote!(self.n)), &[], Outer::default(), 0)
            .unwrap();
        assert_eq!(text(n), text(quote!(w.write_uint(self.n as u64)?;)));
        let s = e
            .encode(Family::Marshal, field_node(&g, "A", 1), &Access::place(quote!(self.s)), &[], Outer::default(), 0)
            .unwrap();
        assert_eq!(text(s), text(quote!(::packgen::append::append_str(buf, &self.s);)));
    }

    #[test]
    fn compact_floats_and_new_time_change_the_writer() {
        let (g, options) = graph(
            "#![packgen(compact_floats, new_time)] struct A { f: f64, t: std::time::SystemTime }",
        );
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let f = e
            .encode(Family::Encode, field_node(&g, "A", 0), &Access::place(quote!(self.f)), &[], Outer::default(), 0)
            .unwrap();
        assert!(text(f).contains("write_f64_compact"));
        let t = e
            .encode(Family::Encode, field_node(&g, "A", 1), &Access::place(quote!(self.t)), &[], Outer::default(), 0)
            .unwrap();
        assert!(text(t).contains("write_timestamp"));
    }

    #[test]
    fn slice_decode_checks_limit_before_allocating() {
        let (g, options) = graph("#![packgen(limit(arrays = 8))] struct A { v: Vec<u32> }");
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let path = vec![quote!(::packgen::PathSegment::Field("v"))];
        let code = text(
            e.decode(Family::Unmarshal, field_node(&g, "A", 0), &Access::place(quote!(self.v)), &path, Outer::default(), 0)
                .unwrap(),
        );
        let check = code.find("limit_exceeded").unwrap();
        let guard = code.find("guard_count").unwrap();
        let reserve = code.find("reserve").unwrap();
        assert!(check < guard && guard < reserve);
        assert!(has(&code, quote!(__n0 > 8)));

        let tighter = text(
            e.decode(
                Family::Decode,
                field_node(&g, "A", 0),
                &Access::place(quote!(self.v)),
                &path,
                Outer { limit: Some(2), allownil: false },
                0,
            )
            .unwrap(),
        );
        assert!(has(&tighter, quote!(__n0 > 2)));
        assert!(!tighter.contains("guard_count"));
    }

    #[test]
    fn encode_limits_only_in_marshal_mode() {
        let rt = quote!(::packgen);
        let (g, options) = graph("#![packgen(limit(arrays = 8))] struct A { v: Vec<u32> }");
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let code = text(
            e.encode(Family::Encode, field_node(&g, "A", 0), &Access::place(quote!(self.v)), &[], Outer::default(), 0)
                .unwrap(),
        );
        assert!(!code.contains("limit_exceeded"));

        let (g, options) = graph("#![packgen(limit(arrays = 8, marshal))] struct A { v: Vec<u32> }");
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let code = text(
            e.encode(Family::Encode, field_node(&g, "A", 0), &Access::place(quote!(self.v)), &[], Outer::default(), 0)
                .unwrap(),
        );
        assert!(code.contains("limit_exceeded"));
    }

    #[test]
    fn marshal_limit_errors_carry_the_field_path() {
        let rt = quote!(::packgen);
        let (g, options) = graph("#![packgen(limit(arrays = 8, marshal))] struct A { v: Vec<Vec<u32>> }");
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let path = vec![quote!(::packgen::PathSegment::Field("v"))];
        let code = text(
            e.encode(Family::Marshal, field_node(&g, "A", 0), &Access::place(quote!(self.v)), &path, Outer::default(), 0)
                .unwrap(),
        );
        assert!(has(&code, quote!(for (__i0, __e0) in self.v.iter().enumerate())));
        assert!(has(&code, quote!(.prefixed([::packgen::PathSegment::Field("v")]))));
        assert!(has(
            &code,
            quote!(.prefixed([::packgen::PathSegment::Field("v"), ::packgen::PathSegment::Index(__i0)]))
        ));
    }

    #[test]
    fn time_slots_start_at_the_epoch() {
        let (g, options) = graph(
            "struct A {
                o: Option<std::time::SystemTime>,
                v: Vec<std::time::SystemTime>,
                m: std::collections::HashMap<String, std::time::SystemTime>,
                w: Vec<u32>,
            }",
        );
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let decode = |index: usize, place: TokenStream| {
            text(
                e.decode(Family::Unmarshal, field_node(&g, "A", index), &Access::place(place), &[], Outer::default(), 0)
                    .unwrap(),
            )
        };
        assert!(has(&decode(0, quote!(self.o)), quote!(get_or_insert_with(|| ::std::time::UNIX_EPOCH))));
        assert!(has(&decode(1, quote!(self.v)), quote!(self.v.push(::std::time::UNIX_EPOCH);)));
        let map = decode(2, quote!(self.m));
        assert!(has(&map, quote!(or_insert_with(|| ::std::time::UNIX_EPOCH))));
        assert!(!map.contains("or_default"));
        assert!(has(&decode(3, quote!(self.w)), quote!(self.w.push(Default::default());)));
    }

    #[test]
    fn optional_containers_follow_allownil() {
        let (g, options) = graph("struct A { v: Option<Vec<String>> }");
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let node = field_node(&g, "A", 0);
        let place = Access::place(quote!(self.v));
        let plain = text(e.encode(Family::Encode, node, &place, &[], Outer::default(), 0).unwrap());
        assert!(has(&plain, quote!(None => { w.write_array_header(0)?; })));
        let nil = text(
            e.encode(Family::Encode, node, &place, &[], Outer { limit: None, allownil: true }, 0)
                .unwrap(),
        );
        assert!(has(&nil, quote!(None => { w.write_nil()?; })));

        let decode = text(e.decode(Family::Decode, node, &place, &[], Outer::default(), 0).unwrap());
        assert!(has(&decode, quote!(self.v = Some(Default::default());)));
        let zero = text(e.is_zero(node, &place, false, 0));
        assert!(zero.starts_with(&quote!(self.v.as_ref().map_or).to_string()));
        assert_eq!(text(e.is_zero(node, &place, true, 0)), text(quote!(self.v.is_none())));
    }

    #[test]
    fn declared_types_delegate() {
        let (g, options) = graph("struct Node { next: Option<Box<Node>>, kids: Vec<Node> }");
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "Node" };
        let kids = text(
            e.encode(Family::Marshal, field_node(&g, "Node", 1), &Access::place(quote!(self.kids)), &[], Outer::default(), 0)
                .unwrap(),
        );
        assert!(has(&kids, quote!(::packgen::Marshaler::marshal_msg(__e0, buf)?;)));
        let size = text(
            e.size(field_node(&g, "Node", 0), &Access::place(quote!(self.next)), Outer::default(), 0)
                .unwrap(),
        );
        assert!(has(&size, quote!(::packgen::Sizer::msgsize(__b1))));
    }

    #[test]
    fn fixed_size_elements_multiply() {
        let (g, options) = graph("struct A { v: Vec<u64>, a: [i8; 4] }");
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let v = text(e.size(field_node(&g, "A", 0), &Access::place(quote!(self.v)), Outer::default(), 0).unwrap());
        assert_eq!(
            v,
            text(quote!(::packgen::size::ARRAY_HEADER + self.v.len() * (::packgen::size::UINT)))
        );
        let a = text(e.size(field_node(&g, "A", 1), &Access::place(quote!(self.a)), Outer::default(), 0).unwrap());
        assert!(has(&a, quote!(4 * (::packgen::size::INT))));
    }

    #[test]
    fn auto_shimmed_keys_parse_through_map_key() {
        let (g, options) = graph(
            r#"#![packgen(map_keys = "auto_shim")] struct A { m: std::collections::BTreeMap<u32, String> }"#,
        );
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let code = text(
            e.decode(Family::Decode, field_node(&g, "A", 0), &Access::place(quote!(self.m)), &[], Outer::default(), 0)
                .unwrap(),
        );
        assert!(has(&code, quote!(<u32 as ::packgen::MapKey>::from_key)));
        assert!(has(&code, quote!(PathSegment::Entry(__i0))));
    }

    #[test]
    fn shims_convert_through_user_functions() {
        let (g, options) = graph(
            r#"
            #![packgen(shim(ty = "Celsius", wire = "f64", encode = "units::to_f64", decode = "units::from_f64", fallible))]
            struct A { t: Celsius }
            "#,
        );
        let rt = quote!(::packgen);
        let e = NodeEmitter { graph: &g, options, rt: &rt, owner: "A" };
        let node = field_node(&g, "A", 0);
        let place = Access::place(quote!(self.t));
        let enc = text(e.encode(Family::Encode, node, &place, &[], Outer::default(), 0).unwrap());
        assert!(has(&enc, quote!(let __t0 = units::to_f64(&self.t).map_err(::packgen::Error::conversion)?;)));
        assert!(has(&enc, quote!(w.write_f64(__t0)?;)));
        let dec = text(e.decode(Family::Decode, node, &place, &[], Outer::default(), 0).unwrap());
        assert!(has(&dec, quote!(let mut __t0: f64 = Default::default();)));
        assert!(has(&dec, quote!(self.t = units::from_f64(__t0))));
        assert_eq!(text(e.is_zero(node, &place, false, 0)), "false");
    }
}
