//! Builds the type graph from parsed Rust items.
//!
//! Declarations resolve on demand and are memoized by name. A placeholder
//! is inserted before a declaration's fields resolve, so recursive
//! references get a stable [`DeclId`]. A declaration that fails records one
//! [`ResolutionError`] and the rest of the unit carries on; anything that
//! depends on it fails afterwards with `DependsOnFailed`.

use super::generics::{check_argument, contains_parameter, instance_name, params_of};
use super::types::{
    CapabilitySet, Decl, DeclId, DeclKind, ExternalBehavior, Field, GenericParam, IntWidth,
    MapFlavor, Primitive, StructNode, TypeGraph, TypeNode, Variant,
};
use crate::directives::{
    path_key, tag_rename, unraw, ExternalDirective, ExternalSpec, FieldAttrs, FileDirectives,
    ItemAttrs, RenameRule, VariantAttrs,
};
use crate::error::{ResolutionError, ResolutionErrorKind};
use darling::{FromAttributes, FromField, FromVariant};
use quote::ToTokens;
use std::collections::{BTreeMap, BTreeSet};
use syn::{Fields, GenericArgument, PathArguments};
use tracing::{debug, debug_span, warn};

type Outcome<T> = Result<T, ResolutionErrorKind>;

const MAX_ALIAS_DEPTH: usize = 32;

/// The graph plus every per-type failure found while building it.
#[derive(Debug)]
pub struct BuildOutput {
    pub graph: TypeGraph,
    pub errors: Vec<ResolutionError>,
}

#[derive(Clone, Copy)]
enum Item<'a> {
    Struct(&'a syn::ItemStruct),
    Enum(&'a syn::ItemEnum),
}

impl<'a> Item<'a> {
    fn generics(&self) -> &'a syn::Generics {
        match self {
            Item::Struct(s) => &s.generics,
            Item::Enum(e) => &e.generics,
        }
    }

    fn attrs(&self) -> &'a [syn::Attribute] {
        match self {
            Item::Struct(s) => &s.attrs,
            Item::Enum(e) => &e.attrs,
        }
    }
}

#[derive(Clone)]
struct Scope {
    params: Vec<GenericParam>,
    subst: BTreeMap<String, TypeNode>,
    self_node: TypeNode,
    alias_depth: usize,
}

/// Resolves the items of one input unit.
pub struct TypeGraphBuilder<'a> {
    directives: &'a FileDirectives,
    items: BTreeMap<String, Item<'a>>,
    order: Vec<String>,
    ignored: BTreeSet<String>,
    aliases: BTreeMap<String, &'a syn::ItemType>,
    graph: TypeGraph,
    errors: Vec<ResolutionError>,
}

impl<'a> TypeGraphBuilder<'a> {
    pub fn new(file: &'a syn::File, directives: &'a FileDirectives) -> Self {
        let mut builder = Self {
            directives,
            items: BTreeMap::new(),
            order: Vec::new(),
            ignored: BTreeSet::new(),
            aliases: BTreeMap::new(),
            graph: TypeGraph::default(),
            errors: Vec::new(),
        };
        for item in &file.items {
            match item {
                syn::Item::Struct(s) => builder.collect(s.ident.to_string(), Item::Struct(s)),
                syn::Item::Enum(e) => builder.collect(e.ident.to_string(), Item::Enum(e)),
                syn::Item::Type(t) => {
                    builder.aliases.insert(t.ident.to_string(), t);
                }
                _ => {}
            }
        }
        builder
    }

    /// Builds the graph for every eligible item in the file.
    pub fn build(file: &'a syn::File, directives: &'a FileDirectives) -> BuildOutput {
        Self::new(file, directives).finish()
    }

    fn collect(&mut self, name: String, item: Item<'a>) {
        let ignored_by_attr = ItemAttrs::from_attributes(item.attrs())
            .map(|a| a.ignore)
            .unwrap_or(false);
        if ignored_by_attr || self.directives.ignore.contains(&name) {
            debug!(ty = %name, "ignored by directive");
            self.ignored.insert(name);
            return;
        }
        self.order.push(name.clone());
        self.items.insert(name, item);
    }

    pub fn finish(mut self) -> BuildOutput {
        for name in self.order.clone() {
            self.declare(&name);
        }
        self.check_sizes();
        self.propagate_failures();
        debug!(
            decls = self.graph.decls.len(),
            failed = self.errors.len(),
            "type graph built"
        );
        BuildOutput {
            graph: self.graph,
            errors: self.errors,
        }
    }

    fn push(&mut self, name: String, generics: &syn::Generics, instance_of: Option<DeclId>) -> DeclId {
        let id = DeclId(self.graph.decls.len());
        self.graph.decls.push(Decl {
            id,
            name,
            kind: DeclKind::Pending,
            params: Vec::new(),
            instance_of,
            tuple: false,
            failed: false,
            generics: generics.clone(),
        });
        id
    }

    fn fail(&mut self, id: DeclId, kind: ResolutionErrorKind) {
        let decl = self.graph.decl_mut(id);
        decl.failed = true;
        debug!(ty = %decl.name, error = %kind, "resolution failed");
        self.errors.push(ResolutionError::new(decl.name.clone(), kind));
    }

    fn settle(&mut self, id: DeclId, outcome: Outcome<DeclKind>) {
        match outcome {
            Ok(kind) => self.graph.decl_mut(id).kind = kind,
            Err(kind) => self.fail(id, kind),
        }
    }

    /// Resolves a declaration by name, or returns the handle of one that is
    /// already resolved or in progress.
    fn declare(&mut self, name: &str) -> Option<DeclId> {
        if let Some(id) = self.graph.by_name.get(name) {
            return Some(*id);
        }
        let item = *self.items.get(name)?;
        let id = self.push(name.to_string(), item.generics(), None);
        self.graph.by_name.insert(name.to_string(), id);

        let span = debug_span!("resolve", ty = name);
        let _enter = span.enter();
        let outcome = params_of(item.generics()).and_then(|params| {
            self.graph.decl_mut(id).params = params.clone();
            let scope = Scope {
                params,
                subst: BTreeMap::new(),
                self_node: TypeNode::Declared {
                    id,
                    name: name.to_string(),
                },
                alias_depth: 0,
            };
            self.resolve_item(name, item, id, &scope)
        });
        self.settle(id, outcome);
        Some(id)
    }

    /// Re-resolves a generic declaration with concrete arguments.
    fn instantiate(
        &mut self,
        base_name: &str,
        base: DeclId,
        name: String,
        params: &[GenericParam],
        args: &[TypeNode],
    ) -> Outcome<DeclId> {
        if let Some(id) = self.graph.instances.get(&name) {
            return Ok(*id);
        }
        let item = *self
            .items
            .get(base_name)
            .ok_or_else(|| ResolutionErrorKind::UnresolvedReference {
                name: base_name.to_string(),
            })?;
        let id = self.push(name.clone(), item.generics(), Some(base));
        self.graph.instances.insert(name.clone(), id);

        let span = debug_span!("instantiate", ty = %name);
        let _enter = span.enter();
        let scope = Scope {
            params: Vec::new(),
            subst: params
                .iter()
                .map(|p| p.name.clone())
                .zip(args.iter().cloned())
                .collect(),
            self_node: TypeNode::Declared { id, name },
            alias_depth: 0,
        };
        let outcome = self.resolve_item(base_name, item, id, &scope);
        self.settle(id, outcome);
        Ok(id)
    }

    fn resolve_item(
        &mut self,
        name: &str,
        item: Item<'a>,
        id: DeclId,
        scope: &Scope,
    ) -> Outcome<DeclKind> {
        let attrs = ItemAttrs::from_attributes(item.attrs())
            .map_err(|e| ResolutionErrorKind::Directive(e.to_string()))?;
        let tuple = attrs.tuple || self.directives.tuple.contains(name);
        self.graph.decl_mut(id).tuple = tuple;
        match item {
            Item::Struct(s) => self.resolve_struct(s, &attrs, tuple, scope),
            Item::Enum(e) => self.resolve_enum(e, &attrs, scope),
        }
    }

    fn resolve_struct(
        &mut self,
        item: &syn::ItemStruct,
        attrs: &ItemAttrs,
        tuple: bool,
        scope: &Scope,
    ) -> Outcome<DeclKind> {
        if let Fields::Unnamed(unnamed) = &item.fields {
            if unnamed.unnamed.len() == 1 && !tuple {
                let field = &unnamed.unnamed[0];
                let field_attrs = FieldAttrs::from_field(field)
                    .map_err(|e| ResolutionErrorKind::Directive(e.to_string()))?;
                let underlying = self.resolve_type(&field.ty, scope)?;
                return Ok(DeclKind::Identifier {
                    underlying,
                    attrs: field_attrs,
                });
            }
        }

        let is_tuple = matches!(item.fields, Fields::Unnamed(_));
        let mut fields: Vec<Field> = Vec::new();
        for (index, field) in item.fields.iter().enumerate() {
            let field_attrs = FieldAttrs::from_field(field)
                .map_err(|e| ResolutionErrorKind::Directive(e.to_string()))?;
            let member = field
                .ident
                .as_ref()
                .map_or_else(|| index.to_string(), ToString::to_string);
            if field_attrs.skip {
                debug!(field = %member, "skipped by directive");
                continue;
            }
            let node = self.resolve_type(&field.ty, scope)?;
            if field_attrs.flatten || (field_attrs.embed && self.directives.flatten_embeds) {
                self.splice(&member, &node, &mut fields)?;
                continue;
            }
            let key = self.wire_key(field, &field_attrs, &member, attrs.rename_all, &node)?;
            fields.push(Field {
                key,
                access: vec![member],
                node,
                ordinal: fields.len(),
                attrs: field_attrs,
                flattened_from: None,
            });
        }
        Ok(DeclKind::Struct(StructNode { fields, is_tuple }))
    }

    fn wire_key(
        &self,
        field: &syn::Field,
        attrs: &FieldAttrs,
        member: &str,
        rule: Option<RenameRule>,
        node: &TypeNode,
    ) -> Outcome<String> {
        let renamed = match &self.directives.tag {
            Some(tag) => tag_rename(&field.attrs, tag)
                .map_err(|e| ResolutionErrorKind::Directive(e.to_string()))?,
            None => attrs.rename.clone(),
        };
        if let Some(key) = renamed {
            return Ok(key);
        }
        if attrs.embed {
            return Ok(match node {
                TypeNode::Declared { name, .. } => name.clone(),
                TypeNode::GenericInstance { base, .. } => self.graph.decl(*base).name.clone(),
                other => other.to_string(),
            });
        }
        let member = unraw(member);
        Ok(match rule {
            Some(rule) => rule.apply(member),
            None => member.to_string(),
        })
    }

    /// Splices a flattened struct's fields into the parent list.
    fn splice(&mut self, member: &str, node: &TypeNode, fields: &mut Vec<Field>) -> Outcome<()> {
        let invalid = |reason: String| ResolutionErrorKind::InvalidFlatten {
            field: member.to_string(),
            reason,
        };
        let target = node
            .decl()
            .ok_or_else(|| invalid(format!("`{node}` is not a struct")))?;
        let decl = self.graph.decl(target);
        if decl.failed {
            return Err(ResolutionErrorKind::DependsOnFailed {
                dependency: decl.name.clone(),
            });
        }
        match &decl.kind {
            DeclKind::Pending => Err(invalid(format!(
                "`{}` is flattened into itself",
                decl.name
            ))),
            DeclKind::Struct(inner) => {
                for sub in &inner.fields {
                    let mut field = sub.clone();
                    field.access.insert(0, member.to_string());
                    field.ordinal = fields.len();
                    field.flattened_from.get_or_insert_with(|| decl.name.clone());
                    fields.push(field);
                }
                Ok(())
            }
            _ => Err(invalid(format!("`{}` is not a struct", decl.name))),
        }
    }

    fn resolve_enum(
        &mut self,
        item: &syn::ItemEnum,
        attrs: &ItemAttrs,
        scope: &Scope,
    ) -> Outcome<DeclKind> {
        let mut variants = Vec::new();
        for variant in &item.variants {
            let variant_attrs = VariantAttrs::from_variant(variant)
                .map_err(|e| ResolutionErrorKind::Directive(e.to_string()))?;
            let ident = variant.ident.to_string();
            let renamed = match &self.directives.tag {
                Some(tag) => tag_rename(&variant.attrs, tag)
                    .map_err(|e| ResolutionErrorKind::Directive(e.to_string()))?,
                None => variant_attrs.rename.clone(),
            };
            let key = renamed.unwrap_or_else(|| match attrs.rename_all {
                Some(rule) => rule.apply(&ident),
                None => ident.clone(),
            });
            let payload = match &variant.fields {
                _ if variant_attrs.skip => None,
                Fields::Unit => None,
                Fields::Unnamed(u) if u.unnamed.len() == 1 => {
                    Some(self.resolve_type(&u.unnamed[0].ty, scope)?)
                }
                _ => {
                    return Err(ResolutionErrorKind::UnsupportedVariant {
                        variant: ident,
                        reason: "only unit variants and variants with one unnamed field \
                                 are supported"
                            .into(),
                    })
                }
            };
            variants.push(Variant {
                ident,
                key,
                payload,
                skip: variant_attrs.skip,
            });
        }
        Ok(DeclKind::Interface { variants })
    }

    fn resolve_type(&mut self, ty: &syn::Type, scope: &Scope) -> Outcome<TypeNode> {
        match ty {
            syn::Type::Paren(p) => self.resolve_type(&p.elem, scope),
            syn::Type::Group(g) => self.resolve_type(&g.elem, scope),
            syn::Type::Array(array) => {
                let len = array_len(&array.len)
                    .ok_or_else(|| unsupported(ty, "array length must be an integer literal"))?;
                let elem = self.resolve_type(&array.elem, scope)?;
                Ok(match elem {
                    TypeNode::Primitive {
                        prim: Primitive::Uint(IntWidth::W8),
                    } if !names_parameter(&array.elem, scope) => {
                        TypeNode::primitive(Primitive::ByteArray(len))
                    }
                    elem => TypeNode::Array {
                        elem: Box::new(elem),
                        len,
                    },
                })
            }
            syn::Type::Path(p) if p.qself.is_none() => self.resolve_path(&p.path, ty, scope),
            _ => Err(unsupported(ty, "only owned path and array types can be encoded")),
        }
    }

    fn resolve_path(&mut self, path: &syn::Path, ty: &syn::Type, scope: &Scope) -> Outcome<TypeNode> {
        let last = path
            .segments
            .last()
            .ok_or_else(|| unsupported(ty, "empty path"))?;
        let ident = last.ident.to_string();
        let args = type_args(&last.arguments).map_err(|reason| unsupported(ty, reason))?;
        let single = path.segments.len() == 1 && path.leading_colon.is_none();

        if single && args.is_empty() {
            if ident == "Self" {
                return Ok(scope.self_node.clone());
            }
            if let Some(node) = scope.subst.get(&ident) {
                return Ok(node.clone());
            }
            if let Some(param) = scope.params.iter().find(|p| p.name == ident) {
                return Ok(TypeNode::GenericParameter {
                    name: ident,
                    capabilities: param.capabilities,
                });
            }
        }

        let key = path_key(path);
        if let Some(spec) = self.directives.external(&key).filter(|s| s.is_encoding()) {
            let spec = spec.clone();
            return self.external(key, spec);
        }

        if is_std_path(path) {
            if let Some(node) = self.resolve_std(&ident, &args, ty, scope)? {
                return Ok(node);
            }
        }

        if !single {
            return Err(ResolutionErrorKind::UnshimmedExternal { path: key });
        }
        if let Some(alias) = self.aliases.get(ident.as_str()).copied() {
            if !alias.generics.params.is_empty() {
                return Err(unsupported(ty, "generic type aliases are not supported"));
            }
            if scope.alias_depth >= MAX_ALIAS_DEPTH {
                return Err(unsupported(ty, "type aliases nest too deeply"));
            }
            let mut inner = scope.clone();
            inner.alias_depth += 1;
            return self.resolve_type(&alias.ty, &inner);
        }
        if self.items.contains_key(ident.as_str()) {
            return self.resolve_declared(&ident, &args, scope);
        }
        if self.ignored.contains(&ident) {
            debug!(ty = %ident, "ignored type is assumed to implement its own codec");
            return Ok(TypeNode::ExternalOpaque {
                path: ident,
                behavior: ExternalBehavior::Capabilities,
                capabilities: CapabilitySet::FULL,
            });
        }
        Err(ResolutionErrorKind::UnresolvedReference { name: ident })
    }

    fn resolve_std(
        &mut self,
        ident: &str,
        args: &[&syn::Type],
        ty: &syn::Type,
        scope: &Scope,
    ) -> Outcome<Option<TypeNode>> {
        use Primitive as P;
        let prim = |p: Primitive| -> Outcome<Option<TypeNode>> { Ok(Some(TypeNode::primitive(p))) };
        match (ident, args.len()) {
            ("bool", 0) => prim(P::Bool),
            ("i8", 0) => prim(P::Int(IntWidth::W8)),
            ("i16", 0) => prim(P::Int(IntWidth::W16)),
            ("i32", 0) => prim(P::Int(IntWidth::W32)),
            ("i64", 0) => prim(P::Int(IntWidth::W64)),
            ("isize", 0) => prim(P::Int(IntWidth::Size)),
            ("u8", 0) => prim(P::Uint(IntWidth::W8)),
            ("u16", 0) => prim(P::Uint(IntWidth::W16)),
            ("u32", 0) => prim(P::Uint(IntWidth::W32)),
            ("u64", 0) => prim(P::Uint(IntWidth::W64)),
            ("usize", 0) => prim(P::Uint(IntWidth::Size)),
            ("f32", 0) => prim(P::F32),
            ("f64", 0) => prim(P::F64),
            ("char", 0) => prim(P::Char),
            ("String", 0) => prim(P::String),
            ("SystemTime", 0) => prim(P::Time),
            ("Duration", 0) => prim(P::Duration),
            ("Complex64", 0) => prim(P::Complex64),
            ("Complex128", 0) => prim(P::Complex128),
            ("i128" | "u128", 0) => Err(unsupported(ty, "128-bit integers have no wire form")),
            ("Vec", 1) => {
                let elem = self.resolve_type(args[0], scope)?;
                Ok(Some(match elem {
                    TypeNode::Primitive {
                        prim: P::Uint(IntWidth::W8),
                    } if !names_parameter(args[0], scope) => TypeNode::primitive(P::Bytes),
                    elem => TypeNode::Slice {
                        elem: Box::new(elem),
                    },
                }))
            }
            ("Option", 1) => Ok(Some(TypeNode::Pointer {
                elem: Box::new(self.resolve_type(args[0], scope)?),
            })),
            ("Box", 1) => Ok(Some(TypeNode::Boxed {
                elem: Box::new(self.resolve_type(args[0], scope)?),
            })),
            ("HashMap", 2 | 3) => self.resolve_map(MapFlavor::HashMap, args, scope).map(Some),
            ("BTreeMap", 2) => self.resolve_map(MapFlavor::BTreeMap, args, scope).map(Some),
            (
                "str" | "Rc" | "Arc" | "Cell" | "RefCell" | "Mutex" | "HashSet" | "BTreeSet"
                | "VecDeque" | "Cow" | "PhantomData",
                _,
            ) => Err(unsupported(ty, "no wire mapping for this standard type")),
            _ => Ok(None),
        }
    }

    fn resolve_map(
        &mut self,
        flavor: MapFlavor,
        args: &[&syn::Type],
        scope: &Scope,
    ) -> Outcome<TypeNode> {
        let key = self.resolve_type(args[0], scope)?;
        let value = self.resolve_type(args[1], scope)?;
        Ok(TypeNode::Map {
            flavor,
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    fn resolve_declared(
        &mut self,
        ident: &str,
        args: &[&syn::Type],
        scope: &Scope,
    ) -> Outcome<TypeNode> {
        let base = self
            .declare(ident)
            .ok_or_else(|| ResolutionErrorKind::UnresolvedReference {
                name: ident.to_string(),
            })?;
        let decl = self.graph.decl(base);
        if decl.failed {
            return Err(ResolutionErrorKind::DependsOnFailed {
                dependency: decl.name.clone(),
            });
        }
        let params = decl.params.clone();
        if args.len() != params.len() {
            return Err(ResolutionErrorKind::GenericArity {
                base: ident.to_string(),
                expected: params.len(),
                found: args.len(),
            });
        }
        if params.is_empty() {
            return Ok(TypeNode::Declared {
                id: base,
                name: ident.to_string(),
            });
        }

        let args = args
            .iter()
            .map(|a| self.resolve_type(a, scope))
            .collect::<Outcome<Vec<_>>>()?;
        for (param, arg) in params.iter().zip(&args) {
            check_argument(ident, param, arg, &self.graph)?;
        }
        let name = instance_name(ident, &args);
        let instance = if args.iter().any(contains_parameter) {
            base
        } else {
            self.instantiate(ident, base, name.clone(), &params, &args)?
        };
        Ok(TypeNode::GenericInstance {
            base,
            name,
            args,
            instance,
        })
    }

    fn external(&mut self, path: String, spec: ExternalSpec) -> Outcome<TypeNode> {
        let behavior = match spec.directive {
            None => ExternalBehavior::Capabilities,
            Some(ExternalDirective::Replace { with }) => ExternalBehavior::Replace { with },
            Some(ExternalDirective::Intercept { using }) => ExternalBehavior::Intercept { using },
            Some(ExternalDirective::Shim {
                wire,
                encode,
                decode,
                fallible,
            }) => {
                let scope = Scope {
                    params: Vec::new(),
                    subst: BTreeMap::new(),
                    self_node: TypeNode::ExternalOpaque {
                        path: path.clone(),
                        behavior: ExternalBehavior::Capabilities,
                        capabilities: spec.capabilities,
                    },
                    alias_depth: 0,
                };
                let wire_node = self.resolve_type(&wire, &scope)?;
                if matches!(wire_node, TypeNode::ExternalOpaque { .. }) {
                    return Err(unsupported(
                        &wire,
                        "a shim's wire type must not itself need a directive",
                    ));
                }
                ExternalBehavior::Shim {
                    wire: Box::new(wire_node),
                    wire_ty: wire,
                    encode,
                    decode,
                    fallible,
                }
            }
        };
        Ok(TypeNode::ExternalOpaque {
            path,
            behavior,
            capabilities: spec.capabilities,
        })
    }

    /// Fails every declaration on a by-value cycle.
    fn check_sizes(&mut self) {
        let edges: Vec<Vec<DeclId>> = self
            .graph
            .decls
            .iter()
            .map(|decl| {
                let mut out = Vec::new();
                for node in decl_nodes(decl) {
                    node.by_value_decls(&mut out);
                }
                out
            })
            .collect();
        let mut state = vec![Visit::New; edges.len()];
        let mut stack = Vec::new();
        let mut cycles = Vec::new();
        for start in 0..edges.len() {
            if state[start] == Visit::New {
                visit(start, &edges, &mut state, &mut stack, &mut cycles);
            }
        }
        for cycle in cycles {
            let mut names: Vec<String> = cycle
                .iter()
                .map(|id| self.graph.decl(DeclId(*id)).name.clone())
                .collect();
            if let Some(first) = names.first().cloned() {
                names.push(first);
            }
            for id in cycle {
                if !self.graph.decl(DeclId(id)).failed {
                    self.fail(
                        DeclId(id),
                        ResolutionErrorKind::InfiniteSize {
                            cycle: names.clone(),
                        },
                    );
                }
            }
        }
    }

    fn propagate_failures(&mut self) {
        loop {
            let mut newly = Vec::new();
            for decl in &self.graph.decls {
                if decl.failed {
                    continue;
                }
                let mut refs = Vec::new();
                for node in decl_nodes(decl) {
                    node.referenced_decls(&mut refs);
                }
                if let Some(dep) = refs.iter().find(|id| self.graph.decl(**id).failed) {
                    newly.push((decl.id, self.graph.decl(*dep).name.clone()));
                }
            }
            if newly.is_empty() {
                break;
            }
            for (id, dependency) in newly {
                warn!(ty = %self.graph.decl(id).name, %dependency, "skipped: dependency failed");
                self.fail(id, ResolutionErrorKind::DependsOnFailed { dependency });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

fn visit(
    v: usize,
    edges: &[Vec<DeclId>],
    state: &mut [Visit],
    stack: &mut Vec<usize>,
    cycles: &mut Vec<Vec<usize>>,
) {
    state[v] = Visit::Active;
    stack.push(v);
    for next in &edges[v] {
        match state[next.0] {
            Visit::New => visit(next.0, edges, state, stack, cycles),
            Visit::Active => {
                if let Some(pos) = stack.iter().position(|x| *x == next.0) {
                    cycles.push(stack[pos..].to_vec());
                }
            }
            Visit::Done => {}
        }
    }
    stack.pop();
    state[v] = Visit::Done;
}

/// Every field, underlying or payload node of a declaration.
pub(crate) fn decl_nodes(decl: &Decl) -> Vec<&TypeNode> {
    match &decl.kind {
        DeclKind::Pending => Vec::new(),
        DeclKind::Struct(s) => s.fields.iter().map(|f| &f.node).collect(),
        DeclKind::Identifier { underlying, .. } => vec![underlying],
        DeclKind::Interface { variants } => {
            variants.iter().filter_map(|v| v.payload.as_ref()).collect()
        }
    }
}

/// Whether a type is a bare generic parameter of the scope. Substituted
/// parameters keep the generic impl's encoding, so `Vec<T>` with `T = u8`
/// stays an array.
fn names_parameter(ty: &syn::Type, scope: &Scope) -> bool {
    match ty {
        syn::Type::Path(p) => p.path.get_ident().is_some_and(|ident| {
            let name = ident.to_string();
            scope.subst.contains_key(&name) || scope.params.iter().any(|p| p.name == name)
        }),
        _ => false,
    }
}

fn is_std_path(path: &syn::Path) -> bool {
    if path.segments.len() == 1 {
        return path.leading_colon.is_none();
    }
    path.segments
        .first()
        .map(|s| matches!(s.ident.to_string().as_str(), "std" | "core" | "alloc" | "packgen"))
        .unwrap_or(false)
}

fn type_args(arguments: &PathArguments) -> Result<Vec<&syn::Type>, &'static str> {
    match arguments {
        PathArguments::None => Ok(Vec::new()),
        PathArguments::Parenthesized(_) => Err("function-like type arguments are not supported"),
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .map(|arg| match arg {
                GenericArgument::Type(ty) => Ok(ty),
                _ => Err("only type arguments are supported"),
            })
            .collect(),
    }
}

fn array_len(expr: &syn::Expr) -> Option<usize> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(n),
            ..
        }) => n.base10_parse().ok(),
        syn::Expr::Group(g) => array_len(&g.expr),
        syn::Expr::Paren(p) => array_len(&p.expr),
        _ => None,
    }
}

/// Renders a type for diagnostics with the spacing people write.
pub(crate) fn type_text(ty: &impl ToTokens) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" :: ", "::")
        .replace(" < ", "<")
        .replace("< ", "<")
        .replace(" <", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace("& ", "&")
}

fn unsupported(ty: &impl ToTokens, reason: &str) -> ResolutionErrorKind {
    ResolutionErrorKind::UnsupportedType {
        ty: type_text(ty),
        reason: reason.to_string(),
    }
}
