//! Directive resolution.
//!
//! Merges innate defaults, file-scope directives and field-scope directives
//! into one effective configuration per type and field. Precedence is
//! innate < file < field, except where a type-level veto applies: tuple
//! layout turns every omission policy into `Always`.

use crate::directives::{FileDirectives, FileLimits, KeyMode};
use crate::error::{ResolutionError, ResolutionErrorKind};
use crate::graph::{
    decl_nodes, CapabilitySet, Decl, DeclId, DeclKind, ExternalBehavior, Field, Primitive,
    TypeGraph, TypeNode,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, debug_span, warn};

/// Wire shape of a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Keyed by field name.
    Map,
    /// Positional array in declaration order.
    Tuple,
}

/// When a field is left out of map layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptinessPolicy {
    Always,
    /// `omitempty`: structural zero.
    OmitIfDefaultBitPattern,
    /// `omitzero`: the type's `IsZero`.
    OmitIfCustomZero,
    /// `omitisempty`: the type's `IsEmpty`.
    OmitIfCustomEmpty,
}

impl EmptinessPolicy {
    pub fn omits(self) -> bool {
        self != EmptinessPolicy::Always
    }
}

/// How map keys of a given type reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// `String`, or a newtype around one.
    Native,
    /// `[u8; N]`, or a newtype around one, written as bin.
    BinaryKey,
    /// A shimmed type whose wire form is `String` or `Vec<u8>`.
    ShimmedKey,
    /// Integers, bool, char and `MapKey` parameters, through `MapKey`.
    AutoShimmedKey,
    Unsupported,
}

/// Picks the key strategy for a map key node.
pub fn key_strategy(graph: &TypeGraph, key: &TypeNode, mode: KeyMode) -> KeyStrategy {
    let direct = match key {
        TypeNode::Declared { id, .. } => match &graph.decl(*id).kind {
            DeclKind::Identifier { underlying, .. } => underlying,
            _ => return KeyStrategy::Unsupported,
        },
        other => other,
    };
    match direct {
        TypeNode::Primitive {
            prim: Primitive::String,
        } => KeyStrategy::Native,
        TypeNode::Primitive {
            prim: Primitive::ByteArray(_),
        } if mode >= KeyMode::Binary => KeyStrategy::BinaryKey,
        TypeNode::ExternalOpaque {
            behavior: ExternalBehavior::Shim { wire, .. },
            ..
        } if mode >= KeyMode::Shim
            && std::ptr::eq(direct, key)
            && matches!(
                wire.as_ref(),
                TypeNode::Primitive {
                    prim: Primitive::String | Primitive::Bytes
                }
            ) =>
        {
            KeyStrategy::ShimmedKey
        }
        TypeNode::Primitive {
            prim: Primitive::Bool | Primitive::Int(_) | Primitive::Uint(_) | Primitive::Char,
        } if mode >= KeyMode::AutoShim && std::ptr::eq(direct, key) => KeyStrategy::AutoShimmedKey,
        TypeNode::GenericParameter { capabilities, .. }
            if capabilities.contains(CapabilitySet::MAP_KEY) =>
        {
            KeyStrategy::AutoShimmedKey
        }
        _ => KeyStrategy::Unsupported,
    }
}

/// Effective configuration of one field.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    /// Index into the declaration's field list.
    pub index: usize,
    pub key: String,
    pub policy: EmptinessPolicy,
    pub allownil: bool,
    /// Field-scope limit for the outermost container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Why the field is left out of generated code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
}

/// Effective configuration of one declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedType {
    pub id: DeclId,
    pub name: String,
    pub layout: Layout,
    pub capabilities: CapabilitySet,
    /// Struct fields, or the single wrapped field of a newtype.
    pub fields: Vec<ResolvedField>,
}

/// Unit-wide options every emitter reads.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UnitOptions {
    pub limits: FileLimits,
    pub map_keys: KeyMode,
    pub compact_floats: bool,
    pub new_time: bool,
}

/// Resolved configuration for every type that will be generated.
#[derive(Debug, Default, Serialize)]
pub struct ResolvedUnit {
    pub options: UnitOptions,
    pub types: Vec<ResolvedType>,
    pub errors: Vec<ResolutionError>,
}

/// Resolves directives over a built graph.
pub struct DirectiveResolver<'a> {
    graph: &'a TypeGraph,
    directives: &'a FileDirectives,
    options: UnitOptions,
}

impl<'a> DirectiveResolver<'a> {
    pub fn new(graph: &'a TypeGraph, directives: &'a FileDirectives) -> Self {
        Self {
            graph,
            directives,
            options: UnitOptions {
                limits: directives.limits,
                map_keys: directives.map_keys,
                compact_floats: directives.compact_floats,
                new_time: directives.new_time,
            },
        }
    }

    pub fn resolve(graph: &'a TypeGraph, directives: &'a FileDirectives) -> ResolvedUnit {
        Self::new(graph, directives).run()
    }

    fn run(&self) -> ResolvedUnit {
        let mut types = Vec::new();
        let mut errors = Vec::new();
        let mut failed: BTreeSet<DeclId> = BTreeSet::new();
        for decl in self.graph.declared() {
            if decl.failed {
                failed.insert(decl.id);
                continue;
            }
            let span = debug_span!("directives", ty = %decl.name);
            let _enter = span.enter();
            match self.resolve_decl(decl) {
                Ok(resolved) => types.push(resolved),
                Err(kind) => {
                    failed.insert(decl.id);
                    errors.push(ResolutionError::new(decl.name.clone(), kind));
                }
            }
        }

        // A type that failed here leaves its dependents without impls.
        loop {
            let before = failed.len();
            types.retain(|t: &ResolvedType| {
                let decl = self.graph.decl(t.id);
                let mut refs = Vec::new();
                for node in decl_nodes(decl) {
                    node.referenced_decls(&mut refs);
                }
                match refs.iter().find(|r| failed.contains(r)) {
                    Some(dep) => {
                        failed.insert(t.id);
                        errors.push(ResolutionError::new(
                            t.name.clone(),
                            ResolutionErrorKind::DependsOnFailed {
                                dependency: self.graph.decl(*dep).name.clone(),
                            },
                        ));
                        false
                    }
                    None => true,
                }
            });
            if failed.len() == before {
                break;
            }
        }

        ResolvedUnit {
            options: self.options,
            types,
            errors,
        }
    }

    fn resolve_decl(&self, decl: &Decl) -> Result<ResolvedType, ResolutionErrorKind> {
        let capabilities = self.directives.capabilities(&decl.name);
        let (layout, fields) = match &decl.kind {
            DeclKind::Struct(s) => {
                let layout = if decl.tuple || s.is_tuple {
                    Layout::Tuple
                } else {
                    Layout::Map
                };
                let fields = s
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(index, field)| self.resolve_field(index, field, layout))
                    .collect();
                (layout, fields)
            }
            DeclKind::Identifier { underlying, attrs } => {
                self.require_keys(underlying)?;
                let field = ResolvedField {
                    index: 0,
                    key: String::new(),
                    policy: EmptinessPolicy::Always,
                    allownil: attrs.allownil && self.nullable_container(underlying),
                    limit: attrs.limit.filter(|_| self.has_outer_container(underlying)),
                    skip: None,
                };
                (Layout::Map, vec![field])
            }
            DeclKind::Interface { variants } => {
                for payload in variants.iter().filter_map(|v| v.payload.as_ref()) {
                    self.require_keys(payload)?;
                }
                (Layout::Tuple, Vec::new())
            }
            DeclKind::Pending => {
                return Err(ResolutionErrorKind::UnsupportedType {
                    ty: decl.name.clone(),
                    reason: "declaration never finished resolving".into(),
                })
            }
        };
        Ok(ResolvedType {
            id: decl.id,
            name: decl.name.clone(),
            layout,
            capabilities,
            fields,
        })
    }

    fn resolve_field(&self, index: usize, field: &Field, layout: Layout) -> ResolvedField {
        let name = field.display_name();
        let skip = self.unsupported_key(&field.node).map(|key| {
            warn!(
                field = %name,
                key = %key,
                mode = ?self.options.map_keys,
                "field skipped: map key type is not enabled by map_keys"
            );
            format!("unsupported map key `{key}`")
        });

        let allownil = field.attrs.allownil && self.nullable_container(&field.node);
        if field.attrs.allownil && !allownil {
            debug!(field = %name, "allownil has no effect outside Option of a container");
        }

        let limit = field.attrs.limit.filter(|_| self.has_outer_container(&field.node));
        if field.attrs.limit.is_some() && limit.is_none() {
            debug!(field = %name, "limit has no effect without a Vec or map");
        }

        ResolvedField {
            index,
            key: field.key.clone(),
            policy: self.policy(field, layout),
            allownil,
            limit,
            skip,
        }
    }

    fn policy(&self, field: &Field, layout: Layout) -> EmptinessPolicy {
        let attrs = &field.attrs;
        let requested = if attrs.omitisempty {
            EmptinessPolicy::OmitIfCustomEmpty
        } else if attrs.omitzero {
            EmptinessPolicy::OmitIfCustomZero
        } else if attrs.omitempty {
            EmptinessPolicy::OmitIfDefaultBitPattern
        } else {
            EmptinessPolicy::Always
        };
        if !requested.omits() {
            return requested;
        }
        let name = field.display_name();
        if layout == Layout::Tuple {
            debug!(field = %name, "omission ignored in tuple layout");
            return EmptinessPolicy::Always;
        }

        let caps = self.capabilities_of(&field.node);
        let policy = match requested {
            EmptinessPolicy::OmitIfCustomZero if !caps.contains(CapabilitySet::ZERO_TEST) => {
                debug!(field = %name, "no IsZero capability, using structural zero");
                EmptinessPolicy::OmitIfDefaultBitPattern
            }
            EmptinessPolicy::OmitIfCustomEmpty if !caps.contains(CapabilitySet::EMPTY_TEST) => {
                debug!(field = %name, "no IsEmpty capability, using structural zero");
                EmptinessPolicy::OmitIfDefaultBitPattern
            }
            other => other,
        };
        if policy == EmptinessPolicy::OmitIfDefaultBitPattern
            && !self.graph.zero_knowable(&field.node)
        {
            warn!(
                field = %name,
                ty = %field.node,
                "zero value of this type is unknowable, field is always written"
            );
            return EmptinessPolicy::Always;
        }
        policy
    }

    /// Capabilities of the type a field holds, looking through `Option` and `Box`.
    pub(crate) fn capabilities_of(&self, node: &TypeNode) -> CapabilitySet {
        node_capabilities(self.graph, self.directives, node)
    }

    fn nullable_container(&self, node: &TypeNode) -> bool {
        match node {
            TypeNode::Pointer { elem } => nullable_container(self.graph, elem).is_some(),
            _ => false,
        }
    }

    fn has_outer_container(&self, node: &TypeNode) -> bool {
        outer_container(self.graph, node).is_some()
    }

    fn require_keys(&self, node: &TypeNode) -> Result<(), ResolutionErrorKind> {
        match self.unsupported_key(node) {
            Some(key) => Err(ResolutionErrorKind::UnsupportedType {
                ty: key,
                reason: format!(
                    "map keys of this type are not enabled by map_keys = {:?}",
                    self.options.map_keys
                ),
            }),
            None => Ok(()),
        }
    }

    /// The first map key type in the node that has no strategy.
    fn unsupported_key(&self, node: &TypeNode) -> Option<String> {
        match node {
            TypeNode::Map { key, value, .. } => {
                if key_strategy(self.graph, key, self.options.map_keys) == KeyStrategy::Unsupported
                {
                    return Some(key.to_string());
                }
                self.unsupported_key(value)
            }
            TypeNode::Pointer { elem }
            | TypeNode::Boxed { elem }
            | TypeNode::Slice { elem }
            | TypeNode::Array { elem, .. } => self.unsupported_key(elem),
            _ => None,
        }
    }
}

/// Capabilities declared for the type behind a node.
pub(crate) fn node_capabilities(
    graph: &TypeGraph,
    directives: &FileDirectives,
    node: &TypeNode,
) -> CapabilitySet {
    match node {
        TypeNode::Pointer { elem } | TypeNode::Boxed { elem } => {
            node_capabilities(graph, directives, elem)
        }
        TypeNode::Declared { name, .. } => directives.capabilities(name),
        TypeNode::GenericInstance { base, .. } => directives.capabilities(&graph.decl(*base).name),
        TypeNode::GenericParameter { capabilities, .. }
        | TypeNode::ExternalOpaque { capabilities, .. } => *capabilities,
        _ => CapabilitySet::empty(),
    }
}

/// Kind of variable-length container, for headers and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Map,
    Bin,
}

/// The container a nullable `Option` wraps: `Vec`, map, bytes, or a
/// newtype around one of them.
pub fn nullable_container(graph: &TypeGraph, elem: &TypeNode) -> Option<ContainerKind> {
    let elem = match elem {
        TypeNode::Declared { .. } => graph.underlying(elem),
        other => other,
    };
    match elem {
        TypeNode::Slice { .. } => Some(ContainerKind::Array),
        TypeNode::Map { .. } => Some(ContainerKind::Map),
        TypeNode::Primitive {
            prim: Primitive::Bytes,
        } => Some(ContainerKind::Bin),
        _ => None,
    }
}

/// The outermost `Vec` or map of a field, looking through `Option`, `Box`
/// and newtypes. Byte blobs and fixed arrays are exempt from limits.
pub fn outer_container(graph: &TypeGraph, node: &TypeNode) -> Option<ContainerKind> {
    match node {
        TypeNode::Pointer { elem } | TypeNode::Boxed { elem } => outer_container(graph, elem),
        TypeNode::Declared { .. } => {
            let underlying = graph.underlying(node);
            if std::ptr::eq(underlying, node) {
                None
            } else {
                outer_container(graph, underlying)
            }
        }
        TypeNode::Slice { .. } => Some(ContainerKind::Array),
        TypeNode::Map { .. } => Some(ContainerKind::Map),
        _ => None,
    }
}
