//! Generic parameters, their capability bounds, and instance checks.

use super::types::{CapabilitySet, GenericParam, Primitive, TypeGraph, TypeNode};
use crate::error::ResolutionErrorKind;
use syn::{GenericParam as SynParam, Generics, TypeParamBound, WherePredicate};
use tracing::warn;

fn bound_capabilities<'a>(bounds: impl Iterator<Item = &'a TypeParamBound>) -> CapabilitySet {
    let mut caps = CapabilitySet::empty();
    for bound in bounds {
        let TypeParamBound::Trait(t) = bound else {
            continue;
        };
        let Some(last) = t.path.segments.last() else {
            continue;
        };
        caps |= match last.ident.to_string().as_str() {
            "Msgp" => CapabilitySet::MSGP,
            "MapKey" => CapabilitySet::MAP_KEY,
            "IsZero" => CapabilitySet::ZERO_TEST,
            "IsEmpty" => CapabilitySet::EMPTY_TEST,
            _ => CapabilitySet::empty(),
        };
    }
    caps
}

/// Reads the type parameters of a declaration with the capabilities their
/// bounds grant. Every parameter must be bounded by `Msgp`.
pub(crate) fn params_of(generics: &Generics) -> Result<Vec<GenericParam>, ResolutionErrorKind> {
    let mut params = Vec::new();
    for param in &generics.params {
        match param {
            SynParam::Type(tp) => {
                let name = tp.ident.to_string();
                let mut caps = bound_capabilities(tp.bounds.iter());
                if let Some(clause) = &generics.where_clause {
                    for predicate in &clause.predicates {
                        let WherePredicate::Type(pt) = predicate else {
                            continue;
                        };
                        let bounded = match &pt.bounded_ty {
                            syn::Type::Path(p) => p.path.is_ident(&tp.ident),
                            _ => false,
                        };
                        if bounded {
                            caps |= bound_capabilities(pt.bounds.iter());
                        }
                    }
                }
                if !caps.contains(CapabilitySet::MSGP) {
                    return Err(ResolutionErrorKind::MissingCapability {
                        param: name,
                        capability: "Msgp",
                    });
                }
                params.push(GenericParam {
                    name,
                    capabilities: caps,
                });
            }
            SynParam::Lifetime(lt) => {
                return Err(ResolutionErrorKind::UnsupportedType {
                    ty: lt.lifetime.to_string(),
                    reason: "lifetime parameters are not supported".into(),
                })
            }
            SynParam::Const(c) => {
                return Err(ResolutionErrorKind::UnsupportedType {
                    ty: c.ident.to_string(),
                    reason: "const generic parameters are not supported".into(),
                })
            }
        }
    }
    Ok(params)
}

/// Display name of an instance, such as `Pair<u32, String>`.
pub(crate) fn instance_name(base: &str, args: &[TypeNode]) -> String {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("{base}<{}>", args.join(", "))
}

/// Whether a generic parameter appears anywhere in the node.
pub(crate) fn contains_parameter(node: &TypeNode) -> bool {
    match node {
        TypeNode::GenericParameter { .. } => true,
        TypeNode::Pointer { elem }
        | TypeNode::Boxed { elem }
        | TypeNode::Slice { elem }
        | TypeNode::Array { elem, .. } => contains_parameter(elem),
        TypeNode::Map { key, value, .. } => contains_parameter(key) || contains_parameter(value),
        TypeNode::GenericInstance { args, .. } => args.iter().any(contains_parameter),
        _ => false,
    }
}

/// Checks one concrete argument against the parameter it fills.
pub(crate) fn check_argument(
    base: &str,
    param: &GenericParam,
    arg: &TypeNode,
    graph: &TypeGraph,
) -> Result<(), ResolutionErrorKind> {
    let violation = |reason: &str| ResolutionErrorKind::GenericConstraint {
        base: base.to_string(),
        param: param.name.clone(),
        arg: arg.to_string(),
        reason: reason.to_string(),
    };
    if !arg.implements_msgp(graph) {
        return Err(violation("does not implement `Msgp`"));
    }
    if param.capabilities.contains(CapabilitySet::MAP_KEY) && !arg.implements_map_key() {
        return Err(violation("does not implement `MapKey`"));
    }
    if matches!(
        arg,
        TypeNode::Primitive {
            prim: Primitive::Bytes
        }
    ) {
        warn!(
            base,
            param = %param.name,
            "Vec<u8> as a generic argument is encoded as an array of integers, not bin"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::IntWidth;
    use syn::parse_quote;

    #[test]
    fn bounds_grant_capabilities() {
        let mut generics: Generics = parse_quote!(<K: Msgp + MapKey, V>);
        generics.where_clause = Some(parse_quote!(where V: packgen::Msgp + packgen::IsZero));
        let params = params_of(&generics).unwrap();
        assert_eq!(params.len(), 2);
        assert!(params[0]
            .capabilities
            .contains(CapabilitySet::MSGP | CapabilitySet::MAP_KEY));
        assert!(params[1]
            .capabilities
            .contains(CapabilitySet::MSGP | CapabilitySet::ZERO_TEST));
    }

    #[test]
    fn unbounded_parameter_is_rejected() {
        let generics: Generics = parse_quote!(<T: Clone>);
        assert_eq!(
            params_of(&generics).unwrap_err(),
            ResolutionErrorKind::MissingCapability {
                param: "T".into(),
                capability: "Msgp"
            }
        );
    }

    #[test]
    fn lifetimes_are_rejected() {
        let generics: Generics = parse_quote!(<'a>);
        assert!(matches!(
            params_of(&generics),
            Err(ResolutionErrorKind::UnsupportedType { .. })
        ));
    }

    #[test]
    fn instance_names_render_arguments() {
        let args = vec![
            TypeNode::primitive(Primitive::Uint(IntWidth::W32)),
            TypeNode::Slice {
                elem: Box::new(TypeNode::primitive(Primitive::String)),
            },
        ];
        assert_eq!(instance_name("Pair", &args), "Pair<u32, Vec<String>>");
        assert!(!contains_parameter(&args[1]));
    }
}
