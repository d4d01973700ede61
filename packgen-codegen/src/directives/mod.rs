//! Directive parsing.
//!
//! File-scope directives are inner attributes at the top of the input:
//!
//! ```rust,ignore
//! #![packgen(tuple(Point), limit(arrays = 1024, maps = 64))]
//! #![packgen(shim(ty = "Celsius", wire = "f64", encode = "c_to_f64", decode = "f64_to_c"))]
//! ```
//!
//! They may repeat and are merged in order. Item, field and variant
//! directives live in [`attrs`].

mod attrs;

pub use attrs::{tag_rename, unraw, FieldAttrs, ItemAttrs, RenameRule, VariantAttrs};

use crate::error::DirectiveError;
use crate::graph::CapabilitySet;
use darling::util::PathList;
use darling::FromMeta;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use syn::{AttrStyle, Attribute};

/// Which map key strategies beyond native string keys are enabled.
///
/// Levels are cumulative: each enables everything before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, FromMeta, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    #[default]
    #[darling(rename = "native")]
    Native,
    /// Adds `[u8; N]` keys written as bin.
    #[darling(rename = "binary")]
    Binary,
    /// Adds keys with a shim to `String` or `Vec<u8>`.
    #[darling(rename = "shim")]
    Shim,
    /// Adds integer, bool and char keys through `MapKey`.
    #[darling(rename = "auto_shim")]
    AutoShim,
}

/// File-scope cardinality limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileLimits {
    pub arrays: Option<u32>,
    pub maps: Option<u32>,
    /// Also enforce when encoding.
    pub marshal: bool,
}

/// A per-type conversion directive.
#[derive(Debug, Clone)]
pub enum ExternalDirective {
    Replace {
        with: syn::Type,
    },
    Shim {
        wire: syn::Type,
        encode: syn::Path,
        decode: syn::Path,
        fallible: bool,
    },
    Intercept {
        using: syn::Path,
    },
}

/// Everything the file says about one type.
#[derive(Debug, Clone, Default)]
pub struct ExternalSpec {
    pub capabilities: CapabilitySet,
    pub directive: Option<ExternalDirective>,
}

impl ExternalSpec {
    /// Whether the entry changes how values are encoded, as opposed to only
    /// adding zero or empty tests.
    pub fn is_encoding(&self) -> bool {
        self.directive.is_some() || self.capabilities.intersects(CapabilitySet::ENCODING)
    }
}

/// Merged file-scope directives.
#[derive(Debug, Clone, Default)]
pub struct FileDirectives {
    pub ignore: BTreeSet<String>,
    pub tuple: BTreeSet<String>,
    /// Attribute that supplies wire keys instead of `#[msg(rename)]`.
    pub tag: Option<String>,
    pub flatten_embeds: bool,
    pub limits: FileLimits,
    pub map_keys: KeyMode,
    pub compact_floats: bool,
    pub new_time: bool,
    /// Keyed by path text without generic arguments.
    pub externals: BTreeMap<String, ExternalSpec>,
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct FileDirectiveArgs {
    ignore: Option<PathList>,
    tuple: Option<PathList>,
    tag: Option<String>,
    flatten_embeds: bool,
    #[darling(multiple)]
    replace: Vec<ReplaceArgs>,
    #[darling(multiple)]
    shim: Vec<ShimArgs>,
    #[darling(multiple)]
    intercept: Vec<InterceptArgs>,
    limit: Option<LimitArgs>,
    map_keys: Option<KeyMode>,
    compact_floats: bool,
    new_time: bool,
    external: Option<PathList>,
    binary: Option<PathList>,
    binary_append: Option<PathList>,
    text: Option<PathList>,
    text_string: Option<PathList>,
    zero_test: Option<PathList>,
    empty_test: Option<PathList>,
}

#[derive(Debug, FromMeta)]
struct ReplaceArgs {
    ty: String,
    with: String,
}

#[derive(Debug, FromMeta)]
struct ShimArgs {
    ty: String,
    wire: String,
    encode: String,
    decode: String,
    #[darling(default)]
    fallible: bool,
}

#[derive(Debug, FromMeta)]
struct InterceptArgs {
    ty: String,
    using: String,
}

#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct LimitArgs {
    arrays: Option<u32>,
    maps: Option<u32>,
    marshal: bool,
}

/// Lookup key for a path: segment idents joined by `::`, arguments dropped.
pub fn path_key(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn type_key(text: &str) -> Result<String, DirectiveError> {
    let ty: syn::Type = syn::parse_str(text)
        .map_err(|e| DirectiveError::new(format!("`{text}` is not a type: {e}")))?;
    match &ty {
        syn::Type::Path(p) if p.qself.is_none() => Ok(path_key(&p.path)),
        _ => Err(DirectiveError::new(format!("`{text}` must name a path type"))),
    }
}

fn parse_path(text: &str, what: &str) -> Result<syn::Path, DirectiveError> {
    syn::parse_str(text)
        .map_err(|e| DirectiveError::new(format!("{what} `{text}` is not a path: {e}")))
}

impl FileDirectives {
    /// Collects `#![packgen(...)]` inner attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> Result<Self, DirectiveError> {
        let mut out = Self::default();
        for attr in attrs {
            if !matches!(attr.style, AttrStyle::Inner(_)) || !attr.path().is_ident("packgen") {
                continue;
            }
            let args = FileDirectiveArgs::from_meta(&attr.meta)?;
            out.merge(args)?;
        }
        Ok(out)
    }

    fn merge(&mut self, args: FileDirectiveArgs) -> Result<(), DirectiveError> {
        if let Some(list) = args.ignore {
            self.ignore.extend(list.iter().map(path_key));
        }
        if let Some(list) = args.tuple {
            self.tuple.extend(list.iter().map(path_key));
        }
        if args.tag.is_some() {
            self.tag = args.tag;
        }
        self.flatten_embeds |= args.flatten_embeds;
        self.compact_floats |= args.compact_floats;
        self.new_time |= args.new_time;
        if let Some(mode) = args.map_keys {
            self.map_keys = mode;
        }
        if let Some(limit) = args.limit {
            if limit.arrays.is_some() {
                self.limits.arrays = limit.arrays;
            }
            if limit.maps.is_some() {
                self.limits.maps = limit.maps;
            }
            self.limits.marshal |= limit.marshal;
        }

        let capability_lists = [
            (args.external, CapabilitySet::FULL),
            (args.binary, CapabilitySet::BINARY),
            (
                args.binary_append,
                CapabilitySet::BINARY_APPEND | CapabilitySet::BINARY,
            ),
            (args.text, CapabilitySet::TEXT),
            (args.text_string, CapabilitySet::TEXT_STRING),
            (args.zero_test, CapabilitySet::ZERO_TEST),
            (args.empty_test, CapabilitySet::EMPTY_TEST),
        ];
        for (list, caps) in capability_lists {
            for path in list.iter().flat_map(|l| l.iter()) {
                self.externals.entry(path_key(path)).or_default().capabilities |= caps;
            }
        }

        for r in args.replace {
            let key = type_key(&r.ty)?;
            let with: syn::Type = syn::parse_str(&r.with).map_err(|e| {
                DirectiveError::new(format!("replacement `{}` is not a type: {e}", r.with))
            })?;
            self.set_directive(key, CapabilitySet::REPLACE, ExternalDirective::Replace { with })?;
        }
        for s in args.shim {
            let key = type_key(&s.ty)?;
            let wire: syn::Type = syn::parse_str(&s.wire).map_err(|e| {
                DirectiveError::new(format!("shim wire type `{}` is not a type: {e}", s.wire))
            })?;
            let directive = ExternalDirective::Shim {
                wire,
                encode: parse_path(&s.encode, "shim encoder")?,
                decode: parse_path(&s.decode, "shim decoder")?,
                fallible: s.fallible,
            };
            self.set_directive(key, CapabilitySet::SHIM, directive)?;
        }
        for i in args.intercept {
            let key = type_key(&i.ty)?;
            let using = parse_path(&i.using, "interceptor")?;
            self.set_directive(
                key,
                CapabilitySet::INTERCEPT,
                ExternalDirective::Intercept { using },
            )?;
        }
        Ok(())
    }

    fn set_directive(
        &mut self,
        key: String,
        cap: CapabilitySet,
        directive: ExternalDirective,
    ) -> Result<(), DirectiveError> {
        let spec = self.externals.entry(key.clone()).or_default();
        if spec.directive.is_some() {
            return Err(DirectiveError::new(format!(
                "`{key}` has more than one replace, shim or intercept directive"
            )));
        }
        spec.capabilities |= cap;
        spec.directive = Some(directive);
        Ok(())
    }

    /// Finds the spec for a path, falling back to a unique match on the
    /// last segment so `chrono::NaiveDate` and `NaiveDate` meet.
    pub fn external(&self, key: &str) -> Option<&ExternalSpec> {
        if let Some(spec) = self.externals.get(key) {
            return Some(spec);
        }
        let last = key.rsplit("::").next().unwrap_or(key);
        let mut candidates = self
            .externals
            .iter()
            .filter(|(k, _)| k.rsplit("::").next() == Some(last));
        match (candidates.next(), candidates.next()) {
            (Some((_, spec)), None) => Some(spec),
            _ => None,
        }
    }

    /// Capabilities declared for a type name.
    pub fn capabilities(&self, key: &str) -> CapabilitySet {
        self.external(key)
            .map(|s| s.capabilities)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<FileDirectives, DirectiveError> {
        let file: syn::File = syn::parse_str(src).unwrap();
        FileDirectives::from_attrs(&file.attrs)
    }

    #[test]
    fn repeated_attributes_merge_in_order() {
        let d = parse(
            r#"
            #![packgen(tuple(Point), limit(arrays = 10, maps = 4))]
            #![packgen(tuple(Pair), limit(maps = 8, marshal), map_keys = "auto_shim")]
            #![packgen(compact_floats, new_time, tag = "serde")]
            "#,
        )
        .unwrap();
        assert!(d.tuple.contains("Point") && d.tuple.contains("Pair"));
        assert_eq!(
            d.limits,
            FileLimits {
                arrays: Some(10),
                maps: Some(8),
                marshal: true
            }
        );
        assert_eq!(d.map_keys, KeyMode::AutoShim);
        assert!(d.compact_floats && d.new_time);
        assert_eq!(d.tag.as_deref(), Some("serde"));
    }

    #[test]
    fn conversion_directives_are_recorded() {
        let d = parse(
            r#"
            #![packgen(
                shim(ty = "Celsius", wire = "f64", encode = "units::to_f64", decode = "units::from_f64", fallible),
                replace(ty = "ext::Money", with = "LocalMoney"),
                intercept(ty = "chrono::NaiveDate", using = "DATES"),
                binary_append(net::Addr),
                zero_test(Celsius)
            )]
            "#,
        )
        .unwrap();
        let celsius = d.external("Celsius").unwrap();
        assert!(celsius
            .capabilities
            .contains(CapabilitySet::SHIM | CapabilitySet::ZERO_TEST));
        assert!(matches!(
            celsius.directive,
            Some(ExternalDirective::Shim { fallible: true, .. })
        ));
        assert!(d.external("NaiveDate").is_some());
        assert!(d
            .capabilities("net::Addr")
            .contains(CapabilitySet::BINARY_APPEND | CapabilitySet::BINARY));
        assert!(celsius.is_encoding());
    }

    #[test]
    fn conflicting_directives_are_rejected() {
        let err = parse(
            r#"#![packgen(replace(ty = "A", with = "B"), intercept(ty = "A", using = "P"))]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn unknown_directive_is_rejected() {
        assert!(parse("#![packgen(omit_everything)]").is_err());
    }

    #[test]
    fn other_inner_attributes_are_ignored() {
        let d = parse("#![allow(dead_code)]").unwrap();
        assert!(d.externals.is_empty());
    }
}
