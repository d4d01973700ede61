//! Item, field and variant directives.
//!
//! Items take `#[packgen(...)]`; fields and variants take `#[msg(...)]`.
//! When the unit names a custom tag (`tag = "serde"`), wire keys are read
//! from that attribute's `rename` instead, and everything else still comes
//! from `#[msg(...)]`.

use crate::error::DirectiveError;
use darling::{FromAttributes, FromField, FromMeta, FromVariant};
use serde::Serialize;
use syn::Attribute;

/// Item-level directives on a struct or enum.
#[derive(Debug, Clone, Default, FromAttributes)]
#[darling(attributes(packgen), default)]
pub struct ItemAttrs {
    /// Encode as a positional array.
    pub tuple: bool,
    /// Leave the item out of generation.
    pub ignore: bool,
    /// Case convention for wire keys of fields and variants.
    pub rename_all: Option<RenameRule>,
}

/// Field-level directives from `#[msg(...)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromField, Serialize)]
#[darling(attributes(msg), default)]
pub struct FieldAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    pub omitempty: bool,
    pub omitzero: bool,
    pub omitisempty: bool,
    pub allownil: bool,
    /// Cardinality ceiling for the field's outermost container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub skip: bool,
    pub embed: bool,
    pub flatten: bool,
}

/// Variant-level directives from `#[msg(...)]`.
#[derive(Debug, Clone, Default, FromVariant)]
#[darling(attributes(msg), default)]
pub struct VariantAttrs {
    pub rename: Option<String>,
    pub skip: bool,
}

/// Rename rule for wire keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromMeta)]
pub enum RenameRule {
    #[darling(rename = "camelCase")]
    CamelCase,

    #[darling(rename = "snake_case")]
    SnakeCase,

    #[darling(rename = "PascalCase")]
    PascalCase,

    #[darling(rename = "SCREAMING_SNAKE_CASE")]
    ScreamingSnakeCase,

    #[darling(rename = "kebab-case")]
    KebabCase,
}

impl RenameRule {
    pub fn apply(&self, name: &str) -> String {
        use convert_case::{Case, Casing};

        match self {
            RenameRule::CamelCase => name.to_case(Case::Camel),
            RenameRule::SnakeCase => name.to_case(Case::Snake),
            RenameRule::PascalCase => name.to_case(Case::Pascal),
            RenameRule::ScreamingSnakeCase => name.to_case(Case::UpperSnake),
            RenameRule::KebabCase => name.to_case(Case::Kebab),
        }
    }
}

/// Reads `rename = ".."` from a custom tag attribute such as `#[serde(...)]`.
///
/// Other keys in the same attribute are consumed and ignored. An attribute
/// that does not parse as a key list is an error.
pub fn tag_rename(attrs: &[Attribute], tag: &str) -> Result<Option<String>, DirectiveError> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident(tag) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<syn::Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<proc_macro2::TokenStream>()?;
            }
            Ok(())
        })?;
    }
    Ok(rename)
}

/// Strips the raw-identifier prefix from a member name.
pub fn unraw(name: &str) -> &str {
    name.strip_prefix("r#").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn field_directives_parse() {
        let field: syn::Field = parse_quote! {
            #[msg(rename = "tags", omitempty, allownil, limit = 8)]
            pub tags: Option<Vec<String>>
        };
        let attrs = FieldAttrs::from_field(&field).unwrap();
        assert_eq!(attrs.rename.as_deref(), Some("tags"));
        assert!(attrs.omitempty && attrs.allownil);
        assert_eq!(attrs.limit, Some(8));
        assert!(!attrs.skip);
    }

    #[test]
    fn unknown_field_directive_is_rejected() {
        let field: syn::Field = parse_quote! {
            #[msg(omit_empty)]
            pub name: String
        };
        assert!(FieldAttrs::from_field(&field).is_err());
    }

    #[test]
    fn item_directives_parse() {
        let item: syn::ItemStruct = parse_quote! {
            #[packgen(tuple, rename_all = "camelCase")]
            struct Point { x_pos: i32 }
        };
        let attrs = ItemAttrs::from_attributes(&item.attrs).unwrap();
        assert!(attrs.tuple);
        assert_eq!(attrs.rename_all, Some(RenameRule::CamelCase));
        assert_eq!(RenameRule::CamelCase.apply("x_pos"), "xPos");
    }

    #[test]
    fn custom_tag_rename_is_found_among_other_keys() {
        let field: syn::Field = parse_quote! {
            #[serde(default, skip_serializing_if = "Option::is_none", rename = "Full")]
            pub full_name: Option<String>
        };
        assert_eq!(tag_rename(&field.attrs, "serde").unwrap().as_deref(), Some("Full"));
        assert_eq!(tag_rename(&field.attrs, "json").unwrap(), None);
    }

    #[test]
    fn malformed_tag_attribute_is_an_error() {
        let field: syn::Field = parse_quote! {
            #[serde(rename = 42)]
            pub full_name: String
        };
        let err = tag_rename(&field.attrs, "serde").unwrap_err();
        assert!(err.message.contains("expected string literal"), "{err}");

        let field: syn::Field = parse_quote! {
            #[serde = "Full"]
            pub full_name: String
        };
        assert!(tag_rename(&field.attrs, "serde").is_err());
    }

    #[test]
    fn raw_identifiers_lose_their_prefix() {
        assert_eq!(unraw("r#type"), "type");
        assert_eq!(unraw("kind"), "kind");
    }
}
