//! Emission output assembler.
//!
//! Combines the input declarations with their generated impls into one
//! source file, plus an optional test file with round-trip tests. Both are
//! plain item lists with no inner attributes, so they can be pulled in with
//! `include!`.

use crate::generator::GeneratedTypes;
use proc_macro2::TokenStream;
use quote::{format_ident, quote, ToTokens};
use std::collections::BTreeSet;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by packgen. DO NOT EDIT.";

/// Rendered output of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub code: String,
    pub tests: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Assembler {
    runtime: TokenStream,
    emit_tests: bool,
    rustfmt: bool,
    source: Option<String>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            runtime: quote!(::packgen),
            emit_tests: false,
            rustfmt: false,
            source: None,
        }
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, path: &syn::Path) -> Self {
        self.runtime = path.to_token_stream();
        self
    }

    pub fn with_tests(mut self, emit: bool) -> Self {
        self.emit_tests = emit;
        self
    }

    /// Pipe output through `rustfmt` when it is installed.
    pub fn with_rustfmt(mut self, enabled: bool) -> Self {
        self.rustfmt = enabled;
        self
    }

    /// Names the input in the header comment.
    pub fn with_source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(name.into());
        self
    }

    pub fn assemble(&self, file: &syn::File, generated: GeneratedTypes) -> GeneratedUnit {
        let stripped = strip_directives(file);
        let mut chunks: Vec<String> = stripped
            .items
            .iter()
            .map(|item| item.to_token_stream().to_string())
            .collect();
        chunks.extend(generated.types.iter().map(|t| t.impls.to_string()));
        let code = self.render(chunks);

        let tests = self.emit_tests.then(|| {
            let eligible = testable_types(file);
            let tests: Vec<String> = generated
                .types
                .iter()
                .filter(|t| !t.generic && eligible.contains(&t.name))
                .map(|t| self.round_trip_tests(&t.name).to_string())
                .collect();
            debug!(count = tests.len(), "round-trip tests emitted");
            let mut chunks = vec![quote!(use super::*;).to_string()];
            chunks.extend(tests);
            self.render(chunks)
        });

        GeneratedUnit { code, tests }
    }

    fn render(&self, chunks: Vec<String>) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        if let Some(source) = &self.source {
            out.push_str(&format!("// Source: {source}\n"));
        }
        out.push('\n');
        let body = chunks.join("\n\n");
        let body = if self.rustfmt {
            rustfmt(&body).unwrap_or(body)
        } else {
            body
        };
        out.push_str(&body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    fn round_trip_tests(&self, name: &str) -> TokenStream {
        let rt = &self.runtime;
        let ty = format_ident!("{}", name);
        let snake = to_snake(name);
        let marshal = format_ident!("marshal_unmarshal_{}", snake);
        let encode = format_ident!("encode_decode_{}", snake);
        let under = format!("msgsize under-reports {name}");
        quote! {
            #[test]
            fn #marshal() {
                let v = #ty::default();
                let bts = #rt::to_vec(&v).unwrap();
                assert!(bts.len() <= #rt::Sizer::msgsize(&v), #under);
                let _: #ty = #rt::from_slice(&bts).unwrap();
            }

            #[test]
            fn #encode() {
                let v = #ty::default();
                let streamed = #rt::encode(&v, Vec::new()).unwrap();
                assert_eq!(streamed, #rt::to_vec(&v).unwrap());
                let _: #ty = #rt::decode(streamed.as_slice()).unwrap();
            }
        }
    }
}

fn is_directive(attr: &syn::Attribute) -> bool {
    attr.path().is_ident("packgen") || attr.path().is_ident("msg")
}

/// Drops `#![packgen]`, `#[packgen]` and `#[msg]` attributes. Everything
/// else, including a custom tag attribute, is kept.
fn strip_directives(file: &syn::File) -> syn::File {
    let mut file = file.clone();
    file.attrs.retain(|a| !is_directive(a));
    for item in &mut file.items {
        match item {
            syn::Item::Struct(s) => {
                s.attrs.retain(|a| !is_directive(a));
                for field in s.fields.iter_mut() {
                    field.attrs.retain(|a| !is_directive(a));
                }
            }
            syn::Item::Enum(e) => {
                e.attrs.retain(|a| !is_directive(a));
                for variant in &mut e.variants {
                    variant.attrs.retain(|a| !is_directive(a));
                    for field in variant.fields.iter_mut() {
                        field.attrs.retain(|a| !is_directive(a));
                    }
                }
            }
            _ => {}
        }
    }
    file
}

fn derives_default(attrs: &[syn::Attribute]) -> bool {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.segments.last().is_some_and(|s| s.ident == "Default") {
                found = true;
            }
            Ok(())
        });
    }
    found
}

fn skipped_variant(variant: &syn::Variant) -> bool {
    variant.attrs.iter().filter(|a| a.path().is_ident("msg")).any(|attr| {
        let mut skip = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<syn::Expr>()?;
            }
            Ok(())
        });
        skip
    })
}

/// Types whose default value can drive a round-trip test.
fn testable_types(file: &syn::File) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for item in &file.items {
        match item {
            syn::Item::Struct(s) if derives_default(&s.attrs) => {
                out.insert(s.ident.to_string());
            }
            syn::Item::Enum(e) if derives_default(&e.attrs) => {
                // A skipped default variant cannot be encoded.
                let default_skipped = e
                    .variants
                    .iter()
                    .find(|v| v.attrs.iter().any(|a| a.path().is_ident("default")))
                    .is_some_and(skipped_variant);
                if !default_skipped {
                    out.insert(e.ident.to_string());
                }
            }
            _ => {}
        }
    }
    out
}

fn to_snake(name: &str) -> String {
    use convert_case::{Case, Casing};
    name.to_case(Case::Snake)
}

fn rustfmt(source: &str) -> Option<String> {
    let mut child = Command::new("rustfmt")
        .args(["--edition", "2021"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| debug!("rustfmt unavailable: {e}"))
        .ok()?;
    child.stdin.take()?.write_all(source.as_bytes()).ok()?;
    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        warn!("rustfmt failed, keeping unformatted output");
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratedType;
    use crate::graph::DeclId;

    fn file(src: &str) -> syn::File {
        syn::parse_str(src).unwrap()
    }

    fn generated(names: &[(&str, bool)]) -> GeneratedTypes {
        GeneratedTypes {
            types: names
                .iter()
                .enumerate()
                .map(|(i, (name, generic))| GeneratedType {
                    id: DeclId(i),
                    name: name.to_string(),
                    generic: *generic,
                    impls: quote!(impl Marker for X {}),
                })
                .collect(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn directives_are_stripped_and_other_attributes_kept() {
        let input = file(
            r#"
            #![packgen(limit(arrays = 4))]
            #[derive(Debug, Default)]
            #[packgen(tuple)]
            pub struct A {
                #[msg(omitempty)]
                #[serde(rename = "x")]
                pub x: String,
            }
            "#,
        );
        let unit = Assembler::new().assemble(&input, generated(&[("A", false)]));
        assert!(unit.code.starts_with(HEADER));
        assert!(!unit.code.contains("packgen ("));
        assert!(!unit.code.contains("msg ("));
        assert!(unit.code.contains("serde"));
        assert!(unit.code.contains("derive"));
        assert!(unit.code.contains("impl Marker for X"));
        assert!(unit.tests.is_none());
    }

    #[test]
    fn tests_cover_default_constructible_concrete_types() {
        let input = file(
            r#"
            #[derive(Default)] struct Plain { a: u8 }
            #[derive(Default)] struct Wrap<T> { t: T }
            struct NoDefault { a: u8 }
            #[derive(Default)] enum Good { #[default] A, B(u8) }
            #[derive(Default)] enum Bad { #[default] #[msg(skip)] Hidden, B(u8) }
            "#,
        );
        let names = [
            ("Plain", false),
            ("Wrap", true),
            ("NoDefault", false),
            ("Good", false),
            ("Bad", false),
        ];
        let unit = Assembler::new()
            .with_tests(true)
            .with_source("schema.rs")
            .assemble(&input, generated(&names));
        let tests = unit.tests.unwrap();
        assert!(tests.contains("// Source: schema.rs"));
        assert!(tests.contains("use super :: * ;"));
        assert!(tests.contains("fn marshal_unmarshal_plain"));
        assert!(tests.contains("fn encode_decode_good"));
        assert!(!tests.contains("wrap"));
        assert!(!tests.contains("no_default"));
        assert!(!tests.contains("_bad"));
    }
}
