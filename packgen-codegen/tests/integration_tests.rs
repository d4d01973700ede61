//! Integration tests for the generation pipeline.
//!
//! These tests drive `Config::generate` end to end and check the emitted
//! source for the calls each directive should produce.

use packgen_codegen::resolver::{EmptinessPolicy, KeyStrategy, Layout};
use packgen_codegen::{analyze, CodegenError, Config};
use proc_macro2::TokenStream;
use quote::quote;

fn generate(src: &str) -> String {
    Config::new().strict(true).generate(src, "test.rs").unwrap().unit.code
}

fn has(code: &str, fragment: TokenStream) -> bool {
    code.contains(&fragment.to_string())
}

fn field_policy(src: &str, ty: &str, field: usize) -> EmptinessPolicy {
    let file: syn::File = syn::parse_str(src).unwrap();
    let analysis = analyze(&file).unwrap();
    let resolved = analysis
        .resolved
        .types
        .iter()
        .find(|t| t.name == ty)
        .unwrap();
    resolved.fields[field].policy
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_map_layout_by_default() {
    let code = generate("#[derive(Default)] pub struct User { pub name: String, pub age: u32 }");
    assert!(has(&code, quote!(w.write_map_header(2)?;)));
    assert!(has(&code, quote!(w.write_str(&self.name)?;)));
    assert!(has(&code, quote!(w.write_uint(self.age as u64)?;)));
    assert!(has(&code, quote!(self.age = r.read_u32())));
}

#[test]
fn test_file_scope_tuple_directive() {
    let code = generate("#![packgen(tuple(Point))] #[derive(Default)] pub struct Point { x: f64, y: f64 }");
    assert!(has(&code, quote!(w.write_array_header(2)?;)));
    assert!(has(&code, quote!(::packgen::Error::arity(2, __n))));
}

#[test]
fn test_tuple_structs_are_positional() {
    let file: syn::File = syn::parse_str("pub struct Pair(pub u8, pub String);").unwrap();
    let analysis = analyze(&file).unwrap();
    assert_eq!(analysis.resolved.types[0].layout, Layout::Tuple);
    let code = generate("pub struct Pair(pub u8, pub String);");
    assert!(has(&code, quote!(w.write_str(&self.1)?;)));
}

// =============================================================================
// Directive Precedence Tests
// =============================================================================

#[test]
fn test_omitisempty_beats_omitzero_and_omitempty() {
    let src = r#"
        #![packgen(zero_test(Money), empty_test(Money), external(Money))]
        pub struct Wallet {
            #[msg(omitempty, omitzero, omitisempty)]
            pub balance: Money,
            #[msg(omitempty, omitzero)]
            pub pending: Money,
        }
    "#;
    assert_eq!(field_policy(src, "Wallet", 0), EmptinessPolicy::OmitIfCustomEmpty);
    assert_eq!(field_policy(src, "Wallet", 1), EmptinessPolicy::OmitIfCustomZero);

    let code = generate(src);
    assert!(has(&code, quote!(::packgen::IsEmpty::is_empty_value(&self.balance))));
    assert!(has(&code, quote!(::packgen::IsZero::is_zero(&self.pending))));
}

#[test]
fn test_omitzero_without_capability_falls_back_to_structural_zero() {
    let src = "pub struct Counter { #[msg(omitzero)] pub hits: u64 }";
    assert_eq!(field_policy(src, "Counter", 0), EmptinessPolicy::OmitIfDefaultBitPattern);
    let code = generate(src);
    assert!(has(&code, quote!(if self.hits == 0)));
}

#[test]
fn test_tuple_layout_neutralizes_omission() {
    let src = "#[packgen(tuple)] pub struct Row { #[msg(omitempty)] pub label: String, pub n: u8 }";
    assert_eq!(field_policy(src, "Row", 0), EmptinessPolicy::Always);
    assert!(!generate(src).contains("__omit"));
}

#[test]
fn test_skipped_fields_are_not_emitted() {
    let code = generate("pub struct S { pub a: u8, #[msg(skip)] pub cache: Vec<u8> }");
    assert!(has(&code, quote!(w.write_map_header(1)?;)));
    assert!(!code.contains("cache"));
}

// =============================================================================
// Limits And Nil Tests
// =============================================================================

#[test]
fn test_field_limit_overrides_file_limit() {
    let code = generate(
        r#"
        #![packgen(limit(arrays = 100, maps = 10))]
        pub struct Batch {
            #[msg(limit = 3)]
            pub ids: Vec<u64>,
            pub names: Vec<String>,
            pub index: std::collections::HashMap<String, u32>,
        }
        "#,
    );
    assert!(has(&code, quote!(if __n0 > 3)));
    assert!(has(&code, quote!(if __n0 > 100)));
    assert!(has(&code, quote!(if __n0 > 10)));
    assert!(has(&code, quote!(::packgen::Container::Map)));
}

#[test]
fn test_allownil_keeps_nil_on_the_wire() {
    let code = generate(
        r#"
        #[derive(Default)]
        pub struct Lists {
            pub a: Option<Vec<String>>,
            #[msg(allownil)]
            pub b: Option<Vec<String>>,
        }
        "#,
    );
    assert!(has(&code, quote!(self.a = Some(Default::default());)));
    assert!(has(&code, quote!(self.b = None;)));
}

// =============================================================================
// Map Key Tests
// =============================================================================

#[test]
fn test_integer_keys_need_auto_shim() {
    let src = "pub struct Hist { pub buckets: std::collections::BTreeMap<u16, u64> }";
    let err = Config::new().strict(true).generate(src, "hist.rs").unwrap_err();
    assert!(matches!(err, CodegenError::Resolution(_)));

    let code = generate(&format!("#![packgen(map_keys = \"auto_shim\")] {src}"));
    assert!(has(&code, quote!(<u16 as ::packgen::MapKey>::from_key)));
    assert!(has(&code, quote!(::packgen::MapKey::to_key(__k0))));
}

#[test]
fn test_key_strategy_levels_are_cumulative() {
    use packgen_codegen::directives::KeyMode;
    use packgen_codegen::resolver::key_strategy;

    let file: syn::File =
        syn::parse_str("pub struct K { pub m: std::collections::HashMap<[u8; 4], u8> }").unwrap();
    let analysis = analyze(&file).unwrap();
    let decl = analysis.graph.lookup("K").unwrap();
    let field = &decl.as_struct().unwrap().fields[0];
    let packgen_codegen::graph::TypeNode::Map { key, .. } = &field.node else {
        panic!("expected a map");
    };
    assert_eq!(key_strategy(&analysis.graph, key, KeyMode::Native), KeyStrategy::Unsupported);
    assert_eq!(key_strategy(&analysis.graph, key, KeyMode::Binary), KeyStrategy::BinaryKey);
    assert_eq!(key_strategy(&analysis.graph, key, KeyMode::AutoShim), KeyStrategy::BinaryKey);
}

// =============================================================================
// External Type Tests
// =============================================================================

#[test]
fn test_replace_converts_through_local_type() {
    let code = generate(
        r#"
        #![packgen(replace(ty = "net::Addr", with = "AddrWire"))]
        #[derive(Default)]
        pub struct AddrWire { pub ip: String, pub port: u16 }
        pub struct Peer { pub addr: net::Addr }
        "#,
    );
    assert!(has(&code, quote!(let __t0: AddrWire = ::std::convert::From::from(&self.addr);)));
    assert!(has(&code, quote!(self.addr = ::std::convert::From::from(__t0);)));
}

#[test]
fn test_intercept_calls_the_provider() {
    let code = generate(
        r#"
        #![packgen(intercept(ty = "Secret", using = "crate::REDACT"))]
        pub struct Login { pub password: Secret }
        "#,
    );
    assert!(has(&code, quote!(::packgen::Interceptor::encode(&crate::REDACT, &self.password, w)?;)));
    assert!(has(&code, quote!(::packgen::Interceptor::msgsize(&crate::REDACT, &self.password))));
}

#[test]
fn test_text_capability_writes_bin() {
    let code = generate(
        r#"
        #![packgen(text(uuid::Uuid))]
        pub struct Row { pub id: uuid::Uuid }
        "#,
    );
    assert!(has(&code, quote!(::packgen::TextMarshal::marshal_text(&self.id))));
    assert!(has(&code, quote!(w.write_bin(__t0.as_bytes())?;)));
}

#[test]
fn test_unshimmed_external_fails_only_its_type() {
    let generation = Config::new()
        .generate(
            "pub struct Good { pub a: u8 } pub struct Bad { pub at: chrono::DateTime }",
            "mixed.rs",
        )
        .unwrap();
    assert_eq!(generation.generated, 1);
    assert_eq!(generation.resolution_errors[0].type_name, "Bad");
}
