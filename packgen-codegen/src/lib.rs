//! # packgen-codegen
//!
//! Compiles Rust type declarations into MessagePack codecs.
//!
//! A schema is an ordinary Rust source file. Its structs and enums are read
//! with `syn`, resolved into a [`TypeGraph`](graph::TypeGraph), configured by
//! directives, and given impls of the `packgen` runtime traits.
//!
//! ## Pipeline
//!
//! 1. [`graph`]: the Type Graph Builder turns declarations into an arena of
//!    typed nodes, splicing flattened fields and monomorphizing generics.
//! 2. [`resolver`]: the Directive Resolver computes the effective layout,
//!    omission policy, limits and key strategy of every type and field.
//! 3. [`generator`]: the Code Generation Engine emits the six trait impls.
//! 4. [`assembler`]: the Emission Output Assembler writes the final file and
//!    an optional test file.
//!
//! [`Config`] drives the whole pipeline, from a build script or the CLI.
//!
//! ## Directives
//!
//! ```rust,ignore
//! #![packgen(limit(arrays = 1024), map_keys = "auto_shim")]
//!
//! #[derive(Debug, Default)]
//! pub struct Event {
//!     pub id: u64,
//!     #[msg(rename = "ts", omitempty)]
//!     pub timestamp: Option<std::time::SystemTime>,
//!     #[msg(allownil, limit = 16)]
//!     pub tags: Option<Vec<String>>,
//! }
//! ```

pub mod assembler;
pub mod config;
pub mod directives;
pub mod error;
pub mod generator;
pub mod graph;
pub mod resolver;

pub use assembler::{Assembler, GeneratedUnit};
pub use config::{Config, Generation};
pub use directives::FileDirectives;
pub use error::{CodegenError, CodegenResult, DirectiveError, GenerateError, ResolutionError};
pub use generator::{GeneratedType, GeneratedTypes, Generator, GeneratorConfig};
pub use graph::{TypeGraph, TypeGraphBuilder};
pub use resolver::{DirectiveResolver, ResolvedUnit};

use serde::Serialize;

/// A unit after graph construction and directive resolution.
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub graph: TypeGraph,
    /// Resolved types. Errors from both stages are collected here.
    pub resolved: ResolvedUnit,
}

/// Builds the type graph of a parsed file and resolves its directives.
pub fn analyze(file: &syn::File) -> CodegenResult<Analysis> {
    let directives = FileDirectives::from_attrs(&file.attrs)?;
    let built = TypeGraphBuilder::build(file, &directives);
    let mut resolved = DirectiveResolver::resolve(&built.graph, &directives);
    let mut errors = built.errors;
    errors.append(&mut resolved.errors);
    resolved.errors = errors;
    Ok(Analysis {
        graph: built.graph,
        resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_serializes_for_dumping() {
        let file: syn::File = syn::parse_str(
            "#[derive(Default)] struct A { #[msg(omitempty)] name: String, n: Option<u8> }",
        )
        .unwrap();
        let analysis = analyze(&file).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["graph"]["decls"][0]["name"], "A");
        assert_eq!(
            json["resolved"]["types"][0]["fields"][0]["policy"],
            "omit_if_default_bit_pattern"
        );
    }

    #[test]
    fn malformed_file_directive_aborts() {
        let file: syn::File = syn::parse_str("#![packgen(nonsense)] struct A;").unwrap();
        assert!(matches!(analyze(&file), Err(CodegenError::Directive(_))));
    }
}
