//! Error types for the code generator.
//!
//! Resolution failures are per type: one bad declaration aborts only its
//! own emission while the rest of the unit continues. Directive and syntax
//! errors at file scope abort the whole unit.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unit-level operations.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Top-level error for processing one input unit.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The input is not valid Rust.
    #[error("syntax error in {path}: {source}")]
    Syntax {
        path: String,
        #[source]
        source: syn::Error,
    },

    /// A file-scope directive is malformed.
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    /// Some types failed to resolve and the caller asked for strictness.
    #[error("{} type(s) failed to resolve:\n{}", .0.len(), render_all(.0))]
    Resolution(Vec<ResolutionError>),

    /// Emitting code for a type failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// Reading input or writing output failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn render_all(errors: &[ResolutionError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A malformed directive.
#[derive(Debug, Clone, Error)]
#[error("invalid directive: {message}")]
pub struct DirectiveError {
    pub message: String,
}

impl DirectiveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<darling::Error> for DirectiveError {
    fn from(err: darling::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<syn::Error> for DirectiveError {
    fn from(err: syn::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Emission failure for one type, such as a member or path the
/// generator cannot render as tokens.
#[derive(Debug, Clone, Error)]
#[error("cannot generate `{type_name}`: {message}")]
pub struct GenerateError {
    pub type_name: String,
    pub message: String,
}

impl GenerateError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// A type that cannot be turned into generated code.
#[derive(Debug, Clone, Error)]
#[error("{type_name}: {kind}")]
pub struct ResolutionError {
    /// The declaration that failed.
    pub type_name: String,
    pub kind: ResolutionErrorKind,
}

impl serde::Serialize for ResolutionError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = s.serialize_struct("ResolutionError", 2)?;
        st.serialize_field("type_name", &self.type_name)?;
        st.serialize_field("message", &self.kind.to_string())?;
        st.end()
    }
}

impl ResolutionError {
    pub fn new(type_name: impl Into<String>, kind: ResolutionErrorKind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
        }
    }
}

/// Why a type failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionErrorKind {
    /// A bare name refers to nothing declared in the unit.
    #[error("unresolved type `{name}`")]
    UnresolvedReference { name: String },

    /// A path type from elsewhere has no directive telling how to encode it.
    #[error(
        "external type `{path}` needs an `external`, `replace`, `shim`, `intercept`, \
         `binary` or `text` directive"
    )]
    UnshimmedExternal { path: String },

    /// A generic parameter lacks a bound the generated code relies on.
    #[error("generic parameter `{param}` must be bounded by `{capability}`")]
    MissingCapability {
        param: String,
        capability: &'static str,
    },

    #[error("`{base}` expects {expected} type argument(s), found {found}")]
    GenericArity {
        base: String,
        expected: usize,
        found: usize,
    },

    #[error("`{arg}` cannot instantiate `{param}` of `{base}`: {reason}")]
    GenericConstraint {
        base: String,
        param: String,
        arg: String,
        reason: String,
    },

    #[error("unsupported type `{ty}`: {reason}")]
    UnsupportedType { ty: String, reason: String },

    /// A by-value reference cycle with no indirection.
    #[error("infinite size through {}", .cycle.join(" -> "))]
    InfiniteSize { cycle: Vec<String> },

    #[error("cannot flatten `{field}`: {reason}")]
    InvalidFlatten { field: String, reason: String },

    #[error("depends on `{dependency}`, which failed to resolve")]
    DependsOnFailed { dependency: String },

    #[error("unsupported variant `{variant}`: {reason}")]
    UnsupportedVariant { variant: String, reason: String },

    /// A malformed item or field directive.
    #[error("{0}")]
    Directive(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_names_the_type() {
        let err = ResolutionError::new(
            "Order",
            ResolutionErrorKind::InfiniteSize {
                cycle: vec!["Order".into(), "Line".into(), "Order".into()],
            },
        );
        assert_eq!(
            err.to_string(),
            "Order: infinite size through Order -> Line -> Order"
        );
    }

    #[test]
    fn unit_error_lists_each_failure() {
        let err = CodegenError::Resolution(vec![
            ResolutionError::new(
                "A",
                ResolutionErrorKind::UnresolvedReference { name: "B".into() },
            ),
            ResolutionError::new(
                "C",
                ResolutionErrorKind::DependsOnFailed {
                    dependency: "A".into(),
                },
            ),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 type(s) failed to resolve"));
        assert!(text.contains("A: unresolved type `B`"));
        assert!(text.contains("C: depends on `A`"));
    }
}
