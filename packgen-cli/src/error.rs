//! Failures of the `packgen` binary.
//!
//! Codegen failures are kept per schema file so one broken schema can be
//! reported next to the units that generated fine. `Stale` is not a fault
//! in the tool; it is how `packgen check` tells CI to regenerate.

use packgen_codegen::CodegenError;
use std::path::PathBuf;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot collect schema files: {0}")]
    Scan(#[from] ScanError),

    #[error("{path}: {source}")]
    Codegen {
        path: PathBuf,
        #[source]
        source: CodegenError,
    },

    #[error("bad configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot write generated code: {0}")]
    Write(#[from] WriteError),

    #[error("{count} generated file(s) differ from their schema")]
    Stale { count: usize },

    /// `init` found a config file and `--force` was not given.
    #[error("{0}")]
    Refused(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn codegen(path: impl Into<PathBuf>, source: CodegenError) -> Self {
        Self::Codegen {
            path: path.into(),
            source,
        }
    }

    /// 2 for stale outputs, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Stale { .. } => 2,
            _ => 1,
        }
    }
}

/// Failure to turn `input.paths` into a list of schema files.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("input {path} does not exist")]
    NotFound { path: PathBuf },

    /// Inputs exist but hold no `.rs` file other than generated ones.
    #[error("no schema files under {}", display_paths(.paths))]
    NoSchemaFiles { paths: Vec<PathBuf> },

    #[error("filter `{pattern}` is not a glob: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("cannot read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

/// Problems with `packgen.toml` or the flags merged over it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Only raised for a file named with `-c`; a missing default file
    /// falls back to built-in settings.
    #[error("{path} does not exist")]
    NotFound { path: PathBuf },

    #[error("{path} is not valid TOML: {message}")]
    InvalidToml { path: PathBuf, message: String },

    #[error("`{key}`: {message}")]
    InvalidValue { key: String, message: String },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to persist a `_msgp.rs` or `_msgp_test.rs` file.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot save {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    let shown: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
    shown.join(", ")
}

impl ScanError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn no_schema_files(paths: Vec<PathBuf>) -> Self {
        Self::NoSchemaFiles { paths }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl ConfigError {
    pub fn invalid_toml(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidToml {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
