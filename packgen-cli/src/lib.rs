//! # packgen-cli
//!
//! Library behind the `packgen` binary: configuration, schema file
//! discovery, batch generation and output writing.
//!
//! - [`config`] - `packgen.toml` loading and CLI overrides
//! - [`scanner`] - schema file discovery and filtering
//! - [`pipeline`] - per-file generation and staleness checks
//! - [`writer`] - file output and dry-run support
//! - [`error`] - error types

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scanner;
pub mod writer;

pub use config::{Config, ConfigManager};
pub use error::{CliError, CliResult};
pub use pipeline::{Batch, UnitGenerator, UnitOutput};
pub use scanner::{SourceFile, SourceScanner};
pub use writer::{Freshness, OutputWriter, WriteResult, WriteSummary};
