//! Configuration management for the CLI.
//!
//! Settings come from `packgen.toml` and are overridden by command-line
//! arguments.

use crate::error::{CliResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration filename.
pub const CONFIG_FILENAME: &str = "packgen.toml";

/// Main configuration structure.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub codegen: CodegenConfig,
}

/// Where schema files are found.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Schema files or directories to scan.
    pub paths: Vec<PathBuf>,

    /// Glob applied to paths relative to each scanned directory.
    pub filter: Option<String>,
}

/// Where and how generated files are written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory. Outputs go next to their input when unset.
    pub dir: Option<PathBuf>,

    /// Also emit `<stem>_msgp_test.rs` round-trip tests.
    pub tests: bool,

    /// Format outputs with `rustfmt` when it is installed.
    pub rustfmt: bool,
}

/// Code generation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Path of the runtime crate in generated code.
    pub runtime: String,

    /// Fail a unit when any of its types fails.
    pub strict: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("schema")],
            filter: None,
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            runtime: "::packgen".to_string(),
            strict: false,
        }
    }
}

impl Config {
    /// Rejects values that would only fail later, mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.paths.is_empty() {
            return Err(ConfigError::invalid_value("input.paths", "at least one path is required"));
        }
        if let Err(e) = syn::parse_str::<syn::Path>(&self.codegen.runtime) {
            return Err(ConfigError::invalid_value("codegen.runtime", e.to_string()));
        }
        if let Some(filter) = &self.input.filter {
            if let Err(e) = glob::Pattern::new(filter) {
                return Err(ConfigError::invalid_value("input.filter", e.to_string()));
            }
        }
        Ok(())
    }

    /// Builder for the code generator with these settings applied.
    pub fn codegen(&self) -> packgen_codegen::Config {
        let mut config = packgen_codegen::Config::new();
        config
            .runtime_path(self.codegen.runtime.clone())
            .emit_tests(self.output.tests)
            .rustfmt(self.output.rustfmt)
            .strict(self.codegen.strict);
        config
    }
}

/// Configuration manager for loading and merging configs.
pub struct ConfigManager;

impl ConfigManager {
    /// Loads configuration from `path`, or from `packgen.toml` in the
    /// working directory. A missing default file yields defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> CliResult<Config> {
        let config_path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));

        if !config_path.exists() {
            if path.is_some() {
                return Err(ConfigError::NotFound { path: config_path }.into());
            }
            tracing::debug!("no {CONFIG_FILENAME}, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::invalid_toml(config_path, e.to_string()))?;

        Ok(config)
    }

    /// Merges CLI arguments into configuration. CLI arguments take
    /// precedence over config file values.
    pub fn merge_cli_args(mut config: Config, args: &CliArgs) -> Config {
        if !args.inputs.is_empty() {
            config.input.paths = args.inputs.clone();
        }

        if let Some(ref filter) = args.filter {
            config.input.filter = Some(filter.clone());
        }

        if let Some(ref output) = args.output {
            config.output.dir = Some(output.clone());
        }

        if let Some(tests) = args.tests {
            config.output.tests = tests;
        }

        if let Some(rustfmt) = args.rustfmt {
            config.output.rustfmt = rustfmt;
        }

        if let Some(ref runtime) = args.runtime {
            config.codegen.runtime = runtime.clone();
        }

        if let Some(strict) = args.strict {
            config.codegen.strict = strict;
        }

        config
    }

    /// Default configuration file content with comments.
    pub fn default_config_content() -> &'static str {
        r#"# packgen configuration file

[input]
# Schema files or directories containing schema files
paths = ["schema"]

# Optional glob to select files inside the directories above
# filter = "**/*.rs"

[output]
# Output directory; when unset each output is written next to its input
# dir = "src/generated"

# Emit <stem>_msgp_test.rs round-trip tests alongside the code
tests = false

# Format generated files with rustfmt when it is installed
rustfmt = false

[codegen]
# Path of the runtime crate as seen from the generated code
runtime = "::packgen"

# Fail a whole file when any of its types cannot be generated
strict = false
"#
    }
}

/// CLI arguments that can override configuration.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Input paths override. Empty keeps the configured paths.
    pub inputs: Vec<PathBuf>,
    pub filter: Option<String>,
    pub output: Option<PathBuf>,
    pub tests: Option<bool>,
    pub rustfmt: Option<bool>,
    pub runtime: Option<String>,
    pub strict: Option<bool>,
}
