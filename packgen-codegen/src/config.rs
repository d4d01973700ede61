//! Build-script entry point.
//!
//! ```rust,ignore
//! // build.rs
//! fn main() {
//!     packgen_codegen::Config::new()
//!         .emit_tests(true)
//!         .compile("schema/events.rs", std::env::var("OUT_DIR").unwrap())
//!         .unwrap();
//! }
//! ```

use crate::assembler::{Assembler, GeneratedUnit};
use crate::error::{CodegenError, CodegenResult, GenerateError, ResolutionError};
use crate::generator::{Generator, GeneratorConfig};
use crate::{analyze, Analysis};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// Suffix of generated code files.
pub const CODE_SUFFIX: &str = "_msgp.rs";
/// Suffix of generated test files.
pub const TEST_SUFFIX: &str = "_msgp_test.rs";

#[derive(Debug, Clone)]
pub struct Config {
    runtime: String,
    emit_tests: bool,
    rustfmt: bool,
    strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: "::packgen".into(),
            emit_tests: false,
            rustfmt: false,
            strict: false,
        }
    }
}

/// Result of generating one unit.
#[derive(Debug)]
pub struct Generation {
    pub unit: GeneratedUnit,
    /// Number of types that got impls.
    pub generated: usize,
    pub resolution_errors: Vec<ResolutionError>,
    pub generate_errors: Vec<GenerateError>,
}

impl Generation {
    pub fn is_clean(&self) -> bool {
        self.resolution_errors.is_empty() && self.generate_errors.is_empty()
    }
}

/// Output paths for one input, e.g. `events_msgp.rs` and `events_msgp_test.rs`.
pub fn output_paths(input: &Path, out_dir: &Path) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unit".into());
    (
        out_dir.join(format!("{stem}{CODE_SUFFIX}")),
        out_dir.join(format!("{stem}{TEST_SUFFIX}")),
    )
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the runtime crate in generated code. Defaults to `::packgen`.
    pub fn runtime_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.runtime = path.into();
        self
    }

    pub fn emit_tests(&mut self, enabled: bool) -> &mut Self {
        self.emit_tests = enabled;
        self
    }

    pub fn rustfmt(&mut self, enabled: bool) -> &mut Self {
        self.rustfmt = enabled;
        self
    }

    /// Fail the unit when any type fails, instead of generating the rest.
    pub fn strict(&mut self, enabled: bool) -> &mut Self {
        self.strict = enabled;
        self
    }

    /// Generates code for one source text. `name` labels diagnostics and
    /// the header comment.
    pub fn generate(&self, source: &str, name: &str) -> CodegenResult<Generation> {
        let span = info_span!("unit", name = %name);
        let _enter = span.enter();

        let runtime: syn::Path = syn::parse_str(&self.runtime).map_err(|e| {
            GenerateError::new(name, format!("runtime path `{}` is invalid: {e}", self.runtime))
        })?;
        let file = syn::parse_file(source).map_err(|source| CodegenError::Syntax {
            path: name.to_string(),
            source,
        })?;
        let Analysis { graph, resolved } = analyze(&file)?;
        if self.strict && !resolved.errors.is_empty() {
            return Err(CodegenError::Resolution(resolved.errors));
        }
        for error in &resolved.errors {
            warn!("{error}");
        }

        let generated = Generator::new(&graph, &resolved)
            .with_config(GeneratorConfig::new().with_runtime(&runtime))
            .generate();
        if self.strict {
            if let Some(first) = generated.errors.first() {
                return Err(first.clone().into());
            }
        }
        let generate_errors = generated.errors.clone();
        let count = generated.types.len();
        let unit = Assembler::new()
            .with_runtime(&runtime)
            .with_tests(self.emit_tests)
            .with_rustfmt(self.rustfmt)
            .with_source(name)
            .assemble(&file, generated);
        info!(types = count, "unit generated");

        Ok(Generation {
            unit,
            generated: count,
            resolution_errors: resolved.errors,
            generate_errors,
        })
    }

    /// Reads `input`, generates, and writes the outputs into `out_dir`.
    pub fn compile(&self, input: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> CodegenResult<Generation> {
        let input = input.as_ref();
        let out_dir = out_dir.as_ref();
        let source = fs::read_to_string(input).map_err(|source| CodegenError::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let generation = self.generate(&source, &input.display().to_string())?;

        let (code_path, test_path) = output_paths(input, out_dir);
        write(&code_path, &generation.unit.code)?;
        if let Some(tests) = &generation.unit.tests {
            write(&test_path, tests)?;
        }
        Ok(generation)
    }
}

fn write(path: &Path, contents: &str) -> CodegenResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CodegenError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| CodegenError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        #[derive(Debug, Default)]
        pub struct Point { pub x: i32, pub y: i32 }

        pub struct Broken { pub x: Missing }
    "#;

    #[test]
    fn failed_types_do_not_stop_the_unit() {
        let generation = Config::new().generate(SCHEMA, "points.rs").unwrap();
        assert_eq!(generation.generated, 1);
        assert_eq!(generation.resolution_errors.len(), 1);
        assert!(!generation.is_clean());
        assert!(generation.unit.code.contains("Encodable for Point"));
        assert!(!generation.unit.code.contains("Encodable for Broken"));
    }

    #[test]
    fn strict_mode_fails_the_unit() {
        let err = Config::new().strict(true).generate(SCHEMA, "points.rs").unwrap_err();
        assert!(matches!(err, CodegenError::Resolution(ref errors) if errors.len() == 1));
    }

    #[test]
    fn syntax_errors_name_the_input() {
        let err = Config::new().generate("struct {", "bad.rs").unwrap_err();
        assert!(err.to_string().contains("bad.rs"));
    }

    #[test]
    fn compile_writes_code_and_tests() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("points.rs");
        fs::write(&input, "#[derive(Default)] pub struct Point { pub x: i32 }").unwrap();
        let out = dir.path().join("out");
        Config::new().emit_tests(true).compile(&input, &out).unwrap();

        let code = fs::read_to_string(out.join("points_msgp.rs")).unwrap();
        assert!(code.starts_with(crate::assembler::HEADER));
        let tests = fs::read_to_string(out.join("points_msgp_test.rs")).unwrap();
        assert!(tests.contains("marshal_unmarshal_point"));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::new()
            .compile(dir.path().join("nope.rs"), dir.path())
            .unwrap_err();
        assert!(matches!(err, CodegenError::Io { .. }));
    }
}
