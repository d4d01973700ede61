//! Runs the code generator over discovered schema files.
//!
//! Each file is an independent unit. A unit that fails does not stop the
//! others; failures are collected and reported together.

use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::scanner::SourceFile;
use crate::writer::is_stale;
use packgen_codegen::config::output_paths;
use std::path::{Path, PathBuf};
use tracing::{info_span, warn};

/// Generated files for one schema file.
#[derive(Debug)]
pub struct UnitOutput {
    pub source: PathBuf,
    /// `(path, content)` of the code file, then the test file if enabled.
    pub files: Vec<(PathBuf, String)>,
    /// Types that received impls.
    pub generated: usize,
    /// Per-type failures that were skipped in non-strict mode.
    pub warnings: Vec<String>,
}

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct Batch {
    pub units: Vec<UnitOutput>,
    pub failures: Vec<CliError>,
}

impl Batch {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.units.iter().all(|u| u.warnings.is_empty())
    }

    /// Output files whose content on disk differs from the generated content.
    pub fn stale_files(&self) -> Vec<&Path> {
        self.units
            .iter()
            .flat_map(|u| u.files.iter())
            .filter(|(path, content)| is_stale(path, content))
            .map(|(path, _)| path.as_path())
            .collect()
    }
}

/// Generates units according to a CLI [`Config`].
#[derive(Debug)]
pub struct UnitGenerator {
    codegen: packgen_codegen::Config,
    out_dir: Option<PathBuf>,
}

impl UnitGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            codegen: config.codegen(),
            out_dir: config.output.dir.clone(),
        }
    }

    /// Directory receiving the outputs of `file`. With an output directory,
    /// the file's location under its input is mirrored so equal stems in
    /// different directories cannot collide.
    pub fn out_dir_for(&self, file: &SourceFile) -> PathBuf {
        match &self.out_dir {
            Some(dir) => match file.relative_path.parent() {
                Some(sub) => dir.join(sub),
                None => dir.clone(),
            },
            None => file
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    pub fn generate(&self, file: &SourceFile) -> CliResult<UnitOutput> {
        let span = info_span!("file", path = %file.path.display());
        let _enter = span.enter();

        let name = file.relative_path.to_string_lossy().replace('\\', "/");
        let generation = self
            .codegen
            .generate(&file.content, &name)
            .map_err(|e| CliError::codegen(&file.path, e))?;

        let (code_path, test_path) = output_paths(&file.path, &self.out_dir_for(file));
        let mut files = vec![(code_path, generation.unit.code)];
        if let Some(tests) = generation.unit.tests {
            files.push((test_path, tests));
        }

        let warnings: Vec<String> = generation
            .resolution_errors
            .iter()
            .map(ToString::to_string)
            .chain(generation.generate_errors.iter().map(ToString::to_string))
            .collect();

        Ok(UnitOutput {
            source: file.path.clone(),
            files,
            generated: generation.generated,
            warnings,
        })
    }

    pub fn generate_all(&self, files: &[SourceFile]) -> Batch {
        let mut batch = Batch::default();
        for file in files {
            match self.generate(file) {
                Ok(unit) => batch.units.push(unit),
                Err(e) => {
                    warn!("{e}");
                    batch.failures.push(e);
                }
            }
        }
        batch
    }
}
