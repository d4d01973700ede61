//! Schema file discovery.
//!
//! Inputs are files or directories. Directories are walked recursively,
//! respecting `.gitignore` patterns and an optional glob filter. Files that
//! packgen itself generated are never picked up as inputs.

use crate::error::{CliResult, ScanError};
use ignore::WalkBuilder;
use packgen_codegen::config::{CODE_SUFFIX, TEST_SUFFIX};
use std::path::{Path, PathBuf};

/// A discovered schema file with its content.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,

    /// Path relative to the input it was found under. For an input that is
    /// itself a file, this is its file name.
    pub relative_path: PathBuf,

    pub content: String,
}

/// Scanner for discovering schema files.
#[derive(Debug)]
pub struct SourceScanner {
    roots: Vec<PathBuf>,
    respect_gitignore: bool,
    filter: Option<glob::Pattern>,
}

/// True for files packgen wrote, e.g. `user_msgp.rs`.
pub fn is_generated(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(CODE_SUFFIX) || n.ends_with(TEST_SUFFIX))
}

impl SourceScanner {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            respect_gitignore: true,
            filter: None,
        }
    }

    pub fn with_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Only directory entries whose relative path matches `pattern` are
    /// included. Inputs named directly are always included.
    pub fn with_filter(mut self, pattern: &str) -> Result<Self, ScanError> {
        let glob_pattern = glob::Pattern::new(pattern)
            .map_err(|e| ScanError::invalid_pattern(pattern, e.to_string()))?;
        self.filter = Some(glob_pattern);
        Ok(self)
    }

    /// Returns every schema file under the inputs, sorted by path.
    pub fn scan(&self) -> CliResult<Vec<SourceFile>> {
        let mut files = Vec::new();
        for root in &self.roots {
            if !root.exists() {
                return Err(ScanError::not_found(root.clone()).into());
            }
            if root.is_file() {
                let relative = root.file_name().map(PathBuf::from).unwrap_or_default();
                files.push(read(root, relative)?);
            } else {
                self.walk(root, &mut files)?;
            }
        }

        if files.is_empty() {
            return Err(ScanError::no_schema_files(self.roots.clone()).into());
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        tracing::debug!(count = files.len(), "schema files discovered");
        Ok(files)
    }

    /// Scan without failing on empty results.
    pub fn scan_allow_empty(&self) -> CliResult<Vec<SourceFile>> {
        match self.scan() {
            Ok(files) => Ok(files),
            Err(crate::error::CliError::Scan(ScanError::NoSchemaFiles { .. })) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn walk(&self, root: &Path, files: &mut Vec<SourceFile>) -> CliResult<()> {
        let walker = WalkBuilder::new(root)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .hidden(false)
            .build();

        for entry in walker {
            let entry = entry.map_err(ScanError::Walk)?;
            let path = entry.path();

            if !path.is_file() || path.extension().map_or(true, |ext| ext != "rs") {
                continue;
            }
            if is_generated(path) {
                tracing::trace!(path = %path.display(), "skipping generated file");
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            if let Some(ref pattern) = self.filter {
                if !pattern.matches_path(&relative) {
                    continue;
                }
            }

            files.push(read(path, relative)?);
        }
        Ok(())
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

fn read(path: &Path, relative_path: PathBuf) -> CliResult<SourceFile> {
    let content = std::fs::read_to_string(path).map_err(|e| ScanError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(SourceFile {
        path: path.to_path_buf(),
        relative_path,
        content,
    })
}
