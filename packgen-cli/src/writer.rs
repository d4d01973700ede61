//! Persists generated `_msgp.rs` files.
//!
//! A file whose content already matches is not rewritten. Schema crates
//! `include!` these files, and touching them would make cargo rebuild.

use crate::error::{CliResult, WriteError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a file on disk compares with freshly generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No file, or one that cannot be read.
    Missing,
    Outdated,
    Current,
}

impl Freshness {
    pub fn of(path: &Path, content: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(existing) if existing == content => Freshness::Current,
            Ok(_) => Freshness::Outdated,
            Err(_) => Freshness::Missing,
        }
    }
}

/// Whether `path` needs regenerating to hold `content`.
pub fn is_stale(path: &Path, content: &str) -> bool {
    Freshness::of(path, content) != Freshness::Current
}

#[derive(Debug)]
pub enum WriteResult {
    Created { path: PathBuf, bytes: usize },
    Updated { path: PathBuf, bytes: usize },
    Unchanged { path: PathBuf },
    /// Nothing was touched. `freshness` is what a real run would have found.
    DryRun {
        path: PathBuf,
        content: String,
        freshness: Freshness,
    },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Created { path, .. }
            | WriteResult::Updated { path, .. }
            | WriteResult::Unchanged { path }
            | WriteResult::DryRun { path, .. } => path,
        }
    }

    /// True when the file on disk now differs from before the call.
    pub fn changed(&self) -> bool {
        matches!(self, WriteResult::Created { .. } | WriteResult::Updated { .. })
    }

    pub fn bytes(&self) -> usize {
        match self {
            WriteResult::Created { bytes, .. } | WriteResult::Updated { bytes, .. } => *bytes,
            _ => 0,
        }
    }
}

/// Counts over one `generate` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl WriteSummary {
    fn record(&mut self, result: &WriteResult) {
        match result {
            WriteResult::Created { .. } => self.created += 1,
            WriteResult::Updated { .. } => self.updated += 1,
            WriteResult::Unchanged { .. } => self.unchanged += 1,
            WriteResult::DryRun { .. } => {}
        }
    }
}

#[derive(Debug)]
pub struct OutputWriter {
    dry_run: bool,
}

impl OutputWriter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Saves one generated file, creating its directory on first use.
    pub fn write(&self, path: &Path, content: &str) -> CliResult<WriteResult> {
        let freshness = Freshness::of(path, content);
        if self.dry_run {
            return Ok(WriteResult::DryRun {
                path: path.to_path_buf(),
                content: content.to_string(),
                freshness,
            });
        }
        if freshness == Freshness::Current {
            debug!(path = %path.display(), "output unchanged");
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| WriteError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "output saved");

        let path = path.to_path_buf();
        let bytes = content.len();
        Ok(match freshness {
            Freshness::Missing => WriteResult::Created { path, bytes },
            _ => WriteResult::Updated { path, bytes },
        })
    }

    /// Saves every `(path, content)` pair in order and stops at the first
    /// failure. `report` sees each result as it happens.
    pub fn write_all<'f, I, F>(&self, files: I, mut report: F) -> CliResult<WriteSummary>
    where
        I: IntoIterator<Item = &'f (PathBuf, String)>,
        F: FnMut(&WriteResult),
    {
        let mut summary = WriteSummary::default();
        for (path, content) in files {
            let result = self.write(path, content)?;
            summary.record(&result);
            report(&result);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CODE: &str = "// Code generated by packgen. DO NOT EDIT.\n";

    #[test]
    fn test_first_write_creates_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_msgp.rs");

        let result = OutputWriter::new(false).write(&path, CODE).unwrap();

        assert!(matches!(result, WriteResult::Created { .. }));
        assert_eq!(result.bytes(), CODE.len());
        assert_eq!(fs::read_to_string(&path).unwrap(), CODE);
    }

    #[test]
    fn test_mirrored_subdirectories_are_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gen/events/session_msgp.rs");

        assert!(OutputWriter::new(false).write(&path, CODE).unwrap().changed());
        assert!(path.exists());
    }

    #[test]
    fn test_regenerating_identical_code_leaves_the_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_msgp.rs");
        let writer = OutputWriter::new(false);

        writer.write(&path, CODE).unwrap();
        let second = writer.write(&path, CODE).unwrap();

        assert!(matches!(second, WriteResult::Unchanged { .. }));
        assert_eq!(second.bytes(), 0);
        assert_eq!(second.path(), path);

        let third = writer.write(&path, "// regenerated\n").unwrap();
        assert!(matches!(third, WriteResult::Updated { .. }));
    }

    #[test]
    fn test_dry_run_reports_without_touching_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_msgp.rs");

        let writer = OutputWriter::new(true);
        assert!(writer.is_dry_run());
        let result = writer.write(&path, CODE).unwrap();

        assert!(!path.exists());
        assert!(!result.changed());
        match result {
            WriteResult::DryRun {
                content, freshness, ..
            } => {
                assert_eq!(content, CODE);
                assert_eq!(freshness, Freshness::Missing);
            }
            other => panic!("expected a dry run, got {other:?}"),
        }
    }

    #[test]
    fn test_freshness() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_msgp.rs");

        assert_eq!(Freshness::of(&path, CODE), Freshness::Missing);
        assert!(is_stale(&path, CODE));
        fs::write(&path, CODE).unwrap();
        assert_eq!(Freshness::of(&path, CODE), Freshness::Current);
        assert!(!is_stale(&path, CODE));
        assert_eq!(Freshness::of(&path, "// different\n"), Freshness::Outdated);
    }

    #[test]
    fn test_write_all_summarizes() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            (dir.path().join("a_msgp.rs"), CODE.to_string()),
            (dir.path().join("b_msgp.rs"), CODE.to_string()),
        ];
        fs::write(&files[1].0, CODE).unwrap();

        let mut seen = Vec::new();
        let summary = OutputWriter::new(false)
            .write_all(&files, |r| seen.push(r.path().to_path_buf()))
            .unwrap();

        assert_eq!(
            summary,
            WriteSummary {
                created: 1,
                updated: 0,
                unchanged: 1
            }
        );
        assert_eq!(seen, vec![files[0].0.clone(), files[1].0.clone()]);
    }
}
