//! Per-file analysis driver.
//!
//! Each input is parsed once; the graph, structure, relationship and outline
//! passes all run over the same [`ParsedSource`]. Files are independent, so a
//! batch is analyzed in parallel with one builder per file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cfg::{self, BuildOptions, ControlFlowGraph};
use crate::comments::Comments;
use crate::config::Settings;
use crate::parser::{parse_source, ParsedSource, SyntaxError};
use crate::structure::{self, OutlineNode, Relationships, Structure};

/// Why one input could not be analyzed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{path}: {source}")]
    Syntax {
        path: String,
        #[source]
        source: SyntaxError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl AnalysisError {
    pub fn path(&self) -> &str {
        match self {
            AnalysisError::Syntax { path, .. } | AnalysisError::Io { path, .. } => path,
        }
    }

    /// The syntax error, when parsing was what failed.
    pub fn syntax(&self) -> Option<&SyntaxError> {
        match self {
            AnalysisError::Syntax { source, .. } => Some(source),
            AnalysisError::Io { .. } => None,
        }
    }
}

/// One parsed input, ready for any of the passes.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    /// Display path (relative to the analysis base when possible; `-` for stdin).
    pub path: String,
    pub parsed: ParsedSource,
}

impl FileAnalysis {
    pub fn wrapped(&self) -> bool {
        self.parsed.wrapped()
    }

    pub fn cfg(&self, settings: &Settings) -> ControlFlowGraph {
        cfg::build(&self.parsed, BuildOptions::from_settings(settings))
    }

    pub fn structure(&self) -> Structure {
        structure::extract_structure(&self.parsed)
    }

    pub fn relationships(&self) -> Relationships {
        structure::detect_relationships(self.parsed.unit())
    }

    pub fn outline(&self, comments: Option<&Comments>) -> OutlineNode {
        structure::outline(self.parsed.unit(), comments)
    }
}

/// Analysis context for a set of files.
pub struct AnalysisContext {
    /// Base directory for relative path resolution.
    base_dir: PathBuf,
    settings: Settings,
}

impl AnalysisContext {
    pub fn new<P: AsRef<Path>>(base_dir: P, settings: Settings) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            settings,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// Parse source text that did not come from a file.
    pub fn analyze_source(&self, name: &str, source: &str) -> Result<FileAnalysis, AnalysisError> {
        let parsed = parse_source(source, &self.settings).map_err(|e| AnalysisError::Syntax {
            path: name.to_string(),
            source: e,
        })?;
        debug!(path = name, wrapped = parsed.wrapped(), "parsed input");
        Ok(FileAnalysis {
            path: name.to_string(),
            parsed,
        })
    }

    /// Read and parse one file.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<FileAnalysis, AnalysisError> {
        let path = path.as_ref();
        let abs_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        let display = self.display_path(&abs_path);

        let source = fs::read_to_string(&abs_path).map_err(|e| AnalysisError::Io {
            path: display.clone(),
            source: e,
        })?;
        self.analyze_source(&display, &source)
    }

    /// Analyze multiple files in parallel.
    ///
    /// Uses rayon for parallel processing. Successes are sorted by path;
    /// failures are returned alongside them rather than aborting the batch.
    pub fn analyze_files_parallel(
        &self,
        paths: &[PathBuf],
    ) -> (Vec<FileAnalysis>, Vec<AnalysisError>) {
        let results: Vec<_> = paths.par_iter().map(|p| self.analyze_file(p)).collect();

        let mut analyses = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    warn!(path = e.path(), error = %e, "failed to analyze file");
                    errors.push(e);
                }
            }
        }

        // Sort by path for deterministic ordering
        analyses.sort_by(|a, b| a.path.cmp(&b.path));
        errors.sort_by(|a, b| a.path().cmp(b.path()));
        (analyses, errors)
    }
}
