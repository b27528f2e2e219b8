use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use tempfile::Builder;
use thiserror::Error;

const OUTPUT_SUFFIX: &str = ".critical.css";
const FALLBACK_STEM: &str = "document";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} is unusable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("output directory {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("{first:?} and {second:?} would both be written to {target:?}")]
    Collision {
        target: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("failed to write {target:?}: {source}")]
    Write {
        target: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `<stem>.critical.css` for an HTML document, `document` when it has no stem.
pub fn output_filename(document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    format!("{stem}{OUTPUT_SUFFIX}")
}

/// Directory receiving one critical stylesheet per HTML document.
///
/// Outputs are staged in a sibling temp file and renamed over the target, so
/// a reader sees either the previous stylesheet or the new one.
#[derive(Debug, Clone)]
pub struct CriticalCssOutputs {
    dir: PathBuf,
}

impl CriticalCssOutputs {
    /// Creates the directory when missing.
    pub fn prepare(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| {
            if dir.exists() && !dir.is_dir() {
                PersistError::NotADirectory(dir.clone())
            } else {
                PersistError::OutputDir {
                    path: dir.clone(),
                    source,
                }
            }
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_for(&self, document: &Path) -> PathBuf {
        self.dir.join(output_filename(document))
    }

    /// Targets for every document, in order. Two documents mapping to the
    /// same target are rejected before anything is written.
    pub fn plan(&self, documents: &[PathBuf]) -> Result<Vec<PathBuf>, PersistError> {
        let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
        let mut targets = Vec::with_capacity(documents.len());
        for document in documents {
            let target = self.target_for(document);
            if let Some(first) = claimed.insert(target.clone(), document) {
                return Err(PersistError::Collision {
                    target,
                    first: first.clone(),
                    second: document.clone(),
                });
            }
            targets.push(target);
        }
        Ok(targets)
    }

    pub fn write(&self, document: &Path, css: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.target_for(document);
        let write_err = |source| PersistError::Write {
            target: target.clone(),
            source,
        };

        let mut staged = Builder::new()
            .prefix(".critical-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(write_err)?;
        staged.write_all(css).map_err(write_err)?;
        staged.flush().map_err(write_err)?;
        staged.as_file_mut().sync_all().map_err(write_err)?;
        staged
            .persist(&target)
            .map_err(|err| write_err(err.error))?;

        engine_debug!("Stored {} bytes of critical css at {:?}", css.len(), target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::output_filename;
    use std::path::Path;

    #[test]
    fn output_name_uses_document_stem() {
        assert_eq!(output_filename(Path::new("site/index.html")), "index.critical.css");
        assert_eq!(output_filename(Path::new("about")), "about.critical.css");
        assert_eq!(output_filename(Path::new("/")), "document.critical.css");
    }
}
