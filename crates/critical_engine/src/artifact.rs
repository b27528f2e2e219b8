use std::io::{self, Write};
use std::path::Path;

use engine_logging::{engine_trace, engine_warn};
use tempfile::{Builder, TempPath};
use url::Url;

use crate::{ArtifactKind, ExtractionError};

const ARTIFACT_PREFIX: &str = "critical-";

/// A uniquely named file holding one renderer input.
///
/// The file is fully written and synced before `create` returns, so any
/// process handed its path sees complete content.
#[derive(Debug)]
pub struct TemporaryArtifact {
    kind: ArtifactKind,
    path: TempPath,
}

impl TemporaryArtifact {
    pub fn create(kind: ArtifactKind, bytes: &[u8], dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(ARTIFACT_PREFIX).suffix(kind.suffix());
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;
        file.as_file_mut().sync_all()?;

        let path = file.into_temp_path();
        engine_trace!("Created {} artifact {:?} ({} bytes)", kind, path, bytes.len());
        Ok(Self { kind, path })
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file:` URL of the artifact, always absolute.
    pub fn file_url(&self) -> io::Result<Url> {
        let absolute = std::path::absolute(self.path())?;
        Url::from_file_path(&absolute).map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot express {absolute:?} as a file url"),
            )
        })
    }

    /// Deletes the file, reporting failure instead of ignoring it.
    pub fn release(self) -> io::Result<()> {
        engine_trace!("Releasing {} artifact {:?}", self.kind, self.path);
        self.path.close()
    }
}

/// Guard owning the html and css artifacts of one extraction.
///
/// Whatever has been staged is deleted on `release` or, failing that, on
/// drop, which covers early returns, panics and dropped futures.
#[derive(Debug, Default)]
pub struct ArtifactPair {
    html: Option<TemporaryArtifact>,
    css: Option<TemporaryArtifact>,
}

impl ArtifactPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(
        &mut self,
        kind: ArtifactKind,
        bytes: &[u8],
        dir: Option<&Path>,
    ) -> Result<&TemporaryArtifact, ExtractionError> {
        let artifact = TemporaryArtifact::create(kind, bytes, dir).map_err(|source| {
            ExtractionError::Artifact {
                artifact: kind,
                source,
            }
        })?;
        let slot = self.slot(kind);
        if let Some(previous) = slot.take() {
            release_logged(previous);
        }
        let staged: &TemporaryArtifact = slot.insert(artifact);
        Ok(staged)
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&TemporaryArtifact> {
        match kind {
            ArtifactKind::Html => self.html.as_ref(),
            ArtifactKind::Css => self.css.as_ref(),
        }
    }

    /// Deletes every staged artifact. Failures are logged, never returned,
    /// so they cannot mask the outcome of the extraction.
    pub fn release(&mut self) {
        for artifact in [self.html.take(), self.css.take()].into_iter().flatten() {
            release_logged(artifact);
        }
    }

    fn slot(&mut self, kind: ArtifactKind) -> &mut Option<TemporaryArtifact> {
        match kind {
            ArtifactKind::Html => &mut self.html,
            ArtifactKind::Css => &mut self.css,
        }
    }
}

impl Drop for ArtifactPair {
    fn drop(&mut self) {
        self.release();
    }
}

fn release_logged(artifact: TemporaryArtifact) {
    let kind = artifact.kind();
    let path = artifact.path().to_path_buf();
    if let Err(err) = artifact.release() {
        engine_warn!("Failed to remove {} artifact {:?}: {}", kind, path, err);
    }
}
