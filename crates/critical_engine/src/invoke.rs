use std::process::{Output, Stdio};
use std::time::Duration;

use critical_core::{ExtractionConfig, ExtractionRequest};
use engine_logging::{engine_debug, engine_warn};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use crate::artifact::ArtifactPair;
use crate::codec::{encode_text, resolve_encoding};
use crate::command::RendererCommand;
use crate::{ArtifactKind, ExtractionError};

/// Runs the external renderer over in-memory html and css.
///
/// Each call stages its own pair of artifacts and spawns its own child, so
/// one invoker can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct RendererInvoker {
    config: ExtractionConfig,
}

impl RendererInvoker {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<u8>, ExtractionError> {
        run_extraction(&self.config, request, &CancellationToken::new()).await
    }

    /// Like [`extract`](Self::extract), but gives up (killing the child) once
    /// `cancel` fires.
    pub async fn extract_with_cancel(
        &self,
        request: &ExtractionRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, ExtractionError> {
        run_extraction(&self.config, request, &cancel).await
    }
}

/// Returns the renderer's stdout verbatim; an empty result is a success.
pub async fn extract_critical_css(
    html: &str,
    css: &str,
    config: &ExtractionConfig,
) -> Result<Vec<u8>, ExtractionError> {
    let request = ExtractionRequest::new(html, css);
    run_extraction(config, &request, &CancellationToken::new()).await
}

async fn run_extraction(
    config: &ExtractionConfig,
    request: &ExtractionRequest,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ExtractionError> {
    let mut artifacts = ArtifactPair::new();
    let result = render(config, request, cancel, &mut artifacts).await;
    artifacts.release();
    result
}

async fn render(
    config: &ExtractionConfig,
    request: &ExtractionRequest,
    cancel: &CancellationToken,
    artifacts: &mut ArtifactPair,
) -> Result<Vec<u8>, ExtractionError> {
    let encoding = resolve_encoding(&config.encoding).map_err(ExtractionError::UnknownEncoding)?;
    let dir = config.artifact_dir.as_deref();

    let html_bytes = encode_text(&request.html, encoding).map_err(|source| {
        ExtractionError::Encoding {
            artifact: ArtifactKind::Html,
            source,
        }
    })?;
    let html_url = artifacts
        .stage(ArtifactKind::Html, &html_bytes, dir)?
        .file_url()
        .map_err(|source| ExtractionError::Artifact {
            artifact: ArtifactKind::Html,
            source,
        })?;

    let css_bytes = encode_text(&request.css, encoding).map_err(|source| {
        ExtractionError::Encoding {
            artifact: ArtifactKind::Css,
            source,
        }
    })?;
    let css_path = artifacts
        .stage(ArtifactKind::Css, &css_bytes, dir)?
        .path()
        .to_path_buf();

    let command = RendererCommand::new(config, &html_url, &css_path);
    engine_debug!("Running renderer: {}", command);

    let mut process = command.to_tokio();
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let child = process.spawn().map_err(|source| ExtractionError::Spawn {
        program: command.program().display().to_string(),
        source,
    })?;

    let output = wait_for(child, config.timeout(), cancel).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        engine_warn!(
            "Renderer {} exited with {:?}: {}",
            command.program().display(),
            output.status.code(),
            stderr
        );
        return Err(ExtractionError::ExternalTool {
            code: output.status.code(),
            stderr,
        });
    }

    engine_debug!("Renderer produced {} bytes", output.stdout.len());
    Ok(output.stdout)
}

/// Dropping the pending wait drops the child, and `kill_on_drop` kills it.
async fn wait_for(
    child: Child,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<Output, ExtractionError> {
    let deadline = async move {
        match timeout {
            Some(after) => {
                tokio::time::sleep(after).await;
                after
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        output = child.wait_with_output() => {
            output.map_err(|source| ExtractionError::Wait { source })
        }
        after = deadline => {
            engine_warn!("Renderer exceeded {:?}; killing it", after);
            Err(ExtractionError::Timeout { after })
        }
        _ = cancel.cancelled() => {
            engine_warn!("Extraction cancelled; killing renderer");
            Err(ExtractionError::Cancelled)
        }
    }
}
