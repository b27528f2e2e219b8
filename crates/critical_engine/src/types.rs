use std::fmt;
use std::io;
use std::time::Duration;

use crate::codec::CodecError;
use crate::pipeline::{PipelineError, PipelineOutput};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Aggregating,
    Rendering,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub stage: Stage,
}

#[derive(Debug)]
pub enum EngineEvent {
    Progress(JobProgress),
    JobCompleted {
        job_id: JobId,
        result: Result<PipelineOutput, PipelineError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Which of the two renderer inputs an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Html,
    Css,
}

impl ArtifactKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Html => ".html",
            ArtifactKind::Css => ".css",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Html => write!(f, "html"),
            ArtifactKind::Css => write!(f, "css"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unusable text encoding: {0}")]
    UnknownEncoding(#[source] CodecError),
    #[error("cannot encode {artifact} input: {source}")]
    Encoding {
        artifact: ArtifactKind,
        #[source]
        source: CodecError,
    },
    #[error("cannot write {artifact} artifact: {source}")]
    Artifact {
        artifact: ArtifactKind,
        #[source]
        source: io::Error,
    },
    #[error("cannot launch renderer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("lost track of renderer process: {source}")]
    Wait {
        #[source]
        source: io::Error,
    },
    #[error("renderer failed ({}): {stderr}", describe_exit(.code))]
    ExternalTool { code: Option<i32>, stderr: String },
    #[error("renderer did not finish within {after:?}")]
    Timeout { after: Duration },
    #[error("extraction cancelled")]
    Cancelled,
}

/// Coarse classification of [`ExtractionError`] for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailureKind {
    Encoding,
    Artifact,
    Spawn,
    ExternalTool,
    Timeout,
    Cancelled,
}

impl ExtractionError {
    pub fn kind(&self) -> ExtractionFailureKind {
        match self {
            ExtractionError::UnknownEncoding(_) | ExtractionError::Encoding { .. } => {
                ExtractionFailureKind::Encoding
            }
            ExtractionError::Artifact { .. } => ExtractionFailureKind::Artifact,
            ExtractionError::Spawn { .. } | ExtractionError::Wait { .. } => {
                ExtractionFailureKind::Spawn
            }
            ExtractionError::ExternalTool { .. } => ExtractionFailureKind::ExternalTool,
            ExtractionError::Timeout { .. } => ExtractionFailureKind::Timeout,
            ExtractionError::Cancelled => ExtractionFailureKind::Cancelled,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
