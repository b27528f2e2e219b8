//! Critical engine: stylesheet fetching, artifact staging and renderer runs.
mod aggregate;
mod artifact;
mod codec;
mod command;
mod engine;
mod fetch;
mod invoke;
mod persist;
mod pipeline;
mod types;

pub use aggregate::CssAggregator;
pub use artifact::{ArtifactPair, TemporaryArtifact};
pub use codec::{decode_text, encode_text, resolve_encoding, CodecError};
pub use command::RendererCommand;
pub use engine::{EngineHandle, ExtractionJob};
pub use fetch::{FetchSettings, ReqwestFetcher, StyleFetcher};
pub use invoke::{extract_critical_css, RendererInvoker};
pub use persist::{output_filename, CriticalCssOutputs, PersistError};
pub use pipeline::{CriticalCssPipeline, PipelineError, PipelineOutput};
pub use types::{
    ArtifactKind, EngineEvent, ExtractionError, ExtractionFailureKind, FailureKind, FetchError,
    FetchMetadata, FetchOutput, JobId, JobProgress, Stage,
};
