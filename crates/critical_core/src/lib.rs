//! Critical core: pure data model and stylesheet assembly.
mod config;
mod request;
mod source;

pub use config::{
    ConfigError, ExtractionConfig, DEFAULT_ENCODING, DEFAULT_HELPER_SCRIPT, DEFAULT_RENDERER,
    ENV_ARTIFACT_DIR, ENV_ENCODING, ENV_HELPER_PATH, ENV_RENDERER_PATH, ENV_TIMEOUT_MS,
};
pub use request::ExtractionRequest;
pub use source::{
    aggregate, AggregateError, AggregatedCss, CssAssembler, FetchFailurePolicy, SourceReport,
    SourceStatus, StyleSource,
};
