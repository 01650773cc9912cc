// THEORY:
// Only genuinely exceptional conditions live here. A line set that does not
// match a layout is a `Verdict::Rejected`, and an incomplete artifact bundle is
// `None`; neither is an error. What remains are failures of the things the
// engine does not own: the recognizer, the frame source, the config file and
// the runtime it was started on.

use std::path::PathBuf;
use thiserror::Error;

/// The external recognizer failed for one frame. The frame is discarded and the
/// pipeline moves on.
#[derive(Debug, Clone, Error)]
pub enum RecognizerError {
    #[error("recognizer failed: {0}")]
    Failed(String),
    #[error("recognizer produced unreadable output: {0}")]
    Output(String),
    #[error("recognizer task panicked")]
    Panicked,
}

/// A frame source could not be opened or read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("frame source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame source read failed: {0}")]
    Read(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("video source failed to open: {0}")]
    SourceUnavailable(#[source] SourceError),
    #[error("a stream is already running")]
    AlreadyStreaming,
    #[error("the capture pipeline must be created inside a tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
