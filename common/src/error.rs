//! Error taxonomy for the quote pipeline.

use thiserror::Error;

/// A pipeline stage, used to attach stage identity to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Outbound fetch from the remote quote source.
    Fetch,
    /// Write to the persistence backend.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Persist => write!(f, "persist"),
        }
    }
}

/// Failure of a single pipeline stage.
///
/// Stage-local failures are never retried or swallowed; they propagate
/// unchanged to the pipeline, which attaches the [`Stage`] identity before
/// surfacing them to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The stage's bounded deadline elapsed before the operation completed.
    #[error("deadline elapsed")]
    TimedOut,

    /// Network-level failure reaching the remote source.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Malformed or schema-mismatched response body.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The persistence backend rejected or failed the write.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StageError {
    /// Stable code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            StageError::TimedOut => "TIMED_OUT",
            StageError::Transport(_) => "TRANSPORT_ERROR",
            StageError::Decode(_) => "DECODE_ERROR",
            StageError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// A stage failure together with the stage it occurred in.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    /// Which stage failed.
    pub stage: Stage,
    /// The underlying classification, surfaced unchanged.
    #[source]
    pub source: StageError,
}

impl PipelineError {
    /// Attach stage identity to a stage failure.
    pub fn new(stage: Stage, source: StageError) -> Self {
        Self { stage, source }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
