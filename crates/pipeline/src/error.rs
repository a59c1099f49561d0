//! Error types for the urban filter pipeline.

use thiserror::Error;
use urbano_algorithms::spatial::Gid;

/// Errors produced while running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("core error: {0}")]
    Core(#[from] urbano_core::Error),

    #[error("parallel execution error: {0}")]
    Parallel(#[from] urbano_parallel::ParallelError),

    #[error("source error for GID {gid}: {reason}")]
    Source { gid: Gid, reason: String },

    #[error("sink error for GID {gid}: {reason}")]
    Sink { gid: Gid, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
