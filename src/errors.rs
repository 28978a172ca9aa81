// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! The first three variants are raised while the dependency graph is being
//! built, before any work starts. `Execution` is only surfaced once every
//! already-running work has finished.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error for '{id}': {reason}")]
    Configuration { id: String, reason: String },

    #[error("Cycle detected in shaper dependencies: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("Unknown target: {id}")]
    UnknownTarget { id: String },

    #[error("Work '{id}' failed: {cause} (blocked: {blocked:?})")]
    Execution {
        id: String,
        cause: String,
        blocked: Vec<String>,
    },

    #[error("Worker pool did not shut down cleanly: {0}")]
    PoolShutdown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub(crate) fn configuration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Configuration {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
