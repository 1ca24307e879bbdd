use thiserror::Error;

use crate::pipeline::{ContextKey, StepKind};

/// Failures raised by a store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connect(String),

    #[error("connection is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed filter: {0}")]
    Filter(String),

    #[error("malformed update: {0}")]
    Update(String),

    #[error("duplicate _id: {0}")]
    DuplicateId(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Io(format!("serde json: {e}"))
    }
}

/// Every way a pipeline run can end without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("insufficient parameters for `{step}`: missing {}", list(.missing))]
    Precondition { step: StepKind, missing: Vec<ContextKey> },

    #[error("connect failed: {0}")]
    Connect(#[source] StoreError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

fn list(keys: &[ContextKey]) -> String {
    keys.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
