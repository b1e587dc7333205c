//! Build error types.

use smartdeploy_core::{BuildTarget, ValidationError};

use crate::version_gate::StaleVersion;

/// Errors produced by a build run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    StaleVersion(#[from] StaleVersion),

    #[error("configured target {requested} does not match active target {active}")]
    TargetMismatch {
        active: BuildTarget,
        requested: BuildTarget,
    },

    #[error("failed to switch active target to {target}: {reason}")]
    TargetSwitch { target: BuildTarget, reason: String },

    #[error("build canceled: no folder selected")]
    Canceled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("build backend error: {0}")]
    Backend(String),
}

impl BuildError {
    /// Cancellations are user decisions, not failures worth alarming about.
    pub fn is_canceled(&self) -> bool {
        matches!(self, BuildError::Canceled)
    }
}
