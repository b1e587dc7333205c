//! Deploy error types.

use smartdeploy_build::{BuildError, StaleVersion};
use smartdeploy_core::ValidationError;
use smartdeploy_transfer::TransferError;

/// Errors produced by the pipeline before or around an upload run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    StaleVersion(#[from] StaleVersion),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}

impl DeployError {
    /// The user backed out; nothing went wrong.
    pub fn is_canceled(&self) -> bool {
        match self {
            DeployError::Build(e) => e.is_canceled(),
            DeployError::Transfer(TransferError::Cancelled) => true,
            _ => false,
        }
    }
}
