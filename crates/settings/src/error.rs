use std::path::PathBuf;

use smartdeploy_core::UnknownTarget;

/// Errors produced while loading or saving settings and credentials.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed credentials file: {0}")]
    Credentials(#[from] dotenvy::Error),

    #[error("invalid active build target: {0}")]
    ActiveTarget(#[from] UnknownTarget),

    #[error("could not determine the user configuration directory")]
    NoConfigDir,
}

impl SettingsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }
}
