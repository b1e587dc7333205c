//! File enumeration and remote transfer backends.
//!
//! A [`TransferBackend`] moves one file at a time to a remote root. Two
//! implementations exist: [`SftpBackend`] over an SSH session and
//! [`ObjectStorageBackend`] over an S3-compatible bucket.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

mod backend;
mod content_type;
pub mod object_storage;
pub mod scanner;
pub mod sftp;
mod validation;

pub use backend::{ProgressSink, TransferBackend};
pub use content_type::{content_encoding_for, content_type_for};
pub use object_storage::{ObjectStorageBackend, ObjectStore, PutRequest, S3Store};
pub use scanner::enumerate;
pub use sftp::{RemoteEntry, RemoteFs, SftpBackend, SftpConnector, Ssh2Connector};
pub use validation::{join_remote, validate_remote_path};

/// Boxed future returned by the backend traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source folder does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("not connected")]
    NotConnected,

    #[error("remote operation on {path} failed: {message}")]
    Remote { path: String, message: String },

    #[error("object storage error: {0}")]
    ObjectStore(String),

    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),

    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    pub(crate) fn remote(path: &str, err: impl std::fmt::Display) -> Self {
        TransferError::Remote {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}
