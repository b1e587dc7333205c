use std::sync::Arc;

use smartdeploy_core::{FileTransferItem, TransportKind};
use tokio_util::sync::CancellationToken;

use crate::{BoxFuture, TransferError};

/// Per-file byte progress: `(bytes_sent, bytes_total)`.
pub type ProgressSink = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Moves files to a remote destination, one at a time.
///
/// Callers drive a backend as `connect`, `ensure_remote_root`, optionally
/// `purge_remote_root`, any number of `send_one`, then `disconnect`.
pub trait TransferBackend: Send {
    fn kind(&self) -> TransportKind;

    /// Human readable destination, for status messages.
    fn destination(&self) -> String;

    fn connect(&mut self) -> BoxFuture<'_, Result<(), TransferError>>;

    /// Makes sure `remote_root` exists.
    fn ensure_remote_root<'a>(
        &'a mut self,
        remote_root: &'a str,
    ) -> BoxFuture<'a, Result<(), TransferError>>;

    fn supports_purge(&self) -> bool;

    /// Deletes everything below `remote_root`, keeping the root itself.
    fn purge_remote_root<'a>(
        &'a mut self,
        remote_root: &'a str,
    ) -> BoxFuture<'a, Result<(), TransferError>>;

    /// Sends `item` to the full remote path `remote_path` and returns the
    /// number of bytes written.
    fn send_one<'a>(
        &'a mut self,
        item: &'a FileTransferItem,
        remote_path: &'a str,
        progress: ProgressSink,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<u64, TransferError>>;

    /// Releases the connection. Never fails; problems are logged.
    fn disconnect(&mut self) -> BoxFuture<'_, ()>;
}
