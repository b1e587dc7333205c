//! Run-scoped status and progress stream.
//!
//! A [`StatusEmitter`] is created by the caller for one pipeline
//! invocation and handed to the components that run. Listeners are
//! invoked synchronously, in emission order.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::target::BuildTarget;
use crate::transfer::TransferProgress;
use crate::version::Version;

/// A step of a build or upload run.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    BuildStarted {
        target: BuildTarget,
        version: Version,
    },
    BuildCompleted {
        version: Version,
        artifact_root: PathBuf,
    },
    BuildFailed {
        error: String,
    },
    Connecting {
        destination: String,
    },
    Connected,
    ConnectionFailed {
        error: String,
    },
    Purging {
        remote_root: String,
    },
    Uploading {
        remote_path: String,
        index: usize,
        total: usize,
    },
    /// Byte-level progress within the current file.
    FileProgress {
        remote_path: String,
        fraction: f64,
    },
    FileUploaded {
        remote_path: String,
    },
    FileFailed {
        remote_path: String,
        error: String,
    },
    /// Aggregate progress, emitted once per file.
    Progress(TransferProgress),
    Finished {
        sent: usize,
        failed: usize,
    },
    /// The remote root could not be prepared; no file was sent.
    UploadFailed {
        error: String,
    },
    Cancelled,
}

impl fmt::Display for DeployEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployEvent::BuildStarted { target, version } => {
                write!(f, "Start building {target} {version}")
            }
            DeployEvent::BuildCompleted { version, .. } => {
                write!(f, "Building complete ({version})")
            }
            DeployEvent::BuildFailed { error } => write!(f, "Building error: {error}"),
            DeployEvent::Connecting { destination } => write!(f, "Connecting to {destination}..."),
            DeployEvent::Connected => f.write_str("Connected"),
            DeployEvent::ConnectionFailed { error } => write!(f, "Could not connect: {error}"),
            DeployEvent::Purging { remote_root } => write!(f, "Cleaning {remote_root}..."),
            DeployEvent::Uploading {
                remote_path,
                index,
                total,
            } => write!(f, "Uploading {remote_path} ({}/{total})", index + 1),
            DeployEvent::FileProgress {
                remote_path,
                fraction,
            } => write!(f, "{remote_path}: {:.0}%", fraction * 100.0),
            DeployEvent::FileUploaded { remote_path } => write!(f, "Uploaded {remote_path}"),
            DeployEvent::FileFailed { remote_path, error } => {
                write!(f, "Failed to upload {remote_path}: {error}")
            }
            DeployEvent::Progress(p) => write!(
                f,
                "{}/{} files ({:.0}%)",
                p.files_completed,
                p.files_total,
                p.fraction_complete * 100.0
            ),
            DeployEvent::Finished { sent, failed } if *failed == 0 => {
                write!(f, "Upload finished! ({sent} files)")
            }
            DeployEvent::Finished { sent, failed } => {
                write!(f, "Upload finished! ({sent} sent, {failed} failed)")
            }
            DeployEvent::UploadFailed { error } => write!(f, "Upload failed: {error}"),
            DeployEvent::Cancelled => f.write_str("Upload cancelled"),
        }
    }
}

type Listener = Arc<dyn Fn(&DeployEvent) + Send + Sync>;

/// Fan-out of [`DeployEvent`]s to any number of listeners.
///
/// Cloning shares the listener list, so a clone can be moved into
/// blocking tasks that report byte progress.
#[derive(Clone, Default)]
pub struct StatusEmitter {
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl fmt::Debug for StatusEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("StatusEmitter")
            .field("listeners", &count)
            .finish()
    }
}

impl StatusEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the rest of the run.
    pub fn subscribe(&self, listener: impl Fn(&DeployEvent) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn emit(&self, event: DeployEvent) {
        // Snapshot so a listener may subscribe without deadlocking.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn every_listener_sees_events_in_order() {
        let emitter = StatusEmitter::new();
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
        emitter.subscribe(move |e| a2.lock().unwrap().push(e.to_string()));
        emitter.subscribe(move |e| b2.lock().unwrap().push(e.to_string()));

        emitter.emit(DeployEvent::Connected);
        emitter.emit(DeployEvent::Finished { sent: 2, failed: 0 });

        let expected = vec!["Connected".to_string(), "Upload finished! (2 files)".to_string()];
        assert_eq!(*a.lock().unwrap(), expected);
        assert_eq!(*b.lock().unwrap(), expected);
    }

    #[test]
    fn emit_without_listeners_is_noop() {
        StatusEmitter::new().emit(DeployEvent::Cancelled);
    }

    #[test]
    fn uploading_status_is_one_based() {
        let e = DeployEvent::Uploading {
            remote_path: "a/b.txt".into(),
            index: 0,
            total: 3,
        };
        assert_eq!(e.to_string(), "Uploading a/b.txt (1/3)");
    }
}
