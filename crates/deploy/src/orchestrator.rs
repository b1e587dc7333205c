//! Upload orchestrator.
//!
//! Drives one [`TransferBackend`] through an upload run: enumerate the
//! local tree, connect, prepare the remote root, then send every file in
//! order. Per-file failures are recorded and skipped; the run carries on.

use std::path::PathBuf;
use std::sync::Arc;

use smartdeploy_core::{
    DeployEvent, FileTransferItem, ProgressWeighting, StatusEmitter, TransferProgress,
};
use smartdeploy_transfer::{
    ProgressSink, TransferBackend, TransferError, enumerate, join_remote, validate_remote_path,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DeployError;

/// What to upload and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Local directory whose contents are uploaded.
    pub root: PathBuf,
    /// Remote directory (SFTP) or key prefix (object storage).
    pub remote_dir: String,
    /// Delete the remote contents before sending.
    pub purge_first: bool,
    /// What the aggregate progress fraction counts.
    pub weighting: ProgressWeighting,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Finished,
    Cancelled,
    ConnectionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub remote_path: String,
    pub error: String,
}

/// Summary of one upload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub run_id: Uuid,
    pub outcome: UploadOutcome,
    pub files_total: usize,
    pub files_sent: usize,
    pub failures: Vec<FileFailure>,
}

impl UploadReport {
    fn new(run_id: Uuid, files_total: usize) -> Self {
        Self {
            run_id,
            outcome: UploadOutcome::Finished,
            files_total,
            files_sent: 0,
            failures: Vec::new(),
        }
    }

    /// Finished with every file sent.
    pub fn is_clean(&self) -> bool {
        self.outcome == UploadOutcome::Finished && self.failures.is_empty()
    }
}

/// Runs upload runs, one at a time, against any transfer backend.
pub struct UploadOrchestrator {
    events: StatusEmitter,
    cancel: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(events: StatusEmitter) -> Self {
        Self::with_cancel(events, CancellationToken::new())
    }

    /// Shares an existing cancellation token.
    pub fn with_cancel(events: StatusEmitter, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Cancelling stops the run before the next file, or during the current
    /// one when the backend supports it.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads every file under `request.root`.
    ///
    /// A refused connection is an outcome, not an error. Errors are
    /// returned when the local tree cannot be read or the remote root
    /// cannot be prepared.
    pub async fn run(
        &self,
        backend: &mut dyn TransferBackend,
        request: &UploadRequest,
    ) -> Result<UploadReport, DeployError> {
        let run_id = Uuid::new_v4();
        let items = match enumerate(&request.root) {
            Ok(items) => items,
            Err(e) => {
                error!(root = %request.root.display(), error = %e, "cannot enumerate upload files");
                self.events.emit(DeployEvent::UploadFailed {
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut report = UploadReport::new(run_id, items.len());
        let destination = backend.destination();
        info!(
            %run_id,
            transport = %backend.kind(),
            root = %request.root.display(),
            %destination,
            remote_dir = %request.remote_dir,
            files = items.len(),
            bytes = items.iter().map(|i| i.size).sum::<u64>(),
            weighting = ?request.weighting,
            "starting upload"
        );

        self.events.emit(DeployEvent::Connecting {
            destination: destination.clone(),
        });
        if let Err(e) = backend.connect().await {
            error!(%destination, error = %e, "connection failed");
            backend.disconnect().await;
            self.events.emit(DeployEvent::ConnectionFailed {
                error: e.to_string(),
            });
            report.outcome = UploadOutcome::ConnectionFailed(e.to_string());
            return Ok(report);
        }
        self.events.emit(DeployEvent::Connected);

        let result = self.transfer(backend, request, &items, &mut report).await;
        backend.disconnect().await;

        match result {
            Ok(()) => Ok(report),
            Err(e) => {
                error!(error = %e, "upload aborted");
                self.events.emit(DeployEvent::UploadFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    async fn transfer(
        &self,
        backend: &mut dyn TransferBackend,
        request: &UploadRequest,
        items: &[FileTransferItem],
        report: &mut UploadReport,
    ) -> Result<(), TransferError> {
        backend.ensure_remote_root(&request.remote_dir).await?;

        if request.purge_first {
            if backend.supports_purge() {
                self.events.emit(DeployEvent::Purging {
                    remote_root: request.remote_dir.clone(),
                });
                backend.purge_remote_root(&request.remote_dir).await?;
                info!(remote_dir = %request.remote_dir, "remote root purged");
            } else {
                warn!(
                    transport = ?backend.kind(),
                    "purge not supported, uploading over existing files"
                );
            }
        }

        let total = items.len();
        let bytes_total: u64 = items.iter().map(|i| i.size).sum();
        // Failed files count as handled so the run still ends at 1.0.
        let mut bytes_handled = 0u64;
        for (index, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.cancelled(report);
                return Ok(());
            }

            let remote_path = join_remote(&request.remote_dir, &item.remote_path);
            self.events.emit(DeployEvent::Uploading {
                remote_path: remote_path.clone(),
                index,
                total,
            });

            let sent = match validate_remote_path(&item.remote_path) {
                Ok(()) => {
                    let progress = self.file_progress(&remote_path);
                    backend
                        .send_one(item, &remote_path, progress, &self.cancel)
                        .await
                }
                Err(e) => Err(e),
            };

            match sent {
                Ok(bytes) => {
                    debug!(file = %remote_path, bytes, "uploaded");
                    report.files_sent += 1;
                    self.events.emit(DeployEvent::FileUploaded {
                        remote_path: remote_path.clone(),
                    });
                }
                Err(TransferError::Cancelled) => {
                    self.cancelled(report);
                    return Ok(());
                }
                Err(e) => {
                    warn!(file = %remote_path, error = %e, "failed to upload file");
                    self.events.emit(DeployEvent::FileFailed {
                        remote_path: remote_path.clone(),
                        error: e.to_string(),
                    });
                    report.failures.push(FileFailure {
                        remote_path,
                        error: e.to_string(),
                    });
                }
            }

            bytes_handled += item.size;
            self.events.emit(DeployEvent::Progress(TransferProgress::weighted(
                request.weighting,
                index + 1,
                total,
                bytes_handled,
                bytes_total,
            )));
        }

        info!(
            run_id = %report.run_id,
            sent = report.files_sent,
            failed = report.failures.len(),
            "upload finished"
        );
        self.events.emit(DeployEvent::Finished {
            sent: report.files_sent,
            failed: report.failures.len(),
        });
        Ok(())
    }

    fn cancelled(&self, report: &mut UploadReport) {
        info!(run_id = %report.run_id, sent = report.files_sent, "upload cancelled");
        report.outcome = UploadOutcome::Cancelled;
        self.events.emit(DeployEvent::Cancelled);
    }

    fn file_progress(&self, remote_path: &str) -> ProgressSink {
        let events = self.events.clone();
        let remote_path = remote_path.to_string();
        Arc::new(move |sent, total| {
            let fraction = if total == 0 {
                1.0
            } else {
                (sent as f64 / total as f64).min(1.0)
            };
            events.emit(DeployEvent::FileProgress {
                remote_path: remote_path.clone(),
                fraction,
            });
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use smartdeploy_core::TransportKind;
    use smartdeploy_transfer::BoxFuture;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every call; can refuse connections, fail chosen files, and
    /// cancel the run when a chosen file starts.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub ops: Arc<Mutex<Vec<String>>>,
        pub refuse: bool,
        pub purge: bool,
        pub fail_root: bool,
        pub fail: HashSet<String>,
        pub cancel_at: Option<(String, CancellationToken)>,
    }

    impl MockTransport {
        fn log(&self, op: String) {
            self.ops.lock().unwrap().push(op);
        }
    }

    impl TransferBackend for MockTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Sftp
        }

        fn destination(&self) -> String {
            "mock".into()
        }

        fn connect(&mut self) -> BoxFuture<'_, Result<(), TransferError>> {
            Box::pin(async move {
                self.log("connect".into());
                if self.refuse {
                    Err(TransferError::Connect("refused".into()))
                } else {
                    Ok(())
                }
            })
        }

        fn ensure_remote_root<'a>(
            &'a mut self,
            remote_root: &'a str,
        ) -> BoxFuture<'a, Result<(), TransferError>> {
            Box::pin(async move {
                self.log(format!("root {remote_root}"));
                if self.fail_root {
                    Err(TransferError::Remote {
                        path: remote_root.to_string(),
                        message: "permission denied".into(),
                    })
                } else {
                    Ok(())
                }
            })
        }

        fn supports_purge(&self) -> bool {
            self.purge
        }

        fn purge_remote_root<'a>(
            &'a mut self,
            remote_root: &'a str,
        ) -> BoxFuture<'a, Result<(), TransferError>> {
            Box::pin(async move {
                self.log(format!("purge {remote_root}"));
                Ok(())
            })
        }

        fn send_one<'a>(
            &'a mut self,
            item: &'a FileTransferItem,
            remote_path: &'a str,
            progress: ProgressSink,
            cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<u64, TransferError>> {
            Box::pin(async move {
                if let Some((at, token)) = &self.cancel_at {
                    if at == &item.remote_path {
                        token.cancel();
                    }
                }
                if cancel.is_cancelled() {
                    self.log(format!("cancelled {remote_path}"));
                    return Err(TransferError::Cancelled);
                }
                self.log(format!("send {remote_path}"));
                if self.fail.contains(&item.remote_path) {
                    return Err(TransferError::Io(std::io::Error::other("disk full")));
                }
                let size = std::fs::metadata(&item.local_path)?.len();
                progress(size, size);
                Ok(size)
            })
        }

        fn disconnect(&mut self) -> BoxFuture<'_, ()> {
            Box::pin(async move { self.log("disconnect".into()) })
        }
    }

    pub(crate) fn tree(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for f in files {
            let path = dir.path().join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, f.as_bytes()).unwrap();
        }
        dir
    }

    fn request(dir: &tempfile::TempDir, purge_first: bool) -> UploadRequest {
        UploadRequest {
            root: dir.path().to_path_buf(),
            remote_dir: "dev/8080".into(),
            purge_first,
            weighting: ProgressWeighting::Files,
        }
    }

    fn fractions(seen: &[DeployEvent]) -> Vec<f64> {
        seen.iter()
            .filter_map(|e| match e {
                DeployEvent::Progress(p) => Some(p.fraction_complete),
                _ => None,
            })
            .collect()
    }

    fn record(events: &StatusEmitter) -> Arc<Mutex<Vec<DeployEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[tokio::test]
    async fn every_file_reports_monotonic_progress_and_one_finish() {
        let dir = tree(&["index.html", "Build/a.wasm", "Build/b.data"]);
        let events = StatusEmitter::new();
        let seen = record(&events);
        let mut backend = MockTransport::default();

        let report = UploadOrchestrator::new(events)
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.files_sent, 3);

        let seen = seen.lock().unwrap();
        let fractions = fractions(&seen);
        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fractions.last(), Some(&1.0));

        let finishes = seen
            .iter()
            .filter(|e| matches!(e, DeployEvent::Finished { .. }))
            .count();
        assert_eq!(finishes, 1);
        assert_eq!(seen.last(), Some(&DeployEvent::Finished { sent: 3, failed: 0 }));
    }

    #[tokio::test]
    async fn byte_weighting_follows_file_sizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), vec![b'a'; 10]).unwrap();
        std::fs::write(dir.path().join("b.data"), vec![b'b'; 970]).unwrap();
        std::fs::write(dir.path().join("c.txt"), vec![b'c'; 20]).unwrap();
        let events = StatusEmitter::new();
        let seen = record(&events);
        let mut backend = MockTransport {
            fail: HashSet::from(["c.txt".to_string()]),
            ..Default::default()
        };

        let mut req = request(&dir, false);
        req.weighting = ProgressWeighting::Bytes;
        UploadOrchestrator::new(events)
            .run(&mut backend, &req)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        // Sorted: a.txt, b.data, c.txt.
        assert_eq!(fractions(&seen), vec![0.01, 0.98, 1.0]);
        let last = seen
            .iter()
            .rev()
            .find_map(|e| match e {
                DeployEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .unwrap();
        assert_eq!(last.bytes_completed, 1000);
        assert_eq!(last.bytes_total, 1000);
        assert_eq!(last.files_completed, 3);
    }

    #[tokio::test]
    async fn files_are_sent_in_order_under_remote_dir() {
        let dir = tree(&["index.html", "Build/a.wasm"]);
        let mut backend = MockTransport::default();
        let ops = Arc::clone(&backend.ops);

        UploadOrchestrator::new(StatusEmitter::new())
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap();

        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                "connect",
                "root dev/8080",
                "send dev/8080/Build/a.wasm",
                "send dev/8080/index.html",
                "disconnect",
            ]
        );
    }

    #[tokio::test]
    async fn purge_happens_before_first_send() {
        let dir = tree(&["a.txt"]);
        let mut backend = MockTransport {
            purge: true,
            ..Default::default()
        };
        let ops = Arc::clone(&backend.ops);

        UploadOrchestrator::new(StatusEmitter::new())
            .run(&mut backend, &request(&dir, true))
            .await
            .unwrap();

        let ops = ops.lock().unwrap();
        let purge = ops.iter().position(|o| o == "purge dev/8080").unwrap();
        let send = ops.iter().position(|o| o.starts_with("send")).unwrap();
        assert!(purge < send);
    }

    #[tokio::test]
    async fn unsupported_purge_is_skipped() {
        let dir = tree(&["a.txt"]);
        let mut backend = MockTransport::default();
        let ops = Arc::clone(&backend.ops);

        let report = UploadOrchestrator::new(StatusEmitter::new())
            .run(&mut backend, &request(&dir, true))
            .await
            .unwrap();

        assert!(report.is_clean());
        assert!(!ops.lock().unwrap().iter().any(|o| o.starts_with("purge")));
    }

    #[tokio::test]
    async fn refused_connection_sends_nothing_and_never_finishes() {
        let dir = tree(&["a.txt"]);
        let events = StatusEmitter::new();
        let seen = record(&events);
        let mut backend = MockTransport {
            refuse: true,
            ..Default::default()
        };
        let ops = Arc::clone(&backend.ops);

        let report = UploadOrchestrator::new(events)
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap();

        assert!(matches!(report.outcome, UploadOutcome::ConnectionFailed(_)));
        assert_eq!(*ops.lock().unwrap(), vec!["connect", "disconnect"]);
        let seen = seen.lock().unwrap();
        assert!(!seen.iter().any(|e| matches!(e, DeployEvent::Finished { .. })));
        assert!(matches!(seen.last(), Some(DeployEvent::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn failed_file_is_skipped_and_counted() {
        let dir = tree(&["a.txt", "b.txt", "c.txt"]);
        let events = StatusEmitter::new();
        let seen = record(&events);
        let mut backend = MockTransport {
            fail: HashSet::from(["b.txt".to_string()]),
            ..Default::default()
        };

        let report = UploadOrchestrator::new(events)
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap();

        assert_eq!(report.outcome, UploadOutcome::Finished);
        assert!(!report.is_clean());
        assert_eq!(report.files_sent, 2);
        assert_eq!(report.failures[0].remote_path, "dev/8080/b.txt");
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&DeployEvent::Finished { sent: 2, failed: 1 })
        );
    }

    #[tokio::test]
    async fn cancellation_stops_run_without_finish() {
        let dir = tree(&["a.txt", "b.txt", "c.txt"]);
        let events = StatusEmitter::new();
        let seen = record(&events);
        let orchestrator = UploadOrchestrator::new(events);
        let mut backend = MockTransport {
            cancel_at: Some(("b.txt".into(), orchestrator.cancel_token())),
            ..Default::default()
        };
        let ops = Arc::clone(&backend.ops);

        let report = orchestrator
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap();

        assert_eq!(report.outcome, UploadOutcome::Cancelled);
        assert_eq!(report.files_sent, 1);
        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                "connect",
                "root dev/8080",
                "send dev/8080/a.txt",
                "cancelled dev/8080/b.txt",
                "disconnect",
            ]
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&DeployEvent::Cancelled));
        assert!(!seen.iter().any(|e| matches!(e, DeployEvent::Finished { .. })));
    }

    #[tokio::test]
    async fn root_failure_aborts_and_disconnects() {
        let dir = tree(&["a.txt"]);
        let events = StatusEmitter::new();
        let seen = record(&events);
        let mut backend = MockTransport {
            fail_root: true,
            ..Default::default()
        };
        let ops = Arc::clone(&backend.ops);

        let err = UploadOrchestrator::new(events)
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Transfer(TransferError::Remote { .. })));
        assert_eq!(ops.lock().unwrap().last().map(String::as_str), Some("disconnect"));
        assert!(matches!(
            seen.lock().unwrap().last(),
            Some(DeployEvent::UploadFailed { .. })
        ));
    }

    #[tokio::test]
    async fn missing_root_never_connects() {
        let mut backend = MockTransport::default();
        let ops = Arc::clone(&backend.ops);
        let request = UploadRequest {
            root: PathBuf::from("/nonexistent/smartdeploy/build"),
            remote_dir: "dev".into(),
            purge_first: false,
            weighting: ProgressWeighting::Bytes,
        };

        let err = UploadOrchestrator::new(StatusEmitter::new())
            .run(&mut backend, &request)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Transfer(TransferError::MissingRoot(_))));
        assert!(ops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_tree_finishes_immediately() {
        let dir = tree(&[]);
        let events = StatusEmitter::new();
        let seen = record(&events);
        let mut backend = MockTransport::default();

        let report = UploadOrchestrator::new(events)
            .run(&mut backend, &request(&dir, false))
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.files_total, 0);
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&DeployEvent::Finished { sent: 0, failed: 0 })
        );
    }
}
