//! SFTP transfer backend.
//!
//! The SSH session is blocking, so every remote operation runs on the
//! blocking pool with the session behind a mutex. One session serves a
//! whole upload run.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use smartdeploy_core::{FileTransferItem, TransportKind};
use ssh2::{Session, Sftp};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{ProgressSink, TransferBackend};
use crate::validation::join_remote;
use crate::{BoxFuture, TransferError};

/// Bytes written per SFTP write call.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// SSH session timeout, in milliseconds.
const SESSION_TIMEOUT_MS: u32 = 30_000;

/// One directory entry on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Blocking remote filesystem operations used by [`SftpBackend`].
pub trait RemoteFs: Send {
    fn exists(&mut self, path: &str) -> bool;
    fn mkdir(&mut self, path: &str) -> io::Result<()>;
    fn read_dir(&mut self, path: &str) -> io::Result<Vec<RemoteEntry>>;
    fn remove_file(&mut self, path: &str) -> io::Result<()>;
    fn remove_dir(&mut self, path: &str) -> io::Result<()>;
    /// Creates or truncates `path` for writing.
    fn create<'a>(&'a mut self, path: &str) -> io::Result<Box<dyn Write + 'a>>;

    fn close(&mut self) {}
}

/// Opens [`RemoteFs`] sessions.
pub trait SftpConnector: Send + Sync {
    /// `user@host:port`, for status messages.
    fn destination(&self) -> String;

    fn open(&self) -> Result<Box<dyn RemoteFs>, TransferError>;
}

/// Password-authenticated SSH connector.
#[derive(Clone)]
pub struct Ssh2Connector {
    host: String,
    port: u16,
    user: String,
    password: String,
}

impl Ssh2Connector {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Ssh2Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ssh2Connector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SftpConnector for Ssh2Connector {
    fn destination(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }

    fn open(&self) -> Result<Box<dyn RemoteFs>, TransferError> {
        let addr = format!("{}:{}", self.host, self.port);
        let connect_err = |what: &str, e: &dyn std::fmt::Display| {
            TransferError::Connect(format!("{what} {addr}: {e}"))
        };

        let tcp = TcpStream::connect(&addr).map_err(|e| connect_err("tcp connect to", &e))?;
        let mut session = Session::new().map_err(|e| connect_err("ssh session for", &e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(SESSION_TIMEOUT_MS);
        session
            .handshake()
            .map_err(|e| connect_err("ssh handshake with", &e))?;
        session
            .userauth_password(&self.user, &self.password)
            .map_err(|e| connect_err("authentication at", &e))?;
        if !session.authenticated() {
            return Err(TransferError::Connect(format!(
                "authentication at {addr} rejected for {}",
                self.user
            )));
        }

        let sftp = session
            .sftp()
            .map_err(|e| connect_err("sftp subsystem on", &e))?;

        debug!(destination = %self.destination(), "sftp session opened");
        Ok(Box::new(Ssh2Fs { session, sftp }))
    }
}

struct Ssh2Fs {
    session: Session,
    sftp: Sftp,
}

impl RemoteFs for Ssh2Fs {
    fn exists(&mut self, path: &str) -> bool {
        self.sftp.stat(Path::new(path)).is_ok()
    }

    fn mkdir(&mut self, path: &str) -> io::Result<()> {
        Ok(self.sftp.mkdir(Path::new(path), 0o755)?)
    }

    fn read_dir(&mut self, path: &str) -> io::Result<Vec<RemoteEntry>> {
        let entries = self.sftp.readdir(Path::new(path))?;
        Ok(entries
            .into_iter()
            .filter_map(|(entry, stat)| {
                let name = entry.file_name()?.to_string_lossy().into_owned();
                Some(RemoteEntry {
                    name,
                    is_dir: stat.is_dir(),
                })
            })
            .collect())
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        Ok(self.sftp.unlink(Path::new(path))?)
    }

    fn remove_dir(&mut self, path: &str) -> io::Result<()> {
        Ok(self.sftp.rmdir(Path::new(path))?)
    }

    fn create<'a>(&'a mut self, path: &str) -> io::Result<Box<dyn Write + 'a>> {
        let file = self.sftp.create(Path::new(path))?;
        Ok(Box::new(file))
    }

    fn close(&mut self) {
        if let Err(e) = self.session.disconnect(None, "upload finished", None) {
            debug!(error = %e, "ssh disconnect failed");
        }
    }
}

type SharedFs = Arc<Mutex<Box<dyn RemoteFs>>>;

/// Uploads over SFTP, reusing one session per run.
pub struct SftpBackend {
    connector: Arc<dyn SftpConnector>,
    session: Option<SharedFs>,
}

impl SftpBackend {
    pub fn new(connector: Arc<dyn SftpConnector>) -> Self {
        Self {
            connector,
            session: None,
        }
    }

    /// Runs `op` against the open session on the blocking pool.
    async fn with_session<T, F>(&self, op: F) -> Result<T, TransferError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn RemoteFs) -> Result<T, TransferError> + Send + 'static,
    {
        let session = self.session.clone().ok_or(TransferError::NotConnected)?;
        tokio::task::spawn_blocking(move || {
            let mut fs = session.lock().unwrap_or_else(PoisonError::into_inner);
            op(fs.as_mut())
        })
        .await
        .map_err(|e| TransferError::Io(io::Error::other(e)))?
    }
}

impl TransferBackend for SftpBackend {
    fn kind(&self) -> TransportKind {
        TransportKind::Sftp
    }

    fn destination(&self) -> String {
        self.connector.destination()
    }

    fn connect(&mut self) -> BoxFuture<'_, Result<(), TransferError>> {
        Box::pin(async move {
            let connector = Arc::clone(&self.connector);
            let fs = tokio::task::spawn_blocking(move || connector.open())
                .await
                .map_err(|e| TransferError::Io(io::Error::other(e)))??;
            self.session = Some(Arc::new(Mutex::new(fs)));
            info!(destination = %self.connector.destination(), "connected");
            Ok(())
        })
    }

    fn ensure_remote_root<'a>(
        &'a mut self,
        remote_root: &'a str,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        let root = remote_root.to_string();
        Box::pin(async move { self.with_session(move |fs| create_dirs(fs, &root)).await })
    }

    fn supports_purge(&self) -> bool {
        true
    }

    fn purge_remote_root<'a>(
        &'a mut self,
        remote_root: &'a str,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        let root = remote_root.to_string();
        Box::pin(async move {
            self.with_session(move |fs| {
                if !fs.exists(&root) {
                    return Ok(());
                }
                purge_dir(fs, &root)
            })
            .await
        })
    }

    fn send_one<'a>(
        &'a mut self,
        item: &'a FileTransferItem,
        remote_path: &'a str,
        progress: ProgressSink,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<u64, TransferError>> {
        let item = item.clone();
        let remote_path = remote_path.to_string();
        let cancel = cancel.clone();
        Box::pin(async move {
            self.with_session(move |fs| upload_file(fs, &item, &remote_path, &progress, &cancel))
                .await
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some(session) = self.session.take() else {
                return;
            };
            let closed = tokio::task::spawn_blocking(move || {
                session
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .close();
            })
            .await;
            if let Err(e) = closed {
                warn!(error = %e, "failed to close sftp session");
            }
        })
    }
}

/// Creates every missing segment of `dir`, skipping empty segments.
fn create_dirs(fs: &mut dyn RemoteFs, dir: &str) -> Result<(), TransferError> {
    let mut acc = String::new();
    if dir.starts_with('/') {
        acc.push('/');
    }
    for part in dir.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if !acc.is_empty() && !acc.ends_with('/') {
            acc.push('/');
        }
        acc.push_str(part);
        if !fs.exists(&acc) {
            debug!(path = %acc, "creating remote directory");
            fs.mkdir(&acc).map_err(|e| TransferError::remote(&acc, e))?;
        }
    }
    Ok(())
}

/// Removes the contents of `dir` depth-first. `dir` itself is kept.
fn purge_dir(fs: &mut dyn RemoteFs, dir: &str) -> Result<(), TransferError> {
    let entries = fs
        .read_dir(dir)
        .map_err(|e| TransferError::remote(dir, e))?;

    for entry in entries {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        let path = join_remote(dir, &entry.name);
        if entry.is_dir {
            purge_dir(fs, &path)?;
            fs.remove_dir(&path)
                .map_err(|e| TransferError::remote(&path, e))?;
        } else {
            fs.remove_file(&path)
                .map_err(|e| TransferError::remote(&path, e))?;
        }
        debug!(path = %path, "deleted");
    }
    Ok(())
}

fn upload_file(
    fs: &mut dyn RemoteFs,
    item: &FileTransferItem,
    remote_path: &str,
    progress: &ProgressSink,
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let mut local = std::fs::File::open(&item.local_path)?;
    let size = local.metadata()?.len();

    if let Some((parent, _)) = remote_path.rsplit_once('/') {
        create_dirs(fs, parent)?;
    }

    let mut remote = fs
        .create(remote_path)
        .map_err(|e| TransferError::remote(remote_path, e))?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let n = local.read(&mut buf)?;
        if n == 0 {
            break;
        }
        remote
            .write_all(&buf[..n])
            .map_err(|e| TransferError::remote(remote_path, e))?;
        sent += n as u64;
        progress(sent, size);
    }
    remote
        .flush()
        .map_err(|e| TransferError::remote(remote_path, e))?;

    if sent == 0 {
        progress(0, 0);
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Node {
        Dir,
        File(Vec<u8>),
    }

    /// In-memory remote tree with an operation log.
    #[derive(Default)]
    struct Tree {
        nodes: BTreeMap<String, Node>,
        ops: Vec<String>,
        writes: usize,
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
    }

    #[derive(Clone, Default)]
    struct MemoryFs(Arc<Mutex<Tree>>);

    struct MemoryWriter {
        tree: Arc<Mutex<Tree>>,
        path: String,
    }

    impl Write for MemoryWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let mut tree = self.tree.lock().unwrap();
            tree.writes += 1;
            if let Some(Node::File(content)) = tree.nodes.get_mut(&self.path) {
                content.extend_from_slice(data);
            }
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl RemoteFs for MemoryFs {
        fn exists(&mut self, path: &str) -> bool {
            self.0.lock().unwrap().nodes.contains_key(path)
        }

        fn mkdir(&mut self, path: &str) -> io::Result<()> {
            let mut tree = self.0.lock().unwrap();
            let parent = parent_of(path);
            if !parent.is_empty() && tree.nodes.get(parent) != Some(&Node::Dir) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no parent"));
            }
            tree.ops.push(format!("mkdir {path}"));
            tree.nodes.insert(path.to_string(), Node::Dir);
            Ok(())
        }

        fn read_dir(&mut self, path: &str) -> io::Result<Vec<RemoteEntry>> {
            let tree = self.0.lock().unwrap();
            let mut entries = vec![
                RemoteEntry {
                    name: ".".into(),
                    is_dir: true,
                },
                RemoteEntry {
                    name: "..".into(),
                    is_dir: true,
                },
            ];
            for (key, node) in &tree.nodes {
                if parent_of(key) == path && key != path {
                    entries.push(RemoteEntry {
                        name: key[path.len() + 1..].to_string(),
                        is_dir: *node == Node::Dir,
                    });
                }
            }
            Ok(entries)
        }

        fn remove_file(&mut self, path: &str) -> io::Result<()> {
            let mut tree = self.0.lock().unwrap();
            tree.ops.push(format!("rm {path}"));
            tree.nodes.remove(path);
            Ok(())
        }

        fn remove_dir(&mut self, path: &str) -> io::Result<()> {
            let mut tree = self.0.lock().unwrap();
            if tree.nodes.keys().any(|k| parent_of(k) == path) {
                return Err(io::Error::other("directory not empty"));
            }
            tree.ops.push(format!("rmdir {path}"));
            tree.nodes.remove(path);
            Ok(())
        }

        fn create<'a>(&'a mut self, path: &str) -> io::Result<Box<dyn Write + 'a>> {
            let mut tree = self.0.lock().unwrap();
            let parent = parent_of(path);
            if !parent.is_empty() && tree.nodes.get(parent) != Some(&Node::Dir) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no parent"));
            }
            tree.ops.push(format!("create {path}"));
            tree.nodes.insert(path.to_string(), Node::File(Vec::new()));
            Ok(Box::new(MemoryWriter {
                tree: Arc::clone(&self.0),
                path: path.to_string(),
            }))
        }
    }

    struct MemoryConnector {
        fs: MemoryFs,
        refuse: bool,
    }

    impl SftpConnector for MemoryConnector {
        fn destination(&self) -> String {
            "deploy@memory:22".into()
        }

        fn open(&self) -> Result<Box<dyn RemoteFs>, TransferError> {
            if self.refuse {
                return Err(TransferError::Connect("connection refused".into()));
            }
            Ok(Box::new(self.fs.clone()))
        }
    }

    fn backend(fs: &MemoryFs) -> SftpBackend {
        SftpBackend::new(Arc::new(MemoryConnector {
            fs: fs.clone(),
            refuse: false,
        }))
    }

    fn no_progress() -> ProgressSink {
        Arc::new(|_, _| {})
    }

    fn item(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> FileTransferItem {
        let local_path = dir.path().join(name);
        std::fs::write(&local_path, content).unwrap();
        FileTransferItem {
            local_path,
            remote_path: name.to_string(),
            size: content.len() as u64,
        }
    }

    #[tokio::test]
    async fn operations_require_connection() {
        let fs = MemoryFs::default();
        let mut sftp = backend(&fs);
        let err = sftp.ensure_remote_root("dev").await.unwrap_err();
        assert!(matches!(err, TransferError::NotConnected));
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let mut sftp = SftpBackend::new(Arc::new(MemoryConnector {
            fs: MemoryFs::default(),
            refuse: true,
        }));
        let err = sftp.connect().await.unwrap_err();
        assert!(matches!(err, TransferError::Connect(_)));
    }

    #[tokio::test]
    async fn send_creates_intermediate_directories() {
        let dir = tempfile::tempdir().unwrap();
        let fs = MemoryFs::default();
        let mut sftp = backend(&fs);
        sftp.connect().await.unwrap();
        sftp.ensure_remote_root("dev/8080").await.unwrap();

        let file = item(&dir, "a.txt", b"hello");
        let cancel = CancellationToken::new();
        let sent = sftp
            .send_one(&file, "dev/8080/x/y/a.txt", no_progress(), &cancel)
            .await
            .unwrap();
        assert_eq!(sent, 5);

        let tree = fs.0.lock().unwrap();
        assert_eq!(tree.nodes.get("dev/8080/x/y"), Some(&Node::Dir));
        assert_eq!(
            tree.nodes.get("dev/8080/x/y/a.txt"),
            Some(&Node::File(b"hello".to_vec()))
        );
        assert_eq!(
            &tree.ops[..4],
            &[
                "mkdir dev".to_string(),
                "mkdir dev/8080".to_string(),
                "mkdir dev/8080/x".to_string(),
                "mkdir dev/8080/x/y".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn send_reports_progress_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let fs = MemoryFs::default();
        let mut sftp = backend(&fs);
        sftp.connect().await.unwrap();

        let content = vec![7u8; CHUNK_SIZE * 2 + 10];
        let file = item(&dir, "big.data", &content);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressSink = Arc::new(move |sent, total| {
            sink.lock().unwrap().push((sent, total));
        });

        sftp.send_one(&file, "big.data", progress, &CancellationToken::new())
            .await
            .unwrap();

        let total = content.len() as u64;
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (CHUNK_SIZE as u64, total),
                (CHUNK_SIZE as u64 * 2, total),
                (total, total),
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_send_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = MemoryFs::default();
        let mut sftp = backend(&fs);
        sftp.connect().await.unwrap();

        let file = item(&dir, "a.txt", b"hello");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = sftp
            .send_one(&file, "a.txt", no_progress(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(fs.0.lock().unwrap().writes, 0);
    }

    #[tokio::test]
    async fn purge_is_depth_first_and_keeps_root() {
        let fs = MemoryFs::default();
        {
            let mut tree = fs.0.lock().unwrap();
            for d in ["dev", "dev/Build", "dev/Build/sub"] {
                tree.nodes.insert(d.into(), Node::Dir);
            }
            for f in ["dev/index.html", "dev/Build/a.wasm", "dev/Build/sub/b.data"] {
                tree.nodes.insert(f.into(), Node::File(vec![1]));
            }
        }

        let mut sftp = backend(&fs);
        sftp.connect().await.unwrap();
        sftp.purge_remote_root("dev").await.unwrap();

        let tree = fs.0.lock().unwrap();
        assert_eq!(tree.nodes.keys().collect::<Vec<_>>(), vec!["dev"]);
        assert_eq!(
            tree.ops,
            vec![
                "rm dev/Build/a.wasm",
                "rm dev/Build/sub/b.data",
                "rmdir dev/Build/sub",
                "rmdir dev/Build",
                "rm dev/index.html",
            ]
        );
    }

    #[tokio::test]
    async fn purge_of_missing_root_is_noop() {
        let fs = MemoryFs::default();
        let mut sftp = backend(&fs);
        sftp.connect().await.unwrap();
        sftp.purge_remote_root("nothing/here").await.unwrap();
        assert!(fs.0.lock().unwrap().ops.is_empty());
    }

    #[tokio::test]
    async fn disconnect_drops_session() {
        let fs = MemoryFs::default();
        let mut sftp = backend(&fs);
        sftp.connect().await.unwrap();
        sftp.disconnect().await;
        assert!(matches!(
            sftp.ensure_remote_root("dev").await,
            Err(TransferError::NotConnected)
        ));
    }
}
