//! Object-storage transfer backend.
//!
//! Each file becomes one PUT. Progress is reported once per file, when the
//! store acknowledges it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use smartdeploy_core::{FileTransferItem, TransportKind};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{ProgressSink, TransferBackend};
use crate::content_type::{content_encoding_for, content_type_for};
use crate::{BoxFuture, TransferError};

const HASH_CHUNK: usize = 64 * 1024;

/// One object to store, streamed from a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
    /// Base64 SHA-256 of the file, verified by the store.
    pub checksum_sha256: String,
}

impl PutRequest {
    /// Builds the request for the file at `path` stored under `key`.
    ///
    /// The file is hashed in one buffered pass; its bytes are never held
    /// in memory as a whole.
    pub async fn from_path(key: impl Into<String>, path: &Path) -> Result<Self, TransferError> {
        let key = key.into();
        let mut reader = BufReader::with_capacity(HASH_CHUNK, File::open(path).await?);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_CHUNK];
        let mut size = 0u64;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        Ok(Self {
            content_type: content_type_for(&key),
            content_encoding: content_encoding_for(&key),
            checksum_sha256: BASE64.encode(hasher.finalize()),
            path: path.to_path_buf(),
            size,
            key,
        })
    }
}

/// A bucket that accepts whole-object puts.
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    fn region(&self) -> &str;

    fn put_object(&self, request: PutRequest) -> BoxFuture<'_, Result<(), TransferError>>;
}

/// S3 bucket accessed through the AWS SDK.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Store {
    /// Static-key client for `bucket` in `region`.
    pub fn new(access_key: &str, secret_key: &str, region: &str, bucket: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "smartdeploy");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();
        Self::from_client(Client::from_conf(config), region, bucket)
    }

    /// Wraps a client configured elsewhere.
    pub fn from_client(client: Client, region: &str, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            region: region.to_string(),
        }
    }
}

impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn put_object(&self, request: PutRequest) -> BoxFuture<'_, Result<(), TransferError>> {
        Box::pin(async move {
            let key = request.key;
            let body = ByteStream::from_path(&request.path).await.map_err(|e| {
                TransferError::ObjectStore(format!("open {}: {e}", request.path.display()))
            })?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type(request.content_type)
                .set_content_encoding(request.content_encoding.map(str::to_string))
                .checksum_sha256(request.checksum_sha256)
                .content_length(request.size as i64)
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    TransferError::ObjectStore(format!("put {key}: {}", DisplayErrorContext(&e)))
                })?;
            Ok(())
        })
    }
}

/// Uploads into a bucket through an [`ObjectStore`].
pub struct ObjectStorageBackend {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStorageBackend {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl TransferBackend for ObjectStorageBackend {
    fn kind(&self) -> TransportKind {
        TransportKind::ObjectStorage
    }

    fn destination(&self) -> String {
        format!("s3://{} ({})", self.store.bucket(), self.store.region())
    }

    fn connect(&mut self) -> BoxFuture<'_, Result<(), TransferError>> {
        Box::pin(async move {
            if self.store.bucket().trim().is_empty() {
                return Err(TransferError::Connect("bucket name is empty".into()));
            }
            Ok(())
        })
    }

    fn ensure_remote_root<'a>(
        &'a mut self,
        _remote_root: &'a str,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        // Prefixes need no creation.
        Box::pin(async { Ok(()) })
    }

    fn supports_purge(&self) -> bool {
        false
    }

    fn purge_remote_root<'a>(
        &'a mut self,
        remote_root: &'a str,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            warn!(prefix = %remote_root, "purge requested on object storage");
            Err(TransferError::Unsupported("purging a bucket prefix"))
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
            let request = PutRequest::from_path(remote_path, &item.local_path).await?;
            let size = request.size;
            debug!(
                key = %request.key,
                content_type = request.content_type,
                content_encoding = ?request.content_encoding,
                size,
                "putting object"
            );

            tokio::select! {
                _ = cancel.cancelled() => Err(TransferError::Cancelled),
                result = self.store.put_object(request) => {
                    result?;
                    progress(size, size);
                    Ok(size)
                }
            }
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}
