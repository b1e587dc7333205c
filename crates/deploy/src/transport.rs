//! Production transfer backends from settings.

use std::sync::Arc;

use smartdeploy_core::{Credentials, TransportKind, UploadSettings, ValidationError};
use smartdeploy_transfer::{
    ObjectStorageBackend, S3Store, SftpBackend, Ssh2Connector, TransferBackend,
};

use crate::preflight::validate_destination;

/// Validates the destination and builds the matching backend.
pub fn backend_for(
    upload: &UploadSettings,
    credentials: &Credentials,
) -> Result<Box<dyn TransferBackend>, ValidationError> {
    validate_destination(upload, credentials)?;

    let backend: Box<dyn TransferBackend> = match upload.transport {
        TransportKind::Sftp => {
            let connector = Ssh2Connector::new(
                upload.bucket_or_remote_name.trim(),
                upload.sftp_port,
                upload.sftp_user.trim(),
                credentials.sftp_password.as_deref().unwrap_or_default(),
            );
            Box::new(SftpBackend::new(Arc::new(connector)))
        }
        TransportKind::ObjectStorage => {
            let store = S3Store::new(
                credentials.access_key.as_deref().unwrap_or_default(),
                credentials.secret_key.as_deref().unwrap_or_default(),
                upload.region.trim(),
                upload.bucket_or_remote_name.trim(),
            );
            Box::new(ObjectStorageBackend::new(Arc::new(store)))
        }
    };
    Ok(backend)
}
