//! Destination checks that run before anything is built or sent.

use smartdeploy_core::{Credentials, SettingsField, TransportKind, UploadSettings, ValidationError};

fn require(value: Option<&str>, field: SettingsField) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::missing(field)),
    }
}

/// Fails on the first missing destination setting or credential.
pub fn validate_destination(
    upload: &UploadSettings,
    credentials: &Credentials,
) -> Result<(), ValidationError> {
    require(Some(&upload.bucket_or_remote_name), SettingsField::RemoteName)?;

    match upload.transport {
        TransportKind::ObjectStorage => {
            require(Some(&upload.region), SettingsField::Region)?;
            require(credentials.access_key.as_deref(), SettingsField::AccessKey)?;
            require(credentials.secret_key.as_deref(), SettingsField::SecretKey)?;
        }
        TransportKind::Sftp => {
            require(Some(&upload.sftp_user), SettingsField::SftpUser)?;
            require(credentials.sftp_password.as_deref(), SettingsField::SftpPassword)?;
        }
    }
    Ok(())
}
