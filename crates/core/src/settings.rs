//! Persisted build and upload configuration.
//!
//! One [`ProjectSettings`] exists per project. It is loaded once by the
//! settings store, passed by `&mut` into whichever component runs, and
//! saved after each mutation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::target::BuildTarget;
use crate::transfer::ProgressWeighting;
use crate::version::Version;

/// Default object-storage region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default SSH port.
pub const DEFAULT_SFTP_PORT: u16 = 22;

/// Build-side settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub build_target: BuildTarget,
    /// Output folder; absolute, or relative to the project root.
    pub build_path: String,
    pub scenes_to_build: BTreeSet<String>,
    /// Version of the last successful build.
    pub last_version: Version,
    pub development_build: bool,
}

/// Deployment environment label. Orthogonal to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvironmentTag {
    #[default]
    Dev,
    Test,
    Local,
}

impl EnvironmentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentTag::Dev => "DEV",
            EnvironmentTag::Test => "TEST",
            EnvironmentTag::Local => "LOCAL",
        }
    }
}

impl fmt::Display for EnvironmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote delivery mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Sftp,
    ObjectStorage,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Sftp => f.write_str("SFTP"),
            TransportKind::ObjectStorage => f.write_str("object storage"),
        }
    }
}

/// Upload-side settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub environment: EnvironmentTag,
    pub transport: TransportKind,
    /// Selects a path prefix under the remote root; not a network port.
    pub remote_port: u32,
    /// Bucket name for object storage, host name for SFTP.
    pub bucket_or_remote_name: String,
    pub region: String,
    pub sftp_port: u16,
    pub sftp_user: String,
    pub purge_before_upload: bool,
    /// Whether aggregate progress counts files or bytes.
    pub progress_weighting: ProgressWeighting,
    /// Version of the last successful upload.
    pub last_version: Version,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            environment: EnvironmentTag::default(),
            transport: TransportKind::default(),
            remote_port: 0,
            bucket_or_remote_name: String::new(),
            region: DEFAULT_REGION.to_string(),
            sftp_port: DEFAULT_SFTP_PORT,
            sftp_user: String::new(),
            purge_before_upload: false,
            progress_weighting: ProgressWeighting::Files,
            last_version: Version::ZERO,
        }
    }
}

/// Everything persisted for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Current application version; the value the gates compare.
    pub bundle_version: Version,
    pub build: BuildSettings,
    pub upload: UploadSettings,
    pub upload_after_build: bool,
}

/// Secrets read from the credential source. Never persisted with settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub sftp_password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.as_deref().is_some_and(|s| !s.is_empty()) {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Credentials")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("sftp_password", &redact(&self.sftp_password))
            .finish()
    }
}
