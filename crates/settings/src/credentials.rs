//! Credential sources.
//!
//! Secrets are resolved per key: the process environment wins, then the
//! user-scoped `credentials.env` file. Nothing is written back into the
//! process environment.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smartdeploy_core::Credentials;
use tracing::{debug, info};

use crate::error::SettingsError;
use crate::paths::{config_base_dir, set_permissions_0600};

pub const ACCESS_KEY_VAR: &str = "SMARTDEPLOY_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "SMARTDEPLOY_SECRET_KEY";
pub const SFTP_PASSWORD_VAR: &str = "SMARTDEPLOY_SFTP_PASSWORD";

const CREDENTIALS_FILE: &str = "credentials.env";

/// Loads and stores [`Credentials`].
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Result<Credentials, SettingsError>;

    fn store(&self, credentials: &Credentials) -> Result<(), SettingsError>;
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variables over a dotenv-syntax file.
#[derive(Clone)]
pub struct EnvCredentialSource {
    file: Option<PathBuf>,
    env: EnvLookup,
}

impl EnvCredentialSource {
    /// Process environment over `<config dir>/smartdeploy/credentials.env`.
    pub fn new() -> Self {
        Self {
            file: config_base_dir().map(|dir| dir.join("smartdeploy").join(CREDENTIALS_FILE)),
            env: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Replaces the environment lookup.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn read_file(&self) -> Result<HashMap<String, String>, SettingsError> {
        let Some(path) = self.file.as_deref().filter(|p| p.is_file()) else {
            return Ok(HashMap::new());
        };

        let mut values = HashMap::new();
        for entry in dotenvy::from_path_iter(path)? {
            let (key, value) = entry?;
            values.insert(key, value);
        }
        debug!(path = %path.display(), keys = values.len(), "credentials file read");
        Ok(values)
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvCredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCredentialSource")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl CredentialSource for EnvCredentialSource {
    fn load(&self) -> Result<Credentials, SettingsError> {
        let file = self.read_file()?;
        let lookup = |key: &str| {
            (self.env)(key)
                .or_else(|| file.get(key).cloned())
                .filter(|v| !v.is_empty())
        };

        Ok(Credentials {
            access_key: lookup(ACCESS_KEY_VAR),
            secret_key: lookup(SECRET_KEY_VAR),
            sftp_password: lookup(SFTP_PASSWORD_VAR),
        })
    }

    fn store(&self, credentials: &Credentials) -> Result<(), SettingsError> {
        let path = self.file.as_deref().ok_or(SettingsError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
        }

        let mut content = String::new();
        for (key, value) in [
            (ACCESS_KEY_VAR, &credentials.access_key),
            (SECRET_KEY_VAR, &credentials.secret_key),
            (SFTP_PASSWORD_VAR, &credentials.sftp_password),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(content, "{key}=\"{}\"", escape(value));
            }
        }

        std::fs::write(path, content).map_err(|e| SettingsError::io(path, e))?;
        set_permissions_0600(path);
        info!(path = %path.display(), "credentials stored");
        Ok(())
    }
}

/// Escapes a value for a double-quoted dotenv string.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '$' => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out
}
