//! Persisted project settings and credentials.
//!
//! Project settings live in a pretty-printed JSON file inside the project
//! (`.smartdeploy/settings.json`) and are cached for the process lifetime
//! by [`Settings`]. Credentials never go there: they come from the process
//! environment, falling back to a user-scoped `credentials.env` file.
//! The build tool's active target is remembered next to the settings.

mod active_target;
mod credentials;
mod error;
mod paths;
mod store;

pub use active_target::{ACTIVE_TARGET_VAR, ActiveTargetFile};
pub use credentials::{
    ACCESS_KEY_VAR, CredentialSource, EnvCredentialSource, SECRET_KEY_VAR, SFTP_PASSWORD_VAR,
};
pub use error::SettingsError;
pub use paths::{config_base_dir, settings_path};
pub use store::{JsonFileStore, MemoryStore, Settings, SettingsStore};
