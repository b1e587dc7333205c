//! Shared data model for the SmartDeploy pipeline.
//!
//! Everything the build gate, the transfer backends and the upload
//! orchestrator exchange lives here: versions and build targets, the
//! persisted project settings, transient transfer items, and the
//! run-scoped status stream.
//!
//! The interactive collaborators (confirmation prompts and the folder
//! picker) are traits so the pipeline crates stay free of any UI.

pub mod events;
pub mod prompt;
pub mod settings;
pub mod target;
pub mod transfer;
pub mod validation;
pub mod version;

pub use events::{DeployEvent, StatusEmitter};
pub use prompt::{Confirmation, GateScope, PathPicker, Prompt};
pub use settings::{
    BuildSettings, Credentials, EnvironmentTag, ProjectSettings, TransportKind, UploadSettings,
};
pub use target::{BuildSubtarget, BuildTarget, UnknownTarget};
pub use transfer::{FileTransferItem, ProgressWeighting, TransferProgress};
pub use validation::{SettingsField, ValidationError};
pub use version::{Version, VersionError};
