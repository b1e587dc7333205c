//! Build gate and executor.
//!
//! Turns a [`ProjectSettings`](smartdeploy_core::ProjectSettings) into a
//! call to an opaque build backend, after checking that the request makes
//! sense:
//!
//! 1. **Target**: configured target matches the active one, or is switched
//! 2. **Validate**: a real target and at least one scene
//! 3. **Path**: output folder resolves, or the user picks one
//! 4. **Version**: current version is strictly newer than the last build
//! 5. **Build**: output folder is recreated and the backend runs

pub mod backend;
pub mod command;
pub mod error;
pub mod executor;
pub mod layout;
pub mod version_gate;

pub use backend::{BuildBackend, BuildOptions};
pub use command::{BuildCommand, CommandBuildBackend};
pub use error::BuildError;
pub use executor::{BuildExecutor, BuildReport};
pub use layout::{OutputLocation, ProjectLayout};
pub use version_gate::{GateDecision, StaleVersion, VersionOrder};
