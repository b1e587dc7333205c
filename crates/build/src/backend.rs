//! The opaque build backend.
//!
//! The host environment implements `BuildBackend` to compile and package
//! the application. Keeping it a trait lets the gate and executor be
//! tested with a recording mock.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use smartdeploy_core::{BuildSubtarget, BuildTarget};

use crate::error::BuildError;

/// Fully resolved request handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub scenes: Vec<String>,
    /// Output path: a directory, or an executable for server players.
    pub location: PathBuf,
    pub target: BuildTarget,
    pub subtarget: BuildSubtarget,
    pub development: bool,
}

/// Compiles and packages the application.
pub trait BuildBackend: Send + Sync {
    /// Target the environment is currently set up for.
    fn active_target(&self) -> BuildTarget;

    /// Reconfigures the environment for `target`.
    fn switch_active_target(&mut self, target: BuildTarget) -> Result<(), BuildError>;

    /// Runs the build.
    fn build_player<'a>(
        &'a mut self,
        options: &'a BuildOptions,
    ) -> Pin<Box<dyn Future<Output = Result<(), BuildError>> + Send + 'a>>;
}
