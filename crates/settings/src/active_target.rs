use std::path::{Path, PathBuf};

use smartdeploy_core::BuildTarget;
use tracing::{debug, info};

use crate::error::SettingsError;
use crate::paths::active_target_path;

/// Overrides the remembered active target for one process.
pub const ACTIVE_TARGET_VAR: &str = "SMARTDEPLOY_ACTIVE_TARGET";

/// The target the build tool currently has active, remembered between runs.
///
/// This is separate from the configured target in the project settings:
/// the two differ until a target switch is accepted.
#[derive(Debug, Clone)]
pub struct ActiveTargetFile {
    path: PathBuf,
}

impl ActiveTargetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File at `<project>/.smartdeploy/active_target.json`.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(active_target_path(project_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no target was ever recorded.
    pub fn load(&self) -> Result<Option<BuildTarget>, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SettingsError::io(&self.path, e)),
        };
        let target = serde_json::from_str(&content).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(target))
    }

    pub fn save(&self, target: BuildTarget) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
        }
        let json = serde_json::to_string(&target).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| SettingsError::io(&self.path, e))?;
        debug!(%target, path = %self.path.display(), "active target saved");
        Ok(())
    }

    /// `override_name` (normally [`ACTIVE_TARGET_VAR`]) wins, then the
    /// recorded target, then [`BuildTarget::NoTarget`].
    pub fn resolve(&self, override_name: Option<&str>) -> Result<BuildTarget, SettingsError> {
        if let Some(name) = override_name.filter(|n| !n.trim().is_empty()) {
            let target = name.parse::<BuildTarget>()?;
            info!(%target, "active target taken from {ACTIVE_TARGET_VAR}");
            return Ok(target);
        }
        Ok(self.load()?.unwrap_or_default())
    }
}
