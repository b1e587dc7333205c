//! Build executor: preconditions, version gate, output preparation and
//! the backend call.

use std::path::{Path, PathBuf};

use smartdeploy_core::{
    BuildSettings, BuildTarget, Confirmation, DeployEvent, GateScope, PathPicker, ProjectSettings,
    Prompt, SettingsField, StatusEmitter, ValidationError, Version,
};
use tracing::{error, info, warn};

use crate::backend::{BuildBackend, BuildOptions};
use crate::error::BuildError;
use crate::layout::{ProjectLayout, output_location};
use crate::version_gate::{self, GateDecision};

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub version: Version,
    pub options: BuildOptions,
    /// Directory holding the build output; the upload source.
    pub artifact_root: PathBuf,
}

/// Runs one build against borrowed collaborators.
pub struct BuildExecutor<'a> {
    backend: &'a mut dyn BuildBackend,
    prompt: &'a dyn Prompt,
    picker: &'a dyn PathPicker,
    layout: &'a ProjectLayout,
}

impl<'a> BuildExecutor<'a> {
    pub fn new(
        backend: &'a mut dyn BuildBackend,
        prompt: &'a dyn Prompt,
        picker: &'a dyn PathPicker,
        layout: &'a ProjectLayout,
    ) -> Self {
        Self {
            backend,
            prompt,
            picker,
            layout,
        }
    }

    /// Builds the project described by `settings`.
    ///
    /// `settings` may be mutated even when the build fails: a declined
    /// target switch corrects the configured target and a picked folder
    /// replaces the build path. `build.last_version` only changes after the
    /// backend succeeds. The caller persists.
    pub async fn build(
        &mut self,
        settings: &mut ProjectSettings,
        events: &StatusEmitter,
    ) -> Result<BuildReport, BuildError> {
        let build_dir = self.check_preconditions(&mut settings.build).await?;

        let decision = version_gate::check(
            GateScope::Build,
            settings.bundle_version,
            settings.build.last_version,
            self.prompt,
        )?;
        if let GateDecision::Bumped(version) = decision {
            settings.bundle_version = version;
        }
        let version = decision.version();

        let output = output_location(&build_dir, settings.build.build_target);
        let options = BuildOptions {
            scenes: settings.build.scenes_to_build.iter().cloned().collect(),
            location: output.location,
            target: output.target,
            subtarget: output.subtarget,
            development: settings.build.development_build,
        };

        if let Err(e) = prepare_output_dir(&output.artifact_root).await {
            error!(path = %output.artifact_root.display(), error = %e, "failed to prepare output directory");
            events.emit(DeployEvent::BuildFailed {
                error: e.to_string(),
            });
            return Err(e.into());
        }

        info!(
            target = %options.target,
            subtarget = %options.subtarget,
            %version,
            location = %options.location.display(),
            "start building"
        );
        events.emit(DeployEvent::BuildStarted {
            target: settings.build.build_target,
            version,
        });

        match self.backend.build_player(&options).await {
            Ok(()) => {
                info!(%version, "building complete");
                settings.build.last_version = version;
                events.emit(DeployEvent::BuildCompleted {
                    version,
                    artifact_root: output.artifact_root.clone(),
                });
                Ok(BuildReport {
                    version,
                    options,
                    artifact_root: output.artifact_root,
                })
            }
            Err(e) => {
                error!(%version, error = %e, "building error");
                events.emit(DeployEvent::BuildFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Target, scenes and output folder, in that order. Returns the
    /// resolved output folder.
    async fn check_preconditions(
        &mut self,
        build: &mut BuildSettings,
    ) -> Result<PathBuf, BuildError> {
        let active = self.backend.active_target();
        if build.build_target != active {
            let question = Confirmation::SwitchTarget {
                active,
                requested: build.build_target,
            };
            if self.prompt.confirm(&question) {
                self.backend
                    .switch_active_target(build.build_target)
                    .map_err(|e| match e {
                        BuildError::TargetSwitch { .. } => e,
                        other => BuildError::TargetSwitch {
                            target: build.build_target,
                            reason: other.to_string(),
                        },
                    })?;
            } else {
                warn!(
                    configured = %build.build_target,
                    %active,
                    "target switch declined, keeping active target"
                );
                let requested = build.build_target;
                build.build_target = active;
                return Err(BuildError::TargetMismatch { active, requested });
            }
        }

        if build.build_target == BuildTarget::NoTarget {
            return Err(ValidationError::new(SettingsField::BuildTarget, "Select a build target").into());
        }

        if build.scenes_to_build.is_empty() {
            return Err(
                ValidationError::new(SettingsField::Scenes, "No scenes selected to build").into(),
            );
        }

        if let Some(dir) = self.layout.resolve(&build.build_path) {
            if tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
                return Ok(dir);
            }
        }

        let default_dir = self.layout.default_build_dir();
        if let Err(e) = tokio::fs::create_dir_all(&default_dir).await {
            warn!(path = %default_dir.display(), error = %e, "failed to create default build folder");
        }

        let Some(picked) = self.picker.pick_folder(&default_dir) else {
            warn!("build canceled: no folder selected");
            return Err(BuildError::Canceled);
        };

        build.build_path = self.layout.relativize(&picked);
        info!(build_path = %build.build_path, "build folder selected");

        self.layout
            .resolve(&build.build_path)
            .ok_or_else(|| ValidationError::missing(SettingsField::BuildPath).into())
    }
}

/// Removes any previous output and recreates the directory.
///
/// The whole artifact root is cleared, not just the build location: for
/// headless Linux the location is an executable inside it, and stale
/// siblings would otherwise be uploaded with the new build.
async fn prepare_output_dir(dir: &Path) -> std::io::Result<()> {
    if tokio::fs::try_exists(dir).await? {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await
}
