//! Build-then-deploy pipeline.
//!
//! Wires the build executor, the upload version gate and the upload
//! orchestrator over one project. Settings are borrowed mutably for the
//! duration of a call; persisting them is the caller's job.

use std::path::PathBuf;

use smartdeploy_build::layout::output_location;
use smartdeploy_build::version_gate::{self, GateDecision};
use smartdeploy_build::{BuildBackend, BuildExecutor, BuildReport, ProjectLayout};
use smartdeploy_core::{
    Credentials, GateScope, PathPicker, ProjectSettings, Prompt, SettingsField, StatusEmitter,
    UploadSettings, ValidationError,
};
use smartdeploy_transfer::TransferBackend;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::DeployError;
use crate::orchestrator::{UploadOrchestrator, UploadReport, UploadRequest};
use crate::preflight::validate_destination;

/// Remote directory for an upload: the lower-cased environment tag, plus
/// `/<remote_port>` when the port is set.
pub fn default_remote_dir(upload: &UploadSettings) -> String {
    let env = upload.environment.to_string().to_lowercase();
    if upload.remote_port == 0 {
        env
    } else {
        format!("{env}/{}", upload.remote_port)
    }
}

/// One project's build and upload flow.
pub struct DeployPipeline<'a> {
    backend: &'a mut dyn BuildBackend,
    prompt: &'a dyn Prompt,
    picker: &'a dyn PathPicker,
    layout: &'a ProjectLayout,
    events: StatusEmitter,
    cancel: CancellationToken,
}

impl<'a> DeployPipeline<'a> {
    pub fn new(
        backend: &'a mut dyn BuildBackend,
        prompt: &'a dyn Prompt,
        picker: &'a dyn PathPicker,
        layout: &'a ProjectLayout,
        events: StatusEmitter,
    ) -> Self {
        Self {
            backend,
            prompt,
            picker,
            layout,
            events,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancels uploads started by this pipeline.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn build(
        &mut self,
        settings: &mut ProjectSettings,
    ) -> Result<BuildReport, DeployError> {
        let report =
            BuildExecutor::new(&mut *self.backend, self.prompt, self.picker, self.layout)
                .build(settings, &self.events)
                .await?;
        Ok(report)
    }

    /// Uploads the current build output through `transport`.
    ///
    /// When the upload gate bumps the version, the project is rebuilt
    /// first and a failed build aborts the upload. `upload.last_version`
    /// moves only after a run that sent every file.
    pub async fn upload(
        &mut self,
        settings: &mut ProjectSettings,
        credentials: &Credentials,
        transport: &mut dyn TransferBackend,
    ) -> Result<UploadReport, DeployError> {
        self.upload_from(settings, credentials, transport, None).await
    }

    /// Builds, then uploads the fresh output when `upload_after_build` is
    /// set. `connect` produces the transport only when it is needed.
    ///
    /// The destination is validated before building, so a run that cannot
    /// upload never starts the build.
    pub async fn build_and_upload<F>(
        &mut self,
        settings: &mut ProjectSettings,
        credentials: &Credentials,
        connect: F,
    ) -> Result<(BuildReport, Option<UploadReport>), DeployError>
    where
        F: FnOnce(
            &UploadSettings,
            &Credentials,
        ) -> Result<Box<dyn TransferBackend>, ValidationError>,
    {
        if settings.upload_after_build {
            validate_destination(&settings.upload, credentials)?;
        }
        let build = self.build(settings).await?;
        if !settings.upload_after_build {
            return Ok((build, None));
        }

        let mut transport = connect(&settings.upload, credentials)?;
        let upload = self
            .upload_from(
                settings,
                credentials,
                transport.as_mut(),
                Some(build.artifact_root.clone()),
            )
            .await?;
        Ok((build, Some(upload)))
    }

    async fn upload_from(
        &mut self,
        settings: &mut ProjectSettings,
        credentials: &Credentials,
        transport: &mut dyn TransferBackend,
        built_root: Option<PathBuf>,
    ) -> Result<UploadReport, DeployError> {
        // Gate first; nothing is applied until the destination checks out.
        let decision = version_gate::check(
            GateScope::Upload,
            settings.bundle_version,
            settings.upload.last_version,
            self.prompt,
        )?;
        validate_destination(&settings.upload, credentials)?;

        let root = match (decision, built_root) {
            (GateDecision::Bumped(version), _) => {
                settings.bundle_version = version;
                info!(%version, "rebuilding before upload");
                self.build(settings).await?.artifact_root
            }
            (GateDecision::Proceed(_), Some(root)) => root,
            (GateDecision::Proceed(_), None) => self.artifact_root(settings)?,
        };

        let request = UploadRequest {
            root,
            remote_dir: default_remote_dir(&settings.upload),
            purge_first: settings.upload.purge_before_upload,
            weighting: settings.upload.progress_weighting,
        };

        let orchestrator = UploadOrchestrator::with_cancel(self.events.clone(), self.cancel.clone());
        let report = orchestrator.run(transport, &request).await?;

        if report.is_clean() {
            settings.upload.last_version = settings.bundle_version;
            info!(version = %settings.bundle_version, "upload version recorded");
        }
        Ok(report)
    }

    /// Output directory of the configured build, without building.
    fn artifact_root(&self, settings: &ProjectSettings) -> Result<PathBuf, ValidationError> {
        let dir = self
            .layout
            .resolve(&settings.build.build_path)
            .ok_or_else(|| ValidationError::missing(SettingsField::BuildPath))?;
        Ok(output_location(&dir, settings.build.build_target).artifact_root)
    }
}
