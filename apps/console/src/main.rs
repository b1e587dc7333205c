//! SmartDeploy console entry point.
//!
//! Usage: `smartdeploy [PROJECT_ROOT]`. The build command comes from
//! `SMARTDEPLOY_BUILD_COMMAND`, e.g.
//! `unity -batchmode -quit -buildTarget {target} -executeMethod Build.Run -out {location}`.
//! The build tool's active target is remembered per project and can be
//! overridden with `SMARTDEPLOY_ACTIVE_TARGET`.

mod configure;
mod dialogs;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use dialoguer::Select;
use smartdeploy_build::{BuildBackend, BuildCommand, CommandBuildBackend, ProjectLayout};
use smartdeploy_core::{DeployEvent, StatusEmitter};
use smartdeploy_deploy::{DeployError, DeployPipeline, UploadReport, backend_for};
use smartdeploy_settings::{
    ACTIVE_TARGET_VAR, ActiveTargetFile, CredentialSource, EnvCredentialSource, JsonFileStore,
    Settings,
};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::dialogs::{TerminalPicker, TerminalPrompt};

const BUILD_COMMAND_VAR: &str = "SMARTDEPLOY_BUILD_COMMAND";

const ACTIONS: [&str; 6] = [
    "Build",
    "Upload",
    "Build and upload",
    "Edit settings",
    "Store credentials",
    "Quit",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,smartdeploy=debug")),
        )
        .init();

    let root = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => std::env::current_dir().context("reading the current directory")?,
    };
    if !root.is_dir() {
        bail!("project root {} is not a directory", root.display());
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        project = %root.display(),
        "starting SmartDeploy"
    );

    let mut settings = Settings::new(JsonFileStore::for_project(&root));
    let credential_source = EnvCredentialSource::new();
    let layout = ProjectLayout::new(&root);
    let active_target = ActiveTargetFile::for_project(&root);

    let events = StatusEmitter::new();
    events.subscribe(print_event);

    loop {
        let action = Select::new()
            .with_prompt("What would you like to do?")
            .items(&ACTIONS)
            .default(0)
            .interact()?;

        match action {
            0..=2 => {
                let command = std::env::var(BUILD_COMMAND_VAR)
                    .ok()
                    .as_deref()
                    .and_then(BuildCommand::from_command_line)
                    .with_context(|| format!("{BUILD_COMMAND_VAR} is not set"))?;
                let credentials = credential_source.load()?;
                let override_name = std::env::var(ACTIVE_TARGET_VAR).ok();
                let active = active_target.resolve(override_name.as_deref())?;
                let project = settings.get_mut()?;
                let mut backend = CommandBuildBackend::new(command, active);
                let mut pipeline = DeployPipeline::new(
                    &mut backend,
                    &TerminalPrompt,
                    &TerminalPicker,
                    &layout,
                    events.clone(),
                );
                let interrupt = cancel_on_ctrl_c(&pipeline);

                let result = match action {
                    0 => pipeline.build(project).await.map(|_| ()),
                    1 => match backend_for(&project.upload, &credentials) {
                        Ok(mut transport) => pipeline
                            .upload(project, &credentials, transport.as_mut())
                            .await
                            .map(|report| summarize(&report)),
                        Err(e) => Err(e.into()),
                    },
                    _ => pipeline
                        .build_and_upload(project, &credentials, backend_for)
                        .await
                        .map(|(_, upload)| upload.iter().for_each(summarize)),
                };
                interrupt.abort();
                drop(pipeline);

                // Gates and target switches may have changed settings
                // even when the run failed.
                settings.save()?;
                active_target.save(backend.active_target())?;
                report_error(result);
            }
            3 => {
                let mut edited = settings.get()?.clone();
                configure::edit_settings(&mut edited)?;
                settings.update(|s| *s = edited)?;
                println!("Settings saved to {}", settings.store().path().display());
            }
            4 => {
                let transport = settings.get()?.upload.transport;
                let current = credential_source.load()?;
                let updated = configure::edit_credentials(transport, &current)?;
                credential_source.store(&updated)?;
                if let Some(file) = credential_source.file() {
                    println!("Credentials saved to {}", file.display());
                }
            }
            _ => break,
        }
    }

    Ok(())
}

/// Cancels the pipeline's uploads on Ctrl-C until the handle is aborted.
fn cancel_on_ctrl_c(pipeline: &DeployPipeline<'_>) -> JoinHandle<()> {
    let token = pipeline.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            token.cancel();
        }
    })
}

fn print_event(event: &DeployEvent) {
    match event {
        // Per-chunk progress goes to the log only.
        DeployEvent::FileProgress { .. } => tracing::trace!(%event),
        _ => println!("{event}"),
    }
}

fn summarize(report: &UploadReport) {
    for failure in &report.failures {
        println!("  {}: {}", failure.remote_path, failure.error);
    }
    tracing::info!(
        run_id = %report.run_id,
        outcome = ?report.outcome,
        sent = report.files_sent,
        total = report.files_total,
        "upload run ended"
    );
}

fn report_error(result: Result<(), DeployError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_canceled() => println!("Canceled."),
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            println!("Error: {e}");
        }
    }
}
