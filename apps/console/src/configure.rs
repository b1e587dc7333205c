//! Interactive editing of project settings and credentials.

use std::collections::BTreeSet;

use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use smartdeploy_core::{
    BuildTarget, Credentials, EnvironmentTag, ProgressWeighting, ProjectSettings, TransportKind,
    Version,
};

const ENVIRONMENTS: [EnvironmentTag; 3] =
    [EnvironmentTag::Dev, EnvironmentTag::Test, EnvironmentTag::Local];
const TRANSPORTS: [TransportKind; 2] = [TransportKind::Sftp, TransportKind::ObjectStorage];
const WEIGHTINGS: [ProgressWeighting; 2] = [ProgressWeighting::Files, ProgressWeighting::Bytes];

/// Walks through every setting, prefilled with the current values.
pub fn edit_settings(settings: &mut ProjectSettings) -> Result<()> {
    let version: Version = Input::new()
        .with_prompt("Bundle version")
        .with_initial_text(settings.bundle_version.to_string())
        .validate_with(|v: &String| v.parse::<Version>().map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()?
        .parse()?;
    settings.bundle_version = version;

    let build = &mut settings.build;
    build.build_target = select("Build target", &BuildTarget::ALL, build.build_target)?;
    build.build_path = Input::new()
        .with_prompt("Build folder")
        .with_initial_text(build.build_path.clone())
        .allow_empty(true)
        .interact_text()?;
    let scenes: String = Input::new()
        .with_prompt("Scenes (comma-separated)")
        .with_initial_text(build.scenes_to_build.iter().cloned().collect::<Vec<_>>().join(","))
        .allow_empty(true)
        .interact_text()?;
    build.scenes_to_build = parse_scenes(&scenes);
    build.development_build = Confirm::new()
        .with_prompt("Development build?")
        .default(build.development_build)
        .interact()?;

    let upload = &mut settings.upload;
    upload.environment = select("Environment", &ENVIRONMENTS, upload.environment)?;
    upload.transport = select("Transport", &TRANSPORTS, upload.transport)?;
    upload.remote_port = Input::new()
        .with_prompt("Remote port folder (0 for none)")
        .default(upload.remote_port)
        .interact_text()?;

    match upload.transport {
        TransportKind::ObjectStorage => {
            upload.bucket_or_remote_name = Input::new()
                .with_prompt("Bucket")
                .with_initial_text(upload.bucket_or_remote_name.clone())
                .interact_text()?;
            upload.region = Input::new()
                .with_prompt("Region")
                .with_initial_text(upload.region.clone())
                .interact_text()?;
        }
        TransportKind::Sftp => {
            upload.bucket_or_remote_name = Input::new()
                .with_prompt("Host")
                .with_initial_text(upload.bucket_or_remote_name.clone())
                .interact_text()?;
            upload.sftp_port = Input::new()
                .with_prompt("SSH port")
                .default(upload.sftp_port)
                .interact_text()?;
            upload.sftp_user = Input::new()
                .with_prompt("User")
                .with_initial_text(upload.sftp_user.clone())
                .interact_text()?;
        }
    }

    upload.purge_before_upload = Confirm::new()
        .with_prompt("Delete remote files before uploading?")
        .default(upload.purge_before_upload)
        .interact()?;
    upload.progress_weighting = select("Upload progress", &WEIGHTINGS, upload.progress_weighting)?;
    settings.upload_after_build = Confirm::new()
        .with_prompt("Upload after every build?")
        .default(settings.upload_after_build)
        .interact()?;
    Ok(())
}

/// Asks for the secrets the configured transport needs. Blank answers
/// keep the current value.
pub fn edit_credentials(transport: TransportKind, current: &Credentials) -> Result<Credentials> {
    let mut creds = current.clone();
    match transport {
        TransportKind::ObjectStorage => {
            creds.access_key = secret("Access key", &current.access_key)?;
            creds.secret_key = secret("Secret key", &current.secret_key)?;
        }
        TransportKind::Sftp => {
            creds.sftp_password = secret("SFTP password", &current.sftp_password)?;
        }
    }
    Ok(creds)
}

fn secret(label: &str, current: &Option<String>) -> Result<Option<String>> {
    let answer = Password::new()
        .with_prompt(format!("{label} (blank to keep)"))
        .allow_empty_password(true)
        .interact()?;
    Ok(if answer.is_empty() {
        current.clone()
    } else {
        Some(answer)
    })
}

fn select<T: Copy + PartialEq + ToString>(prompt: &str, items: &[T], current: T) -> Result<T> {
    let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
    let default = items.iter().position(|i| *i == current).unwrap_or(0);
    let index = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(default)
        .interact()?;
    Ok(items[index])
}

fn parse_scenes(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
