//! Build backend that shells out to an external build command.
//!
//! Arguments are templates; the placeholders `{target}`, `{subtarget}`,
//! `{location}`, `{scenes}` (comma-separated) and `{development}` are
//! substituted per build.
//!
//! A command line is split on whitespace. Single quotes keep their content
//! verbatim; inside double quotes `\"` and `\\` are escapes. Backslashes
//! elsewhere are literal, so Windows paths need no doubling.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use smartdeploy_core::BuildTarget;
use tokio::process::Command;
use tracing::{debug, info};

use crate::backend::{BuildBackend, BuildOptions};
use crate::error::BuildError;

/// How many trailing stderr bytes are kept in a failure message.
const STDERR_TAIL: usize = 2048;

/// Program and argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl BuildCommand {
    /// Parses a command line. `None` when it is blank or a quote is left
    /// open.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = split_command_line(line)?.into_iter();
        let program = parts.next()?;
        Some(Self {
            program: PathBuf::from(program),
            args: parts.collect(),
        })
    }

    fn render_args(&self, options: &BuildOptions) -> Vec<String> {
        let scenes = options.scenes.join(",");
        let location = options.location.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{target}", options.target.as_str())
                    .replace("{subtarget}", &options.subtarget.to_string())
                    .replace("{location}", &location)
                    .replace("{scenes}", &scenes)
                    .replace("{development}", if options.development { "1" } else { "0" })
            })
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

fn split_command_line(line: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    // Distinguishes `""` (an empty argument) from no argument at all.
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Double, '\\') if matches!(chars.peek(), Some(&('"' | '\\'))) => {
                word.extend(chars.next());
            }
            (_, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if quote != Quote::None {
        return None;
    }
    if in_word {
        words.push(word);
    }
    Some(words)
}

/// Runs a [`BuildCommand`] for every build.
///
/// The target is passed on each invocation, so switching only updates the
/// remembered active target.
#[derive(Debug, Clone)]
pub struct CommandBuildBackend {
    command: BuildCommand,
    active: BuildTarget,
}

impl CommandBuildBackend {
    pub fn new(command: BuildCommand, active: BuildTarget) -> Self {
        Self { command, active }
    }
}

impl BuildBackend for CommandBuildBackend {
    fn active_target(&self) -> BuildTarget {
        self.active
    }

    fn switch_active_target(&mut self, target: BuildTarget) -> Result<(), BuildError> {
        if target == BuildTarget::NoTarget {
            return Err(BuildError::TargetSwitch {
                target,
                reason: "cannot activate the empty target".into(),
            });
        }
        info!(from = %self.active, to = %target, "switching active build target");
        self.active = target;
        Ok(())
    }

    fn build_player<'a>(
        &'a mut self,
        options: &'a BuildOptions,
    ) -> Pin<Box<dyn Future<Output = Result<(), BuildError>> + Send + 'a>> {
        Box::pin(async move {
            let args = self.command.render_args(options);
            debug!(program = %self.command.program.display(), ?args, "running build command");

            let output = Command::new(&self.command.program)
                .args(&args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| {
                    BuildError::Backend(format!(
                        "failed to start {}: {e}",
                        self.command.program.display()
                    ))
                })?;

            for line in String::from_utf8_lossy(&output.stdout).lines() {
                debug!(target: "smartdeploy::build::command", "{line}");
            }

            if output.status.success() {
                return Ok(());
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail_start = stderr.len().saturating_sub(STDERR_TAIL);
            let tail = stderr.get(tail_start..).unwrap_or(stderr.as_ref()).trim();
            Err(BuildError::Backend(format!(
                "{} exited with {}: {tail}",
                self.command.program.display(),
                output.status
            )))
        })
    }
}
