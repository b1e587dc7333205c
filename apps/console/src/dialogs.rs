//! Terminal implementations of the pipeline's interactive collaborators.

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input};
use smartdeploy_core::{Confirmation, PathPicker, Prompt};
use tracing::warn;

/// Asks confirmations on the terminal. A failed prompt counts as "no".
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &Confirmation) -> bool {
        Confirm::new()
            .with_prompt(format!("{}: {}", question.title(), question.message()))
            .default(true)
            .interact()
            .unwrap_or_else(|e| {
                warn!(error = %e, "confirmation prompt failed");
                false
            })
    }
}

/// Reads a folder path from the terminal. An empty answer cancels.
pub struct TerminalPicker;

impl PathPicker for TerminalPicker {
    fn pick_folder(&self, default_dir: &Path) -> Option<PathBuf> {
        let answer: String = Input::new()
            .with_prompt("Build folder (empty to cancel)")
            .with_initial_text(default_dir.display().to_string())
            .allow_empty(true)
            .interact_text()
            .inspect_err(|e| warn!(error = %e, "folder prompt failed"))
            .ok()?;
        let answer = answer.trim();
        (!answer.is_empty()).then(|| PathBuf::from(answer))
    }
}
