//! Interactive collaborators the pipeline asks for decisions.

use std::path::{Path, PathBuf};

use crate::target::BuildTarget;
use crate::version::Version;

/// Which version gate is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateScope {
    Build,
    Upload,
}

/// A yes/no question raised by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The configured target differs from the environment's active one.
    SwitchTarget {
        active: BuildTarget,
        requested: BuildTarget,
    },
    /// The current version is not newer than the last recorded one.
    IncrementVersion {
        scope: GateScope,
        current: Version,
        proposed: Version,
    },
}

impl Confirmation {
    pub fn title(&self) -> &'static str {
        match self {
            Confirmation::SwitchTarget { .. } => "Incompatible build platforms",
            Confirmation::IncrementVersion { .. } => "Version error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Confirmation::SwitchTarget { active, requested } => format!(
                "Current build target is {active}. Do you want to switch to {requested}?"
            ),
            Confirmation::IncrementVersion {
                scope,
                current,
                proposed,
            } => {
                let what = match scope {
                    GateScope::Build => "build",
                    GateScope::Upload => "upload",
                };
                format!(
                    "Current version '{current}' must be higher than the last {what} version. \
                     Do you want to increment it to '{proposed}'?"
                )
            }
        }
    }
}

/// Answers confirmations.
pub trait Prompt: Send + Sync {
    fn confirm(&self, question: &Confirmation) -> bool;
}

/// Lets the user choose a folder. Returns `None` when cancelled.
pub trait PathPicker: Send + Sync {
    fn pick_folder(&self, default_dir: &Path) -> Option<PathBuf>;
}
