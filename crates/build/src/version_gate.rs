//! Strict-monotonic version check in front of builds and uploads.

use std::cmp::Ordering;

use smartdeploy_core::{Confirmation, GateScope, Prompt, Version};
use tracing::{debug, info, warn};

/// How the current version relates to the last recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrder {
    Newer,
    Equal,
    Older,
}

/// Outcome of a passed gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Current version was already newer.
    Proceed(Version),
    /// User accepted the proposed increment; the caller must adopt it.
    Bumped(Version),
}

impl GateDecision {
    pub fn version(&self) -> Version {
        match self {
            GateDecision::Proceed(v) | GateDecision::Bumped(v) => *v,
        }
    }
}

/// The gate blocked and the increment was declined, or no increment
/// exists because the build number is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("version {current} must be newer than last {scope:?} version {last} ({})", suggestion(.proposed))]
pub struct StaleVersion {
    pub scope: GateScope,
    pub current: Version,
    pub last: Version,
    pub proposed: Option<Version>,
}

fn suggestion(proposed: &Option<Version>) -> String {
    match proposed {
        Some(v) => format!("suggested {v}"),
        None => "build number exhausted, raise major or minor".to_string(),
    }
}

pub fn compare(current: Version, last: Version) -> VersionOrder {
    match current.cmp(&last) {
        Ordering::Greater => VersionOrder::Newer,
        Ordering::Equal => VersionOrder::Equal,
        Ordering::Less => VersionOrder::Older,
    }
}

/// Next build number after `last`, if there is one.
pub fn propose_increment(last: Version) -> Option<Version> {
    last.increment()
}

/// Lets the operation through when `current > last`; otherwise offers the
/// increment through `prompt`. Nothing is mutated here.
pub fn check(
    scope: GateScope,
    current: Version,
    last: Version,
    prompt: &dyn Prompt,
) -> Result<GateDecision, StaleVersion> {
    if compare(current, last) == VersionOrder::Newer {
        debug!(?scope, %current, %last, "version gate passed");
        return Ok(GateDecision::Proceed(current));
    }

    let Some(proposed) = propose_increment(last) else {
        warn!(?scope, %current, %last, "no build number left to propose");
        return Err(StaleVersion {
            scope,
            current,
            last,
            proposed: None,
        });
    };
    let question = Confirmation::IncrementVersion {
        scope,
        current,
        proposed,
    };

    if prompt.confirm(&question) {
        info!(?scope, %current, %proposed, "version incremented");
        Ok(GateDecision::Bumped(proposed))
    } else {
        Err(StaleVersion {
            scope,
            current,
            last,
            proposed: Some(proposed),
        })
    }
}
