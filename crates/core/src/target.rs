use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform an artifact is compiled for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildTarget {
    /// Sentinel for "nothing selected". Never buildable.
    #[default]
    NoTarget,
    StandaloneWindows64,
    #[serde(rename = "StandaloneOSX")]
    StandaloneOsx,
    StandaloneLinux64,
    LinuxHeadlessSimulation,
    #[serde(rename = "WebGL")]
    WebGl,
    Android,
    #[serde(rename = "iOS")]
    Ios,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 8] = [
        BuildTarget::NoTarget,
        BuildTarget::StandaloneWindows64,
        BuildTarget::StandaloneOsx,
        BuildTarget::StandaloneLinux64,
        BuildTarget::LinuxHeadlessSimulation,
        BuildTarget::WebGl,
        BuildTarget::Android,
        BuildTarget::Ios,
    ];

    /// Identifier used in output paths and by build backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::NoTarget => "NoTarget",
            BuildTarget::StandaloneWindows64 => "StandaloneWindows64",
            BuildTarget::StandaloneOsx => "StandaloneOSX",
            BuildTarget::StandaloneLinux64 => "StandaloneLinux64",
            BuildTarget::LinuxHeadlessSimulation => "LinuxHeadlessSimulation",
            BuildTarget::WebGl => "WebGL",
            BuildTarget::Android => "Android",
            BuildTarget::Ios => "iOS",
        }
    }

    /// Linux targets that are built as a dedicated server player.
    pub fn is_headless_linux(&self) -> bool {
        matches!(
            self,
            BuildTarget::StandaloneLinux64 | BuildTarget::LinuxHeadlessSimulation
        )
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target name that matches no [`BuildTarget`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown build target '{0}'")]
pub struct UnknownTarget(pub String);

impl FromStr for BuildTarget {
    type Err = UnknownTarget;

    /// Matches [`BuildTarget::as_str`] ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        BuildTarget::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownTarget(s.to_string()))
    }
}

/// Player flavour within a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildSubtarget {
    #[default]
    Player,
    Server,
}

impl fmt::Display for BuildSubtarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSubtarget::Player => f.write_str("Player"),
            BuildSubtarget::Server => f.write_str("Server"),
        }
    }
}
