//! Project directory layout and build output locations.

use std::path::{Component, Path, PathBuf};

use smartdeploy_core::{BuildSubtarget, BuildTarget};

/// Name of the working-data directory inside the project root.
pub const DATA_DIR: &str = "Assets";

/// Folder offered by the path picker when nothing is configured.
pub const DEFAULT_BUILD_DIR: &str = "Build";

/// Executable name for server-class Linux players.
pub const LINUX_SERVER_EXECUTABLE: &str = "run.x86_64";

/// Up-level marker prefixed to stored paths that live inside the project.
const UP_LEVEL: &str = "../";

/// Where the project lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    data_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = normalize(&root.into());
        let data_dir = root.join(DATA_DIR);
        Self { root, data_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn default_build_dir(&self) -> PathBuf {
        self.root.join(DEFAULT_BUILD_DIR)
    }

    /// Resolves a configured build path to an absolute one.
    ///
    /// Relative paths resolve against the project root. Paths carrying the
    /// up-level marker were stored relative to the data directory and
    /// resolve from there, which lands them back under the root.
    pub fn resolve(&self, build_path: &str) -> Option<PathBuf> {
        let trimmed = build_path.trim();
        if trimmed.is_empty() {
            return None;
        }

        let path = Path::new(trimmed);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else if trimmed.starts_with(UP_LEVEL) || trimmed.starts_with("..\\") {
            self.data_dir.join(path)
        } else {
            self.root.join(path)
        };
        Some(normalize(&joined))
    }

    /// Converts a picked folder into the form stored in settings.
    ///
    /// Folders inside the project become `../<relative>` with forward
    /// slashes; anything else stays absolute.
    pub fn relativize(&self, picked: &Path) -> String {
        let full = normalize(picked);
        match full.strip_prefix(&self.root) {
            Ok(rel) => {
                let rel = rel.to_string_lossy().replace('\\', "/");
                format!("{UP_LEVEL}{rel}")
            }
            Err(_) => full.to_string_lossy().into_owned(),
        }
    }
}

/// Resolved output of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    /// Directory that receives the build and is later uploaded.
    pub artifact_root: PathBuf,
    /// Path handed to the backend: the artifact root, or the executable
    /// inside it for server-class Linux targets.
    pub location: PathBuf,
    pub target: BuildTarget,
    pub subtarget: BuildSubtarget,
}

/// Computes where `target` is built under `build_dir`.
///
/// Headless Linux targets are built as the desktop Linux target with the
/// server subtarget, and the backend receives the executable path.
pub fn output_location(build_dir: &Path, target: BuildTarget) -> OutputLocation {
    let artifact_root = build_dir.join(target.as_str());

    if target.is_headless_linux() {
        OutputLocation {
            location: artifact_root.join(LINUX_SERVER_EXECUTABLE),
            artifact_root,
            target: BuildTarget::StandaloneLinux64,
            subtarget: BuildSubtarget::Server,
        }
    } else {
        OutputLocation {
            location: artifact_root.clone(),
            artifact_root,
            target,
            subtarget: BuildSubtarget::Player,
        }
    }
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
