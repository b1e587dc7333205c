use std::path::{Path, PathBuf};

/// Per-project settings directory name.
const PROJECT_DIR: &str = ".smartdeploy";

/// Settings file name inside [`PROJECT_DIR`].
const SETTINGS_FILE: &str = "settings.json";

/// Active build target file name inside [`PROJECT_DIR`].
const ACTIVE_TARGET_FILE: &str = "active_target.json";

/// `<project>/.smartdeploy/settings.json`.
pub fn settings_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(SETTINGS_FILE)
}

/// `<project>/.smartdeploy/active_target.json`.
pub fn active_target_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(ACTIVE_TARGET_FILE)
}

/// User configuration directory for the current platform.
pub fn config_base_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(xdg));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Library").join("Application Support"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        None
    }
}

/// Restricts `path` to its owner. Best effort.
pub(crate) fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
