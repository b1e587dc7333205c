//! Remote path checks.
//!
//! Remote paths are `/`-separated keys below the remote root. The same
//! string names an SFTP file and an object key, so it must be canonical:
//! no leading slash, no empty, `.` or `..` segments, no backslashes.

use crate::TransferError;

fn invalid(remote_path: &str, reason: &str) -> TransferError {
    TransferError::InvalidPath(format!("{reason}: {remote_path:?}"))
}

/// Checks that `remote_path` is a canonical relative key.
pub fn validate_remote_path(remote_path: &str) -> Result<(), TransferError> {
    if remote_path.is_empty() {
        return Err(invalid(remote_path, "empty remote path"));
    }
    if remote_path.starts_with('/') {
        return Err(invalid(remote_path, "remote path must be relative"));
    }
    if remote_path.contains('\\') {
        return Err(invalid(remote_path, "backslash in remote path"));
    }
    if remote_path.chars().any(char::is_control) {
        return Err(invalid(remote_path, "control character in remote path"));
    }

    for (i, segment) in remote_path.split('/').enumerate() {
        match segment {
            "" => return Err(invalid(remote_path, "empty segment in remote path")),
            "." | ".." => return Err(invalid(remote_path, "relative segment in remote path")),
            s if i == 0 && is_drive(s) => {
                return Err(invalid(remote_path, "drive prefix in remote path"));
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Joins a remote directory and a relative path with a single `/`.
///
/// An empty directory yields the relative path unchanged.
pub fn join_remote(dir: &str, relative: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let relative = relative.trim_start_matches("./").trim_start_matches('/');
    if dir.is_empty() {
        relative.to_string()
    } else if relative.is_empty() {
        dir.to_string()
    } else {
        format!("{dir}/{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(path: &str) -> String {
        match validate_remote_path(path) {
            Err(TransferError::InvalidPath(msg)) => msg,
            other => panic!("expected InvalidPath for {path:?}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_build_output_keys() {
        assert!(validate_remote_path("index.html").is_ok());
        assert!(validate_remote_path("Build/WebGL.wasm.br").is_ok());
        assert!(validate_remote_path(".well-known/config.json").is_ok());
        assert!(validate_remote_path("StreamingAssets/a b/c.json").is_ok());
    }

    #[test]
    fn rejects_empty_and_absolute() {
        assert!(reason("").starts_with("empty remote path"));
        assert!(reason("/var/www/index.html").starts_with("remote path must be relative"));
    }

    #[test]
    fn rejects_non_canonical_segments() {
        assert!(reason("Build//game.wasm").starts_with("empty segment"));
        assert!(reason("Build/").starts_with("empty segment"));
        assert!(reason("./index.html").starts_with("relative segment"));
        assert!(reason("sub/../../escape").starts_with("relative segment"));
        assert!(reason("..").starts_with("relative segment"));
    }

    #[test]
    fn rejects_windows_forms() {
        assert!(reason("Build\\game.wasm").starts_with("backslash"));
        assert!(reason("C:/build/index.html").starts_with("drive prefix"));
    }

    #[test]
    fn rejects_control_characters() {
        assert!(reason("index\n.html").starts_with("control character"));
    }

    #[test]
    fn join_handles_slashes() {
        assert_eq!(join_remote("dev/8080", "a/b.txt"), "dev/8080/a/b.txt");
        assert_eq!(join_remote("dev/", "a.txt"), "dev/a.txt");
        assert_eq!(join_remote("", "a.txt"), "a.txt");
        assert_eq!(join_remote("/srv/www", "./a.txt"), "/srv/www/a.txt");
        assert_eq!(join_remote("dev", ""), "dev");
    }
}
