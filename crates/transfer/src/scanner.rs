//! File enumeration for upload.
//!
//! Every regular file under the artifact root becomes one transfer item.
//! The remote path is the file's path below the root, joined with `/`.
//! Symlinks and other special files are skipped.

use std::path::{Component, Path, PathBuf};

use smartdeploy_core::FileTransferItem;
use tracing::debug;

use crate::TransferError;

/// Lists every regular file under `root`, sorted by remote path.
pub fn enumerate(root: &Path) -> Result<Vec<FileTransferItem>, TransferError> {
    if !root.is_dir() {
        return Err(TransferError::MissingRoot(root.to_path_buf()));
    }

    let mut items = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                items.push(FileTransferItem {
                    remote_path: remote_key(root, &path)?,
                    size: entry.metadata()?.len(),
                    local_path: path,
                });
            } else {
                debug!(path = %path.display(), "skipping non-regular file");
            }
        }
    }
    items.sort_by(|a, b| a.remote_path.cmp(&b.remote_path));

    let bytes: u64 = items.iter().map(|i| i.size).sum();
    debug!(root = %root.display(), files = items.len(), bytes, "enumerated upload files");
    Ok(items)
}

/// `/`-joined path of `path` below `root`. Names must be UTF-8, since they
/// become SFTP paths and object keys verbatim.
fn remote_key(root: &Path, path: &Path) -> Result<String, TransferError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        TransferError::InvalidPath(format!("{} is outside {}", path.display(), root.display()))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        let Component::Normal(name) = component else {
            return Err(TransferError::InvalidPath(format!(
                "unexpected component in {}",
                relative.display()
            )));
        };
        let name = name.to_str().ok_or_else(|| {
            TransferError::InvalidPath(format!("file name is not UTF-8: {}", path.display()))
        })?;
        segments.push(name);
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn webgl_output() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("index.html"), b"<html>").unwrap();
        fs::create_dir_all(root.join("Build")).unwrap();
        fs::write(root.join("Build").join("game.wasm.br"), b"WASM").unwrap();
        fs::write(root.join("Build").join("game.data.br"), b"DATA-DATA").unwrap();
        fs::create_dir_all(root.join("TemplateData").join("img")).unwrap();
        fs::write(
            root.join("TemplateData").join("img").join("logo.png"),
            b"PNG",
        )
        .unwrap();

        dir
    }

    #[test]
    fn lists_every_file_with_forward_slashes() {
        let dir = webgl_output();
        let items = enumerate(dir.path()).unwrap();

        let paths: Vec<&str> = items.iter().map(|i| i.remote_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Build/game.data.br",
                "Build/game.wasm.br",
                "TemplateData/img/logo.png",
                "index.html",
            ]
        );
        for item in &items {
            assert!(item.local_path.starts_with(dir.path()));
            assert!(item.local_path.is_file());
        }
    }

    #[test]
    fn records_file_sizes() {
        let dir = webgl_output();
        let items = enumerate(dir.path()).unwrap();
        let sizes: Vec<u64> = items.iter().map(|i| i.size).collect();
        assert_eq!(sizes, vec![9, 4, 3, 6]);
    }

    #[test]
    fn order_is_stable() {
        let dir = webgl_output();
        assert_eq!(enumerate(dir.path()).unwrap(), enumerate(dir.path()).unwrap());
    }

    #[test]
    fn empty_directories_yield_nothing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty").join("nested")).unwrap();
        assert!(enumerate(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = enumerate(Path::new("/nonexistent/build/output")).unwrap_err();
        assert!(matches!(err, TransferError::MissingRoot(_)));
    }

    #[test]
    fn file_as_root_is_missing_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("index.html");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            enumerate(&file),
            Err(TransferError::MissingRoot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = webgl_output();
        std::os::unix::fs::symlink(
            dir.path().join("index.html"),
            dir.path().join("alias.html"),
        )
        .unwrap();

        let items = enumerate(dir.path()).unwrap();
        assert!(items.iter().all(|i| i.remote_path != "alias.html"));
        assert_eq!(items.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"bad\xffname.bin");
        if fs::write(dir.path().join(name), b"x").is_err() {
            // Some filesystems refuse such names outright.
            return;
        }
        assert!(matches!(
            enumerate(dir.path()),
            Err(TransferError::InvalidPath(_))
        ));
    }
}
