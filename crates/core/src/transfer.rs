use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One file to deliver: where it lives locally and where it goes remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferItem {
    pub local_path: PathBuf,
    /// Relative to the remote root, always `/`-separated.
    pub remote_path: String,
    /// Size in bytes when the tree was enumerated.
    pub size: u64,
}

/// What the aggregate fraction of a run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressWeighting {
    /// Every file weighs the same.
    #[default]
    Files,
    /// Files weigh their size in bytes.
    Bytes,
}

impl fmt::Display for ProgressWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressWeighting::Files => f.write_str("per file"),
            ProgressWeighting::Bytes => f.write_str("per byte"),
        }
    }
}

/// Aggregate progress of one upload run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    pub files_completed: usize,
    pub files_total: usize,
    pub bytes_completed: u64,
    pub bytes_total: u64,
    /// In `[0, 1]`.
    pub fraction_complete: f64,
}

impl TransferProgress {
    /// Progress with `files_completed` files and `bytes_completed` bytes
    /// handled. Byte weighting falls back to file counts when the run
    /// carries no bytes at all.
    pub fn weighted(
        weighting: ProgressWeighting,
        files_completed: usize,
        files_total: usize,
        bytes_completed: u64,
        bytes_total: u64,
    ) -> Self {
        let files_completed = files_completed.min(files_total);
        let bytes_completed = bytes_completed.min(bytes_total);
        let fraction_complete = match weighting {
            ProgressWeighting::Bytes if bytes_total > 0 => {
                bytes_completed as f64 / bytes_total as f64
            }
            _ if files_total == 0 => 1.0,
            _ => files_completed as f64 / files_total as f64,
        };
        Self {
            files_completed,
            files_total,
            bytes_completed,
            bytes_total,
            fraction_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_after_each_file() {
        let p = TransferProgress::weighted(ProgressWeighting::Files, 1, 4, 0, 0);
        assert_eq!(p.files_completed, 1);
        assert_eq!(p.fraction_complete, 0.25);
        let p = TransferProgress::weighted(ProgressWeighting::Files, 4, 4, 0, 0);
        assert_eq!(p.fraction_complete, 1.0);
    }

    #[test]
    fn fraction_is_clamped() {
        let p = TransferProgress::weighted(ProgressWeighting::Files, 10, 2, 50, 20);
        assert_eq!(p.bytes_completed, 20);
        assert_eq!(p.files_completed, 2);
        assert_eq!(p.fraction_complete, 1.0);
    }

    #[test]
    fn bytes_weight_large_files_more() {
        let p = TransferProgress::weighted(ProgressWeighting::Bytes, 1, 2, 900, 1000);
        assert_eq!(p.files_completed, 1);
        assert_eq!(p.fraction_complete, 0.9);

        let p = TransferProgress::weighted(ProgressWeighting::Files, 1, 2, 900, 1000);
        assert_eq!(p.fraction_complete, 0.5);
    }

    #[test]
    fn bytes_without_any_bytes_count_files() {
        let p = TransferProgress::weighted(ProgressWeighting::Bytes, 1, 4, 0, 0);
        assert_eq!(p.fraction_complete, 0.25);
        let p = TransferProgress::weighted(ProgressWeighting::Bytes, 0, 0, 0, 0);
        assert_eq!(p.fraction_complete, 1.0);
    }
}
