//! Record persistence.
//!
//! A closed session is committed as one pretty-printed JSON file named
//! `record-{n}.json`, where `n` is one more than the number of entries
//! already in the records directory. Counting entries at commit time is a
//! single-writer assumption: concurrent commits could race to the same
//! number, and this module makes no attempt to lock against that.

use crate::session::Record;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Durability errors. Propagated to the save-signal caller, never retried
/// here; the in-memory session is left intact on failure so the operator
/// can retry the save.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create records directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan records directory {path}: {source}")]
    ScanDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write record {path}: {source}")]
    WriteRecord {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Commit a record to the next sequential file in `dir`.
///
/// Creates `dir` if it does not exist. Returns the path of the new file.
pub fn commit(record: &Record, dir: &Path) -> Result<PathBuf, PersistError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| PersistError::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    let existing = std::fs::read_dir(dir)
        .map_err(|e| PersistError::ScanDir {
            path: dir.to_path_buf(),
            source: e,
        })?
        .count();
    let record_number = existing + 1;

    let path = dir.join(format!("record-{record_number}.json"));
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json).map_err(|e| PersistError::WriteRecord {
        path: path.clone(),
        source: e,
    })?;

    Ok(path)
}
