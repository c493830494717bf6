//! Stage-then-commit helpers for small JSON records.
//!
//! Records are serialized into `tmp/<uuid>.tmp`, fsynced, and only then
//! moved to their final path, so readers never observe a torn record.
//!
//! A record's file name is the SHA-256 of its case-sensitive key, never
//! the key itself. `Calc` and `calc` therefore stay distinct on
//! case-insensitive filesystems, and no valid name can exceed the
//! filesystem's file name limit.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use heleus_core::sha256_digest;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// How an existing target is treated on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Commit {
    /// Atomically replace whatever is there.
    Replace,
    /// Fail with `AlreadyExists` if the target is present.
    CreateNew,
}

/// Path of the record stored under `key` in `dir`.
pub(crate) fn record_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", sha256_digest(key.as_bytes()).to_hex()))
}

/// Check that a loaded record sits at the path its key maps to.
pub(crate) fn check_record_path(dir: &Path, key: &str, path: &Path) -> Result<(), StoreError> {
    if record_path(dir, key) == path {
        Ok(())
    } else {
        Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("record for {key:?} is stored under the wrong file name"),
        })
    }
}

/// Remove every file directly inside `dir`. Returns how many were removed.
///
/// Only called at start-up, when nothing can be writing into `dir`.
pub(crate) fn sweep(dir: &Path) -> Result<usize, StoreError> {
    let mut swept = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && fs::remove_file(&path).is_ok() {
            swept += 1;
        }
    }
    Ok(swept)
}

/// Write `value` as pretty JSON to `target`, staging it in `tmp_dir`.
pub(crate) fn write_json<T: Serialize>(
    tmp_dir: &Path,
    target: &Path,
    value: &T,
    mode: Commit,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let staging = tmp_dir.join(format!("{}.tmp", uuid::Uuid::new_v4()));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        match mode {
            Commit::Replace => fs::rename(&staging, target),
            // hard_link refuses to replace an existing name, which rename
            // would silently do.
            Commit::CreateNew => fs::hard_link(&staging, target),
        }
    })();

    if mode == Commit::CreateNew || result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result.map_err(StoreError::from)
}

/// Read and decode a JSON record.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// List the `*.json` files directly inside `dir`, sorted by path.
pub(crate) fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
