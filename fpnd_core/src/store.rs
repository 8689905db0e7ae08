/*
* Durable json documents for the pool queue and the assignment tracker.
*
* Writes are atomic: write to `<file>.tmp`, then rename over the target,
* so a crash mid-write never leaves a truncated store behind.
*/

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// Error Handling
use fpnd_error::NetError;
use log::trace;

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn io_error(path: &Path, source: std::io::Error) -> NetError {
    NetError::StorageIo {
        path: path.to_owned(),
        source,
    }
}

/// Serialize `value` and atomically replace `path` with it.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), NetError> {
    let bytes = serde_json::to_vec(value).map_err(|e| NetError::CorruptState {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
    }

    let tmp = tmp_path(path);
    let mut file = fs::File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
    file.write_all(&bytes).map_err(|e| io_error(&tmp, e))?;
    file.sync_all().map_err(|e| io_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;

    trace!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Read and deserialize `path`.
/// A missing or unreadable file is a `StorageIo`, an unparseable one is `CorruptState`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, NetError> {
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| NetError::CorruptState {
        path: path.to_owned(),
        reason: e.to_string(),
    })
}
