//! File system and logging helpers.
//!
//! - Atomic writes for every durable file the pipeline owns
//! - Writable-directory probing before any phase starts
//! - Log-friendly truncation of article titles
//! - Output file reporting for the end-of-run summary

use crate::error::PersistError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Cuts on a character boundary so non-ASCII headlines never panic, and appends
/// how many bytes were dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The sibling path a file is staged at before it replaces `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` so that a crash leaves either the old or the new
/// content, never a torn file.
///
/// The data goes to a sibling temp file (see [`temp_path_for`]) which is flushed
/// and then renamed over the target. Missing parent directories are created.
///
/// # Errors
///
/// Returns [`PersistError::Io`] naming `path` when any step fails. The target
/// is left as it was.
#[instrument(level = "debug", skip(bytes), fields(path = %path.display(), bytes = bytes.len()))]
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp = temp_path_for(path);
    let mut file = fs::File::create(&tmp).await.map_err(io_err)?;
    tokio::io::AsyncWriteExt::write_all(&mut file, bytes)
        .await
        .map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(e));
    }
    Ok(())
}

/// Ensure the directory that will hold `file` exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(file = %file.display()))]
pub async fn ensure_writable_parent(file: &Path) -> Result<(), PersistError> {
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let io_err = |source| PersistError::Io {
        path: dir.clone(),
        source,
    };

    fs::create_dir_all(&dir).await.map_err(io_err)?;
    let probe = dir.join("..__probe_write__");
    fs::File::create(&probe).await.map_err(io_err)?;
    let _ = fs::remove_file(&probe).await;
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

/// Log whether each output exists and how large it is.
pub async fn report_outputs(paths: &[PathBuf]) {
    for path in paths {
        match fs::metadata(path).await {
            Ok(meta) => info!(path = %path.display(), bytes = meta.len(), "Output present"),
            Err(_) => warn!(path = %path.display(), "Output not found"),
        }
    }
}
