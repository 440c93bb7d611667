//! Crash-safe JSONL file replacement.
//!
//! Values are written to a sibling file with a `.tmp` suffix which is then
//! renamed over the target. On POSIX filesystems the rename is atomic, so a
//! reader sees either the old file or the new one, never a partial write.

use crate::{Error, JsonlWriter, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// Atomically replaces `path` with one JSON line per value.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written, or
/// [`Error::Replace`] if it cannot be renamed over `path`. The original file
/// is left untouched on failure and the temporary file is removed on a
/// best-effort basis.
///
/// # Examples
///
/// ```no_run
/// use cabletrace_jsonl::write_jsonl_atomic;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let rows = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})];
/// write_jsonl_atomic("paths.jsonl", &rows).await?;
/// # Ok(())
/// # }
/// ```
pub async fn write_jsonl_atomic<T, I, P>(path: P, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    if let Err(e) = write_temp(&temp_path, values).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(source) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(Error::Replace {
            path: path.to_path_buf(),
            source,
        });
    }
    tracing::trace!(path = %path.display(), "Replaced JSONL file");
    Ok(())
}

/// `paths.jsonl` becomes `paths.jsonl.tmp`; `paths` becomes `paths.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("snapshot"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_temp<T, I>(temp_path: &Path, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = File::create(temp_path).await?;
    let mut writer = JsonlWriter::new(file);
    writer.write_all(values).await?;
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(())
}
