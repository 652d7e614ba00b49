//! Atomic publishing of generated files
//!
//! Content is written to a temporary file in the target's own directory and
//! then renamed over the target, so a reader (the downstream PVR client)
//! either sees the previous complete file or the new complete file, never a
//! truncated one. The rename is the last step; if anything before it fails
//! the old file is left untouched and the temporary file is removed.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

/// Write `contents` to `target` atomically (blocking)
pub fn write_atomic_blocking(target: &Path, contents: &[u8]) -> AppResult<()> {
    let directory = parent_dir(target);
    std::fs::create_dir_all(&directory)?;

    let mut temp = NamedTempFile::new_in(&directory)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    debug!(
        "Wrote {} bytes to temporary file {}",
        contents.len(),
        temp.path().display()
    );

    temp.persist(target).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}

/// Write `contents` to `target` atomically
pub async fn write_atomic(target: &Path, contents: Vec<u8>) -> AppResult<()> {
    let target_owned = target.to_path_buf();
    let size = contents.len();

    tokio::task::spawn_blocking(move || write_atomic_blocking(&target_owned, &contents))
        .await
        .map_err(|e| AppError::internal(format!("Publish task failed: {e}")))??;

    info!("Published {} ({} bytes)", target.display(), size);
    Ok(())
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
