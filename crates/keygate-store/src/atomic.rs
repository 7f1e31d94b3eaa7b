use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Replace `path` with `bytes` so readers see either the old or the new file
///
/// The payload is staged in a uniquely named temp file next to the target,
/// flushed, then renamed over it. A failure at any step leaves the previous
/// version in place and removes the temp file.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| StoreError::InvalidPath {
            path: path.to_path_buf(),
        })?
        .to_string_lossy()
        .into_owned();
    let dir = parent_dir(path);

    fs::create_dir_all(&dir)
        .await
        .map_err(|e| StoreError::io(&dir, e))?;

    let temp_path = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    if let Err(e) = stage(&temp_path, bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StoreError::io(path, e));
    }

    sync_directory(&dir).await?;

    debug!(path = %path.display(), bytes = bytes.len(), "replaced document");
    Ok(())
}

async fn stage(temp_path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| StoreError::io(temp_path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::io(temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| StoreError::io(temp_path, e))?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Persist the rename itself
#[cfg(unix)]
async fn sync_directory(dir: &Path) -> StoreResult<()> {
    let handle = fs::File::open(dir)
        .await
        .map_err(|e| StoreError::io(dir, e))?;
    handle.sync_all().await.map_err(|e| StoreError::io(dir, e))
}

#[cfg(not(unix))]
async fn sync_directory(_dir: &Path) -> StoreResult<()> {
    Ok(())
}
