use crate::error::FrameError;
use std::path::Path;
use tokio::fs;

/// Saves uploaded image bytes, creating parent directories as needed.
pub async fn save_upload(bytes: &[u8], path: &Path) -> Result<(), FrameError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(FrameError::Write)?;
    }
    fs::write(path, bytes).await.map_err(FrameError::Write)
}
