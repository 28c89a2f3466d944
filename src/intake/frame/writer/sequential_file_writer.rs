use crate::error::FrameError;
use std::path::PathBuf;
use tokio::fs;

/// Persists raw payloads as `frame_000000.jpg`, `frame_000001.jpg`, ...
pub struct SequentialFileWriter {
    out_dir: PathBuf,
    next_id: u64,
}

impl SequentialFileWriter {
    pub async fn create(out_dir: impl Into<PathBuf>) -> Result<Self, FrameError> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir).await.map_err(FrameError::Write)?;
        Ok(Self { out_dir, next_id: 0 })
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn path_for(&self, id: u64) -> PathBuf {
        self.out_dir.join(format!("frame_{id:06}.jpg"))
    }

    /// Writes the payload under the next sequence number. The number only
    /// advances once the file is on disk.
    pub async fn write(&mut self, payload: &[u8]) -> Result<PathBuf, FrameError> {
        let path = self.path_for(self.next_id);
        fs::write(&path, payload).await.map_err(FrameError::Write)?;
        self.next_id += 1;
        Ok(path)
    }
}
