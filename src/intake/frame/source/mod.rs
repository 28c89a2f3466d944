pub mod frame_source;
pub mod mjpeg_source;
pub mod snapshot_source;

pub use frame_source::FrameSource;
pub use mjpeg_source::MjpegSource;
pub use snapshot_source::SnapshotSource;

use crate::config::{CameraMode, CameraSettings};

/// Builds the configured camera source. Each streaming client owns one.
pub fn from_settings(client: reqwest::Client, settings: &CameraSettings) -> Box<dyn FrameSource> {
    match settings.mode {
        CameraMode::Mjpeg => Box::new(MjpegSource::new(
            client,
            settings.url.clone(),
            settings.max_buffer_bytes,
        )),
        CameraMode::Snapshot => Box::new(SnapshotSource::new(client, settings.url.clone())),
    }
}
