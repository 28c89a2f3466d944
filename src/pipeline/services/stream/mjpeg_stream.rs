use crate::{
    common::Frame,
    error::FrameError,
    intake::frame::FrameSource,
    pipeline::services::stream::frame_cycle::FrameCycle,
};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

pub const MJPEG_BOUNDARY: &str = "frame";
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

#[derive(Debug, Clone, Copy)]
pub struct StreamTiming {
    pub frame_interval: Duration,
    pub fetch_timeout: Duration,
}

/// Wraps one JPEG as a multipart section.
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{MJPEG_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

/// Fetches one frame within `timeout`. Any failure resets the source and
/// yields a blank frame instead.
pub async fn fetch_or_placeholder(
    source: &mut dyn FrameSource,
    timeout: Duration,
    placeholder: impl FnOnce() -> Frame,
) -> Frame {
    let result = tokio::time::timeout(timeout, source.fetch_next_frame()).await;
    let error = match result {
        Ok(Ok(frame)) => return frame,
        Ok(Err(e)) => e,
        Err(_) => FrameError::Timeout(timeout),
    };
    warn!("Camera fetch error from {} source: {}", source.name(), error);
    source.reset();
    placeholder()
}

/// Endless, lazily evaluated MJPEG body for one client. Each step pulls a
/// frame from this client's own source, runs the frame cycle off the async
/// workers, yields the multipart section and then waits `frame_interval`.
/// Dropping the stream (client gone) ends it at the next suspension point.
pub fn mjpeg_stream(
    mut source: Box<dyn FrameSource>,
    cycle: Arc<FrameCycle>,
    timing: StreamTiming,
) -> impl Stream<Item = Bytes> + Send {
    async_stream::stream! {
        loop {
            let frame = fetch_or_placeholder(source.as_mut(), timing.fetch_timeout, || cycle.placeholder()).await;

            let worker = Arc::clone(&cycle);
            let rendered = match tokio::task::spawn_blocking(move || worker.render(&frame)).await {
                Ok(rendered) => rendered,
                Err(e) => {
                    error!("Frame cycle failed, sending blank frame: {}", e);
                    cycle.render_blank()
                }
            };
            if let Some(jpeg) = rendered {
                yield multipart_part(&jpeg);
            }

            tokio::time::sleep(timing.frame_interval).await;
        }
    }
}
