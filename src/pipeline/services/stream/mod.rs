pub mod frame_cycle;
pub mod mjpeg_stream;

pub use frame_cycle::FrameCycle;
pub use mjpeg_stream::{
    fetch_or_placeholder, mjpeg_stream, multipart_part, StreamTiming, MJPEG_CONTENT_TYPE,
};
