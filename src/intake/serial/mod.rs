pub mod serial_recorder;

pub use serial_recorder::{open_port, spawn_serial_capture, SerialFrameRecorder};
