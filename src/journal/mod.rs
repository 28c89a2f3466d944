pub mod log_row;
pub mod snapshot_logger;

pub use log_row::{LogRow, LOG_HEADER};
pub use snapshot_logger::SnapshotLogger;
