pub mod detection;
pub mod live_stats;

pub use detection::{round_to, BoundingBox, Detection, DetectionSummary};
pub use live_stats::LiveStats;
