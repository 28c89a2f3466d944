pub mod domain;
pub mod services;

pub use domain::{BoundingBox, Detection, DetectionSummary, LiveStats};
pub use services::{Annotator, FrameCycle, ParticleEstimator, StatsStore};
