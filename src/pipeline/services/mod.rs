pub mod estimator;
pub mod image;
pub mod stats;
pub mod stream;

pub use estimator::{Estimation, ParticleEstimator};
pub use self::image::Annotator;
pub use stats::{aggregate, StatsStore};
pub use stream::{mjpeg_stream, FrameCycle, StreamTiming};
