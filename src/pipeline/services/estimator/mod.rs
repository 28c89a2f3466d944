pub mod particle_estimator;

pub use particle_estimator::{Estimation, ParticleEstimator};
