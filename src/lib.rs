pub mod common;
pub mod config;
pub mod detector;
pub mod error;
pub mod intake;
pub mod journal;
pub mod pipeline;
pub mod server;

#[cfg(test)]
mod test_support;

pub use config::Configuration;
pub use error::{ApiError, AppError, ConfigError, FrameError, LogError};
pub use server::{create_router, AppState};
