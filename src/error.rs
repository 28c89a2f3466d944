use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to bind to {1}: {0}")]
    Bind(std::io::Error, String),
    #[error("Server Error: {0}")]
    Serve(std::io::Error),
    #[error("Frame Error: {0}")]
    Frame(#[from] FrameError),
    #[error("Log Error: {0}")]
    Log(#[from] LogError),
    #[error("Detector Error: {0}")]
    Detector(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// Frame acquisition, decoding and persistence
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Frame source timed out after {0:?}")]
    Timeout(Duration),
    #[error("Failed to request frame: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to read frame bytes: {0}")]
    Read(std::io::Error),
    #[error("Failed to write frame: {0}")]
    Write(std::io::Error),
    #[error("Failed to decode frame: {0}")]
    Decode(image::ImageError),
    #[error("Failed to encode frame: {0}")]
    Encode(image::ImageError),
}

#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    #[error("Reference volume must be positive, got {0}")]
    NonPositiveVolume(f64),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to open log file: {0}")]
    Open(std::io::Error),
    #[error("Failed to write log row: {0}")]
    Write(#[from] csv::Error),
    #[error("Failed to flush log file: {0}")]
    Flush(std::io::Error),
    #[error("Log writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// HTTP-facing errors, rendered as `{"detail": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<FrameError> for ApiError {
    fn from(error: FrameError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
