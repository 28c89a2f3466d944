use crate::{
    config::Configuration,
    detector::{AnalysisResult, Detector, ImageAnalyzer},
    error::{AppError, FrameError},
    journal::SnapshotLogger,
    pipeline::services::{
        stats::StatsStore,
        stream::{FrameCycle, StreamTiming},
    },
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LatestOutcome {
    Analysis(AnalysisResult),
    Message { msg: String },
}

/// What the last upload or detect call produced.
#[derive(Debug, Clone, Default)]
pub struct LatestResult {
    pub image_path: Option<PathBuf>,
    pub annotated_path: Option<PathBuf>,
    pub outcome: Option<LatestOutcome>,
}

impl LatestResult {
    /// Body of `/api/latest`. Prefers the annotated image when one exists.
    pub fn to_json(&self) -> Value {
        let image_url = self
            .annotated_path
            .as_deref()
            .or(self.image_path.as_deref())
            .and_then(Path::file_name)
            .map(|name| format!("/image/{}", name.to_string_lossy()));

        let stats = match &self.outcome {
            Some(LatestOutcome::Analysis(result)) => json!({
                "count": result.summary.detections.count,
                "percent_plastic": result.summary.percent_plastic,
                "percent_water": result.summary.percent_water,
            }),
            _ => json!({}),
        };

        json!({ "imageUrl": image_url, "stats": stats })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub configuration: Arc<Configuration>,
    pub stats: Arc<StatsStore>,
    pub cycle: Arc<FrameCycle>,
    pub logger: Arc<SnapshotLogger>,
    pub client: reqwest::Client,
    pub analyzer: Option<Arc<ImageAnalyzer>>,
    pub latest: Arc<RwLock<LatestResult>>,
}

impl AppState {
    pub fn new(configuration: Configuration) -> Result<Self, AppError> {
        let stats = Arc::new(StatsStore::new(configuration.sample.water_ml));
        let cycle = Arc::new(FrameCycle::new(&configuration, Arc::clone(&stats)));
        let logger = Arc::new(SnapshotLogger::from_settings(
            Arc::clone(&stats),
            &configuration.logger,
        ));
        let client = reqwest::Client::builder()
            .connect_timeout(configuration.camera.fetch_timeout())
            .build()
            .map_err(FrameError::Request)?;

        Ok(Self {
            configuration: Arc::new(configuration),
            stats,
            cycle,
            logger,
            client,
            analyzer: None,
            latest: Arc::new(RwLock::new(LatestResult::default())),
        })
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.analyzer = Some(Arc::new(ImageAnalyzer::new(detector, &self.configuration)));
        self
    }

    pub fn stream_timing(&self) -> StreamTiming {
        StreamTiming {
            frame_interval: self.configuration.stream.frame_interval(),
            fetch_timeout: self.configuration.camera.fetch_timeout(),
        }
    }

    pub fn upload_path(&self, file_name: &str) -> PathBuf {
        self.configuration.server.upload_dir.join(file_name)
    }

    pub fn annotated_path(&self, file_name: &str) -> PathBuf {
        self.configuration
            .server
            .results_dir
            .join(format!("annotated_{file_name}"))
    }

    pub fn record_analysis(&self, image_path: PathBuf, annotated_path: PathBuf, result: AnalysisResult) {
        *self.latest.write() = LatestResult {
            image_path: Some(image_path),
            annotated_path: Some(annotated_path),
            outcome: Some(LatestOutcome::Analysis(result)),
        };
    }

    pub fn record_message(&self, image_path: PathBuf, msg: impl Into<String>) {
        *self.latest.write() = LatestResult {
            image_path: Some(image_path),
            annotated_path: None,
            outcome: Some(LatestOutcome::Message { msg: msg.into() }),
        };
    }
}
