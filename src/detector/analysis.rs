use crate::{
    config::Configuration,
    detector::{Detector, ModelDetection, DEFAULT_IOU},
    error::{AppError, FrameError},
    intake::frame::writer::upload::save_upload,
    pipeline::{
        domain::{BoundingBox, Detection, DetectionSummary},
        services::{
            image::{encode_jpeg, Annotator},
            stats::aggregate,
        },
    },
};
use bytes::Bytes;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    #[serde(flatten)]
    pub detections: DetectionSummary,
    pub percent_plastic: f64,
    pub percent_water: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub detections: Vec<ModelDetection>,
    pub summary: AnalysisSummary,
}

/// Runs the detector over a stored image, writes an annotated copy and
/// summarises the result.
pub struct ImageAnalyzer {
    detector: Arc<dyn Detector>,
    annotator: Annotator,
    mm_per_pixel: f64,
    water_ml: f64,
    jpeg_quality: u8,
    iou_threshold: f32,
}

impl ImageAnalyzer {
    pub fn new(detector: Arc<dyn Detector>, configuration: &Configuration) -> Self {
        Self {
            detector,
            annotator: Annotator::new(),
            mm_per_pixel: configuration.sample.mm_per_pixel,
            water_ml: configuration.sample.water_ml,
            jpeg_quality: configuration.stream.jpeg_quality,
            iou_threshold: DEFAULT_IOU,
        }
    }

    pub async fn analyze(
        &self,
        image_path: &Path,
        annotated_path: &Path,
        confidence: f32,
    ) -> Result<AnalysisResult, AppError> {
        let detections = self
            .detector
            .detect(image_path, confidence, self.iou_threshold)
            .await?;
        let boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bounding_box).collect();

        let annotated = self.annotate_file(image_path.to_path_buf(), boxes.clone()).await?;
        save_upload(&annotated, annotated_path).await?;

        let summary = DetectionSummary::from_boxes(&boxes, Some(self.mm_per_pixel));
        let ratios = aggregate(summary.count, self.water_ml);
        info!(
            "{} found {} particles in {}",
            self.detector.name(),
            summary.count,
            image_path.display()
        );

        Ok(AnalysisResult {
            detections,
            summary: AnalysisSummary {
                detections: summary,
                percent_plastic: ratios.percent_plastic,
                percent_water: ratios.percent_water,
            },
        })
    }

    async fn annotate_file(&self, image_path: PathBuf, boxes: Vec<BoundingBox>) -> Result<Bytes, AppError> {
        let annotator = self.annotator.clone();
        let mm_per_pixel = self.mm_per_pixel;
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || -> Result<Bytes, FrameError> {
            let image = image::open(&image_path).map_err(FrameError::Decode)?.to_rgb8();
            let detections: Vec<Detection> = boxes
                .into_iter()
                .map(|b| Detection::sized(b, mm_per_pixel))
                .collect();
            encode_jpeg(&annotator.annotate(&image, &detections), quality)
        })
        .await
        .map_err(|e| AppError::Detector(format!("annotation task failed: {e}")))?
        .map_err(AppError::from)
    }
}
