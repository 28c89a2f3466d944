//! Seam for a trained object detector. The live feed never needs one; the
//! upload flow uses it when the server was started with an implementation.

pub mod analysis;

use crate::{error::AppError, pipeline::domain::BoundingBox};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

pub use analysis::{AnalysisResult, AnalysisSummary, ImageAnalyzer};

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelDetection {
    pub bounding_box: BoundingBox,
    pub class_id: u32,
    pub confidence: f32,
}

#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(
        &self,
        image_path: &Path,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<ModelDetection>, AppError>;

    fn name(&self) -> &'static str;
}
