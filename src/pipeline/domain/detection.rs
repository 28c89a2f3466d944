use serde::Serialize;

/// Axis-aligned box in pixel coordinates; `x_max`/`y_max` sit one past the
/// last covered column/row, so `width() == x_max - x_min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    pub fn from_rect(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x + width,
            y_max: y + height,
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Mean of width and height, the size proxy for one particle.
    pub fn mean_side(&self) -> f64 {
        (self.width() as f64 + self.height() as f64) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub estimated_size_mm: Option<f64>,
}

impl Detection {
    /// `mm_per_pixel` of zero means no calibration, so no size.
    pub fn sized(bounding_box: BoundingBox, mm_per_pixel: f64) -> Self {
        let estimated_size_mm = (mm_per_pixel > 0.0)
            .then(|| round_to(bounding_box.mean_side() * mm_per_pixel, 2));
        Self {
            bounding_box,
            estimated_size_mm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub count: usize,
    pub sizes_px: Vec<f64>,
    pub sizes_mm: Vec<Option<f64>>,
    pub mean_px: f64,
    pub mean_mm: Option<f64>,
}

impl DetectionSummary {
    pub fn from_boxes(boxes: &[BoundingBox], mm_per_pixel: Option<f64>) -> Self {
        let sizes_px: Vec<f64> = boxes.iter().map(BoundingBox::mean_side).collect();
        let sizes_mm: Vec<Option<f64>> = sizes_px
            .iter()
            .map(|px| mm_per_pixel.filter(|scale| *scale > 0.0).map(|scale| px * scale))
            .collect();
        let valid_mm: Vec<f64> = sizes_mm.iter().flatten().copied().collect();

        Self {
            count: boxes.len(),
            mean_px: mean(&sizes_px).unwrap_or(0.0),
            mean_mm: mean(&valid_mm),
            sizes_px,
            sizes_mm,
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
