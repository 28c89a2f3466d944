use crate::{common::Frame, config::EstimatorSettings, pipeline::domain::BoundingBox};
use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::distance_transform::Norm;
use imageproc::{edges, filter, morphology};

/// Result of one estimator pass.
///
/// `count` includes every external contour, noise included, and is what the
/// stats use. `boxes` only carries contours larger than the minimum side and
/// is what gets drawn. The two are intentionally not reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimation {
    pub count: usize,
    pub boxes: Vec<BoundingBox>,
}

impl Estimation {
    pub fn empty() -> Self {
        Self {
            count: 0,
            boxes: Vec::new(),
        }
    }

    /// Splits the outermost contours of a binary mask (non-zero = edge) into
    /// the raw count and the boxes worth drawing.
    pub fn from_mask(mask: &GrayImage, min_box_side: u32) -> Self {
        let contours = external_boxes(mask);
        let count = contours.len();
        let boxes = contours
            .into_iter()
            .filter(|b| b.width() > min_box_side && b.height() > min_box_side)
            .collect();
        Self { count, boxes }
    }
}

/// Sigma OpenCV derives for a kernel size when none is given.
pub fn sigma_for_kernel(kernel_size: usize) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

// Outer borders with no parent: contours nested in another component's hole
// and the holes themselves are skipped.
fn external_boxes(mask: &GrayImage) -> Vec<BoundingBox> {
    find_contours::<u32>(mask)
        .iter()
        .filter(|contour| contour.parent.is_none())
        .filter_map(bounding_box)
        .collect()
}

fn bounding_box(contour: &Contour<u32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in &contour.points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some(BoundingBox::from_rect(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Cheap particle counter for the live feed: grayscale, Gaussian blur,
/// Canny, dilation, external contours.
#[derive(Debug, Clone)]
pub struct ParticleEstimator {
    blur_sigma: f32,
    canny_low: f32,
    canny_high: f32,
    dilation_iterations: u8,
    min_box_side: u32,
}

impl Default for ParticleEstimator {
    fn default() -> Self {
        Self::from_settings(&EstimatorSettings::default())
    }
}

impl ParticleEstimator {
    pub fn from_settings(settings: &EstimatorSettings) -> Self {
        Self {
            blur_sigma: sigma_for_kernel(settings.blur_kernel),
            canny_low: settings.canny_low,
            canny_high: settings.canny_high,
            dilation_iterations: settings.dilation_iterations.min(u8::MAX as usize) as u8,
            min_box_side: settings.min_box_side,
        }
    }

    pub fn edge_mask(&self, frame: &Frame) -> GrayImage {
        let gray = imageops::grayscale(frame.image());
        let blurred = filter::gaussian_blur_f32(&gray, self.blur_sigma);
        let edges = edges::canny(&blurred, self.canny_low, self.canny_high);
        if self.dilation_iterations == 0 {
            return edges;
        }
        // k passes of a 3x3 square equal one chessboard dilation of radius k
        morphology::dilate(&edges, Norm::LInf, self.dilation_iterations)
    }

    pub fn estimate(&self, frame: &Frame) -> Estimation {
        Estimation::from_mask(&self.edge_mask(frame), self.min_box_side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn fill(mask: &mut GrayImage, x: i32, y: i32, width: u32, height: u32) {
        draw_filled_rect_mut(mask, Rect::at(x, y).of_size(width, height), Luma([255]));
    }

    fn ring(mask: &mut GrayImage, from: u32, to: u32) {
        for i in from..=to {
            mask.put_pixel(i, from, Luma([255]));
            mask.put_pixel(i, to, Luma([255]));
            mask.put_pixel(from, i, Luma([255]));
            mask.put_pixel(to, i, Luma([255]));
        }
    }

    fn bright_square(size: u32, from: u32, to: u32) -> Frame {
        let mut image = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
        for y in from..to {
            for x in from..to {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        Frame::new(image)
    }

    #[test]
    fn default_kernel_matches_eleven_pixel_sigma() {
        assert!((sigma_for_kernel(11) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn blank_frame_has_no_particles() {
        let estimation = ParticleEstimator::default().estimate(&Frame::placeholder(320, 240));
        assert_eq!(estimation, Estimation::empty());
    }

    #[test]
    fn bright_square_is_detected_and_boxed() {
        let estimation = ParticleEstimator::default().estimate(&bright_square(120, 40, 80));

        assert!(estimation.count >= 1);
        assert!(!estimation.boxes.is_empty());
        let outer = estimation.boxes.iter().max_by_key(|b| b.width() * b.height()).unwrap();
        assert!(outer.x_min <= 40 && outer.x_max >= 80);
        assert!(outer.y_min <= 40 && outer.y_max >= 80);
    }

    #[test]
    fn dilation_closes_the_square_outline_into_one_particle() {
        let estimation = ParticleEstimator::default().estimate(&bright_square(120, 40, 80));
        assert_eq!(estimation.count, 1);
    }

    #[test]
    fn tiny_contour_counts_but_is_not_boxed() {
        let mut mask = GrayImage::new(50, 50);
        fill(&mut mask, 5, 5, 4, 4);
        fill(&mut mask, 20, 20, 12, 12);

        let estimation = Estimation::from_mask(&mask, 5);
        assert_eq!(estimation.count, 2);
        assert_eq!(estimation.boxes, vec![BoundingBox::from_rect(20, 20, 12, 12)]);
    }

    #[test]
    fn six_pixel_side_passes_the_filter_but_five_does_not() {
        let mut mask = GrayImage::new(40, 40);
        fill(&mut mask, 1, 1, 5, 5);
        fill(&mut mask, 20, 20, 6, 6);

        let estimation = Estimation::from_mask(&mask, 5);
        assert_eq!(estimation.count, 2);
        assert_eq!(estimation.boxes, vec![BoundingBox::from_rect(20, 20, 6, 6)]);
    }

    #[test]
    fn diagonal_neighbours_join_one_contour() {
        let mut mask = GrayImage::new(5, 5);
        for i in 1..4 {
            mask.put_pixel(i, i, Luma([255]));
        }
        assert_eq!(Estimation::from_mask(&mask, 0).boxes, vec![BoundingBox::from_rect(1, 1, 3, 3)]);
    }

    #[test]
    fn blob_inside_ring_is_not_counted() {
        let mut mask = GrayImage::new(20, 20);
        ring(&mut mask, 2, 17);
        fill(&mut mask, 8, 8, 3, 3);

        let estimation = Estimation::from_mask(&mask, 5);
        assert_eq!(estimation.count, 1);
        assert_eq!(estimation.boxes, vec![BoundingBox::from_rect(2, 2, 16, 16)]);
    }

    #[test]
    fn blob_touching_border_is_counted() {
        let mut mask = GrayImage::new(10, 10);
        fill(&mut mask, 0, 0, 10, 3);
        assert_eq!(
            Estimation::from_mask(&mask, 0).boxes,
            vec![BoundingBox::from_rect(0, 0, 10, 3)]
        );
    }
}
