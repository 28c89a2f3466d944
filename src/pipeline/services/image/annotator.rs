use crate::pipeline::{
    domain::{BoundingBox, Detection},
    services::image::glyphs::{glyph_bits, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH},
};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const BOX_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: u32 = 2;
const LABEL_GAP: i64 = 5;

/// Draws boxes and `"{size} mm"` labels for human viewing. The input frame
/// is never touched; a new image is returned.
#[derive(Debug, Clone, Default)]
pub struct Annotator;

impl Annotator {
    pub fn new() -> Self {
        Self
    }

    pub fn annotate(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = frame.clone();
        for detection in detections {
            draw_box(&mut canvas, &detection.bounding_box);
            if let Some(size_mm) = detection.estimated_size_mm {
                let (x, y) = label_origin(&canvas, &detection.bounding_box);
                draw_label(&mut canvas, x, y, &format!("{size_mm} mm"));
            }
        }
        canvas
    }
}

/// Top-left of the label: just above the box, pushed down to stay on frame
/// when the box hugs the top edge.
pub fn label_origin(canvas: &RgbImage, bounding_box: &BoundingBox) -> (i64, i64) {
    let above = bounding_box.y_min as i64 - LABEL_GAP - GLYPH_HEIGHT as i64;
    let max_y = (canvas.height() as i64 - GLYPH_HEIGHT as i64).max(0);
    (bounding_box.x_min as i64, above.clamp(0, max_y))
}

fn draw_box(canvas: &mut RgbImage, bounding_box: &BoundingBox) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let left = bounding_box.x_min.min(width - 1);
    let top = bounding_box.y_min.min(height - 1);
    let right = bounding_box.x_max.min(width - 1);
    let bottom = bounding_box.y_max.min(height - 1);

    for t in 0..BOX_THICKNESS {
        let inset_width = (right - left + 1) as i64 - 2 * t as i64;
        let inset_height = (bottom - top + 1) as i64 - 2 * t as i64;
        // Thin boxes are already solid after the outer rings.
        if inset_width <= 0 || inset_height <= 0 {
            break;
        }
        let ring = Rect::at((left + t) as i32, (top + t) as i32).of_size(inset_width as u32, inset_height as u32);
        draw_hollow_rect_mut(canvas, ring, BOX_COLOUR);
    }
}

fn put_colour(canvas: &mut RgbImage, x: i64, y: i64, colour: Rgb<u8>) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    canvas.put_pixel(x as u32, y as u32, colour);
}

fn draw_label(canvas: &mut RgbImage, x: i64, y: i64, text: &str) {
    let mut pen_x = x;
    for ch in text.chars() {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        put_colour(canvas, pen_x + col as i64, y + row as i64, LABEL_COLOUR);
                    }
                }
            }
        }
        pen_x += GLYPH_ADVANCE as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x: u32, y: u32, w: u32, h: u32, size: Option<f64>) -> Detection {
        Detection {
            bounding_box: BoundingBox::from_rect(x, y, w, h),
            estimated_size_mm: size,
        }
    }

    #[test]
    fn input_frame_is_left_untouched() {
        let frame = RgbImage::new(64, 64);
        let annotated = Annotator::new().annotate(&frame, &[detection(10, 20, 20, 20, Some(1.0))]);
        assert!(frame.pixels().all(|p| p.0 == [0, 0, 0]));
        assert_ne!(annotated, frame);
    }

    #[test]
    fn draws_box_outline_only() {
        let frame = RgbImage::new(64, 64);
        let annotated = Annotator::new().annotate(&frame, &[detection(10, 20, 20, 20, None)]);
        assert_eq!(*annotated.get_pixel(10, 20), BOX_COLOUR);
        assert_eq!(*annotated.get_pixel(30, 40), BOX_COLOUR);
        assert_eq!(*annotated.get_pixel(11, 30), BOX_COLOUR);
        assert_eq!(*annotated.get_pixel(20, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn zero_width_box_draws_a_solid_line() {
        let frame = RgbImage::new(16, 16);
        let annotated = Annotator::new().annotate(&frame, &[detection(4, 2, 0, 6, None)]);
        assert!((2..=8).all(|y| *annotated.get_pixel(4, y) == BOX_COLOUR));
        assert_eq!(*annotated.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn label_sits_above_box() {
        let canvas = RgbImage::new(100, 100);
        let origin = label_origin(&canvas, &BoundingBox::from_rect(15, 50, 10, 10));
        assert_eq!(origin, (15, 50 - LABEL_GAP - GLYPH_HEIGHT as i64));
    }

    #[test]
    fn label_is_clamped_at_top_edge() {
        let canvas = RgbImage::new(100, 100);
        assert_eq!(label_origin(&canvas, &BoundingBox::from_rect(15, 2, 10, 10)), (15, 0));

        let annotated = Annotator::new().annotate(&canvas, &[detection(15, 0, 30, 30, Some(1.5))]);
        let label_pixels = annotated.pixels().filter(|p| **p == LABEL_COLOUR).count();
        assert!(label_pixels > 0);
    }

    #[test]
    fn boxes_past_the_frame_are_clipped() {
        let frame = RgbImage::new(32, 32);
        let annotated = Annotator::new().annotate(&frame, &[detection(20, 20, 40, 40, Some(2.0))]);
        assert_eq!(*annotated.get_pixel(31, 31), BOX_COLOUR);
    }
}
