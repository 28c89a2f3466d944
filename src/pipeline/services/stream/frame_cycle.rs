use crate::{
    common::Frame,
    config::Configuration,
    pipeline::{
        domain::Detection,
        services::{
            estimator::ParticleEstimator,
            image::{encode_jpeg, Annotator},
            stats::StatsStore,
        },
    },
};
use bytes::Bytes;
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, warn};

/// One frame's worth of work: estimate, publish stats, annotate, re-encode.
pub struct FrameCycle {
    estimator: ParticleEstimator,
    annotator: Annotator,
    stats: Arc<StatsStore>,
    mm_per_pixel: f64,
    jpeg_quality: u8,
    placeholder_size: (u32, u32),
}

impl FrameCycle {
    pub fn new(configuration: &Configuration, stats: Arc<StatsStore>) -> Self {
        Self {
            estimator: ParticleEstimator::from_settings(&configuration.estimator),
            annotator: Annotator::new(),
            stats,
            mm_per_pixel: configuration.sample.mm_per_pixel,
            jpeg_quality: configuration.stream.jpeg_quality,
            placeholder_size: (
                configuration.stream.placeholder_width,
                configuration.stream.placeholder_height,
            ),
        }
    }

    pub fn stats(&self) -> &Arc<StatsStore> {
        &self.stats
    }

    pub fn placeholder(&self) -> Frame {
        Frame::placeholder(self.placeholder_size.0, self.placeholder_size.1)
    }

    /// Runs the full cycle and returns the annotated JPEG. Placeholder frames
    /// skip estimation so the last good stats stay published.
    pub fn render(&self, frame: &Frame) -> Option<Bytes> {
        if frame.is_placeholder() {
            return self.encode(frame.image());
        }

        let estimation = self.estimator.estimate(frame);
        let stats = self.stats.record(estimation.count);
        debug!(
            "Frame {}: {} contours, {} boxed, {}% plastic",
            frame.id(),
            estimation.count,
            estimation.boxes.len(),
            stats.percent_plastic
        );

        let detections: Vec<Detection> = estimation
            .boxes
            .iter()
            .map(|b| Detection::sized(*b, self.mm_per_pixel))
            .collect();
        let annotated = self.annotator.annotate(frame.image(), &detections);
        self.encode(&annotated)
    }

    /// Blank frame for cycles that failed outright.
    pub fn render_blank(&self) -> Option<Bytes> {
        self.encode(self.placeholder().image())
    }

    fn encode(&self, image: &RgbImage) -> Option<Bytes> {
        match encode_jpeg(image, self.jpeg_quality) {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                warn!("Dropping frame that failed to encode: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn square_frame() -> Frame {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        for y in 30..70 {
            for x in 30..70 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        Frame::new(image)
    }

    #[test]
    fn render_publishes_stats_and_keeps_source_frame() {
        let stats = Arc::new(StatsStore::new(100.0));
        let cycle = FrameCycle::new(&Configuration::default(), Arc::clone(&stats));
        let frame = square_frame();

        let jpeg = cycle.render(&frame).unwrap();
        assert!(!jpeg.is_empty());
        assert!(stats.snapshot().objects >= 1);
        assert_eq!(*frame.image().get_pixel(50, 50), Rgb([255, 255, 255]));
        assert_eq!(*frame.image().get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn placeholder_keeps_last_good_stats() {
        let stats = Arc::new(StatsStore::new(100.0));
        let cycle = FrameCycle::new(&Configuration::default(), Arc::clone(&stats));
        let good = stats.record(12);

        assert!(cycle.render(&cycle.placeholder()).is_some());
        assert_eq!(stats.snapshot(), good);
    }
}
