use crate::error::FrameError;
use image::{ImageFormat, RgbImage};
use std::sync::Arc;
use uuid::Uuid;

/// Where a frame's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    Camera,
    /// Blank stand-in emitted when the camera could not deliver.
    Placeholder,
}

/// One decoded RGB raster. Cloning shares the pixel buffer; stages that draw
/// on a frame take their own copy first.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    frame_id: Uuid,
    origin: FrameOrigin,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
            frame_id: Uuid::new_v4(),
            origin: FrameOrigin::Camera,
        }
    }

    /// Decodes a complete JPEG buffer into a colour frame.
    pub fn from_jpeg(bytes: &[u8]) -> Result<Self, FrameError> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
            .map_err(FrameError::Decode)?;
        Ok(Self::new(decoded.to_rgb8()))
    }

    /// All-zero frame of fixed dimensions.
    pub fn placeholder(width: u32, height: u32) -> Self {
        Self {
            origin: FrameOrigin::Placeholder,
            ..Self::new(RgbImage::new(width, height))
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn id(&self) -> Uuid {
        self.frame_id
    }

    pub fn origin(&self) -> FrameOrigin {
        self.origin
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == FrameOrigin::Placeholder
    }
}
