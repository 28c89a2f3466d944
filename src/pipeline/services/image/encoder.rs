use crate::error::FrameError;
use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, RgbImage};

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Bytes, FrameError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(FrameError::Encode)?;
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::frame::scanner::jpeg_scanner::{JPEG_END, JPEG_START};

    #[test]
    fn output_is_delimited_by_jpeg_markers() {
        let jpeg = encode_jpeg(&RgbImage::new(16, 16), 80).unwrap();
        assert_eq!(&jpeg[..2], &JPEG_START);
        assert_eq!(&jpeg[jpeg.len() - 2..], &JPEG_END);
    }
}
