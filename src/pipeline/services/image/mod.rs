pub mod annotator;
pub mod encoder;
pub mod glyphs;

pub use annotator::Annotator;
pub use encoder::encode_jpeg;
