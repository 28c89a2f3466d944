pub mod envelope_scanner;
pub mod jpeg_scanner;
pub mod marker;

pub use envelope_scanner::EnvelopeScanner;
pub use jpeg_scanner::JpegScanner;
