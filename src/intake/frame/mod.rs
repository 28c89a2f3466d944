pub mod scanner;
pub mod source;
pub mod writer;

pub use source::FrameSource;
