pub mod sequential_file_writer;
pub mod upload;

pub use sequential_file_writer::SequentialFileWriter;
pub use upload::save_upload;
