pub mod frame;
pub mod serial;
