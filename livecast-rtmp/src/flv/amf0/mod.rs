pub mod amf0_markers;
pub mod amf0_reader;
pub mod amf0_writer;
pub mod define;
pub mod errors;

pub use define::{Amf0Object, Amf0ValueType};
