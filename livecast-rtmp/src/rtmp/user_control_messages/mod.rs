pub mod define;
pub mod errors;
pub mod reader;
pub mod writer;
