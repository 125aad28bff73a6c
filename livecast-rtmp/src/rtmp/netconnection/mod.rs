pub mod errors;
pub mod writer;
