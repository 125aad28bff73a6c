pub mod bits_errors;
pub mod bits_reader;
pub mod bytes_errors;
pub mod bytes_reader;
pub mod bytes_writer;
#[allow(clippy::module_inception)]
pub mod bytesio;
pub mod bytesio_errors;
