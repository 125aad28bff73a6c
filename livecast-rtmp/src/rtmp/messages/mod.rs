pub mod define;
pub mod errors;
pub mod parser;
