pub mod define;
pub mod errors;
pub mod handshake_client;
