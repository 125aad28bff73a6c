pub mod tcp_adaptation;

pub use self::tcp_adaptation::{TcpThroughputAdaptation, ThroughputEstimate, ThroughputHandle};
