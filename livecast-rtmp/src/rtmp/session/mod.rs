pub mod define;
pub mod errors;
pub mod publisher;

pub use self::{
    define::{ClientState, PublisherConfig},
    publisher::{MediaSender, PublisherStats, PushOutcome, RtmpPublisher},
};
