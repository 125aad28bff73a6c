pub mod errors;
pub mod url;

pub use self::url::RtmpUrl;
