use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use livecast_rtmp::{
    rtmp::netstream::writer::StreamMetadata, throughput::tcp_adaptation::DEFAULT_SAMPLE_PERIOD,
    PublisherConfig,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, time::Duration};

use crate::filters::VideoFilter;

const ENV_PREFIX: &str = "LIVECAST";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub rtmp: RtmpConfig,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub adaptive: AdaptiveConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Log to this file instead of stderr.
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RtmpConfig {
    pub connect_timeout_seconds: u64,
    pub handshake_timeout_seconds: u64,
    pub out_chunk_size: u32,
    pub media_queue_capacity: usize,
}

impl Default for RtmpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 10,
            handshake_timeout_seconds: 10,
            out_chunk_size: 4096,
            media_queue_capacity: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Bits per second. Also the ceiling for adaptive bitrate.
    pub bitrate: u32,
    pub filter: VideoFilter,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            bitrate: 1_000_000,
            filter: VideoFilter::Normal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u8,
    pub mic_gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            mic_gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub enabled: bool,
    pub sample_period_seconds: u64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_period_seconds: DEFAULT_SAMPLE_PERIOD.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_file, None)
    }

    /// Same as [`Config::load`] but reads variables from `env` when given
    /// instead of the process environment.
    pub fn load_with_env(
        config_file: Option<&str>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if !Path::new(path).exists() {
                return Err(ConfigError::NotFound(path.to_string()));
            }
            builder = builder.add_source(File::with_name(path));
        }

        // LIVECAST_VIDEO__BITRATE, LIVECAST_RTMP__OUT_CHUNK_SIZE, ...
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        builder.build()?.try_deserialize()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Every problem found, empty when the configuration is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if crate::logging::parse_log_level(&self.logging.level).is_err() {
            problems.push(format!("logging.level: unknown level '{}'", self.logging.level));
        }
        if self.video.width == 0 || self.video.height == 0 {
            problems.push("video: width and height must be non-zero".to_string());
        }
        if self.video.fps == 0 || self.video.fps > 120 {
            problems.push(format!("video.fps: {} is outside 1..=120", self.video.fps));
        }
        if self.video.bitrate < crate::bitrate::MIN_VIDEO_BITRATE {
            problems.push(format!(
                "video.bitrate: {} is below the {} bps floor",
                self.video.bitrate,
                crate::bitrate::MIN_VIDEO_BITRATE
            ));
        }
        if livecast_rtmp::flv::aac_packetizer::sampling_frequency_index(self.audio.sample_rate)
            .is_none()
        {
            problems.push(format!(
                "audio.sample_rate: {} Hz is not an AAC sampling frequency",
                self.audio.sample_rate
            ));
        }
        if !(1..=2).contains(&self.audio.channels) {
            problems.push(format!("audio.channels: {} is not 1 or 2", self.audio.channels));
        }
        if !(0.0..=1.0).contains(&self.audio.mic_gain) {
            problems.push(format!("audio.mic_gain: {} is outside [0, 1]", self.audio.mic_gain));
        }
        if !(128..=0x7FFF_FFFF).contains(&self.rtmp.out_chunk_size) {
            problems.push(format!(
                "rtmp.out_chunk_size: {} is outside 128..=2147483647",
                self.rtmp.out_chunk_size
            ));
        }
        if self.rtmp.media_queue_capacity == 0 {
            problems.push("rtmp.media_queue_capacity must be non-zero".to_string());
        }
        if self.adaptive.sample_period_seconds == 0 {
            problems.push("adaptive.sample_period_seconds must be non-zero".to_string());
        }

        problems
    }

    #[must_use]
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            connect_timeout: Duration::from_secs(self.rtmp.connect_timeout_seconds),
            handshake_timeout: Duration::from_secs(self.rtmp.handshake_timeout_seconds),
            out_chunk_size: self.rtmp.out_chunk_size,
            media_queue_capacity: self.rtmp.media_queue_capacity,
            metadata: StreamMetadata {
                width: self.video.width,
                height: self.video.height,
                video_bitrate: self.video.bitrate,
                frame_rate: f64::from(self.video.fps),
                audio_sample_rate: self.audio.sample_rate,
                stereo: self.audio.channels == 2,
            },
        }
    }

    #[must_use]
    pub const fn sample_period(&self) -> Duration {
        Duration::from_secs(self.adaptive.sample_period_seconds)
    }
}
