pub mod factory;
pub mod kernels;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::pixel_buffer::PixelBuffer;

pub use factory::FilterFactory;

/// Filters selectable on a broadcast session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFilter {
    #[default]
    Normal,
    Gray,
    InvertColors,
    Sepia,
    Fisheye,
    Glow,
    /// Registered but outside the selection cycle.
    NightVision,
}

impl VideoFilter {
    pub const ALL: [Self; 7] = [
        Self::Normal,
        Self::Gray,
        Self::InvertColors,
        Self::Sepia,
        Self::Fisheye,
        Self::Glow,
        Self::NightVision,
    ];

    /// The filter after this one in the selection cycle. Values outside the
    /// cycle are returned unchanged.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Normal => Self::Gray,
            Self::Gray => Self::InvertColors,
            Self::InvertColors => Self::Sepia,
            Self::Sepia => Self::Fisheye,
            Self::Fisheye => Self::Glow,
            Self::Glow => Self::Normal,
            other => other,
        }
    }

    /// Registry name used by [`FilterFactory`].
    #[must_use]
    pub const fn filter_name(self) -> &'static str {
        match self {
            Self::Normal => kernels::BGRA_NAME,
            Self::Gray => kernels::GRAYSCALE_NAME,
            Self::InvertColors => kernels::INVERT_COLORS_NAME,
            Self::Sepia => kernels::SEPIA_NAME,
            Self::Fisheye => kernels::FISHEYE_NAME,
            Self::Glow => kernels::GLOW_NAME,
            Self::NightVision => kernels::NIGHT_VISION_NAME,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Gray => "gray",
            Self::InvertColors => "invert_colors",
            Self::Sepia => "sepia",
            Self::Fisheye => "fisheye",
            Self::Glow => "glow",
            Self::NightVision => "night_vision",
        }
    }
}

impl fmt::Display for VideoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str() == normalized || filter.filter_name() == value)
            .ok_or_else(|| format!("unknown filter '{value}'"))
    }
}

/// A CPU implementation of one video filter.
pub trait VideoFilterKernel: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer;
}
