//! Mixes interleaved 16-bit PCM from several sources into one output format.
//!
//! Each source is converted on push (nearest neighbour resampling, mono/stereo
//! conversion) and buffered. [`AudioMixer::mix`] then drains up to a number of
//! frames from every source, weights each by its gain and sums with clamping.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{Error, Result};

/// Applied to every source once more than one contributes to a mix.
const MULTI_SOURCE_HEADROOM: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(u64);

struct MixerSource {
    gain: f32,
    buffer: VecDeque<i16>,
}

pub struct AudioMixer {
    frequency_in_hz: u32,
    channel_count: u8,
    sources: BTreeMap<SourceId, MixerSource>,
    next_id: u64,
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}

/// Nearest neighbour resample and channel conversion of interleaved samples.
fn convert(
    samples: &[i16],
    in_rate: u32,
    in_channels: u8,
    out_rate: u32,
    out_channels: u8,
) -> Vec<i16> {
    let in_channels = usize::from(in_channels);
    let in_frames = samples.len() / in_channels;
    let out_frames = if in_rate == out_rate {
        in_frames
    } else {
        (in_frames as u64 * u64::from(out_rate) / u64::from(in_rate)) as usize
    };

    let mut out = Vec::with_capacity(out_frames * usize::from(out_channels));
    for frame in 0..out_frames {
        let source = if in_rate == out_rate {
            frame
        } else {
            ((frame as u64 * u64::from(in_rate) / u64::from(out_rate)) as usize).min(in_frames - 1)
        };
        let base = source * in_channels;
        let left = samples[base];
        let right = if in_channels > 1 { samples[base + 1] } else { left };
        if out_channels == 1 {
            out.push(((i32::from(left) + i32::from(right)) / 2) as i16);
        } else {
            out.push(left);
            out.push(right);
        }
    }
    out
}

impl AudioMixer {
    #[must_use]
    pub fn new(frequency_in_hz: u32, channel_count: u8) -> Self {
        Self {
            frequency_in_hz: frequency_in_hz.max(1),
            channel_count: channel_count.clamp(1, 2),
            sources: BTreeMap::new(),
            next_id: 0,
        }
    }

    #[must_use]
    pub const fn frequency_in_hz(&self) -> u32 {
        self.frequency_in_hz
    }

    #[must_use]
    pub const fn channel_count(&self) -> u8 {
        self.channel_count
    }

    /// Changing the output format discards audio buffered in the old one.
    pub fn set_frequency_in_hz(&mut self, frequency_in_hz: u32) {
        let frequency_in_hz = frequency_in_hz.max(1);
        if frequency_in_hz != self.frequency_in_hz {
            self.frequency_in_hz = frequency_in_hz;
            self.clear_buffers();
        }
    }

    pub fn set_channel_count(&mut self, channel_count: u8) {
        let channel_count = channel_count.clamp(1, 2);
        if channel_count != self.channel_count {
            self.channel_count = channel_count;
            self.clear_buffers();
        }
    }

    /// New sources start at full gain.
    pub fn register_source(&mut self) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.sources.insert(
            id,
            MixerSource {
                gain: 1.0,
                buffer: VecDeque::new(),
            },
        );
        tracing::debug!("audio source {:?} registered", id);
        id
    }

    pub fn unregister_source(&mut self, source: SourceId) -> bool {
        self.sources.remove(&source).is_some()
    }

    /// Gain is clamped to [0, 1]. Unknown sources are ignored.
    pub fn set_source_gain(&mut self, source: SourceId, gain: f32) {
        if let Some(entry) = self.sources.get_mut(&source) {
            entry.gain = clamp_gain(gain);
        }
    }

    #[must_use]
    pub fn source_gain(&self, source: SourceId) -> Option<f32> {
        self.sources.get(&source).map(|entry| entry.gain)
    }

    /// Buffer interleaved samples of one source, converted to the output
    /// format. Returns the number of output frames buffered for that source.
    pub fn push(
        &mut self,
        source: SourceId,
        samples: &[i16],
        sample_rate: u32,
        channels: u8,
    ) -> Result<usize> {
        if sample_rate == 0 || !(1..=2).contains(&channels) {
            return Err(Error::InvalidInput(format!(
                "unsupported pcm format: {sample_rate} Hz, {channels} channels"
            )));
        }
        if samples.len() % usize::from(channels) != 0 {
            return Err(Error::InvalidInput(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        let (out_rate, out_channels) = (self.frequency_in_hz, self.channel_count);
        let entry = self
            .sources
            .get_mut(&source)
            .ok_or_else(|| Error::InvalidInput(format!("unknown audio source {source:?}")))?;

        if !samples.is_empty() {
            if sample_rate == out_rate && channels == out_channels {
                entry.buffer.extend(samples.iter().copied());
            } else {
                entry
                    .buffer
                    .extend(convert(samples, sample_rate, channels, out_rate, out_channels));
            }
        }
        Ok(entry.buffer.len() / usize::from(out_channels))
    }

    /// Drain up to `frames` frames from every source and sum them. The result
    /// is as long as the longest contribution; shorter sources count as silence.
    pub fn mix(&mut self, frames: usize) -> Vec<i16> {
        let channels = usize::from(self.channel_count);
        let wanted = frames * channels;
        let contributing = self
            .sources
            .values()
            .filter(|entry| !entry.buffer.is_empty())
            .count();
        let headroom = if contributing > 1 {
            MULTI_SOURCE_HEADROOM
        } else {
            1.0
        };

        let mut sum: Vec<f32> = Vec::new();
        for entry in self.sources.values_mut() {
            let take = wanted.min(entry.buffer.len());
            if take > sum.len() {
                sum.resize(take, 0.0);
            }
            let weight = entry.gain * headroom;
            for (slot, sample) in sum.iter_mut().zip(entry.buffer.drain(..take)) {
                *slot += f32::from(sample) * weight;
            }
        }

        sum.into_iter()
            .map(|value| value.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16)
            .collect()
    }

    fn clear_buffers(&mut self) {
        for entry in self.sources.values_mut() {
            entry.buffer.clear();
        }
    }
}
