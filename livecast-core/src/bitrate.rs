//! Adaptive bitrate steps driven by the throughput vector.

pub const MIN_VIDEO_BITRATE: u32 = 32_000;

/// `(threshold, step)`: above `threshold` the bitrate moves in `step` units.
const VIDEO_STEPS: [(u32, u32); 3] = [(1_152_000, 384_000), (512_000, 128_000), (128_000, 64_000)];
const SMALLEST_STEP: u32 = 32_000;

/// The video bitrate one step away from `current` in the direction of
/// `vector`, never above `ceiling`. A zero vector keeps `current`.
#[must_use]
pub fn next_video_bitrate(current: u32, vector: f32, ceiling: u32) -> u32 {
    if vector == 0.0 || vector.is_nan() {
        return current;
    }
    let direction: i64 = if vector < 0.0 { -1 } else { 1 };

    let step = VIDEO_STEPS
        .iter()
        .find(|(threshold, _)| current > *threshold)
        .map_or(SMALLEST_STEP, |(_, step)| *step);

    let stepped = (i64::from(current / step) + direction) * i64::from(step);
    let bounded = stepped.min(i64::from(ceiling));

    if step == SMALLEST_STEP {
        bounded.max(i64::from(MIN_VIDEO_BITRATE)) as u32
    } else {
        bounded.max(0) as u32
    }
}

/// Audio bitrate matching a video bitrate.
#[must_use]
pub const fn audio_bitrate_for(video_bitrate: u32) -> u32 {
    if video_bitrate > 500_000 {
        128_000
    } else if video_bitrate > 250_000 {
        96_000
    } else {
        80_000
    }
}
