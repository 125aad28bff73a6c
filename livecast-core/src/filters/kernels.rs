use super::VideoFilterKernel;
use crate::pixel_buffer::{PixelBuffer, BYTES_PER_PIXEL};

pub const BGRA_NAME: &str = "com.videocore.filters.bgra";
pub const GRAYSCALE_NAME: &str = "com.videocore.filters.grayscale";
pub const INVERT_COLORS_NAME: &str = "com.videocore.filters.invertColors";
pub const SEPIA_NAME: &str = "com.videocore.filters.sepia";
pub const FISHEYE_NAME: &str = "com.videocore.filters.fisheye";
pub const GLOW_NAME: &str = "com.videocore.filters.glow";
pub const NIGHT_VISION_NAME: &str = "com.videocore.filters.nightVision";

const SEPIA_TONE: [f32; 3] = [1.2, 1.0, 0.8];
const NIGHT_VISION_TONE: [f32; 3] = [0.2, 1.0, 0.2];
const TONE_MIX: f32 = 0.75;
/// Field of view constant of the fisheye lens.
const FISHEYE_FOV: f32 = -5.2;
/// Sobel tap spacing as a fraction of the frame size.
const GLOW_STEP_W: f32 = 0.001_562_5;
const GLOW_STEP_H: f32 = 0.002_777_8;

fn luma(bgra: &[u8]) -> f32 {
    0.3 * f32::from(bgra[2]) + 0.59 * f32::from(bgra[1]) + 0.11 * f32::from(bgra[0])
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn map_pixels(frame: &PixelBuffer, f: impl Fn(&mut [u8])) -> PixelBuffer {
    let mut out = frame.clone();
    for pixel in out.data_mut().chunks_exact_mut(BYTES_PER_PIXEL) {
        f(pixel);
    }
    out
}

/// `mix(colour, gray * tone, TONE_MIX)`, with `tone` given as rgb.
fn tone(frame: &PixelBuffer, tone: [f32; 3]) -> PixelBuffer {
    map_pixels(frame, |pixel| {
        let gray = luma(pixel);
        // rgb tone over bgr storage
        for (channel, factor) in [(2, tone[0]), (1, tone[1]), (0, tone[2])] {
            let original = f32::from(pixel[channel]);
            pixel[channel] = to_u8(original * (1.0 - TONE_MIX) + gray * factor * TONE_MIX);
        }
    })
}

/// Pass-through.
pub struct BgraFilter;

impl VideoFilterKernel for BgraFilter {
    fn name(&self) -> &'static str {
        BGRA_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        frame.clone()
    }
}

pub struct GrayscaleFilter;

impl VideoFilterKernel for GrayscaleFilter {
    fn name(&self) -> &'static str {
        GRAYSCALE_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        map_pixels(frame, |pixel| {
            let gray = to_u8(luma(pixel));
            pixel[..3].fill(gray);
        })
    }
}

pub struct InvertColorsFilter;

impl VideoFilterKernel for InvertColorsFilter {
    fn name(&self) -> &'static str {
        INVERT_COLORS_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        map_pixels(frame, |pixel| {
            for channel in &mut pixel[..3] {
                *channel = 255 - *channel;
            }
        })
    }
}

pub struct SepiaFilter;

impl VideoFilterKernel for SepiaFilter {
    fn name(&self) -> &'static str {
        SEPIA_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        tone(frame, SEPIA_TONE)
    }
}

pub struct NightVisionFilter;

impl VideoFilterKernel for NightVisionFilter {
    fn name(&self) -> &'static str {
        NIGHT_VISION_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        tone(frame, NIGHT_VISION_TONE)
    }
}

pub struct FisheyeFilter;

impl VideoFilterKernel for FisheyeFilter {
    fn name(&self) -> &'static str {
        FISHEYE_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        let (width, height) = (frame.width(), frame.height());
        let mut out = PixelBuffer::new(width, height);
        let lens = FISHEYE_FOV.tan();

        for y in 0..height {
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32 - 0.5;
                let v = (y as f32 + 0.5) / height as f32 - 0.5;
                let z = (1.0 - u * u - v * v).sqrt();
                let a = 1.0 / (z * lens);

                let source_x = ((u * a + 0.5) * width as f32).floor() as i64;
                let source_y = ((v * a + 0.5) * height as f32).floor() as i64;
                out.set_pixel(x, y, frame.pixel_clamped(source_x, source_y));
            }
        }
        out
    }
}

/// Sobel edge magnitude modulated by the centre colour. Red and blue trade
/// places in the output.
pub struct GlowFilter;

impl GlowFilter {
    fn texel(frame: &PixelBuffer, x: i64, y: i64) -> [f32; 3] {
        let [b, g, r, _] = frame.pixel_clamped(x, y);
        [f32::from(b) / 255.0, f32::from(g) / 255.0, f32::from(r) / 255.0]
    }
}

impl VideoFilterKernel for GlowFilter {
    fn name(&self) -> &'static str {
        GLOW_NAME
    }

    fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        let (width, height) = (frame.width(), frame.height());
        let mut out = PixelBuffer::new(width, height);
        let dx = ((GLOW_STEP_W * width as f32).round() as i64).max(1);
        let dy = ((GLOW_STEP_H * height as f32).round() as i64).max(1);

        for y in 0..height {
            for x in 0..width {
                let (cx, cy) = (i64::from(x), i64::from(y));
                let t = |ox: i64, oy: i64| Self::texel(frame, cx + ox * dx, cy + oy * dy);
                let (t1, t2, t3) = (t(-1, -1), t(0, -1), t(1, -1));
                let (t4, t5, t6) = (t(-1, 0), t(0, 0), t(1, 0));
                let (t7, t8, t9) = (t(-1, 1), t(0, 1), t(1, 1));

                let mut rgb = [0.0_f32; 3];
                for i in 0..3 {
                    let xx = t1[i] + 2.0 * t2[i] + t3[i] - t7[i] - 2.0 * t8[i] - t9[i];
                    let yy = t1[i] - t3[i] + 2.0 * t4[i] - 2.0 * t6[i] + t7[i] - t9[i];
                    let rr = (xx * xx + yy * yy).sqrt();
                    rgb[i] = rr * 2.0 * t5[i];
                }

                out.set_pixel(
                    x,
                    y,
                    [
                        to_u8(rgb[2] * 255.0),
                        to_u8(rgb[1] * 255.0),
                        to_u8(rgb[0] * 255.0),
                        255,
                    ],
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BGRA: [u8; 4] = [40, 120, 200, 128];

    #[test]
    fn test_grayscale_uses_luma_weights() {
        let out = GrayscaleFilter.apply(&PixelBuffer::filled(2, 2, BGRA));
        // 0.3 * 200 + 0.59 * 120 + 0.11 * 40 = 135.2
        assert_eq!(out.pixel(1, 1), [135, 135, 135, 128]);
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let out = InvertColorsFilter.apply(&PixelBuffer::filled(1, 1, BGRA));
        assert_eq!(out.pixel(0, 0), [215, 135, 55, 128]);
    }

    #[test]
    fn test_sepia_mix() {
        let out = SepiaFilter.apply(&PixelBuffer::filled(1, 1, BGRA));
        let gray = 135.2_f32;
        let expected_r = to_u8(200.0 * 0.25 + gray * 1.2 * 0.75);
        let expected_g = to_u8(120.0 * 0.25 + gray * 0.75);
        let expected_b = to_u8(40.0 * 0.25 + gray * 0.8 * 0.75);
        assert_eq!(out.pixel(0, 0), [expected_b, expected_g, expected_r, 128]);
    }

    #[test]
    fn test_night_vision_favours_green() {
        let [b, g, r, a] = NightVisionFilter.apply(&PixelBuffer::filled(1, 1, BGRA)).pixel(0, 0);
        assert!(g > r && g > b);
        assert_eq!(a, 128);
    }

    #[test]
    fn test_glow_is_dark_on_flat_frames() {
        let out = GlowFilter.apply(&PixelBuffer::filled(8, 8, BGRA));
        assert_eq!(out.pixel(4, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn test_glow_lights_edges() {
        let mut frame = PixelBuffer::filled(8, 8, [0, 0, 0, 255]);
        for y in 0..8 {
            for x in 4..8 {
                frame.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        let out = GlowFilter.apply(&frame);
        assert!(out.pixel(4, 4)[1] > 0);
        assert_eq!(out.pixel(7, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn test_fisheye_keeps_centre_and_size() {
        let mut frame = PixelBuffer::filled(9, 9, [0, 0, 0, 255]);
        frame.set_pixel(4, 4, [9, 9, 9, 255]);
        let out = FisheyeFilter.apply(&frame);
        assert_eq!((out.width(), out.height()), (9, 9));
        assert_eq!(out.pixel(4, 4), [9, 9, 9, 255]);
    }

    #[test]
    fn test_bgra_is_identity() {
        let frame = PixelBuffer::filled(3, 3, BGRA);
        assert_eq!(BgraFilter.apply(&frame), frame);
    }
}
