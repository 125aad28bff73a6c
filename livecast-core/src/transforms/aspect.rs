use serde::{Deserialize, Serialize};

use crate::pixel_buffer::PixelBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectMode {
    /// Whole source visible, letterboxed.
    #[default]
    Fit,
    /// Bounding box covered, source cropped.
    Fill,
}

/// Scales frames into a bounding box while keeping their aspect ratio.
pub struct AspectTransform {
    bounding_width: u32,
    bounding_height: u32,
    mode: AspectMode,
    bounding_box_dirty: bool,
    previous_size: (u32, u32),
    scale: (f32, f32),
}

impl AspectTransform {
    #[must_use]
    pub const fn new(bounding_width: u32, bounding_height: u32, mode: AspectMode) -> Self {
        Self {
            bounding_width,
            bounding_height,
            mode,
            bounding_box_dirty: true,
            previous_size: (0, 0),
            scale: (1.0, 1.0),
        }
    }

    pub fn set_bounding_size(&mut self, width: u32, height: u32) {
        self.bounding_width = width;
        self.bounding_height = height;
        self.bounding_box_dirty = true;
    }

    pub fn set_aspect_mode(&mut self, mode: AspectMode) {
        self.mode = mode;
        self.bounding_box_dirty = true;
    }

    #[must_use]
    pub const fn aspect_mode(&self) -> AspectMode {
        self.mode
    }

    /// Size of the source relative to the bounding box, per axis.
    pub fn scale(&mut self, width: u32, height: u32) -> (f32, f32) {
        if (width, height) != self.previous_size {
            self.previous_size = (width, height);
            self.bounding_box_dirty = true;
        }

        if self.bounding_box_dirty && width > 0 && height > 0 {
            let bounding_width = self.bounding_width as f32;
            let bounding_height = self.bounding_height as f32;
            let wfac = bounding_width / width as f32;
            let hfac = bounding_height / height as f32;

            let use_width = match self.mode {
                AspectMode::Fit => wfac < hfac,
                AspectMode::Fill => wfac > hfac,
            };
            let mult = if use_width { wfac } else { hfac };

            self.scale = (
                width as f32 * mult / bounding_width,
                height as f32 * mult / bounding_height,
            );
            self.bounding_box_dirty = false;
        }

        self.scale
    }

    /// Render `frame` into a bounding-size frame, centred.
    pub fn apply(&mut self, frame: &PixelBuffer) -> PixelBuffer {
        let (sx, sy) = self.scale(frame.width(), frame.height());
        let mut out = PixelBuffer::filled(self.bounding_width, self.bounding_height, [0, 0, 0, 255]);

        let scaled_width = (sx * self.bounding_width as f32).round() as u32;
        let scaled_height = (sy * self.bounding_height as f32).round() as u32;
        if scaled_width == 0 || scaled_height == 0 {
            return out;
        }
        let scaled = frame.resized(scaled_width, scaled_height);

        let left = (i64::from(self.bounding_width) - i64::from(scaled_width)) / 2;
        let top = (i64::from(self.bounding_height) - i64::from(scaled_height)) / 2;

        for y in 0..self.bounding_height {
            let source_y = i64::from(y) - top;
            if source_y < 0 || source_y >= i64::from(scaled_height) {
                continue;
            }
            for x in 0..self.bounding_width {
                let source_x = i64::from(x) - left;
                if source_x < 0 || source_x >= i64::from(scaled_width) {
                    continue;
                }
                out.set_pixel(x, y, scaled.pixel(source_x as u32, source_y as u32));
            }
        }
        out
    }
}
