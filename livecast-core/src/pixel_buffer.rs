use crate::error::{Error, Result};

pub const BYTES_PER_PIXEL: usize = 4;

/// A tightly packed BGRA8 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Transparent black frame.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn from_bgra(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "{width}x{height} BGRA frame needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let mut buffer = Self::new(width, height);
        buffer.fill(bgra);
        buffer
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// # Panics
    /// When the coordinate is outside the frame.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        let mut bgra = [0; 4];
        bgra.copy_from_slice(&self.data[offset..offset + BYTES_PER_PIXEL]);
        bgra
    }

    /// Sample with coordinates clamped to the edges.
    #[must_use]
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0; 4];
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.height) - 1) as u32;
        self.pixel(x, y)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, bgra: [u8; 4]) {
        let offset = self.offset(x, y);
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&bgra);
    }

    pub fn fill(&mut self, bgra: [u8; 4]) {
        for pixel in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&bgra);
        }
    }

    /// Nearest neighbour resize.
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }
        for y in 0..height {
            let source_y = (u64::from(y) * u64::from(self.height) / u64::from(height.max(1))) as u32;
            for x in 0..width {
                let source_x =
                    (u64::from(x) * u64::from(self.width) / u64::from(width.max(1))) as u32;
                out.set_pixel(x, y, self.pixel(source_x, source_y));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bgra_checks_length() {
        assert!(PixelBuffer::from_bgra(2, 2, vec![0; 16]).is_ok());
        assert!(PixelBuffer::from_bgra(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn test_pixel_access_and_clamp() {
        let mut buffer = PixelBuffer::new(3, 2);
        buffer.set_pixel(2, 1, [1, 2, 3, 4]);
        assert_eq!(buffer.pixel(2, 1), [1, 2, 3, 4]);
        assert_eq!(buffer.pixel_clamped(10, 10), [1, 2, 3, 4]);
        assert_eq!(buffer.pixel_clamped(-5, -5), [0, 0, 0, 0]);
    }

    #[test]
    fn test_resize_doubles_pixels() {
        let mut buffer = PixelBuffer::new(2, 1);
        buffer.set_pixel(0, 0, [255, 0, 0, 255]);
        buffer.set_pixel(1, 0, [0, 255, 0, 255]);

        let resized = buffer.resized(4, 2);
        assert_eq!(resized.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(resized.pixel(2, 0), [0, 255, 0, 255]);
    }
}
