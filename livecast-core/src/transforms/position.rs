use crate::pixel_buffer::PixelBuffer;

/// A rectangle in video pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Positions a layer of `width` x `height` centred on `(x, y)` inside a
/// context of the video size.
#[derive(Debug, Clone)]
pub struct PositionTransform {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    context_width: u32,
    context_height: u32,
    position_is_dirty: bool,
    placement: Rect,
}

impl PositionTransform {
    #[must_use]
    pub const fn new(
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        context_width: u32,
        context_height: u32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            context_width,
            context_height,
            position_is_dirty: true,
            placement: Rect::new(0, 0, 0, 0),
        }
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
        self.position_is_dirty = true;
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.position_is_dirty = true;
    }

    /// Layer size as a fraction of the context.
    #[must_use]
    pub fn relative_size(&self) -> (f32, f32) {
        (
            self.width as f32 / self.context_width.max(1) as f32,
            self.height as f32 / self.context_height.max(1) as f32,
        )
    }

    /// Top-left origin and size of the layer in the context.
    pub fn placement(&mut self) -> Rect {
        if self.position_is_dirty {
            self.placement = Rect::new(
                self.x - (self.width / 2) as i32,
                self.y - (self.height / 2) as i32,
                self.width,
                self.height,
            );
            self.position_is_dirty = false;
        }
        self.placement
    }
}

/// A still image composited over every video frame.
pub struct Overlay {
    image: PixelBuffer,
    position: PositionTransform,
}

impl Overlay {
    /// `rect` is in video coordinates; its origin is where the image centre lands.
    #[must_use]
    pub fn new(image: &PixelBuffer, rect: Rect, video_width: u32, video_height: u32) -> Self {
        let image = if (image.width(), image.height()) == (rect.width, rect.height) {
            image.clone()
        } else {
            image.resized(rect.width, rect.height)
        };
        Self {
            image,
            position: PositionTransform::new(
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                video_width,
                video_height,
            ),
        }
    }

    /// Alpha blend the image onto `frame`; parts outside the frame are clipped.
    pub fn composite(&mut self, frame: &mut PixelBuffer) {
        let placement = self.position.placement();

        for image_y in 0..self.image.height() {
            let y = i64::from(placement.y) + i64::from(image_y);
            if y < 0 || y >= i64::from(frame.height()) {
                continue;
            }
            for image_x in 0..self.image.width() {
                let x = i64::from(placement.x) + i64::from(image_x);
                if x < 0 || x >= i64::from(frame.width()) {
                    continue;
                }

                let source = self.image.pixel(image_x, image_y);
                let alpha = u32::from(source[3]);
                if alpha == 0 {
                    continue;
                }
                let (x, y) = (x as u32, y as u32);
                let destination = frame.pixel(x, y);

                let mut blended = [0_u8; 4];
                for channel in 0..3 {
                    let value = u32::from(source[channel]) * alpha
                        + u32::from(destination[channel]) * (255 - alpha);
                    blended[channel] = ((value + 127) / 255) as u8;
                }
                blended[3] = destination[3].max(source[3]);
                frame.set_pixel(x, y, blended);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_is_centred_on_origin() {
        let mut transform = PositionTransform::new(0, 0, 20, 10, 1280, 720);
        assert_eq!(transform.placement(), Rect::new(-10, -5, 20, 10));

        transform.set_position(100, 50);
        assert_eq!(transform.placement(), Rect::new(90, 45, 20, 10));
        assert_eq!(transform.relative_size(), (20.0 / 1280.0, 10.0 / 720.0));
    }

    #[test]
    fn test_composite_opaque_and_clipped() {
        let image = PixelBuffer::filled(2, 2, [0, 0, 255, 255]);
        let mut overlay = Overlay::new(&image, Rect::new(0, 0, 2, 2), 4, 4);
        let mut frame = PixelBuffer::filled(4, 4, [0, 0, 0, 255]);

        overlay.composite(&mut frame);

        // only the bottom-right quadrant of the image lands in the frame
        assert_eq!(frame.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(frame.pixel(1, 0), [0, 0, 0, 255]);
        assert_eq!(frame.pixel(0, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_composite_half_alpha() {
        let image = PixelBuffer::filled(1, 1, [255, 255, 255, 128]);
        let mut overlay = Overlay::new(&image, Rect::new(1, 1, 1, 1), 2, 2);
        let mut frame = PixelBuffer::filled(2, 2, [0, 0, 0, 255]);

        overlay.composite(&mut frame);

        assert_eq!(frame.pixel(1, 1), [128, 128, 128, 255]);
    }
}
