//! Monochrome framebuffer.
use std::fmt::{self, Display, Formatter};

use crate::{
    constants::{DISPLAY_HEIGHT, DISPLAY_MAX_PIXELS, DISPLAY_WIDTH},
    error::OutOfBounds,
};

/// Resolution of the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct VideoMode {
    pub width: usize,
    pub height: usize,
}

impl VideoMode {
    pub const MODE_64X32: VideoMode = VideoMode::new(64, 32);
    pub const MODE_64X48: VideoMode = VideoMode::new(64, 48);
    pub const MODE_64X64: VideoMode = VideoMode::new(64, 64);
    pub const MODE_128X64: VideoMode = VideoMode::new(128, 64);

    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline(always)]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Both sides are non-zero, and the grid fits in `DISPLAY_MAX_PIXELS`.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && matches!(self.width.checked_mul(self.height), Some(n) if n <= DISPLAY_MAX_PIXELS)
    }
}

impl Default for VideoMode {
    fn default() -> Self {
        Self::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl Display for VideoMode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Screen buffer that is drawn to.
///
/// Pixels are stored row major. The `changed` flag is raised by every
/// mutation and consumed by whoever presents the buffer.
pub struct Framebuffer {
    mode: VideoMode,
    pixels: Vec<bool>,
    changed: bool,
}

impl Framebuffer {
    pub fn new(mode: VideoMode) -> Self {
        Self {
            mode,
            pixels: vec![false; mode.pixel_count()],
            // First frame must be presented.
            changed: true,
        }
    }

    #[inline(always)]
    pub fn mode(&self) -> VideoMode {
        self.mode
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.mode.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.mode.height
    }

    /// Reallocate the grid for a new resolution. All pixels are cleared.
    pub fn set_mode(&mut self, mode: VideoMode) {
        self.mode = mode;
        self.pixels.clear();
        self.pixels.resize(mode.pixel_count(), false);
        self.changed = true;
    }

    pub fn pixel(&self, x: usize, y: usize) -> Result<bool, OutOfBounds> {
        let index = self.index(x, y)?;
        Ok(self.pixels[index])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, active: bool) -> Result<(), OutOfBounds> {
        let index = self.index(x, y)?;
        self.pixels[index] = active;
        self.changed = true;
        Ok(())
    }

    pub fn invert_pixel(&mut self, x: usize, y: usize) -> Result<(), OutOfBounds> {
        let index = self.index(x, y)?;
        self.pixels[index] = !self.pixels[index];
        self.changed = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.set_all(false);
    }

    pub fn set_all(&mut self, active: bool) {
        self.pixels.fill(active);
        self.changed = true;
    }

    pub fn invert_all(&mut self) {
        self.pixels.iter_mut().for_each(|px| *px = !*px);
        self.changed = true;
    }

    /// XOR a sprite onto the grid.
    ///
    /// Each byte in `rows` is 8 pixels wide, most significant bit on the left.
    /// The origin is wrapped into the grid, and pixels that fall over the right
    /// or bottom edge wrap around to the other side.
    ///
    /// Returns true when any pixel was switched off, which is used by programs
    /// for collision detection.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let (width, height) = (self.mode.width, self.mode.height);
        if width == 0 || height == 0 {
            return false;
        }

        let mut is_erased = false;

        for (r, row) in rows.iter().enumerate() {
            let py = (y + r) % height;

            for c in 0..8 {
                let new_px = (row >> (7 - c)) & 1 != 0;
                if !new_px {
                    continue;
                }

                let px = (x + c) % width;
                let index = px + py * width;

                // XOR erases a pixel when both the old and new values are 1.
                is_erased |= self.pixels[index];
                self.pixels[index] = !self.pixels[index];
            }
        }

        self.changed = true;

        is_erased
    }

    /// Whether the grid was mutated since the flag was last taken.
    #[inline(always)]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Consume the changed flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }

    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// Iterate the grid one row at a time, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        // Guard against zero width, which chunks() rejects.
        self.pixels.chunks(self.mode.width.max(1))
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Result<usize, OutOfBounds> {
        if x >= self.mode.width || y >= self.mode.height {
            Err(OutOfBounds::Pixel {
                x,
                y,
                width: self.mode.width,
                height: self.mode.height,
            })
        } else {
            Ok(x + y * self.mode.width)
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new(VideoMode::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mode_valid() {
        assert!(VideoMode::MODE_64X32.is_valid());
        assert!(VideoMode::MODE_128X64.is_valid());
        assert!(VideoMode::new(256, 256).is_valid());
        assert!(!VideoMode::new(0, 64).is_valid());
        assert!(!VideoMode::new(64, 0).is_valid());
        assert!(!VideoMode::new(257, 256).is_valid());
        assert!(!VideoMode::new(usize::MAX, usize::MAX).is_valid());
    }

    #[test]
    fn test_set_mode() {
        let mut fb = Framebuffer::default();
        fb.set_pixel(3, 3, true).unwrap();
        fb.take_changed();

        fb.set_mode(VideoMode::MODE_128X64);

        assert_eq!(fb.width(), 128);
        assert_eq!(fb.height(), 64);
        assert_eq!(fb.pixels().len(), 128 * 64);
        assert!(fb.pixels().iter().all(|px| !px));
        assert!(fb.take_changed());
    }

    #[test]
    fn test_pixel_bounds() {
        let mut fb = Framebuffer::default();
        fb.take_changed();

        assert_eq!(
            fb.set_pixel(64, 0, true),
            Err(OutOfBounds::Pixel {
                x: 64,
                y: 0,
                width: 64,
                height: 32
            })
        );
        assert!(fb.invert_pixel(0, 32).is_err());
        assert!(fb.pixel(100, 100).is_err());

        // Rejected accesses don't count as changes.
        assert!(!fb.is_changed());
        assert!(fb.pixels().iter().all(|px| !px));
    }

    #[test]
    fn test_changed_flag() {
        let mut fb = Framebuffer::default();
        assert!(fb.take_changed());
        assert!(!fb.take_changed());

        fb.invert_pixel(1, 2).unwrap();
        assert_eq!(fb.pixel(1, 2), Ok(true));
        assert!(fb.take_changed());
        assert!(!fb.is_changed());
    }

    #[test]
    fn test_invert_all_twice() {
        let mut fb = Framebuffer::default();
        fb.set_pixel(0, 0, true).unwrap();
        fb.set_pixel(10, 5, true).unwrap();
        fb.set_pixel(63, 31, true).unwrap();
        let before = fb.pixels().to_vec();

        fb.invert_all();
        assert_eq!(fb.pixel(0, 0), Ok(false));
        assert_eq!(fb.pixel(1, 0), Ok(true));

        fb.invert_all();
        assert_eq!(fb.pixels(), before.as_slice());
    }

    #[test]
    fn test_draw_collision() {
        let mut fb = Framebuffer::default();

        // ____####
        assert!(!fb.draw_sprite(4, 0, &[0b1111_0000]));
        // ######## over the top, zero bits must not erase
        assert!(!fb.draw_sprite(0, 0, &[0b1111_0000]));
        assert!((0..8).all(|x| fb.pixel(x, 0) == Ok(true)));

        // Erasing pixel 0 is a collision.
        assert!(fb.draw_sprite(0, 0, &[0b1000_0000]));
        assert_eq!(fb.pixel(0, 0), Ok(false));
    }

    #[test]
    fn test_draw_wraparound() {
        let mut fb = Framebuffer::default();

        fb.draw_sprite(62, 31, &[0b1111_0000, 0b1000_0000]);

        // Right edge wraps to the left.
        assert_eq!(fb.pixel(62, 31), Ok(true));
        assert_eq!(fb.pixel(63, 31), Ok(true));
        assert_eq!(fb.pixel(0, 31), Ok(true));
        assert_eq!(fb.pixel(1, 31), Ok(true));
        assert_eq!(fb.pixel(2, 31), Ok(false));
        // Bottom edge wraps to the top.
        assert_eq!(fb.pixel(62, 0), Ok(true));

        // Origin itself is wrapped.
        let mut fb = Framebuffer::default();
        fb.draw_sprite(64 + 3, 32 + 1, &[0b1000_0000]);
        assert_eq!(fb.pixel(3, 1), Ok(true));
    }

    #[test]
    fn test_rows() {
        let mut fb = Framebuffer::new(VideoMode::new(4, 2));
        fb.set_pixel(1, 1, true).unwrap();

        let rows: Vec<_> = fb.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], &[false, true, false, false]);
    }
}
