//! Bitmap: an owned grid of pixels handed across the thread boundary.
//!
//! Pixels are stored in row-major order: `index = y * width + x`.
//!
//! `Bitmap` deliberately does not implement `Clone`. Moving a bitmap into a
//! message is the ownership handoff: once the producer sends it, the
//! controller is its only owner.

use super::pixel::Rgb;
use std::fmt;

/// A fixed `{width, height}` pair in pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Check if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    #[inline]
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// An owned RGB bitmap.
pub struct Bitmap {
    /// Pixel storage (row-major order).
    pixels: Vec<Rgb>,
    /// Dimensions, fixed at construction.
    resolution: Resolution,
}

impl Bitmap {
    /// Create a black bitmap with the given resolution.
    pub fn new(resolution: Resolution) -> Self {
        Self::filled(resolution, Rgb::BLACK)
    }

    /// Create a bitmap with every pixel set to `color`.
    pub fn filled(resolution: Resolution, color: Rgb) -> Self {
        Self {
            pixels: vec![color; resolution.pixel_count()],
            resolution,
        }
    }

    /// Get the bitmap resolution.
    #[inline]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Get the bitmap width.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.resolution.width
    }

    /// Get the bitmap height.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.resolution.height
    }

    /// Get the underlying pixel slice.
    #[inline]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Get a mutable reference to the underlying pixel slice.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    /// Convert (x, y) coordinates to a linear index.
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub const fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.resolution.width && y < self.resolution.height {
            Some((y as usize) * (self.resolution.width as usize) + (x as usize))
        } else {
            None
        }
    }

    /// Get the pixel at (x, y).
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        self.index_of(x, y).map(|i| self.pixels[i])
    }

    /// Set the pixel at (x, y). Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Rgb) {
        if let Some(i) = self.index_of(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Iterate over rows as pixel slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.pixels.chunks(self.resolution.width.max(1) as usize)
    }

    /// Produce a new bitmap at `target` resolution using nearest-neighbour
    /// sampling.
    ///
    /// The source is left untouched; the result is a fresh allocation that can
    /// be handed off independently.
    pub fn resample(&self, target: Resolution) -> Self {
        if target == self.resolution {
            return Self {
                pixels: self.pixels.clone(),
                resolution: target,
            };
        }

        let mut pixels = Vec::with_capacity(target.pixel_count());
        if self.resolution.is_empty() {
            pixels.resize(target.pixel_count(), Rgb::BLACK);
            return Self {
                pixels,
                resolution: target,
            };
        }

        let src_w = u64::from(self.resolution.width);
        let src_h = u64::from(self.resolution.height);
        let dst_w = u64::from(target.width);
        let dst_h = u64::from(target.height);

        for y in 0..dst_h {
            // Sample at pixel centres to avoid a bias towards the top-left.
            let sy = ((2 * y + 1) * src_h / (2 * dst_h)).min(src_h - 1);
            let row = (sy * src_w) as usize;
            for x in 0..dst_w {
                let sx = ((2 * x + 1) * src_w / (2 * dst_w)).min(src_w - 1);
                pixels.push(self.pixels[row + sx as usize]);
            }
        }

        Self {
            pixels,
            resolution: target,
        }
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}
