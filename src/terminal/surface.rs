//! `TerminalSurface`: presents bitmaps inside a region of a true-color terminal.
//!
//! Each cell shows two pixels using an upper half block (foreground = top
//! pixel, background = bottom pixel). A presented bitmap is scaled to the
//! region's pixel resolution and written with a single flush, so the region
//! always shows exactly one whole bitmap.

use super::output::OutputBuffer;
use super::region::Region;
use crate::bitmap::Bitmap;
use crate::target::{Surface, SurfaceCaps};
use std::io::{self, Stdout, Write};

/// A surface drawing into a rectangular region of a terminal.
pub struct TerminalSurface<W: Write = Stdout> {
    region: Region,
    writer: W,
    output: OutputBuffer,
    frames: u64,
    write_errors: u64,
}

impl TerminalSurface<Stdout> {
    /// Draw into `region` of the process's standard output.
    pub fn stdout(region: Region) -> Self {
        Self::new(region, io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    /// Draw into `region` through `writer`.
    pub fn new(region: Region, writer: W) -> Self {
        let cells = usize::from(region.width) * usize::from(region.height);
        Self {
            region,
            writer,
            // Two color escapes plus a 3-byte glyph per cell in the worst case.
            output: OutputBuffer::with_capacity(cells * 48 + 64),
            frames: 0,
            write_errors: 0,
        }
    }

    /// Region of the terminal this surface owns.
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Number of bitmaps drawn.
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of presentations lost to write failures.
    pub const fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Borrow the underlying writer.
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Encode `bitmap` into the output buffer without flushing.
    fn encode(&mut self, bitmap: &Bitmap) {
        self.output.clear();
        let scaled = bitmap.resample(self.region.pixel_resolution());

        let mut rows = scaled.rows();
        for row in 0..self.region.height {
            let (Some(top), Some(bottom)) = (rows.next(), rows.next()) else {
                break;
            };
            self.output.cursor_move(self.region.x, self.region.y + row);
            for (upper, lower) in top.iter().zip(bottom) {
                self.output.half_block(*upper, *lower);
            }
        }
        self.output.reset_attrs();
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn present(&mut self, bitmap: Bitmap) {
        if self.region.is_empty() {
            return;
        }
        self.encode(&bitmap);
        match self.output.flush_to(&mut self.writer) {
            Ok(()) => self.frames += 1,
            Err(e) => {
                self.write_errors += 1;
                tracing::warn!(error = %e, region = ?self.region, "terminal surface write failed");
            }
        }
    }

    fn capabilities(&self) -> SurfaceCaps {
        SurfaceCaps::TRANSFER | SurfaceCaps::TRUE_COLOR | SurfaceCaps::SCALING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Resolution, Rgb};

    #[test]
    fn test_present_writes_every_row() {
        let mut surface = TerminalSurface::new(Region::new(2, 3, 4, 2), Vec::new());
        surface.present(Bitmap::filled(Resolution::new(160, 90), Rgb::new(9, 8, 7)));

        let text = String::from_utf8(surface.writer().clone()).unwrap();
        assert!(text.contains("\x1b[4;3H"));
        assert!(text.contains("\x1b[5;3H"));
        assert_eq!(text.matches('\u{2580}').count(), 8);
        // Uniform bitmap: colors are emitted once.
        assert_eq!(text.matches("\x1b[38;2;9;8;7m").count(), 1);
        assert!(text.ends_with("\x1b[0m"));
        assert_eq!(surface.frames(), 1);
    }

    #[test]
    fn test_top_and_bottom_pixels() {
        let mut bitmap = Bitmap::new(Resolution::new(1, 2));
        bitmap.set(0, 0, Rgb::WHITE);
        let mut surface = TerminalSurface::new(Region::new(0, 0, 1, 1), Vec::new());
        surface.present(bitmap);

        let text = String::from_utf8(surface.writer().clone()).unwrap();
        assert!(text.contains("\x1b[38;2;255;255;255m\x1b[48;2;0;0;0m\u{2580}"));
    }

    #[test]
    fn test_empty_region_draws_nothing() {
        let mut surface = TerminalSurface::new(Region::new(0, 0, 0, 4), Vec::new());
        surface.present(Bitmap::new(Resolution::new(4, 4)));
        assert!(surface.writer().is_empty());
        assert_eq!(surface.frames(), 0);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_are_counted() {
        let mut surface = TerminalSurface::new(Region::new(0, 0, 2, 2), Broken);
        surface.present(Bitmap::new(Resolution::new(4, 4)));
        assert_eq!(surface.write_errors(), 1);
        assert_eq!(surface.frames(), 0);
    }
}
