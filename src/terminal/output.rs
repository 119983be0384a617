//! `OutputBuffer`: Single-syscall output buffer for ANSI sequences.

use crate::bitmap::Rgb;
use std::io::Write;

/// Upper half block: foreground paints the top pixel, background the bottom.
const UPPER_HALF_BLOCK: &str = "\u{2580}";

/// Pre-allocated buffer for building ANSI escape sequences.
///
/// All output for one presentation is accumulated here, then flushed in a
/// single `write()` call to prevent tearing between rows.
pub struct OutputBuffer {
    data: Vec<u8>,
    /// Last emitted colors, so repeated pixels cost no escape sequence.
    fg: Option<Rgb>,
    bg: Option<Rgb>,
}

impl OutputBuffer {
    /// Create a new output buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            fg: None,
            bg: None,
        }
    }

    /// Create a buffer sized for a small terminal region (16KB).
    pub fn new() -> Self {
        Self::with_capacity(16 * 1024)
    }

    /// Clear the buffer and forget the tracked colors.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
        self.fg = None;
        self.bg = None;
    }

    /// Get the buffer contents.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move cursor to (x, y) position (1-indexed for ANSI).
    #[inline]
    pub fn cursor_move(&mut self, x: u16, y: u16) {
        // CSI row ; col H
        let _ = write!(self.data, "\x1b[{};{}H", y + 1, x + 1);
    }

    /// Set foreground color (true color), skipped if already active.
    #[inline]
    pub fn set_fg(&mut self, color: Rgb) {
        if self.fg != Some(color) {
            let _ = write!(self.data, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b);
            self.fg = Some(color);
        }
    }

    /// Set background color (true color), skipped if already active.
    #[inline]
    pub fn set_bg(&mut self, color: Rgb) {
        if self.bg != Some(color) {
            let _ = write!(self.data, "\x1b[48;2;{};{};{}m", color.r, color.g, color.b);
            self.bg = Some(color);
        }
    }

    /// Emit one cell showing two vertically stacked pixels.
    #[inline]
    pub fn half_block(&mut self, top: Rgb, bottom: Rgb) {
        self.set_fg(top);
        self.set_bg(bottom);
        self.data.extend_from_slice(UPPER_HALF_BLOCK.as_bytes());
    }

    /// Reset all attributes.
    #[inline]
    pub fn reset_attrs(&mut self) {
        self.data.extend_from_slice(b"\x1b[0m");
        self.fg = None;
        self.bg = None;
    }

    /// Flush to a writer in a single syscall.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn flush_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.data)?;
        writer.flush()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_move_is_one_indexed() {
        let mut out = OutputBuffer::new();
        out.cursor_move(0, 0);
        out.cursor_move(9, 4);
        assert_eq!(out.as_bytes(), b"\x1b[1;1H\x1b[5;10H");
    }

    #[test]
    fn test_repeated_colors_are_elided() {
        let mut out = OutputBuffer::new();
        out.half_block(Rgb::WHITE, Rgb::BLACK);
        let first = out.len();
        out.half_block(Rgb::WHITE, Rgb::BLACK);
        assert_eq!(out.len() - first, UPPER_HALF_BLOCK.len());

        out.reset_attrs();
        let before = out.len();
        out.set_fg(Rgb::WHITE);
        assert!(out.len() > before);
    }

    #[test]
    fn test_flush_to_writer() {
        let mut out = OutputBuffer::new();
        out.half_block(Rgb::new(1, 2, 3), Rgb::new(4, 5, 6));
        let mut sink = Vec::new();
        out.flush_to(&mut sink).unwrap();
        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text, "\x1b[38;2;1;2;3m\x1b[48;2;4;5;6m\u{2580}");
    }
}
