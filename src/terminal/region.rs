//! Region: a rectangle of terminal cells.

/// A rectangle of terminal cells defined by position and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    /// X coordinate (column) of the top-left corner.
    pub x: u16,
    /// Y coordinate (row) of the top-left corner.
    pub y: u16,
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Region {
    /// Create a new region.
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the region is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel resolution displayable with half-block cells (two pixels per row).
    #[inline]
    pub const fn pixel_resolution(&self) -> crate::bitmap::Resolution {
        crate::bitmap::Resolution::new(self.width as u32, self.height as u32 * 2)
    }

    /// Split horizontally into `count` columns separated by `gap` cells.
    ///
    /// The last column absorbs any remainder.
    pub fn split_columns(&self, count: u16, gap: u16) -> Vec<Self> {
        if count == 0 {
            return Vec::new();
        }
        let gaps = gap.saturating_mul(count - 1);
        let usable = self.width.saturating_sub(gaps);
        let base = usable / count;

        let mut x = self.x;
        (0..count)
            .map(|i| {
                let width = if i == count - 1 {
                    usable - base * (count - 1)
                } else {
                    base
                };
                let column = Self::new(x, self.y, width, self.height);
                x = x.saturating_add(width).saturating_add(gap);
                column
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_columns() {
        let region = Region::new(0, 1, 80, 20);
        let columns = region.split_columns(3, 1);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0], Region::new(0, 1, 26, 20));
        assert_eq!(columns[1], Region::new(27, 1, 26, 20));
        assert_eq!(columns[2], Region::new(54, 1, 26, 20));
    }

    #[test]
    fn test_pixel_resolution() {
        let region = Region::new(0, 0, 40, 12);
        assert_eq!(region.pixel_resolution(), crate::bitmap::Resolution::new(40, 24));
        assert!(Region::new(0, 0, 0, 5).is_empty());
    }
}
