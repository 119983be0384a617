//! Render targets: the controller-owned surfaces bitmaps are delivered to.
//!
//! A [`RenderTargetSet`] is an ordered, fixed list of
//! (surface, resolution) pairs. Index *i* of every response corresponds to
//! target *i*; the set never grows, shrinks or changes a resolution once
//! built.

mod memory;
mod surface;

pub use memory::{MemorySurface, SurfaceProbe};
pub use surface::{Surface, SurfaceCaps};

use crate::bitmap::{Bitmap, Resolution};
use crate::error::{SessionError, TargetError};

/// A drawable surface bound to a fixed resolution.
pub struct RenderTarget {
    surface: Box<dyn Surface>,
    resolution: Resolution,
}

impl RenderTarget {
    /// Bind `surface` to `resolution`.
    pub fn new(resolution: Resolution, surface: impl Surface + 'static) -> Self {
        Self {
            surface: Box::new(surface),
            resolution,
        }
    }

    /// Resolution this target requests bitmaps at.
    #[inline]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Capabilities of the underlying surface.
    pub fn capabilities(&self) -> SurfaceCaps {
        self.surface.capabilities()
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("resolution", &self.resolution)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// The ordered collection of render targets owned by the controller.
#[derive(Debug)]
pub struct RenderTargetSet {
    targets: Vec<RenderTarget>,
}

impl RenderTargetSet {
    /// Build a set from targets in display order.
    pub fn new(targets: Vec<RenderTarget>) -> Self {
        Self { targets }
    }

    /// Number of targets.
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if the set has no targets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Resolutions of every target, in order.
    pub fn resolutions(&self) -> Vec<Resolution> {
        self.targets.iter().map(RenderTarget::resolution).collect()
    }

    /// Verify the set can host a session.
    ///
    /// Every target must advertise `required` and have a non-empty
    /// resolution. The first failing target is reported.
    pub fn validate(&self, required: SurfaceCaps) -> Result<(), SessionError> {
        if self.targets.is_empty() {
            return Err(SessionError::NoTargets);
        }
        for (index, target) in self.targets.iter().enumerate() {
            if target.resolution.is_empty() {
                return Err(SessionError::EmptyResolution {
                    index,
                    resolution: target.resolution,
                });
            }
            if !target.capabilities().contains(required) {
                return Err(SessionError::UnsupportedSurface {
                    index,
                    resolution: target.resolution,
                });
            }
        }
        Ok(())
    }

    /// Hand `bitmaps[i]` to target `i` for every index.
    ///
    /// A batch whose length differs from the number of targets is rejected
    /// as a whole: no surface is written.
    pub fn consume(&mut self, bitmaps: Vec<Bitmap>) -> Result<(), TargetError> {
        if bitmaps.len() != self.targets.len() {
            return Err(TargetError::LengthMismatch {
                expected: self.targets.len(),
                received: bitmaps.len(),
            });
        }

        for (target, bitmap) in self.targets.iter_mut().zip(bitmaps) {
            if bitmap.resolution() != target.resolution {
                tracing::debug!(
                    expected = %target.resolution,
                    received = %bitmap.resolution(),
                    "bitmap resolution differs from its target"
                );
            }
            target.surface.present(bitmap);
        }
        Ok(())
    }
}

impl FromIterator<RenderTarget> for RenderTargetSet {
    fn from_iter<I: IntoIterator<Item = RenderTarget>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Rgb;

    fn three_targets() -> (RenderTargetSet, Vec<SurfaceProbe>) {
        let mut probes = Vec::new();
        let set = [(160, 90), (640, 480), (1024, 768)]
            .into_iter()
            .map(|(w, h)| {
                let (surface, probe) = MemorySurface::new();
                probes.push(probe);
                RenderTarget::new(Resolution::new(w, h), surface)
            })
            .collect();
        (set, probes)
    }

    #[test]
    fn test_resolutions_in_order() {
        let (set, _) = three_targets();
        assert_eq!(
            set.resolutions(),
            vec![
                Resolution::new(160, 90),
                Resolution::new(640, 480),
                Resolution::new(1024, 768)
            ]
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_consume_writes_each_index() {
        let (mut set, probes) = three_targets();
        let colors = [Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)];

        let bitmaps = set
            .resolutions()
            .into_iter()
            .zip(colors)
            .map(|(res, color)| Bitmap::filled(res, color))
            .collect();
        set.consume(bitmaps).unwrap();

        for ((probe, res), color) in probes.iter().zip(set.resolutions()).zip(colors) {
            assert_eq!(probe.presentations(), 1);
            assert_eq!(probe.latest_resolution(), Some(res));
            assert_eq!(probe.latest_pixel(0, 0), Some(color));
        }

        // A second batch discards the previous content.
        let bitmaps = set
            .resolutions()
            .into_iter()
            .map(|res| Bitmap::filled(res, Rgb::WHITE))
            .collect();
        set.consume(bitmaps).unwrap();
        for probe in &probes {
            assert_eq!(probe.presentations(), 2);
            assert_eq!(probe.latest_pixel(0, 0), Some(Rgb::WHITE));
        }
    }

    #[test]
    fn test_consume_rejects_length_mismatch() {
        let (mut set, probes) = three_targets();
        let short = vec![Bitmap::new(Resolution::new(160, 90))];

        let err = set.consume(short).unwrap_err();
        assert_eq!(
            err,
            TargetError::LengthMismatch {
                expected: 3,
                received: 1
            }
        );
        assert!(probes.iter().all(|p| p.presentations() == 0));
    }

    #[test]
    fn test_validate() {
        let (set, _) = three_targets();
        assert!(set.validate(SurfaceCaps::TRANSFER).is_ok());

        let empty = RenderTargetSet::new(Vec::new());
        assert!(matches!(
            empty.validate(SurfaceCaps::TRANSFER),
            Err(SessionError::NoTargets)
        ));

        let (plain, _) = MemorySurface::new();
        let (opaque, _) = MemorySurface::with_capabilities(SurfaceCaps::TRUE_COLOR);
        let set = RenderTargetSet::new(vec![
            RenderTarget::new(Resolution::new(4, 4), plain),
            RenderTarget::new(Resolution::new(8, 8), opaque),
        ]);
        assert!(matches!(
            set.validate(SurfaceCaps::TRANSFER),
            Err(SessionError::UnsupportedSurface { index: 1, .. })
        ));

        let (surface, _) = MemorySurface::new();
        let set = RenderTargetSet::new(vec![RenderTarget::new(Resolution::new(0, 4), surface)]);
        assert!(matches!(
            set.validate(SurfaceCaps::TRANSFER),
            Err(SessionError::EmptyResolution { index: 0, .. })
        ));
    }
}
