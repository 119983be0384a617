//! `MemorySurface`: keeps the last presented bitmap in memory.
//!
//! Useful for headless sessions and for observing what a session delivered.

use super::surface::{Surface, SurfaceCaps};
use crate::bitmap::{Bitmap, Resolution, Rgb};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct ProbeState {
    latest: Option<Bitmap>,
    presentations: u64,
}

/// Read-only view of a [`MemorySurface`], usable after the surface has been
/// moved into a render target.
#[derive(Clone, Default)]
pub struct SurfaceProbe {
    state: Rc<RefCell<ProbeState>>,
}

impl SurfaceProbe {
    /// Number of bitmaps presented so far.
    pub fn presentations(&self) -> u64 {
        self.state.borrow().presentations
    }

    /// Resolution of the bitmap currently displayed.
    pub fn latest_resolution(&self) -> Option<Resolution> {
        self.state.borrow().latest.as_ref().map(Bitmap::resolution)
    }

    /// Pixel of the bitmap currently displayed.
    pub fn latest_pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.state.borrow().latest.as_ref().and_then(|b| b.get(x, y))
    }
}

/// A surface that stores the latest bitmap.
pub struct MemorySurface {
    probe: SurfaceProbe,
    caps: SurfaceCaps,
}

impl MemorySurface {
    /// Create a surface together with a probe observing it.
    pub fn new() -> (Self, SurfaceProbe) {
        Self::with_capabilities(SurfaceCaps::TRANSFER | SurfaceCaps::TRUE_COLOR)
    }

    /// Create a surface advertising `caps`.
    pub fn with_capabilities(caps: SurfaceCaps) -> (Self, SurfaceProbe) {
        let probe = SurfaceProbe::default();
        (
            Self {
                probe: probe.clone(),
                caps,
            },
            probe,
        )
    }
}

impl Surface for MemorySurface {
    fn present(&mut self, bitmap: Bitmap) {
        let mut state = self.probe.state.borrow_mut();
        state.latest = Some(bitmap);
        state.presentations += 1;
    }

    fn capabilities(&self) -> SurfaceCaps {
        self.caps
    }
}
