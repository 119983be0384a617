//! Surface: a drawable consumer of bitmaps.

use crate::bitmap::Bitmap;
use bitflags::bitflags;

bitflags! {
    /// Capabilities a surface advertises to the session.
    ///
    /// Sessions refuse to start unless every surface supports
    /// [`SurfaceCaps::TRANSFER`].
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceCaps: u8 {
        /// Accepts ownership of a bitmap produced on another thread.
        const TRANSFER = 0b0000_0001;
        /// Displays 24-bit color without quantization.
        const TRUE_COLOR = 0b0000_0010;
        /// Scales presented bitmaps to its own display area.
        const SCALING = 0b0000_0100;
    }
}

impl std::fmt::Debug for SurfaceCaps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// A drawable consumer that displays one bitmap at a time.
///
/// Surfaces live on the controller thread and are written only by
/// [`RenderTargetSet::consume`](super::RenderTargetSet::consume).
pub trait Surface {
    /// Take ownership of `bitmap` and make it visible, replacing whatever
    /// was displayed before.
    fn present(&mut self, bitmap: Bitmap);

    /// Capabilities of this surface.
    fn capabilities(&self) -> SurfaceCaps {
        SurfaceCaps::TRANSFER
    }
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn present(&mut self, bitmap: Bitmap) {
        (**self).present(bitmap);
    }

    fn capabilities(&self) -> SurfaceCaps {
        (**self).capabilities()
    }
}
