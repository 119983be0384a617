//! # bitmap-relay
//!
//! A controller that keeps several display surfaces fed with bitmaps
//! produced on a separate thread.
//!
//! The producer renders a scene off the calling thread and resamples each
//! frame to every target resolution. The controller requests a batch on each
//! display refresh without waiting for the previous one, and hands each
//! bitmap to its target as the replies arrive. Bitmaps are moved across the
//! thread boundary, never shared.
//!
//! ## Core Concepts
//!
//! - **Envelopes**: every cross-thread message is an immutable [`Envelope`]
//! - **Render targets**: a fixed, ordered set of (surface, resolution) pairs
//! - **Actor model**: isolated threads for the producer and the refresh ticker
//! - **Fire-and-forget loop**: one request per refresh, stopped within one
//!   tick of a producer fault
//!
//! ## Example
//!
//! ```rust,no_run
//! use bitmap_relay::{
//!     MemorySurface, RenderTarget, RenderTargetSet, Resolution, Session, SessionConfig,
//! };
//!
//! let (surface, probe) = MemorySurface::new();
//! let targets = RenderTargetSet::new(vec![RenderTarget::new(Resolution::new(160, 90), surface)]);
//!
//! let mut session = Session::new(targets, SessionConfig::default())?;
//! session.run_for(std::time::Duration::from_millis(100))?;
//! println!("presented {} frames", probe.presentations());
//! # Ok::<(), bitmap_relay::SessionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod bitmap;
pub mod error;
pub mod protocol;
pub mod target;
pub mod terminal;

// Re-exports for convenience
pub use actor::{
    ProducerChannel, ProducerFault, SceneRegistry, Session, SessionConfig, SessionState,
    SessionStats,
};
pub use bitmap::{Bitmap, Resolution, Rgb};
pub use error::{Result, SceneError, SessionError, TargetError};
pub use protocol::{Action, Envelope, Message, SceneConfig};
pub use target::{MemorySurface, RenderTarget, RenderTargetSet, Surface, SurfaceCaps};
pub use terminal::{Region, TerminalSurface};
