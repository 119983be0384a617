//! Error types shared across the crate.

use crate::bitmap::Resolution;

/// Result alias for session construction and control.
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Errors that abort a session before or during startup.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The session was given no render targets.
    #[error("session requires at least one render target")]
    NoTargets,

    /// A render target surface cannot accept transferred bitmaps.
    #[error("render target {index} ({resolution}) does not support bitmap transfer")]
    UnsupportedSurface {
        /// Position of the offending target.
        index: usize,
        /// Resolution the target was bound to.
        resolution: Resolution,
    },

    /// A render target was bound to a zero-sized resolution.
    #[error("render target {index} has an empty resolution ({resolution})")]
    EmptyResolution {
        /// Position of the offending target.
        index: usize,
        /// Resolution the target was bound to.
        resolution: Resolution,
    },

    /// The producer thread could not be started.
    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised while handing bitmaps to render targets.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// A response carried a different number of bitmaps than there are targets.
    #[error("received {received} bitmaps for {expected} render targets")]
    LengthMismatch {
        /// Number of render targets.
        expected: usize,
        /// Number of bitmaps in the response.
        received: usize,
    },
}

/// Errors raised by the producer while synthesizing bitmaps.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A bitmap was requested before any scene was initialized.
    #[error("no scene initialized; INIT_STATE must precede REQUEST_BITMAPS")]
    NotInitialized,

    /// A requested resolution had a zero dimension.
    #[error("requested resolution {0} is empty")]
    EmptyResolution(Resolution),

    /// The scene itself failed to render a frame.
    #[error("scene `{scene}` failed at frame {frame}: {reason}")]
    Render {
        /// Scene name.
        scene: String,
        /// Frame number being rendered.
        frame: u64,
        /// Human-readable cause.
        reason: String,
    },
}

impl SceneError {
    /// Convenience constructor for scene render failures.
    pub fn render(scene: impl Into<String>, frame: u64, reason: impl Into<String>) -> Self {
        Self::Render {
            scene: scene.into(),
            frame,
            reason: reason.into(),
        }
    }
}
