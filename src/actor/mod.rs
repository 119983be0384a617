//! Actor Model: the controller/producer pair and the loop between them.
//!
//! This module implements the relay using crossbeam channels:
//! - **Producer Actor**: dedicated thread that renders a scene and resamples
//!   it into one bitmap per requested resolution
//! - **Ticker Actor**: dedicated thread standing in for the display refresh
//! - **Session**: runs on the calling thread, issues requests each refresh
//!   and hands replies to the render targets
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐        Tick         ┌──────────────┐
//! │Ticker Thread │ ─────────────────▶  │              │
//! └──────────────┘                     │   Session    │
//!                                      │ (controller) │
//! ┌──────────────┐  INIT_STATE         │              │
//! │   Producer   │ ◀───────────────── │              │
//! │    Thread    │  REQUEST_BITMAPS    │              │
//! │              │                     │              │
//! │              │  BITMAPS_READY      │              │
//! │              │ ─────────────────▶  │              │
//! └──────────────┘  NOTIFY / TERMINATE └──────────────┘
//!                   (faults on the            │
//!                    same queue)              │ Bitmap
//!                                             ▼
//!                                      ┌──────────────┐
//!                                      │Render Targets│
//!                                      └──────────────┘
//! ```

mod channel;
mod messages;
mod producer;
mod scene;
mod scheduler;
mod session;
mod state;
mod ticker;

pub use channel::ProducerChannel;
pub use messages::{ProducerEvent, ProducerFault};
pub use producer::{BitmapGenerator, ProducerActor, ProducerStats, PRODUCER_SOURCE};
pub use scene::{Checkerboard, Plasma, Scene, SceneFactory, SceneRegistry, DEFAULT_SCENE};
pub use scheduler::{RenderLoop, CONTROLLER_SOURCE};
pub use session::{Session, SessionConfig, SessionStats};
pub use state::SessionState;
pub use ticker::{FrameClock, FrameRequest, Tick, TickerActor};
