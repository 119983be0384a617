//! Refresh timing: a ticker thread standing in for the display refresh, and
//! the frame clock that turns refreshes into cancellable callbacks.
//!
//! [`TickerActor`] produces a [`Tick`] per refresh interval. [`FrameClock`]
//! holds at most one pending [`FrameRequest`]; a refresh fires it, and
//! cancelling it withdraws the next callback. This is the only cancellation
//! primitive the render loop has.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A refresh event sent at regular intervals.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Refresh number (monotonically increasing).
    pub frame: u64,
    /// Time elapsed since the ticker was started.
    pub elapsed: Duration,
}

/// Ticker actor that generates regular refresh events.
pub struct TickerActor {
    /// Handle to the ticker thread.
    handle: Option<JoinHandle<()>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
    /// Receiver for tick events.
    tick_rx: Receiver<Tick>,
}

impl TickerActor {
    /// Spawn a new ticker actor with the given interval.
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between ticks (e.g., 16ms for ~60 Hz).
    pub fn spawn(interval: Duration) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        // Small buffer: refreshes are dropped rather than queued when the
        // controller falls behind.
        let (tick_tx, tick_rx) = bounded(2);

        let handle = thread::Builder::new()
            .name("bitmap-relay-refresh".to_string())
            .spawn(move || {
                Self::run_loop(&tick_tx, &shutdown_clone, interval);
            })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
            tick_rx,
        })
    }

    /// Get a reference to the tick receiver.
    #[inline]
    pub const fn receiver(&self) -> &Receiver<Tick> {
        &self.tick_rx
    }

    /// Signal the ticker to shutdown.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the ticker thread to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main ticker loop.
    fn run_loop(tick_tx: &Sender<Tick>, shutdown: &AtomicBool, interval: Duration) {
        let start = Instant::now();
        let mut frame = 0u64;
        let mut next_tick = start + interval;

        while !shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= next_tick {
                let tick = Tick {
                    frame,
                    elapsed: now - start,
                };

                // Non-blocking: a full buffer means the receiver is slow.
                let _ = tick_tx.try_send(tick);

                frame += 1;
                next_tick += interval;

                // Behind schedule: resynchronize instead of bursting.
                if next_tick < now {
                    next_tick = now + interval;
                }
            } else {
                let sleep_duration = next_tick - now;
                thread::sleep(sleep_duration.min(Duration::from_millis(1)));
            }
        }
    }
}

impl Drop for TickerActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cancellation handle for a scheduled refresh callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

impl FrameRequest {
    /// Numeric id of the request.
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Holds the single pending refresh callback of the render loop.
#[derive(Debug)]
pub struct FrameClock {
    pending: Option<FrameRequest>,
    next_id: u64,
}

impl FrameClock {
    /// Create a clock with nothing scheduled.
    pub const fn new() -> Self {
        Self {
            pending: None,
            next_id: 1,
        }
    }

    /// Schedule a callback for the next refresh, replacing any pending one.
    pub fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id);
        self.next_id += 1;
        self.pending = Some(request);
        request
    }

    /// Withdraw `request`. Returns `false` if it was not pending.
    pub fn cancel_frame(&mut self, request: FrameRequest) -> bool {
        if self.pending == Some(request) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Withdraw whatever is pending.
    pub fn cancel_all(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    /// Consume the pending callback on a refresh.
    pub fn fire(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    /// Currently pending callback.
    pub const fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
