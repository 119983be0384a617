//! Session: the controller side of the relay.
//!
//! A [`Session`] owns the render targets, the producer channel and the render
//! loop. It validates the targets, wires the channel handlers to the
//! controller, and offers two ways to drive it:
//!
//! - manually, by calling [`Session::tick`] on each refresh and
//!   [`Session::dispatch_pending`] to deliver replies (tests, embedding in an
//!   existing event loop);
//! - with [`Session::run`] / [`Session::run_for`], which spawn a
//!   [`TickerActor`] and `select!` over refreshes and producer events.

use super::channel::ProducerChannel;
use super::messages::ProducerFault;
use super::producer::ProducerStats;
use super::scene::SceneRegistry;
use super::scheduler::RenderLoop;
use super::state::SessionState;
use super::ticker::TickerActor;
use crate::error::{Result, SessionError};
use crate::protocol::{BitmapBatch, Envelope, Message, SceneConfig};
use crate::target::{RenderTargetSet, SurfaceCaps};
use crossbeam_channel::select;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Scene sent to the producer with `INIT_STATE`.
    pub scene: SceneConfig,
    /// Interval between refreshes when driven by [`Session::run`].
    pub refresh_interval: Duration,
    /// Cap on unanswered requests. `None` is fire-and-forget.
    pub max_in_flight: Option<usize>,
    /// Name of the producer thread.
    pub producer_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scene: SceneConfig::default(),
            refresh_interval: Duration::from_millis(16),
            max_in_flight: None,
            producer_name: "bitmap-relay-producer".to_string(),
        }
    }
}

/// Controller-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Batches handed to the render targets.
    pub frames_presented: u64,
    /// Batches discarded because a newer one was already presented.
    pub stale_batches: u64,
    /// Batches dropped because their length did not match the targets.
    pub mismatched_batches: u64,
    /// `NOTIFY` envelopes received.
    pub notices: u64,
    /// Envelopes with an action the controller does not handle.
    pub unrecognized: u64,
    /// Producer faults received.
    pub faults: u64,
}

/// State shared by the session and its channel handlers.
struct Controller {
    targets: RenderTargetSet,
    render_loop: RenderLoop,
    /// Sequence of the last batch presented.
    last_presented: u64,
    stats: SessionStats,
}

impl Controller {
    fn new(targets: RenderTargetSet, render_loop: RenderLoop) -> Self {
        Self {
            targets,
            render_loop,
            last_presented: 0,
            stats: SessionStats::default(),
        }
    }

    fn handle_message(&mut self, envelope: Envelope) {
        let source = envelope.source().to_string();
        tracing::trace!(source = %source, action = envelope.action_name(), "controller <- producer");

        match envelope.into_message() {
            Message::BitmapsReady(batch) => self.present(batch),
            Message::Notify(notice) => {
                self.stats.notices += 1;
                tracing::info!(source = %source, "{}", notice.text);
            }
            Message::Terminate => self.handle_terminate(&source),
            other => {
                self.stats.unrecognized += 1;
                tracing::warn!(
                    source = %source,
                    action = other.action_name(),
                    "ignoring unrecognized action"
                );
            }
        }
    }

    fn present(&mut self, batch: BitmapBatch) {
        self.render_loop.acknowledge();

        if batch.sequence <= self.last_presented {
            self.stats.stale_batches += 1;
            tracing::debug!(
                sequence = batch.sequence,
                last = self.last_presented,
                "discarding stale bitmap batch"
            );
            return;
        }

        match self.targets.consume(batch.bitmaps) {
            Ok(()) => {
                self.last_presented = batch.sequence;
                self.stats.frames_presented += 1;
            }
            Err(e) => {
                self.stats.mismatched_batches += 1;
                tracing::error!(sequence = batch.sequence, error = %e, "dropping bitmap batch");
            }
        }
    }

    fn handle_fault(&mut self, fault: ProducerFault) {
        self.stats.faults += 1;
        // A fault tied to a request is that request's answer.
        if fault.sequence.is_some() {
            self.render_loop.acknowledge();
        }
        self.render_loop.record_fault(fault);
    }

    /// The producer thread is gone without a TERMINATE.
    fn handle_disconnect(&mut self) {
        let channel = self.render_loop.channel().clone();
        if channel.is_terminated() {
            self.render_loop.stop();
            return;
        }
        tracing::error!(producer = channel.name(), "producer thread disconnected");
        self.handle_fault(ProducerFault::new(
            format!("producer thread `{}` disconnected", channel.name()),
            None,
        ));
        self.render_loop.halt();
    }

    fn handle_terminate(&mut self, source: &str) {
        // The frame-limit TERMINATE answers the request that triggered it.
        self.render_loop.acknowledge();
        self.render_loop.stop();
        self.render_loop.channel().terminate();
        tracing::warn!(
            source,
            frames = self.stats.frames_presented,
            "producer requested termination; session closed"
        );
    }
}

/// A running controller/producer pair.
pub struct Session {
    channel: ProducerChannel,
    core: Rc<RefCell<Controller>>,
    config: SessionConfig,
    ticker: Option<TickerActor>,
}

impl Session {
    /// Create a session using the built-in scenes.
    ///
    /// # Errors
    ///
    /// Returns an error if a target fails the capability check or the
    /// producer thread cannot be spawned.
    pub fn new(targets: RenderTargetSet, config: SessionConfig) -> Result<Self> {
        Self::with_scenes(targets, config, SceneRegistry::default())
    }

    /// Create a session whose producer draws scenes from `registry`.
    ///
    /// Nothing is sent to the producer until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns an error if a target fails the capability check or the
    /// producer thread cannot be spawned.
    pub fn with_scenes(
        targets: RenderTargetSet,
        config: SessionConfig,
        registry: SceneRegistry,
    ) -> Result<Self> {
        if let Err(e) = targets.validate(SurfaceCaps::TRANSFER) {
            tracing::error!(error = %e, "render targets rejected");
            return Err(e);
        }

        let channel = ProducerChannel::spawn(config.producer_name.clone(), registry)?;
        let render_loop = RenderLoop::new(channel.clone(), targets.resolutions(), config.max_in_flight);
        let core = Rc::new(RefCell::new(Controller::new(targets, render_loop)));

        let handler_core = Rc::clone(&core);
        channel.on_message(move |envelope| handler_core.borrow_mut().handle_message(envelope));
        let fault_core = Rc::clone(&core);
        channel.on_error(move |fault| fault_core.borrow_mut().handle_fault(fault));

        Ok(Self {
            channel,
            core,
            config,
            ticker: None,
        })
    }

    /// Send `INIT_STATE` and issue the first request.
    ///
    /// Returns `false` if the session was already started or has stopped.
    pub fn start(&self) -> bool {
        let scene = self.config.scene.clone();
        self.core.borrow_mut().render_loop.start(scene)
    }

    /// Signal one display refresh. Returns `true` if a request tick ran.
    pub fn tick(&self) -> bool {
        self.core.borrow_mut().render_loop.on_refresh()
    }

    /// Deliver every producer event already queued.
    pub fn dispatch_pending(&self) -> usize {
        self.channel.dispatch_pending()
    }

    /// Wait up to `timeout` for one producer event and deliver it.
    pub fn dispatch_timeout(&self, timeout: Duration) -> bool {
        self.channel.dispatch_timeout(timeout)
    }

    /// Run until the session faults or terminates.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh ticker cannot be spawned.
    pub fn run(&mut self) -> Result<()> {
        while self.run_for(Duration::from_secs(1))? {}
        Ok(())
    }

    /// Run for at most `duration`, starting the session if needed.
    ///
    /// Returns `true` if the session is still running afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh ticker cannot be spawned.
    pub fn run_for(&mut self, duration: Duration) -> Result<bool> {
        let deadline = Instant::now() + duration;
        let ticks = match &self.ticker {
            Some(ticker) => ticker.receiver().clone(),
            None => {
                let ticker = TickerActor::spawn(self.config.refresh_interval).map_err(SessionError::Spawn)?;
                let ticks = ticker.receiver().clone();
                self.ticker = Some(ticker);
                ticks
            }
        };

        if matches!(self.state(), SessionState::Idle) {
            self.start();
        }

        loop {
            let state = self.state();
            if !state.accepts_ticks() {
                if state.is_faulted() {
                    self.drain_in_flight(deadline);
                }
                return Ok(false);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(true);
            }

            select! {
                recv(self.channel.inbound()) -> event => match event {
                    Ok(event) => self.channel.deliver(event),
                    Err(_) => {
                        self.core.borrow_mut().handle_disconnect();
                        return Ok(false);
                    }
                },
                recv(ticks) -> tick => {
                    if tick.is_ok() {
                        self.tick();
                    }
                }
                default(remaining) => {}
            }
        }
    }

    /// Keep delivering replies to requests sent before a fault.
    ///
    /// Returns once nothing is in flight, the channel closes or `deadline`
    /// passes.
    fn drain_in_flight(&self, deadline: Instant) {
        while self.in_flight() > 0 && !self.channel.is_terminated() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.channel.dispatch_timeout(remaining) {
                break;
            }
        }
        tracing::debug!(in_flight = self.in_flight(), "stopped consuming replies after fault");
    }

    /// Snapshot of the session state.
    pub fn state(&self) -> SessionState {
        self.core.borrow().render_loop.state().clone()
    }

    /// Controller-side counters.
    pub fn stats(&self) -> SessionStats {
        self.core.borrow().stats
    }

    /// Requests sent to the producer so far.
    pub fn requests_sent(&self) -> u64 {
        self.core.borrow().render_loop.requests_sent()
    }

    /// Requests sent and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.core.borrow().render_loop.in_flight()
    }

    /// Counters maintained by the producer thread.
    pub fn producer_stats(&self) -> Arc<ProducerStats> {
        self.channel.stats()
    }

    /// The producer channel.
    pub const fn channel(&self) -> &ProducerChannel {
        &self.channel
    }

    /// Configuration the session was built with.
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stop the render loop and close the channel. Idempotent.
    pub fn terminate(&self) {
        if self.core.borrow_mut().render_loop.stop() {
            tracing::info!("session terminated");
        }
        self.channel.terminate();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Ok(mut core) = self.core.try_borrow_mut() {
            core.render_loop.stop();
        }
        self.channel.terminate();
        if let Some(ticker) = self.ticker.take() {
            ticker.join();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channel", &self.channel)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
