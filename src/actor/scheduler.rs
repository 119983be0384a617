//! Render Loop: issues one bitmap request per display refresh.
//!
//! The loop never waits for replies. Each tick sends `REQUEST_BITMAPS` for
//! the fixed target resolutions, schedules the next refresh callback and
//! only then checks for a recorded fault, so a fault stops the loop after at
//! most one extra request.

use super::channel::ProducerChannel;
use super::messages::ProducerFault;
use super::state::SessionState;
use super::ticker::{FrameClock, FrameRequest};
use crate::bitmap::Resolution;
use crate::protocol::{Envelope, SceneConfig};

/// Sender name stamped on every controller envelope.
pub const CONTROLLER_SOURCE: &str = "Controller";

/// Drives the request side of a session.
#[derive(Debug)]
pub struct RenderLoop {
    channel: ProducerChannel,
    resolutions: Vec<Resolution>,
    clock: FrameClock,
    state: SessionState,
    /// Sequence number of the last request sent; 0 before the first.
    last_sequence: u64,
    in_flight: usize,
    max_in_flight: Option<usize>,
    ticks: u64,
    deferred: u64,
}

impl RenderLoop {
    /// Create a stopped loop requesting `resolutions` over `channel`.
    ///
    /// With `max_in_flight` set, a tick sends nothing while that many
    /// requests are unanswered.
    pub fn new(
        channel: ProducerChannel,
        resolutions: Vec<Resolution>,
        max_in_flight: Option<usize>,
    ) -> Self {
        Self {
            channel,
            resolutions,
            clock: FrameClock::new(),
            state: SessionState::Idle,
            last_sequence: 0,
            in_flight: 0,
            max_in_flight,
            ticks: 0,
            deferred: 0,
        }
    }

    /// Current session state.
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Channel the loop sends on.
    pub const fn channel(&self) -> &ProducerChannel {
        &self.channel
    }

    /// Requests sent and not yet answered.
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Requests sent so far.
    pub const fn requests_sent(&self) -> u64 {
        self.last_sequence
    }

    /// Ticks run so far, including deferred ones.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks that sent nothing because the in-flight cap was reached.
    pub const fn deferred_ticks(&self) -> u64 {
        self.deferred
    }

    /// Refresh callback currently scheduled.
    pub const fn pending_frame(&self) -> Option<FrameRequest> {
        self.clock.pending()
    }

    /// Send `INIT_STATE` and run the first tick.
    ///
    /// Does not wait for any acknowledgment. Returns `false` if the loop was
    /// already started, faulted or stopped.
    pub fn start(&mut self, scene: SceneConfig) -> bool {
        if !self.state.start() {
            tracing::debug!(state = self.state.name(), "render loop already started");
            return false;
        }

        tracing::info!(
            scene = %scene.scene_name,
            canvas = %scene.resolution(),
            targets = self.resolutions.len(),
            "starting render loop"
        );
        self.channel.send(Envelope::init_state(scene, CONTROLLER_SOURCE));
        self.run_tick();
        true
    }

    /// Display refresh. Runs a tick if one was scheduled.
    ///
    /// Returns `true` if a tick ran.
    pub fn on_refresh(&mut self) -> bool {
        if self.clock.fire().is_none() {
            return false;
        }
        if !self.state.accepts_ticks() {
            return false;
        }
        self.run_tick();
        true
    }

    fn run_tick(&mut self) {
        self.ticks += 1;

        if self.max_in_flight.is_some_and(|cap| self.in_flight >= cap) {
            self.deferred += 1;
            tracing::trace!(in_flight = self.in_flight, "in-flight cap reached; deferring request");
        } else {
            self.last_sequence += 1;
            let sequence = self.last_sequence;
            if self.channel.send(Envelope::request_bitmaps(
                sequence,
                self.resolutions.clone(),
                CONTROLLER_SOURCE,
            )) {
                self.in_flight += 1;
            }
            tracing::trace!(sequence, in_flight = self.in_flight, "requested bitmaps");
        }

        let next = self.clock.request_frame();

        if self.state.end_tick() {
            self.clock.cancel_frame(next);
            if let Some(fault) = self.state.fault() {
                tracing::warn!(%fault, ticks = self.ticks, "render loop stopped after producer fault");
            }
        }
    }

    /// Record a producer fault. The first fault wins.
    ///
    /// The channel stays open; replies already in flight are still consumed.
    pub fn record_fault(&mut self, fault: ProducerFault) {
        if self.state.fault_observed(fault.clone()) {
            tracing::error!(%fault, state = self.state.name(), "producer fault recorded");
            if matches!(self.state, SessionState::Faulted(_)) {
                self.clock.cancel_all();
            }
        } else {
            tracing::warn!(%fault, state = self.state.name(), "additional producer fault ignored");
        }
    }

    /// Stop right away after a recorded fault instead of at the next tick.
    ///
    /// Used when no further tick can reach the producer.
    pub fn halt(&mut self) -> bool {
        if self.state.end_tick() {
            self.clock.cancel_all();
            true
        } else {
            false
        }
    }

    /// A reply arrived for one outstanding request.
    pub fn acknowledge(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Cancel the pending refresh callback and mark the loop terminated.
    ///
    /// Returns `false` if it was already terminated.
    pub fn stop(&mut self) -> bool {
        self.clock.cancel_all();
        self.state.terminate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::scene::SceneRegistry;

    fn resolutions() -> Vec<Resolution> {
        vec![Resolution::new(16, 9), Resolution::new(32, 24)]
    }

    fn render_loop(max_in_flight: Option<usize>) -> RenderLoop {
        let channel = ProducerChannel::spawn("scheduler-test", SceneRegistry::default()).unwrap();
        RenderLoop::new(channel, resolutions(), max_in_flight)
    }

    #[test]
    fn test_start_sends_first_request_without_waiting() {
        let mut lp = render_loop(None);
        assert!(lp.start(SceneConfig::new(64, 48, "plasma")));
        assert_eq!(lp.state(), &SessionState::Running);
        assert_eq!(lp.requests_sent(), 1);
        assert!(lp.pending_frame().is_some());

        assert!(!lp.start(SceneConfig::default()));
        assert_eq!(lp.requests_sent(), 1);
        lp.channel().terminate();
    }

    #[test]
    fn test_refresh_without_pending_frame_does_nothing() {
        let mut lp = render_loop(None);
        assert!(!lp.on_refresh());
        assert_eq!(lp.ticks(), 0);
        lp.channel().terminate();
    }

    #[test]
    fn test_fire_and_forget_keeps_requests_in_flight() {
        let mut lp = render_loop(None);
        lp.start(SceneConfig::new(8, 8, "plasma"));
        for _ in 0..4 {
            assert!(lp.on_refresh());
        }
        assert_eq!(lp.requests_sent(), 5);
        assert_eq!(lp.in_flight(), 5);
        assert_eq!(lp.deferred_ticks(), 0);
        lp.channel().terminate();
    }

    #[test]
    fn test_in_flight_cap_defers_ticks() {
        let mut lp = render_loop(Some(2));
        lp.start(SceneConfig::new(8, 8, "plasma"));
        lp.on_refresh();
        lp.on_refresh();
        assert_eq!(lp.requests_sent(), 2);
        assert_eq!(lp.deferred_ticks(), 1);
        // Deferred ticks still schedule the next refresh.
        assert!(lp.pending_frame().is_some());

        lp.acknowledge();
        lp.on_refresh();
        assert_eq!(lp.requests_sent(), 3);
        lp.channel().terminate();
    }

    #[test]
    fn test_fault_stops_after_one_more_tick() {
        let mut lp = render_loop(None);
        lp.start(SceneConfig::new(8, 8, "plasma"));
        lp.record_fault(ProducerFault::new("boom", Some(1)));
        assert!(lp.state().is_faulted());

        assert!(lp.on_refresh());
        assert_eq!(lp.requests_sent(), 2);
        assert!(matches!(lp.state(), SessionState::Faulted(_)));
        assert_eq!(lp.pending_frame(), None);

        assert!(!lp.on_refresh());
        assert_eq!(lp.requests_sent(), 2);
        lp.channel().terminate();
    }

    #[test]
    fn test_halt_skips_the_extra_tick() {
        let mut lp = render_loop(None);
        lp.start(SceneConfig::new(8, 8, "plasma"));
        assert!(!lp.halt());

        lp.record_fault(ProducerFault::new("gone", None));
        assert!(lp.halt());
        assert!(matches!(lp.state(), SessionState::Faulted(_)));
        assert_eq!(lp.pending_frame(), None);
        assert!(!lp.on_refresh());
        assert_eq!(lp.requests_sent(), 1);
        lp.channel().terminate();
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let mut lp = render_loop(None);
        lp.start(SceneConfig::new(8, 8, "plasma"));
        assert!(lp.stop());
        assert!(!lp.stop());
        assert_eq!(lp.pending_frame(), None);
        assert!(!lp.on_refresh());
        lp.channel().terminate();
    }

    #[test]
    fn test_acknowledge_never_underflows() {
        let mut lp = render_loop(None);
        lp.acknowledge();
        assert_eq!(lp.in_flight(), 0);
        lp.channel().terminate();
    }
}
