//! Producer Actor: Dedicated thread that synthesizes bitmaps on request.
//!
//! The actor owns a [`BitmapGenerator`] and serves envelopes strictly in
//! arrival order. Nothing on this thread is visible to the controller except
//! the events it sends back.

use super::messages::{ProducerEvent, ProducerFault};
use super::scene::{Scene, SceneRegistry};
use crate::bitmap::Bitmap;
use crate::error::SceneError;
use crate::protocol::{BitmapRequest, Envelope, Message, SceneConfig};
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Sender name stamped on every producer envelope.
pub const PRODUCER_SOURCE: &str = "Producer (bitmap generator)";

/// Counters updated by the producer thread.
#[derive(Debug, Default)]
pub struct ProducerStats {
    requests_observed: AtomicU64,
    frames_produced: AtomicU64,
    faults_raised: AtomicU64,
}

impl ProducerStats {
    /// `REQUEST_BITMAPS` envelopes the producer has received.
    pub fn requests_observed(&self) -> u64 {
        self.requests_observed.load(Ordering::Acquire)
    }

    /// Frames synthesized successfully.
    pub fn frames_produced(&self) -> u64 {
        self.frames_produced.load(Ordering::Acquire)
    }

    /// Faults raised while handling envelopes.
    pub fn faults_raised(&self) -> u64 {
        self.faults_raised.load(Ordering::Acquire)
    }
}

/// Scene state received with `INIT_STATE`.
struct SceneState {
    config: SceneConfig,
    scene: Box<dyn Scene>,
    canvas: Bitmap,
}

/// Producer-side logic turning requests into bitmaps.
///
/// Owns the scene and its master canvas. Each request renders the scene once
/// and resamples the canvas to every requested resolution, so all bitmaps of
/// a batch show the same frame.
pub struct BitmapGenerator {
    registry: SceneRegistry,
    state: Option<SceneState>,
    frames: u64,
    terminate_sent: bool,
}

impl BitmapGenerator {
    /// Create a generator drawing scenes from `registry`.
    pub fn new(registry: SceneRegistry) -> Self {
        Self {
            registry,
            state: None,
            frames: 0,
            terminate_sent: false,
        }
    }

    /// Frames synthesized since the last `INIT_STATE`.
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Name of the active scene, if initialized.
    pub fn scene_name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.scene.name())
    }

    /// Handle one inbound envelope, returning the event to send back.
    ///
    /// Synthesis failures, including panics inside scene code, are returned
    /// as [`ProducerEvent::Fault`] and never as a reply.
    pub fn handle(&mut self, envelope: Envelope) -> Option<ProducerEvent> {
        tracing::trace!(
            source = envelope.source(),
            action = envelope.action_name(),
            "producer <- controller"
        );

        match envelope.into_message() {
            Message::InitState(config) => Some(self.init(config)),
            Message::RequestBitmaps(request) => self.serve(&request),
            other => {
                tracing::warn!(
                    action = other.action_name(),
                    "producer received a message it does not handle"
                );
                None
            }
        }
    }

    fn init(&mut self, config: SceneConfig) -> ProducerEvent {
        if config.resolution().is_empty() {
            return ProducerEvent::Fault(ProducerFault::new(
                format!("scene canvas {} is empty", config.resolution()),
                None,
            ));
        }

        let (scene, note) = match self.registry.create(&config.scene_name) {
            Some(scene) => (scene, None),
            None => match self.registry.create(self.registry.fallback()) {
                Some(scene) => {
                    let note = format!(
                        "unknown scene `{}`, using `{}`",
                        config.scene_name,
                        scene.name()
                    );
                    (scene, Some(note))
                }
                None => {
                    return ProducerEvent::Fault(ProducerFault::new(
                        format!("no scene registered as `{}`", config.scene_name),
                        None,
                    ));
                }
            },
        };

        let text = match note {
            Some(note) => format!("{note}; canvas {}", config.resolution()),
            None => format!("scene `{}` ready; canvas {}", scene.name(), config.resolution()),
        };
        tracing::debug!(scene = scene.name(), canvas = %config.resolution(), "producer initialized");

        self.state = Some(SceneState {
            canvas: Bitmap::new(config.resolution()),
            config,
            scene,
        });
        self.frames = 0;
        self.terminate_sent = false;

        ProducerEvent::Message(Envelope::notify(text, PRODUCER_SOURCE))
    }

    fn serve(&mut self, request: &BitmapRequest) -> Option<ProducerEvent> {
        let limit = self.state.as_ref().and_then(|s| s.config.frame_limit);
        if limit.is_some_and(|limit| self.frames >= limit) {
            if self.terminate_sent {
                tracing::debug!(sequence = request.sequence, "frame limit reached; ignoring request");
                return None;
            }
            self.terminate_sent = true;
            tracing::info!(frames = self.frames, "frame limit reached; asking to be terminated");
            return Some(ProducerEvent::Message(Envelope::terminate(PRODUCER_SOURCE)));
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.generate(request)));
        let event = match outcome {
            Ok(Ok(bitmaps)) => ProducerEvent::Message(Envelope::bitmaps_ready(
                request.sequence,
                bitmaps,
                PRODUCER_SOURCE,
            )),
            Ok(Err(e)) => ProducerEvent::Fault(ProducerFault::new(e.to_string(), Some(request.sequence))),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                ProducerEvent::Fault(ProducerFault::new(
                    format!("bitmap synthesis panicked: {reason}"),
                    Some(request.sequence),
                ))
            }
        };
        Some(event)
    }

    /// Render the current frame and resample it once per requested resolution.
    fn generate(&mut self, request: &BitmapRequest) -> Result<Vec<Bitmap>, SceneError> {
        let state = self.state.as_mut().ok_or(SceneError::NotInitialized)?;
        if let Some(empty) = request.resolutions.iter().find(|r| r.is_empty()) {
            return Err(SceneError::EmptyResolution(*empty));
        }

        state.scene.render(self.frames, &mut state.canvas)?;
        let bitmaps = request
            .resolutions
            .iter()
            .map(|resolution| state.canvas.resample(*resolution))
            .collect();
        self.frames += 1;
        Ok(bitmaps)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Producer actor that owns the generator thread.
pub struct ProducerActor {
    /// Handle to the producer thread.
    handle: Option<JoinHandle<()>>,
}

impl ProducerActor {
    /// Spawn the producer thread.
    ///
    /// # Arguments
    ///
    /// * `name` - Thread name.
    /// * `generator` - Producer logic, moved onto the new thread.
    /// * `inbound` - Envelopes from the controller. The thread exits once
    ///   every sender is dropped.
    /// * `outbound` - Events back to the controller.
    /// * `closed` - Raised by the controller on termination; nothing is sent
    ///   after it is observed.
    /// * `stats` - Shared counters.
    pub fn spawn(
        name: &str,
        generator: BitmapGenerator,
        inbound: Receiver<Envelope>,
        outbound: Sender<ProducerEvent>,
        closed: Arc<AtomicBool>,
        stats: Arc<ProducerStats>,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                Self::run_loop(generator, &inbound, &outbound, &closed, &stats);
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the producer thread to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main producer loop.
    fn run_loop(
        mut generator: BitmapGenerator,
        inbound: &Receiver<Envelope>,
        outbound: &Sender<ProducerEvent>,
        closed: &AtomicBool,
        stats: &ProducerStats,
    ) {
        for envelope in inbound {
            if closed.load(Ordering::Acquire) {
                break;
            }
            let sequence = match envelope.message() {
                Message::RequestBitmaps(request) => {
                    stats.requests_observed.fetch_add(1, Ordering::AcqRel);
                    Some(request.sequence)
                }
                _ => None,
            };
            let action = envelope.action_name().to_string();

            // Scene factories and canvas allocation run outside `serve`.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| generator.handle(envelope)));
            let event = match outcome {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(payload) => ProducerEvent::Fault(ProducerFault::new(
                    format!("producer panicked handling {action}: {}", panic_message(payload.as_ref())),
                    sequence,
                )),
            };
            match &event {
                ProducerEvent::Message(reply) if matches!(reply.message(), Message::BitmapsReady(_)) => {
                    stats.frames_produced.fetch_add(1, Ordering::AcqRel);
                }
                ProducerEvent::Fault(fault) => {
                    stats.faults_raised.fetch_add(1, Ordering::AcqRel);
                    tracing::error!(%fault, "producer fault");
                }
                ProducerEvent::Message(_) => {}
            }

            // Work finished after termination is discarded, not delivered.
            if closed.load(Ordering::Acquire) || outbound.send(event).is_err() {
                break;
            }
        }
        tracing::debug!(frames = generator.frames(), "producer thread exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Resolution;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn init(generator: &mut BitmapGenerator, config: SceneConfig) -> ProducerEvent {
        generator
            .handle(Envelope::init_state(config, "test"))
            .expect("init always replies")
    }

    fn resolutions() -> Vec<Resolution> {
        vec![
            Resolution::new(160, 90),
            Resolution::new(640, 480),
            Resolution::new(1024, 768),
        ]
    }

    struct Exploding;

    impl Scene for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn render(&mut self, _: u64, _: &mut Bitmap) -> Result<(), SceneError> {
            panic!("kaboom");
        }
    }

    #[test]
    fn test_one_bitmap_per_resolution_in_order() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        init(&mut generator, SceneConfig::default());

        let event = generator
            .handle(Envelope::request_bitmaps(7, resolutions(), "test"))
            .unwrap();
        let ProducerEvent::Message(envelope) = event else {
            panic!("expected a reply");
        };
        assert_eq!(envelope.source(), PRODUCER_SOURCE);
        let Message::BitmapsReady(batch) = envelope.into_message() else {
            panic!("expected BITMAPS_READY");
        };
        assert_eq!(batch.sequence, 7);
        let produced: Vec<_> = batch.bitmaps.iter().map(Bitmap::resolution).collect();
        assert_eq!(produced, resolutions());
        assert_eq!(generator.frames(), 1);
    }

    #[test]
    fn test_init_acknowledges_with_notify() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        let event = init(&mut generator, SceneConfig::new(64, 48, "checkerboard"));
        let ProducerEvent::Message(envelope) = event else {
            panic!("expected NOTIFY");
        };
        let Message::Notify(notice) = envelope.into_message() else {
            panic!("expected NOTIFY");
        };
        assert!(notice.text.contains("checkerboard"));
        assert_eq!(generator.scene_name(), Some("checkerboard"));
    }

    #[test]
    fn test_unknown_scene_falls_back() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        let event = init(&mut generator, SceneConfig::new(64, 48, "My Test Scene"));
        let ProducerEvent::Message(envelope) = event else {
            panic!("expected NOTIFY");
        };
        let Message::Notify(notice) = envelope.into_message() else {
            panic!("expected NOTIFY");
        };
        assert!(notice.text.contains("unknown scene `My Test Scene`"));
        assert_eq!(generator.scene_name(), Some("plasma"));
    }

    #[test]
    fn test_request_before_init_is_a_fault() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        let event = generator
            .handle(Envelope::request_bitmaps(1, resolutions(), "test"))
            .unwrap();
        match event {
            ProducerEvent::Fault(fault) => {
                assert_eq!(fault.sequence, Some(1));
                assert!(fault.message.contains("no scene initialized"));
            }
            ProducerEvent::Message(envelope) => panic!("unexpected reply {envelope:?}"),
        }
    }

    #[test]
    fn test_empty_resolution_is_a_fault() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        init(&mut generator, SceneConfig::new(32, 32, "plasma"));
        let event = generator
            .handle(Envelope::request_bitmaps(
                2,
                vec![Resolution::new(8, 8), Resolution::new(0, 8)],
                "test",
            ))
            .unwrap();
        assert!(matches!(event, ProducerEvent::Fault(ProducerFault { sequence: Some(2), .. })));
        assert_eq!(generator.frames(), 0);
    }

    #[test]
    fn test_panicking_scene_becomes_fault_and_generator_survives() {
        let registry = SceneRegistry::default().with("exploding", || Box::new(Exploding));
        let mut generator = BitmapGenerator::new(registry);
        init(&mut generator, SceneConfig::new(16, 16, "exploding"));

        let event = generator
            .handle(Envelope::request_bitmaps(1, resolutions(), "test"))
            .unwrap();
        match event {
            ProducerEvent::Fault(fault) => assert!(fault.message.contains("kaboom")),
            ProducerEvent::Message(envelope) => panic!("unexpected reply {envelope:?}"),
        }

        // Re-initializing with a healthy scene works on the same generator.
        init(&mut generator, SceneConfig::new(16, 16, "plasma"));
        let event = generator
            .handle(Envelope::request_bitmaps(2, resolutions(), "test"))
            .unwrap();
        assert!(matches!(event, ProducerEvent::Message(_)));
    }

    #[test]
    fn test_frame_limit_sends_single_terminate() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        init(&mut generator, SceneConfig::new(16, 16, "plasma").with_frame_limit(1));

        let first = generator.handle(Envelope::request_bitmaps(1, resolutions(), "test"));
        assert!(matches!(first, Some(ProducerEvent::Message(_))));

        let second = generator.handle(Envelope::request_bitmaps(2, resolutions(), "test"));
        match second {
            Some(ProducerEvent::Message(envelope)) => {
                assert!(matches!(envelope.message(), Message::Terminate));
            }
            other => panic!("expected TERMINATE, got {other:?}"),
        }

        assert!(generator
            .handle(Envelope::request_bitmaps(3, resolutions(), "test"))
            .is_none());
    }

    #[test]
    fn test_unhandled_actions_are_ignored() {
        let mut generator = BitmapGenerator::new(SceneRegistry::default());
        let unknown = Envelope::new(
            Message::Unrecognized {
                action: "UNKNOWN_ACTION".to_string(),
            },
            "test",
        );
        assert!(generator.handle(unknown).is_none());
        assert!(generator.handle(Envelope::terminate("test")).is_none());
    }

    #[test]
    fn test_actor_serves_until_inbound_closes() {
        let (to_producer, inbound) = unbounded();
        let (outbound, from_producer) = unbounded();
        let closed = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ProducerStats::default());

        let actor = ProducerActor::spawn(
            "test-producer",
            BitmapGenerator::new(SceneRegistry::default()),
            inbound,
            outbound,
            closed,
            stats.clone(),
        )
        .unwrap();

        to_producer
            .send(Envelope::init_state(SceneConfig::new(32, 24, "plasma"), "test"))
            .unwrap();
        to_producer
            .send(Envelope::request_bitmaps(1, resolutions(), "test"))
            .unwrap();

        let timeout = Duration::from_secs(5);
        assert!(matches!(
            from_producer.recv_timeout(timeout),
            Ok(ProducerEvent::Message(_))
        ));
        assert!(matches!(
            from_producer.recv_timeout(timeout),
            Ok(ProducerEvent::Message(_))
        ));

        drop(to_producer);
        actor.join();
        assert_eq!(stats.requests_observed(), 1);
        assert_eq!(stats.frames_produced(), 1);
        assert_eq!(stats.faults_raised(), 0);
    }

    #[test]
    fn test_actor_survives_panicking_scene_factory() {
        let (to_producer, inbound) = unbounded();
        let (outbound, from_producer) = unbounded();
        let stats = Arc::new(ProducerStats::default());
        let registry = SceneRegistry::default().with("bad", || -> Box<dyn Scene> {
            panic!("factory exploded")
        });

        let actor = ProducerActor::spawn(
            "test-producer",
            BitmapGenerator::new(registry),
            inbound,
            outbound,
            Arc::new(AtomicBool::new(false)),
            stats.clone(),
        )
        .unwrap();

        to_producer
            .send(Envelope::init_state(SceneConfig::new(16, 16, "bad"), "test"))
            .unwrap();
        let timeout = Duration::from_secs(5);
        match from_producer.recv_timeout(timeout) {
            Ok(ProducerEvent::Fault(fault)) => {
                assert!(fault.message.contains("factory exploded"));
                assert!(fault.message.contains("INIT_STATE"));
                assert_eq!(fault.sequence, None);
            }
            other => panic!("expected a fault, got {other:?}"),
        }

        // The thread is still serving.
        to_producer
            .send(Envelope::init_state(SceneConfig::new(16, 16, "plasma"), "test"))
            .unwrap();
        to_producer
            .send(Envelope::request_bitmaps(1, resolutions(), "test"))
            .unwrap();
        assert!(matches!(
            from_producer.recv_timeout(timeout),
            Ok(ProducerEvent::Message(_))
        ));
        assert!(matches!(
            from_producer.recv_timeout(timeout),
            Ok(ProducerEvent::Message(_))
        ));

        drop(to_producer);
        actor.join();
        assert_eq!(stats.faults_raised(), 1);
    }
}
