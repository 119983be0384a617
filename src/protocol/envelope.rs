//! Message envelope: the only value that crosses the thread boundary.
//!
//! Every envelope carries one [`Message`] and the human-readable name of its
//! sender. Fields are private so an envelope cannot be altered after it is
//! built; the payload can only be taken out by consuming the envelope.

use crate::bitmap::{Bitmap, Resolution};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Which side of the boundary an action travels towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Controller to producer.
    ToProducer,
    /// Producer to controller.
    ToController,
}

/// Recognized message actions and their stable wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// `INIT_STATE`: hand the scene configuration to the producer.
    InitState,
    /// `REQUEST_BITMAPS`: ask for one bitmap per listed resolution.
    RequestBitmaps,
    /// `BITMAPS_READY`: bitmaps answering a request, in request order.
    BitmapsReady,
    /// `NOTIFY`: informational text, logged only.
    Notify,
    /// `TERMINATE`: the producer asks to be shut down.
    Terminate,
}

impl Action {
    /// All recognized actions.
    pub const ALL: [Self; 5] = [
        Self::InitState,
        Self::RequestBitmaps,
        Self::BitmapsReady,
        Self::Notify,
        Self::Terminate,
    ];

    /// Wire name of the action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitState => "INIT_STATE",
            Self::RequestBitmaps => "REQUEST_BITMAPS",
            Self::BitmapsReady => "BITMAPS_READY",
            Self::Notify => "NOTIFY",
            Self::Terminate => "TERMINATE",
        }
    }

    /// Direction the action is sent in.
    pub const fn direction(self) -> Direction {
        match self {
            Self::InitState | Self::RequestBitmaps => Direction::ToProducer,
            Self::BitmapsReady | Self::Notify | Self::Terminate => Direction::ToController,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an action name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Scene configuration sent with `INIT_STATE`.
///
/// `width` and `height` size the producer's master canvas; every requested
/// bitmap is resampled from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneConfig {
    /// Master canvas width.
    pub width: u32,
    /// Master canvas height.
    pub height: u32,
    /// Scene to instantiate on the producer.
    pub scene_name: String,
    /// Number of frames after which the producer asks to be terminated.
    pub frame_limit: Option<u64>,
}

impl SceneConfig {
    /// Create a configuration for the named scene with no frame limit.
    pub fn new(width: u32, height: u32, scene_name: impl Into<String>) -> Self {
        Self {
            width,
            height,
            scene_name: scene_name.into(),
            frame_limit: None,
        }
    }

    /// Set the frame limit.
    #[must_use]
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Master canvas resolution.
    pub const fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new(1024, 768, "plasma")
    }
}

/// Payload of `REQUEST_BITMAPS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapRequest {
    /// Monotonically increasing request number, echoed in the response.
    pub sequence: u64,
    /// Resolutions to produce, in target order.
    pub resolutions: Vec<Resolution>,
}

/// Payload of `BITMAPS_READY`.
#[derive(Debug)]
pub struct BitmapBatch {
    /// Sequence number of the request being answered.
    pub sequence: u64,
    /// One bitmap per requested resolution, in request order.
    pub bitmaps: Vec<Bitmap>,
}

/// Payload of `NOTIFY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Informational text.
    pub text: String,
}

/// Action-specific payloads.
#[derive(Debug)]
pub enum Message {
    /// `INIT_STATE`
    InitState(SceneConfig),
    /// `REQUEST_BITMAPS`
    RequestBitmaps(BitmapRequest),
    /// `BITMAPS_READY`
    BitmapsReady(BitmapBatch),
    /// `NOTIFY`
    Notify(Notice),
    /// `TERMINATE`
    Terminate,
    /// An action name neither side recognizes.
    Unrecognized {
        /// The raw action name.
        action: String,
    },
}

impl Message {
    /// Recognized action, or `None` for [`Message::Unrecognized`].
    pub const fn action(&self) -> Option<Action> {
        match self {
            Self::InitState(_) => Some(Action::InitState),
            Self::RequestBitmaps(_) => Some(Action::RequestBitmaps),
            Self::BitmapsReady(_) => Some(Action::BitmapsReady),
            Self::Notify(_) => Some(Action::Notify),
            Self::Terminate => Some(Action::Terminate),
            Self::Unrecognized { .. } => None,
        }
    }

    /// Wire name of the action, including unrecognized ones.
    pub fn action_name(&self) -> &str {
        match self {
            Self::Unrecognized { action } => action,
            other => other.action().map_or("", Action::as_str),
        }
    }

    /// Build a payload-less message from a wire name.
    ///
    /// Only `TERMINATE` carries no payload; any other name that is not
    /// recognized becomes [`Message::Unrecognized`].
    pub fn from_bare_action(name: &str) -> Self {
        match name.parse::<Action>() {
            Ok(Action::Terminate) => Self::Terminate,
            _ => Self::Unrecognized {
                action: name.to_string(),
            },
        }
    }
}

/// A single cross-boundary message.
#[derive(Debug)]
pub struct Envelope {
    message: Message,
    source: Cow<'static, str>,
}

impl Envelope {
    /// Wrap a message with its sender name.
    pub fn new(message: Message, source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message,
            source: source.into(),
        }
    }

    /// `INIT_STATE` envelope.
    pub fn init_state(config: SceneConfig, source: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Message::InitState(config), source)
    }

    /// `REQUEST_BITMAPS` envelope.
    pub fn request_bitmaps(
        sequence: u64,
        resolutions: Vec<Resolution>,
        source: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(
            Message::RequestBitmaps(BitmapRequest {
                sequence,
                resolutions,
            }),
            source,
        )
    }

    /// `BITMAPS_READY` envelope.
    pub fn bitmaps_ready(
        sequence: u64,
        bitmaps: Vec<Bitmap>,
        source: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(Message::BitmapsReady(BitmapBatch { sequence, bitmaps }), source)
    }

    /// `NOTIFY` envelope.
    pub fn notify(text: impl Into<String>, source: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Message::Notify(Notice { text: text.into() }), source)
    }

    /// `TERMINATE` envelope.
    pub fn terminate(source: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Message::Terminate, source)
    }

    /// Recognized action, or `None` if the action is unknown.
    pub const fn action(&self) -> Option<Action> {
        self.message.action()
    }

    /// Wire name of the action.
    pub fn action_name(&self) -> &str {
        self.message.action_name()
    }

    /// Sender name. Used for logging only.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Borrow the message.
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Take the message out of the envelope.
    pub fn into_message(self) -> Message {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
            assert_eq!(action.to_string(), action.as_str());
        }
        assert_eq!(
            "UNKNOWN_ACTION".parse::<Action>(),
            Err(UnknownAction("UNKNOWN_ACTION".to_string()))
        );
    }

    #[test]
    fn test_action_direction() {
        assert_eq!(Action::InitState.direction(), Direction::ToProducer);
        assert_eq!(Action::RequestBitmaps.direction(), Direction::ToProducer);
        assert_eq!(Action::BitmapsReady.direction(), Direction::ToController);
        assert_eq!(Action::Notify.direction(), Direction::ToController);
        assert_eq!(Action::Terminate.direction(), Direction::ToController);
    }

    #[test]
    fn test_request_envelope() {
        let resolutions = vec![Resolution::new(160, 90), Resolution::new(640, 480)];
        let envelope = Envelope::request_bitmaps(4, resolutions.clone(), "Controller");
        assert_eq!(envelope.action(), Some(Action::RequestBitmaps));
        assert_eq!(envelope.action_name(), "REQUEST_BITMAPS");
        assert_eq!(envelope.source(), "Controller");

        match envelope.into_message() {
            Message::RequestBitmaps(request) => {
                assert_eq!(request.sequence, 4);
                assert_eq!(request.resolutions, resolutions);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_bare_actions() {
        assert!(matches!(Message::from_bare_action("TERMINATE"), Message::Terminate));

        let unknown = Message::from_bare_action("UNKNOWN_ACTION");
        assert_eq!(unknown.action(), None);
        assert_eq!(unknown.action_name(), "UNKNOWN_ACTION");

        // Actions with payloads cannot be built bare.
        let bare_notify = Message::from_bare_action("NOTIFY");
        assert_eq!(bare_notify.action(), None);
    }

    #[test]
    fn test_owned_source() {
        let name = format!("producer #{}", 1);
        let envelope = Envelope::notify("ready", name);
        assert_eq!(envelope.source(), "producer #1");
        assert_eq!(envelope.action(), Some(Action::Notify));
    }

    #[test]
    fn test_scene_config_defaults() {
        let config = SceneConfig::default();
        assert_eq!(config.resolution(), Resolution::new(1024, 768));
        assert_eq!(config.frame_limit, None);
        assert_eq!(config.with_frame_limit(10).frame_limit, Some(10));
    }
}
