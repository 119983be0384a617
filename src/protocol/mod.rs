//! Protocol: the wire contract between controller and producer.
//!
//! | Direction | Action | Payload |
//! |---|---|---|
//! | controller → producer | `INIT_STATE` | [`SceneConfig`] |
//! | controller → producer | `REQUEST_BITMAPS` | [`BitmapRequest`] |
//! | producer → controller | `BITMAPS_READY` | [`BitmapBatch`] |
//! | producer → controller | `NOTIFY` | [`Notice`] |
//! | producer → controller | `TERMINATE` | none |

mod envelope;

pub use envelope::{
    Action, BitmapBatch, BitmapRequest, Direction, Envelope, Message, Notice, SceneConfig,
    UnknownAction,
};
