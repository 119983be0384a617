//! Event types crossing from the producer thread to the controller.
//!
//! Envelopes and faults share one FIFO queue, so a fault is observed in the
//! order it happened relative to the replies around it, but they are
//! routed to different handlers on the controller side.

use crate::protocol::Envelope;
use std::fmt;

/// An uncaught failure raised while the producer handled a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerFault {
    /// Human-readable description of the failure.
    pub message: String,
    /// Sequence of the request being served, if the fault belongs to one.
    pub sequence: Option<u64>,
}

impl ProducerFault {
    /// Create a fault for the given request.
    pub fn new(message: impl Into<String>, sequence: Option<u64>) -> Self {
        Self {
            message: message.into(),
            sequence,
        }
    }
}

impl fmt::Display for ProducerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(sequence) => write!(f, "{} (request #{sequence})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProducerFault {}

/// Events from the producer thread.
#[derive(Debug)]
pub enum ProducerEvent {
    /// A regular message envelope.
    Message(Envelope),
    /// An uncaught producer-side error.
    Fault(ProducerFault),
}
