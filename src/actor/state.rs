//! Session state: a single tagged variant instead of independent flags.
//!
//! ```text
//!            start            fault             tick end
//!   Idle ──────────▶ Running ──────▶ FaultPending ──────▶ Faulted
//!    │                  │                 │                  │
//!    │ fault            └────────┬────────┴──────────────────┘
//!    ▼                           │ terminate
//!  Faulted                       ▼
//!                           Terminated
//! ```
//!
//! `FaultPending` records a fault that the render loop has not yet observed;
//! the loop finishes its current tick before moving to `Faulted`.

use super::messages::ProducerFault;

/// Lifecycle of a session, owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created; `INIT_STATE` not sent yet.
    #[default]
    Idle,
    /// `INIT_STATE` sent; requesting bitmaps every refresh.
    Running,
    /// A fault arrived; the loop stops at the end of its next tick.
    FaultPending(ProducerFault),
    /// Stopped after a fault. No further requests are issued.
    Faulted(ProducerFault),
    /// Channel closed for good.
    Terminated,
}

impl SessionState {
    /// `INIT_STATE` has been sent.
    pub const fn is_initialized(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// A producer fault has been recorded.
    pub const fn is_faulted(&self) -> bool {
        matches!(self, Self::FaultPending(_) | Self::Faulted(_))
    }

    /// The session has been terminated.
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Refresh callbacks still run (including the one extra tick after a fault).
    pub const fn accepts_ticks(&self) -> bool {
        matches!(self, Self::Running | Self::FaultPending(_))
    }

    /// The fault that stopped or is stopping the session.
    pub const fn fault(&self) -> Option<&ProducerFault> {
        match self {
            Self::FaultPending(fault) | Self::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::FaultPending(_) => "fault-pending",
            Self::Faulted(_) => "faulted",
            Self::Terminated => "terminated",
        }
    }

    /// `Idle → Running`.
    pub fn start(&mut self) -> bool {
        if matches!(self, Self::Idle) {
            *self = Self::Running;
            true
        } else {
            false
        }
    }

    /// Record a fault. Only the first fault is kept.
    ///
    /// `Running → FaultPending`, `Idle → Faulted`.
    pub fn fault_observed(&mut self, fault: ProducerFault) -> bool {
        match self {
            Self::Running => {
                *self = Self::FaultPending(fault);
                true
            }
            Self::Idle => {
                *self = Self::Faulted(fault);
                true
            }
            _ => false,
        }
    }

    /// `FaultPending → Faulted`, applied at the end of a tick.
    pub fn end_tick(&mut self) -> bool {
        if let Self::FaultPending(fault) = self {
            *self = Self::Faulted(fault.clone());
            true
        } else {
            false
        }
    }

    /// Any state `→ Terminated`. Returns `false` if already terminated.
    pub fn terminate(&mut self) -> bool {
        if self.is_terminated() {
            false
        } else {
            *self = Self::Terminated;
            true
        }
    }
}
