//! Producer Channel: the controller-side handle to the producer thread.
//!
//! Sending never blocks. Inbound events are queued and handed to the
//! registered handlers only when the controller pumps the queue with
//! [`ProducerChannel::dispatch_pending`] or
//! [`ProducerChannel::dispatch_timeout`], so handlers always run on the
//! controller's own thread.
//!
//! The handle is cheap to clone; every clone refers to the same channel.
//! Handlers may capture a clone (for example to call
//! [`terminate`](ProducerChannel::terminate) from inside a handler).
//! Terminating clears both handlers, which breaks any such cycle.

use super::messages::{ProducerEvent, ProducerFault};
use super::producer::{BitmapGenerator, ProducerActor, ProducerStats};
use super::scene::SceneRegistry;
use crate::protocol::Envelope;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

type MessageHandler = Box<dyn FnMut(Envelope)>;
type ErrorHandler = Box<dyn FnMut(ProducerFault)>;

struct ChannelInner {
    name: String,
    /// Outbound queue; `None` once terminated.
    outbound: RefCell<Option<Sender<Envelope>>>,
    inbound: Receiver<ProducerEvent>,
    closed: Arc<AtomicBool>,
    on_message: RefCell<Option<MessageHandler>>,
    on_error: RefCell<Option<ErrorHandler>>,
    stats: Arc<ProducerStats>,
    actor: RefCell<Option<ProducerActor>>,
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.outbound.get_mut().take();
        if let Some(actor) = self.actor.get_mut().take() {
            actor.join();
        }
    }
}

/// Handle to the producer thread.
#[derive(Clone)]
pub struct ProducerChannel {
    inner: Rc<ChannelInner>,
}

impl ProducerChannel {
    /// Spawn a producer thread named `name` serving scenes from `registry`.
    pub fn spawn(name: impl Into<String>, registry: SceneRegistry) -> io::Result<Self> {
        let name = name.into();
        let (outbound, producer_inbound) = unbounded::<Envelope>();
        let (producer_outbound, inbound) = unbounded::<ProducerEvent>();
        let closed = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ProducerStats::default());

        let actor = ProducerActor::spawn(
            &name,
            BitmapGenerator::new(registry),
            producer_inbound,
            producer_outbound,
            Arc::clone(&closed),
            Arc::clone(&stats),
        )?;
        tracing::debug!(producer = %name, "producer thread started");

        Ok(Self {
            inner: Rc::new(ChannelInner {
                name,
                outbound: RefCell::new(Some(outbound)),
                inbound,
                closed,
                on_message: RefCell::new(None),
                on_error: RefCell::new(None),
                stats,
                actor: RefCell::new(Some(actor)),
            }),
        })
    }

    /// Name of the producer thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Counters maintained by the producer thread.
    ///
    /// Remains readable after termination.
    pub fn stats(&self) -> Arc<ProducerStats> {
        Arc::clone(&self.inner.stats)
    }

    /// Check whether [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Queue `envelope` for the producer without blocking.
    ///
    /// Returns `false` if the envelope was dropped because the channel is
    /// terminated or the producer thread has exited.
    pub fn send(&self, envelope: Envelope) -> bool {
        let outbound = self.inner.outbound.borrow();
        let Some(sender) = outbound.as_ref() else {
            tracing::trace!(
                action = envelope.action_name(),
                "channel terminated; dropping envelope"
            );
            return false;
        };

        tracing::trace!(
            source = envelope.source(),
            action = envelope.action_name(),
            "controller -> producer"
        );
        if sender.send(envelope).is_err() {
            tracing::warn!(producer = %self.inner.name, "producer thread has exited; envelope dropped");
            return false;
        }
        true
    }

    /// Register the handler for inbound envelopes, replacing any previous one.
    pub fn on_message(&self, handler: impl FnMut(Envelope) + 'static) {
        if self.is_terminated() {
            return;
        }
        *self.inner.on_message.borrow_mut() = Some(Box::new(handler));
    }

    /// Register the handler for producer faults, replacing any previous one.
    pub fn on_error(&self, handler: impl FnMut(ProducerFault) + 'static) {
        if self.is_terminated() {
            return;
        }
        *self.inner.on_error.borrow_mut() = Some(Box::new(handler));
    }

    /// Sever the channel. Idempotent.
    ///
    /// Later sends are dropped, queued inbound events are discarded and both
    /// handlers are cleared. Work already running on the producer thread is
    /// not interrupted, but its result is never delivered.
    pub fn terminate(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.outbound.borrow_mut().take();

        let mut discarded = 0usize;
        while self.inner.inbound.try_recv().is_ok() {
            discarded += 1;
        }
        self.inner.on_message.borrow_mut().take();
        self.inner.on_error.borrow_mut().take();

        tracing::info!(producer = %self.inner.name, discarded, "producer channel terminated");
    }

    /// Deliver every event already queued. Returns the number delivered.
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        while !self.is_terminated() {
            match self.inner.inbound.try_recv() {
                Ok(event) => {
                    self.deliver(event);
                    delivered += 1;
                }
                Err(_) => break,
            }
        }
        delivered
    }

    /// Wait up to `timeout` for one event and deliver it.
    ///
    /// Returns `true` if an event was delivered.
    pub fn dispatch_timeout(&self, timeout: Duration) -> bool {
        if self.is_terminated() {
            return false;
        }
        match self.inner.inbound.recv_timeout(timeout) {
            Ok(event) => {
                self.deliver(event);
                true
            }
            Err(_) => false,
        }
    }

    /// Inbound queue, for event loops that `select!` over several sources.
    pub(crate) fn inbound(&self) -> &Receiver<ProducerEvent> {
        &self.inner.inbound
    }

    /// Route one event to its handler.
    pub(crate) fn deliver(&self, event: ProducerEvent) {
        if self.is_terminated() {
            tracing::trace!("channel terminated; dropping inbound event");
            return;
        }

        match event {
            ProducerEvent::Message(envelope) => {
                // Taken out of the slot while running so the handler may
                // re-register or terminate without a conflicting borrow.
                let handler = self.inner.on_message.borrow_mut().take();
                let Some(mut handler) = handler else {
                    tracing::debug!(
                        action = envelope.action_name(),
                        "no message handler registered; dropping envelope"
                    );
                    return;
                };
                handler(envelope);
                if !self.is_terminated() {
                    let mut slot = self.inner.on_message.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(handler);
                    }
                }
            }
            ProducerEvent::Fault(fault) => {
                let handler = self.inner.on_error.borrow_mut().take();
                let Some(mut handler) = handler else {
                    tracing::error!(%fault, "unhandled producer fault");
                    return;
                };
                handler(fault);
                if !self.is_terminated() {
                    let mut slot = self.inner.on_error.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(handler);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ProducerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerChannel")
            .field("name", &self.inner.name)
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}
