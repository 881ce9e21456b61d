//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is how committed workflow outcomes reach fire-and-forget consumers
//! (notifications). It makes minimal assumptions:
//!
//! - **Transport-agnostic**: in-memory channels today, a broker later
//! - **Best-effort**: a failed publish is logged by the caller, never retried
//! - **No persistence**: the store is the source of truth, the bus only fans out

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError};

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics). Meant to be drained by a single thread.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// while let Ok(event) = subscription.recv() {
///     handle(event);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available. Fails once every
    /// publisher is gone and the backlog is drained.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }
}

/// Publish/subscribe abstraction.
///
/// `publish()` must not block on consumers; implementations hand the message
/// off and return.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
