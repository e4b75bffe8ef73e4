//! Event publishing/subscription abstraction (mechanics only).
//!
//! Transfer state changes are announced here after they are committed to the
//! record store. The bus is for distribution, not storage: the store remains
//! the source of truth and consumers must tolerate duplicates.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared queue a bus delivers into and a [`Subscription`] drains.
pub type Inbox<M> = Arc<Mutex<VecDeque<M>>>;

/// A subscriber's view of an event stream. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<M> {
    inbox: Inbox<M>,
}

impl<M> Subscription<M> {
    pub fn new(inbox: Inbox<M>) -> Self {
        Self { inbox }
    }

    /// Take everything delivered so far, oldest first.
    pub fn drain(&self) -> Vec<M> {
        let mut queue = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        Vec::from(std::mem::take(&mut *queue))
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// Delivery is at-least-once and unordered across publishers. `publish()` may
/// fail; callers decide whether that is fatal.
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
