//! In-memory event bus for tests, dev and the operational CLI.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    #[error("subscriber registry lock poisoned")]
    Poisoned,
}

/// Fan-out bus that copies each message into every live subscriber's inbox.
///
/// The bus only holds weak references, so a dropped `Subscription` stops
/// receiving immediately and is forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    inboxes: Mutex<Vec<Weak<Mutex<VecDeque<M>>>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions still registered after the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            inboxes: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut inboxes = self.inboxes.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        inboxes.retain(|weak| match weak.upgrade() {
            Some(inbox) => {
                inbox
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(message.clone());
                true
            }
            None => false,
        });
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let inbox = Arc::new(Mutex::new(VecDeque::new()));
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&inbox));
        Subscription::new(inbox)
    }
}
