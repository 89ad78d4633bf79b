//! Shared ingestion queue for chat events.
//!
//! Any number of producers append through cloned [`BusPublisher`] handles;
//! one consumer removes everything queued with [`EventBus::drain_all`].
//! Delivery order is enqueue order across all producers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::event::ChatEvent;

type Queue = Arc<Mutex<VecDeque<ChatEvent>>>;

/// Consumer side of the bus. Cloning shares the same queue.
#[derive(Clone, Default)]
pub struct EventBus {
    queue: Queue,
}

/// Append-only handle given to source adapters.
#[derive(Clone)]
pub struct BusPublisher {
    queue: Queue,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that can only publish into this bus.
    pub fn publisher(&self) -> BusPublisher {
        BusPublisher {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Append one event. Never blocks beyond the queue lock.
    pub fn publish(&self, event: ChatEvent) {
        lock(&self.queue).push_back(event);
    }

    /// Remove and return every queued event in enqueue order.
    ///
    /// Returns an empty vector when nothing is queued.
    pub fn drain_all(&self) -> Vec<ChatEvent> {
        let mut queue = lock(&self.queue);
        if queue.is_empty() {
            return Vec::new();
        }
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }
}

impl BusPublisher {
    pub fn publish(&self, event: ChatEvent) {
        tracing::debug!(
            platform = %event.platform(),
            author = event.author(),
            "Chat event published"
        );
        lock(&self.queue).push_back(event);
    }
}

// A producer that panicked mid-push leaves the deque intact, so the
// poisoned guard is still safe to use and no queued event is lost.
fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<ChatEvent>> {
    queue.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Event bus lock poisoned; recovering queue");
        poisoned.into_inner()
    })
}
