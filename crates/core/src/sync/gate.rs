//! Counting gate bounding concurrent use of an external resource.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many tasks may hold a [`Permit`] at the same time.
///
/// Two independent instances exist per run: one for caption-extractor
/// processes, one for chat-endpoint requests. Acquisition is cancel-safe:
/// a waiter that is cancelled while queued never consumes a slot.
///
/// Clones share the same underlying capacity.
#[derive(Debug, Clone)]
pub struct ResourceGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ResourceGate {
    /// Creates a gate admitting up to `capacity` concurrent holders.
    ///
    /// Capacity is validated with the rest of the run configuration; the
    /// gate itself assumes `capacity >= 1`.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits until a slot is free and claims it.
    ///
    /// The slot is returned when the permit is dropped, on every exit
    /// path.
    pub async fn acquire(&self) -> Permit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");
        Permit { _permit: permit }
    }
}

/// A claimed slot in a [`ResourceGate`]. Dropping it frees the slot.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}
