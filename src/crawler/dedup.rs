//! Single-flight request deduplication
//!
//! A [`RequestDeduplicator`] maps a key to the one operation currently in
//! flight for it. Concurrent callers for the same key attach to that
//! operation and all observe its outcome. The entry is removed the moment
//! the operation settles, so later callers start fresh: nothing is cached.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::oneshot;

/// Handle to an in-flight operation; clone it to await it more than once
pub type Pending<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T> {
    generation: u64,
    pending: Pending<T>,
}

struct Table<T> {
    slots: HashMap<String, Slot<T>>,
    next_generation: u64,
}

/// Removes a settled operation from its table
///
/// Moves into the spawned task, so it runs when the operation completes,
/// panics or is dropped by a runtime that is shutting down. A missing slot
/// is ignored, and the generation check stops a late guard from removing a
/// newer operation for the same key.
struct SettleGuard<T> {
    table: Weak<Mutex<Table<T>>>,
    key: String,
    generation: u64,
}

impl<T> Drop for SettleGuard<T> {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Entry::Occupied(slot) = table.slots.entry(std::mem::take(&mut self.key)) {
            if slot.get().generation == self.generation {
                slot.remove();
            }
        }
    }
}

/// Collapses concurrent requests for the same key into one operation
///
/// Operations are spawned onto the Tokio runtime, so they keep running after
/// every caller has stopped awaiting them.
pub struct RequestDeduplicator<T> {
    table: Arc<Mutex<Table<T>>>,
    /// Outcome reported when an operation's task dies without settling
    on_abort: fn(&str) -> T,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(on_abort: fn(&str) -> T) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                slots: HashMap::new(),
                next_generation: 0,
            })),
            on_abort,
        }
    }

    /// Returns the in-flight operation for `key`, starting one if needed
    ///
    /// `factory` is only called when no operation is in flight for `key`.
    /// The slot for `key` is reserved before it runs, so callers racing with
    /// it attach to the new operation. Neither the factory nor the spawn
    /// happen under the table lock.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get<M, Fut>(&self, key: &str, factory: M) -> Pending<T>
    where
        M: FnOnce(String) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let (pending, generation) = {
            let mut table = self.lock();
            if let Some(slot) = table.slots.get(key) {
                tracing::trace!("Joining in-flight operation for {}", key);
                return slot.pending.clone();
            }

            let generation = table.next_generation;
            table.next_generation += 1;

            let on_abort = self.on_abort;
            let owned_key = key.to_string();
            let pending = async move {
                match receiver.await {
                    Ok(value) => value,
                    Err(_) => {
                        tracing::warn!("Operation for {} did not settle", owned_key);
                        on_abort(&owned_key)
                    }
                }
            }
            .boxed()
            .shared();

            table.slots.insert(
                key.to_string(),
                Slot {
                    generation,
                    pending: pending.clone(),
                },
            );
            (pending, generation)
        };

        // Removes the slot if the factory panics or the task never completes
        let guard = SettleGuard {
            table: Arc::downgrade(&self.table),
            key: key.to_string(),
            generation,
        };
        let operation = factory(key.to_string());
        tracing::trace!("Started operation for {}", key);
        tokio::spawn(async move {
            let value = operation.await;
            // Free the slot before publishing, so no caller can join a
            // settled operation
            drop(guard);
            let _ = sender.send(value);
        });

        pending
    }

    /// Whether an operation for `key` is in flight
    pub fn contains(&self, key: &str) -> bool {
        self.lock().slots.contains_key(key)
    }

    /// Number of operations in flight
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Table<T>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for RequestDeduplicator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len();
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &in_flight)
            .finish()
    }
}
