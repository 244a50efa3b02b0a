//! Most-recent-value broadcast of game snapshots
//!
//! The publisher holds a single slot with the latest [`Snapshot`] and a set of
//! registered sinks. Every write replaces the slot and is delivered to each
//! sink in turn; a sink that joins late is handed the slot's content at once.
//! There is no history: readers may miss intermediate snapshots but always
//! converge to the latest one.

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::Snapshot;

/// Why a sink could not take a snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The receiving end is gone; the sink is dropped from the publisher
    #[error("sink is closed")]
    Closed,
    /// Delivery failed this time; the sink stays registered
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// A destination for published snapshots
///
/// Sinks are called synchronously from [`Publisher::set_state`] and
/// [`Publisher::subscribe`], so they should hand the snapshot off quickly.
/// A sink must not publish from inside `deliver`.
pub trait Sink: Send + Sync {
    /// Delivers a snapshot to the sink
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The snapshot that was just published
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Closed` if the sink will never accept snapshots
    /// again, or `SinkError::Failed` for a one-off failure.
    fn deliver(&self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError>;
}

impl<F> Sink for F
where
    F: Fn(&Arc<Snapshot>) -> Result<(), SinkError> + Send + Sync,
{
    fn deliver(&self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
        self(snapshot)
    }
}

/// Identifier of a registered sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Default)]
struct Slot {
    latest: Option<Arc<Snapshot>>,
    sinks: HashMap<SubscriptionId, Arc<dyn Sink>>,
}

/// Single-slot broadcaster of game snapshots
///
/// One publisher is created by the process entry point and shared behind an
/// [`Arc`]. Writes are serialized, so concurrent writers cannot interleave
/// their deliveries, but the last write always wins.
#[derive(Default)]
pub struct Publisher {
    /// The latest snapshot and the registered sinks
    slot: Mutex<Slot>,
    /// Held for the whole of a delivery round
    publishing: Mutex<()>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = lock(&self.slot);
        f.debug_struct("Publisher")
            .field("latest", &slot.latest.as_ref().map(|s| s.state))
            .field("subscribers", &slot.sinks.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls a sink, turning a panic into a failure
fn dispatch(sink: &dyn Sink, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
    catch_unwind(AssertUnwindSafe(|| sink.deliver(snapshot)))
        .unwrap_or_else(|_| Err(SinkError::Failed("sink panicked".to_owned())))
}

impl Publisher {
    /// Creates an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held snapshot and notifies every sink
    ///
    /// The replacement is unconditional. A sink that fails does not prevent
    /// delivery to the others; sinks reporting [`SinkError::Closed`] are
    /// removed.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The new snapshot
    ///
    /// # Returns
    ///
    /// The number of sinks that accepted the snapshot
    pub fn set_state(&self, snapshot: Snapshot) -> usize {
        let _publishing = lock(&self.publishing);
        let snapshot = Arc::new(snapshot);

        let sinks = {
            let mut slot = lock(&self.slot);
            slot.latest = Some(Arc::clone(&snapshot));
            slot.sinks
                .iter()
                .map(|(id, sink)| (*id, Arc::clone(sink)))
                .collect_vec()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sink) in sinks {
            match dispatch(sink.as_ref(), &snapshot) {
                Ok(()) => delivered += 1,
                Err(SinkError::Closed) => closed.push(id),
                Err(e) => warn!(subscription = %id, error = %e, "failed to deliver snapshot"),
            }
        }

        if !closed.is_empty() {
            let mut slot = lock(&self.slot);
            for id in &closed {
                slot.sinks.remove(id);
            }
            debug!(count = closed.len(), "removed closed sinks");
        }

        delivered
    }

    /// Registers a sink
    ///
    /// If a snapshot has already been published the sink receives it before
    /// this returns.
    ///
    /// # Arguments
    ///
    /// * `sink` - The sink to register
    ///
    /// # Returns
    ///
    /// A handle that removes the sink when unsubscribed or dropped
    pub fn subscribe(self: &Arc<Self>, sink: impl Sink + 'static) -> Subscription {
        let _publishing = lock(&self.publishing);
        let id = SubscriptionId::new();
        let sink: Arc<dyn Sink> = Arc::new(sink);

        let latest = {
            let mut slot = lock(&self.slot);
            slot.sinks.insert(id, Arc::clone(&sink));
            slot.latest.clone()
        };

        if let Some(latest) = latest {
            match dispatch(sink.as_ref(), &latest) {
                Ok(()) => {}
                Err(SinkError::Closed) => {
                    lock(&self.slot).sinks.remove(&id);
                }
                Err(e) => warn!(subscription = %id, error = %e, "failed to deliver latest snapshot"),
            }
        }

        debug!(subscription = %id, "sink subscribed");
        Subscription {
            id,
            publisher: Some(Arc::downgrade(self)),
        }
    }

    /// The latest published snapshot, if any
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        lock(&self.slot).latest.clone()
    }

    /// Number of registered sinks
    pub fn subscriber_count(&self) -> usize {
        lock(&self.slot).sinks.len()
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        lock(&self.slot).sinks.remove(&id).is_some()
    }
}

/// Handle to a registered sink
///
/// Dropping the handle unsubscribes the sink.
#[derive(Debug)]
#[must_use = "dropping a subscription unsubscribes its sink"]
pub struct Subscription {
    id: SubscriptionId,
    publisher: Option<Weak<Publisher>>,
}

impl Subscription {
    /// Identifier of the sink
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the sink from the publisher
    ///
    /// Calling this more than once is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if this call removed the sink
    pub fn unsubscribe(&mut self) -> bool {
        let Some(publisher) = self.publisher.take().and_then(|p| p.upgrade()) else {
            return false;
        };
        let removed = publisher.remove(self.id);
        if removed {
            debug!(subscription = %self.id, "sink unsubscribed");
        }
        removed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
