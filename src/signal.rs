use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Signal::connect`], used to disconnect the slot again
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u64);

/// Thread-safe list of callbacks that are all invoked on [`Signal::emit`].
///
/// Slots are called in connection order. The list is snapshotted before
/// calling, so a slot may connect or disconnect slots without deadlocking.
pub struct Signal<T> {
    slots: Mutex<BTreeMap<SlotId, Slot<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Arc::new(slot));
        id
    }

    /// Returns false when the slot was not connected
    pub fn disconnect(&self, id: SlotId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn emit(&self, value: &T) {
        let slots: Vec<Slot<T>> = self.lock().values().cloned().collect();
        for slot in slots {
            slot(value);
        }
    }

    pub fn slot_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<SlotId, Slot<T>>> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
