//! Ordered subscriber lists with removable handles.
//!
//! Closures have no identity in Rust, so registration returns a
//! [`SubscriberId`] and removal takes that id back.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use monome_core::ControlError;

/// Process-wide id source; ids are never reused.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by every `subscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber #{}", self.0)
    }
}

/// A subscriber callback for events of type `E`.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Callbacks notified in registration order.
pub struct Subscribers<E> {
    entries: Vec<(SubscriberId, Callback<E>)>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: Callback<E>) -> SubscriberId {
        let id = SubscriberId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.push((id, callback));
        id
    }

    /// # Errors
    ///
    /// [`ControlError::NotFound`] if `id` is not registered here.
    pub fn remove(&mut self, id: SubscriberId) -> Result<(), ControlError> {
        let index = self
            .entries
            .iter()
            .position(|(entry, _)| *entry == id)
            .ok_or_else(|| ControlError::NotFound(id.to_string()))?;
        self.entries.remove(index);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clones the callbacks out so they can run after any lock is released.
    pub fn snapshot(&self) -> Vec<Callback<E>> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}
