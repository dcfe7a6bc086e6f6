//! Local UDP port allocation for device sessions.
//!
//! Every [`DeviceSession`](super::session::DeviceSession) binds its own local
//! port and tells the device (via `/sys/port`) to send input there. Sessions
//! created from the same allocator never receive the same port.
//!
//! # Thread safety
//!
//! The counter is an `AtomicU16`, so sessions can be opened from several
//! threads at once without a lock. `fetch_update` refuses to wrap past
//! `u16::MAX` instead of silently handing out port 0 or a reused low port.

use std::sync::atomic::{AtomicU16, Ordering};

/// A thread-safe, monotonically increasing source of local ports.
///
/// # Examples
///
/// ```rust
/// use monome_ui::infrastructure::network::port_allocator::PortAllocator;
///
/// let ports = PortAllocator::new(13001);
/// assert_eq!(ports.allocate(), Some(13001));
/// assert_eq!(ports.allocate(), Some(13002));
/// ```
#[derive(Debug)]
pub struct PortAllocator {
    next: AtomicU16,
}

impl PortAllocator {
    /// Creates an allocator whose first port is `base`.
    pub fn new(base: u16) -> Self {
        Self {
            next: AtomicU16::new(base),
        }
    }

    /// Returns the next unused port, or `None` once the range is exhausted.
    pub fn allocate(&self) -> Option<u16> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |p| p.checked_add(1))
            .ok()
    }

    /// The port the next call to [`allocate`](Self::allocate) would return.
    pub fn peek(&self) -> u16 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for PortAllocator {
    /// Starts at 13001, the first client port conventionally used with serialosc.
    fn default() -> Self {
        Self::new(13001)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_allocate_is_monotonic_from_base() {
        // Arrange
        let ports = PortAllocator::new(14001);

        // Act
        let first = ports.allocate();
        let second = ports.allocate();

        // Assert
        assert_eq!(first, Some(14001));
        assert_eq!(second, Some(14002));
        assert_eq!(ports.peek(), 14003);
    }

    #[test]
    fn test_allocate_stops_at_top_of_range() {
        let ports = PortAllocator::new(u16::MAX - 1);

        assert_eq!(ports.allocate(), Some(u16::MAX - 1));
        // u16::MAX itself is never handed out because the counter cannot move past it.
        assert_eq!(ports.allocate(), None);
        assert_eq!(ports.allocate(), None);
    }

    #[test]
    fn test_concurrent_allocations_never_collide() {
        // Arrange
        let ports = Arc::new(PortAllocator::new(20000));

        // Act
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ports = Arc::clone(&ports);
                std::thread::spawn(move || (0..100).filter_map(|_| ports.allocate()).collect::<Vec<_>>())
            })
            .collect();
        let all: Vec<u16> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

        // Assert
        let unique: HashSet<u16> = all.iter().copied().collect();
        assert_eq!(all.len(), 800);
        assert_eq!(unique.len(), 800);
    }
}
