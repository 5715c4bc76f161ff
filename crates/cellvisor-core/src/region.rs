//! Arena accounting for kernel-owned objects.
//!
//! Every domain, queue, handle, task and port is charged to the kernel's
//! [`Region`] for its lifetime. The reservation also hands out the object's
//! [`ObjectId`], which handle caches use as their key. Ids increase
//! monotonically and are never reused, so a freed object can never alias a
//! newer one.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::fatal::{fatal, kernel_assert};

/// Stable arena-relative identity of a kernel object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Ledger {
    live: HashMap<ObjectId, usize>,
    bytes: usize,
}

/// Arena owning the memory budget of one kernel instance.
pub struct Region {
    capacity: Option<usize>,
    next_id: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl Region {
    /// Create a region. `capacity` bounds the bytes live at once.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            next_id: AtomicU64::new(1),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Unbounded region.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Charge `size` bytes and return the new object's identity.
    ///
    /// Exhaustion is fatal.
    pub fn reserve(self: &Arc<Self>, size: usize) -> Reservation {
        let id = self.charge(size);
        Reservation {
            id,
            size,
            region: Arc::clone(self),
        }
    }

    /// Allocate a zeroed block of `size` bytes.
    ///
    /// The region is charged before any memory is taken. Exhaustion is
    /// fatal.
    pub fn malloc(self: &Arc<Self>, size: usize) -> Allocation {
        let reservation = self.reserve(size);
        Allocation {
            block: vec![0u8; size].into_boxed_slice(),
            reservation,
        }
    }

    /// Return a block to the region.
    pub fn free(&self, allocation: Allocation) {
        kernel_assert!(
            std::ptr::eq(Arc::as_ptr(&allocation.reservation.region), self),
            "block {} freed into a region that did not allocate it",
            allocation.id()
        );
        drop(allocation);
    }

    /// Number of live objects and blocks.
    pub fn live_objects(&self) -> usize {
        self.ledger.lock().live.len()
    }

    /// Bytes currently charged.
    pub fn live_bytes(&self) -> usize {
        self.ledger.lock().bytes
    }

    /// Configured capacity, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn charge(&self, size: usize) -> ObjectId {
        let mut ledger = self.ledger.lock();
        let total = match ledger.bytes.checked_add(size) {
            Some(total) if self.capacity.is_none_or(|capacity| total <= capacity) => total,
            _ => {
                let live = ledger.bytes;
                drop(ledger);
                fatal!(
                    "region exhausted: {} bytes requested, {} of {} in use",
                    size,
                    live,
                    self.capacity.map_or_else(|| "unbounded".to_string(), |c| c.to_string())
                );
            }
        };
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        ledger.live.insert(id, size);
        ledger.bytes = total;
        trace!(target: crate::KERNEL_TARGET, "region: reserved {} ({} bytes)", id, size);
        id
    }

    fn release(&self, id: ObjectId) {
        let mut ledger = self.ledger.lock();
        match ledger.live.remove(&id) {
            Some(size) => {
                ledger.bytes -= size;
                trace!(target: crate::KERNEL_TARGET, "region: released {} ({} bytes)", id, size);
            }
            None => {
                drop(ledger);
                fatal!("region: release of unknown object {}", id);
            }
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ledger = self.ledger.lock();
        f.debug_struct("Region")
            .field("capacity", &self.capacity)
            .field("live_objects", &ledger.live.len())
            .field("live_bytes", &ledger.bytes)
            .finish()
    }
}

/// A charge against a [`Region`], released when dropped.
pub struct Reservation {
    id: ObjectId,
    size: usize,
    region: Arc<Region>,
}

impl Reservation {
    /// Identity of the reserved object.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Bytes charged.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.region.release(self.id);
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

/// A raw block carved from a [`Region`].
pub struct Allocation {
    block: Box<[u8]>,
    reservation: Reservation,
}

impl Allocation {
    /// Identity of the block.
    pub fn id(&self) -> ObjectId {
        self.reservation.id
    }
}

impl Deref for Allocation {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.block
    }
}

impl DerefMut for Allocation {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.block
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("id", &self.reservation.id)
            .field("len", &self.block.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_release() {
        let region = Arc::new(Region::unbounded());
        let a = region.reserve(64);
        let b = region.reserve(32);
        assert_eq!(region.live_objects(), 2);
        assert_eq!(region.live_bytes(), 96);

        drop(a);
        assert_eq!(region.live_objects(), 1);
        assert_eq!(region.live_bytes(), 32);

        drop(b);
        assert_eq!(region.live_bytes(), 0);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let region = Arc::new(Region::unbounded());
        let first = region.reserve(8).id();
        let second = region.reserve(8).id();
        let third = region.reserve(8).id();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_malloc_free() {
        let region = Arc::new(Region::new(Some(1024)));
        let mut block = region.malloc(16);
        assert_eq!(block.len(), 16);
        assert!(block.iter().all(|b| *b == 0));
        block[0] = 0xAB;
        assert_eq!(block[0], 0xAB);
        assert_eq!(region.live_bytes(), 16);

        region.free(block);
        assert_eq!(region.live_bytes(), 0);
        assert_eq!(region.live_objects(), 0);
    }

    #[test]
    fn test_capacity_is_reusable_after_release() {
        let region = Arc::new(Region::new(Some(100)));
        let a = region.reserve(100);
        drop(a);
        let _b = region.reserve(100);
        assert_eq!(region.live_bytes(), 100);
    }

    #[test]
    #[should_panic(expected = "region exhausted")]
    fn test_exhaustion_is_fatal() {
        let region = Arc::new(Region::new(Some(100)));
        let _a = region.reserve(80);
        let _b = region.reserve(40);
    }

    #[test]
    #[should_panic(expected = "region exhausted")]
    fn test_oversized_reserve_is_exhaustion() {
        let region = Arc::new(Region::new(Some(4096)));
        let _a = region.reserve(16);
        let _b = region.reserve(usize::MAX);
    }

    #[test]
    #[should_panic(expected = "region exhausted")]
    fn test_overflow_in_unbounded_region_is_exhaustion() {
        let region = Arc::new(Region::unbounded());
        let _a = region.reserve(16);
        let _b = region.reserve(usize::MAX);
    }

    #[test]
    #[should_panic(expected = "region exhausted")]
    fn test_oversized_malloc_is_refused_before_allocating() {
        let region = Arc::new(Region::new(Some(4096)));
        let _block = region.malloc(usize::MAX);
    }

    #[test]
    fn test_refused_reserve_leaves_ledger_intact() {
        let region = Arc::new(Region::new(Some(4096)));
        let _a = region.reserve(16);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _b = region.reserve(usize::MAX);
        }));
        assert!(outcome.is_err());
        assert_eq!(region.live_bytes(), 16);
        assert_eq!(region.live_objects(), 1);
    }

    #[test]
    #[should_panic(expected = "did not allocate it")]
    fn test_free_into_wrong_region() {
        let a = Arc::new(Region::unbounded());
        let b = Arc::new(Region::unbounded());
        let block = a.malloc(4);
        b.free(block);
    }
}
