//! Append-only allocation tracker over an index space.
//!
//! Mesh data is packed into a handful of large shared buffers. The tracker
//! hands out consecutive ranges of *elements* (vertices or indices, not
//! bytes) and never reclaims them:
//!
//! ```text
//! alloc(100) -> 0      [0 ........ 100)
//! alloc(50)  -> 100                   [100 .... 150)
//! size()     == 150
//! ```
//!
//! Growing the backing buffer is the caller's job: when [`try_alloc`]
//! returns `None`, replace the buffer with a larger one and call [`grow`].
//!
//! [`try_alloc`]: LinearAllocationTracker::try_alloc
//! [`grow`]: LinearAllocationTracker::grow

/// Bump allocator over `[0, capacity)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearAllocationTracker {
    capacity: u32,
    size: u32,
}

impl LinearAllocationTracker {
    /// Create an empty tracker able to hand out `capacity` elements.
    pub fn new(capacity: u32) -> Self {
        Self { capacity, size: 0 }
    }

    /// Allocate `count` elements and return the offset of the first one.
    ///
    /// # Panics
    ///
    /// Panics if the allocation would exceed the tracker capacity.
    pub fn alloc(&mut self, count: u32) -> u32 {
        match self.try_alloc(count) {
            Some(offset) => offset,
            None => panic!(
                "Linear allocation of {} elements overflows tracker (size: {}, capacity: {})",
                count, self.size, self.capacity
            ),
        }
    }

    /// Allocate `count` elements, or `None` if they don't fit.
    pub fn try_alloc(&mut self, count: u32) -> Option<u32> {
        if !self.can_allocate(count) {
            return None;
        }
        let offset = self.size;
        self.size += count;
        Some(offset)
    }

    /// Check if `count` more elements fit.
    pub fn can_allocate(&self, count: u32) -> bool {
        self.size
            .checked_add(count)
            .is_some_and(|end| end <= self.capacity)
    }

    /// Total number of elements allocated so far.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn remaining(&self) -> u32 {
        self.capacity - self.size
    }

    /// Raise the capacity after the backing storage was replaced.
    ///
    /// Existing allocations keep their offsets.
    pub fn grow(&mut self, new_capacity: u32) {
        assert!(
            new_capacity >= self.capacity,
            "Tracker capacity cannot shrink ({} -> {})",
            self.capacity,
            new_capacity
        );
        self.capacity = new_capacity;
    }

    /// Capacity to grow to so that `count` more elements fit.
    pub fn grown_capacity_for(&self, count: u32) -> u32 {
        let needed = self.size.saturating_add(count);
        self.capacity.saturating_mul(2).max(needed)
    }
}
