//! Window resize tracking.
//!
//! The windowing layer reports size changes with
//! [`ResizeTracker::notify`]; the frame loop picks them up at the next frame
//! boundary with [`ResizeTracker::take_pending`]. A minimized window reports
//! a zero extent, which cannot back a swapchain, so the resize stays pending
//! until a non-zero size arrives.
//!
//! ```text
//! notify(1280, 720) ──► pending
//! notify(0, 0)      ──► pending, deferred (minimized)
//! notify(1600, 900) ──► pending
//! take_pending()    ──► Some(1600x900), cleared
//! ```

use crate::types::Extent2d;

/// Tracks the latest window size and whether the swapchain is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeTracker {
    /// Size of the current swapchain.
    current: Extent2d,

    /// Latest reported window size.
    requested: Extent2d,

    /// A resize was requested and not yet applied.
    pending: bool,
}

impl ResizeTracker {
    /// Create a tracker for a swapchain of the given size.
    pub fn new(current: Extent2d) -> Self {
        Self {
            current,
            requested: current,
            pending: false,
        }
    }

    /// Record a new window size.
    pub fn notify(&mut self, width: u32, height: u32) {
        self.requested = Extent2d::new(width, height);
        self.pending = true;
        log::trace!("Resize requested to {}", self.requested);
    }

    /// Mark the swapchain stale without a new size, e.g. after the
    /// presentation engine reported it out of date.
    pub fn mark_stale(&mut self) {
        self.pending = true;
    }

    /// Returns true if a resize was requested and not yet applied.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns true if the window currently has no visible area.
    pub fn is_deferred(&self) -> bool {
        self.pending && self.requested.is_empty()
    }

    /// Take the size to resize to, if a resize is pending and the window is
    /// not minimized.
    pub fn take_pending(&mut self) -> Option<Extent2d> {
        if !self.pending {
            return None;
        }
        if self.requested.is_empty() {
            log::debug!("Deferring resize of a zero-size window");
            return None;
        }
        self.pending = false;
        Some(self.requested)
    }

    /// Record the size the swapchain was actually created with.
    pub fn applied(&mut self, extent: Extent2d) {
        self.current = extent;
        self.requested = extent;
    }

    /// Size of the current swapchain.
    pub fn current(&self) -> Extent2d {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pending_initially() {
        let mut tracker = ResizeTracker::new(Extent2d::new(800, 600));
        assert!(!tracker.is_pending());
        assert_eq!(tracker.take_pending(), None);
    }

    #[test]
    fn test_latest_size_wins() {
        let mut tracker = ResizeTracker::new(Extent2d::new(800, 600));
        tracker.notify(1024, 768);
        tracker.notify(1280, 720);
        assert_eq!(tracker.take_pending(), Some(Extent2d::new(1280, 720)));
        assert!(!tracker.is_pending());
    }

    #[test]
    fn test_zero_size_defers() {
        let mut tracker = ResizeTracker::new(Extent2d::new(800, 600));
        tracker.notify(0, 0);
        assert!(tracker.is_deferred());
        assert_eq!(tracker.take_pending(), None);
        assert!(tracker.is_pending());

        tracker.notify(640, 480);
        assert!(!tracker.is_deferred());
        assert_eq!(tracker.take_pending(), Some(Extent2d::new(640, 480)));
    }

    #[test]
    fn test_stale_reuses_requested_size() {
        let mut tracker = ResizeTracker::new(Extent2d::new(800, 600));
        tracker.mark_stale();
        assert_eq!(tracker.take_pending(), Some(Extent2d::new(800, 600)));

        tracker.applied(Extent2d::new(790, 590));
        assert_eq!(tracker.current(), Extent2d::new(790, 590));
    }
}
