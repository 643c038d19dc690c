//! Frame pipeline for managing multiple frames in flight.
//!
//! This module provides [`FramePipeline`], which owns the per-slot command
//! buffers and synchronization objects and coordinates CPU-GPU overlap
//! (the CPU records frame N+1 while the GPU renders frame N).
//!
//! # Frame Slots
//!
//! With N frames in flight there are N slots. Each slot owns one command
//! buffer, one in-flight fence (created signaled), one image-available
//! semaphore and one render-finished semaphore.
//!
//! ```text
//! frames_in_flight = 2
//!
//! Slot 0: [Frame 0] ──► [Frame 2] ──► [Frame 4] ──►
//! Slot 1: [Frame 1] ──► [Frame 3] ──► [Frame 5] ──►
//! ```
//!
//! # Synchronization Model
//!
//! | Step | Primitive | Purpose |
//! |------|-----------|---------|
//! | acquire → submit | image-available semaphore | GPU waits for the swapchain image |
//! | submit → present | render-finished semaphore | presentation waits for rendering |
//! | frame N → frame N+slots | in-flight fence | CPU waits before reusing a slot |
//!
//! All CPU waits are bounded. A wait that expires returns
//! [`GraphicsError::Timeout`]; a lost device returns
//! [`GraphicsError::DeviceLost`].

use std::time::{Duration, Instant};

use crate::backend::{
    CommandBufferHandle, FenceHandle, GpuBackend, SemaphoreHandle, SubmitInfo,
};
use crate::error::GraphicsError;
use crate::types::PipelineStages;

/// Command buffer and synchronization objects of one frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSync {
    pub command_buffer: CommandBufferHandle,
    pub in_flight: FenceHandle,
    pub image_available: SemaphoreHandle,
    pub render_finished: SemaphoreHandle,
}

impl FrameSync {
    fn create(backend: &dyn GpuBackend) -> Result<Self, GraphicsError> {
        Ok(Self {
            command_buffer: backend.allocate_command_buffer()?,
            in_flight: backend.create_fence(true)?,
            image_available: backend.create_semaphore()?,
            render_finished: backend.create_semaphore()?,
        })
    }

    fn destroy(&self, backend: &dyn GpuBackend) {
        backend.destroy_semaphore(self.render_finished);
        backend.destroy_semaphore(self.image_available);
        backend.destroy_fence(self.in_flight);
        backend.free_command_buffer(self.command_buffer);
    }
}

/// Manages multiple frames in flight for CPU-GPU parallelism.
///
/// `FramePipeline` is **not thread-safe**. It should be owned by a single
/// thread (typically the main/render thread).
#[derive(Debug)]
pub struct FramePipeline {
    slots: Vec<FrameSync>,

    /// Current frame slot index (0 to frames_in_flight - 1).
    frame_index: usize,

    /// Total frames completed.
    frame_count: u64,

    fence_timeout: Duration,
}

impl FramePipeline {
    /// Create a new frame pipeline.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0.
    pub fn new(
        backend: &dyn GpuBackend,
        frames_in_flight: usize,
        fence_timeout: Duration,
    ) -> Result<Self, GraphicsError> {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");

        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            match FrameSync::create(backend) {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    for slot in &slots {
                        slot.destroy(backend);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            slots,
            frame_index: 0,
            frame_count: 0,
            fence_timeout,
        })
    }

    /// Wait, bounded by the fence timeout, until the current slot's previous
    /// frame has finished on the GPU.
    pub fn wait_for_slot(&self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let slot = self.current();
        if backend.wait_fence(slot.in_flight, self.fence_timeout)? {
            return Ok(());
        }
        log::warn!(
            "Frame slot {} not ready after {:?}",
            self.frame_index,
            self.fence_timeout
        );
        Err(GraphicsError::Timeout(format!(
            "fence of frame slot {} after {} ms",
            self.frame_index,
            self.fence_timeout.as_millis()
        )))
    }

    /// Reset the slot fence and start recording the slot's command buffer.
    ///
    /// Only call this once a swapchain image was acquired; a fence reset
    /// without a following submission would never be signaled.
    pub fn begin_recording(&self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let slot = self.current();
        backend.reset_fence(slot.in_flight)?;
        backend.begin_command_buffer(slot.command_buffer, true)?;
        log::trace!(
            "Begin frame {} (slot {})",
            self.frame_count,
            self.frame_index
        );
        Ok(())
    }

    /// Finish recording and submit: wait for the acquired image at color
    /// output, signal render-finished and the slot fence.
    pub fn submit(&self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let slot = self.current();
        backend.end_command_buffer(slot.command_buffer)?;
        backend.submit(&SubmitInfo {
            command_buffer: slot.command_buffer,
            wait: Some((
                slot.image_available,
                PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            )),
            signal: Some(slot.render_finished),
            fence: Some(slot.in_flight),
        })
    }

    /// Advance to the next frame: `frame_index = frame_count % frames_in_flight`.
    pub fn advance(&mut self) {
        log::trace!(
            "End frame {} (slot {})",
            self.frame_count,
            self.frame_index
        );
        self.frame_count += 1;
        self.frame_index = (self.frame_count % self.slots.len() as u64) as usize;
    }

    /// Wait for every slot with one overall timeout. Returns `false` if the
    /// timeout elapsed first.
    pub fn wait_idle_timeout(
        &self,
        backend: &dyn GpuBackend,
        timeout: Duration,
    ) -> Result<bool, GraphicsError> {
        let start = Instant::now();

        for slot in &self.slots {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(false);
            }
            if !backend.wait_fence(slot.in_flight, timeout - elapsed)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Check if a frame slot is ready (non-blocking).
    pub fn is_slot_ready(
        &self,
        backend: &dyn GpuBackend,
        slot: usize,
    ) -> Result<bool, GraphicsError> {
        assert!(slot < self.slots.len(), "Invalid slot index");
        backend.wait_fence(self.slots[slot].in_flight, Duration::ZERO)
    }

    /// Synchronization objects of the current slot.
    pub fn current(&self) -> &FrameSync {
        &self.slots[self.frame_index]
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Get the current frame slot index.
    ///
    /// Returns a value from 0 to `frames_in_flight - 1`.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Number of frames ended so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend) {
        for slot in self.slots.drain(..) {
            slot.destroy(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn pipeline(backend: &DummyBackend, frames: usize) -> FramePipeline {
        FramePipeline::new(backend, frames, Duration::from_millis(10)).unwrap()
    }

    #[test]
    fn test_new() {
        let backend = DummyBackend::new();
        let pipeline = pipeline(&backend, 2);
        assert_eq!(pipeline.frames_in_flight(), 2);
        assert_eq!(pipeline.frame_index(), 0);
        assert_eq!(pipeline.frame_count(), 0);
        assert_ne!(pipeline.slots[0], pipeline.slots[1]);
    }

    #[test]
    #[should_panic(expected = "frames_in_flight must be at least 1")]
    fn test_zero_frames_panics() {
        let backend = DummyBackend::new();
        let _ = FramePipeline::new(&backend, 0, Duration::ZERO);
    }

    #[test]
    fn test_frame_index_cycles() {
        let backend = DummyBackend::new();
        let mut pipeline = pipeline(&backend, 2);
        let mut observed = Vec::new();
        for _ in 0..5 {
            observed.push(pipeline.frame_index());
            pipeline.advance();
        }
        assert_eq!(observed, vec![0, 1, 0, 1, 0]);
        assert_eq!(pipeline.frame_count(), 5);
    }

    #[test]
    fn test_slots_start_ready() {
        let backend = DummyBackend::new();
        let pipeline = pipeline(&backend, 3);
        pipeline.wait_for_slot(&backend).unwrap();
        assert!(pipeline.is_slot_ready(&backend, 2).unwrap());
        assert!(pipeline.wait_idle_timeout(&backend, Duration::from_millis(1)).unwrap());
    }

    #[test]
    fn test_stalled_fence_times_out() {
        let backend = DummyBackend::new();
        let pipeline = pipeline(&backend, 2);
        backend.stall_fences(true);

        pipeline.wait_for_slot(&backend).unwrap();
        pipeline.begin_recording(&backend).unwrap();
        pipeline.submit(&backend).unwrap();

        assert!(!pipeline.is_slot_ready(&backend, 0).unwrap());
        let err = pipeline.wait_for_slot(&backend).unwrap_err();
        assert!(matches!(err, GraphicsError::Timeout(_)));
        assert!(!pipeline.wait_idle_timeout(&backend, Duration::from_millis(1)).unwrap());
    }

    #[test]
    fn test_lost_device_is_reported() {
        let backend = DummyBackend::new();
        let pipeline = pipeline(&backend, 2);
        backend.lose_device();
        assert_eq!(
            pipeline.wait_for_slot(&backend).unwrap_err(),
            GraphicsError::DeviceLost
        );
    }

    #[test]
    fn test_destroy_releases_everything() {
        let backend = DummyBackend::new();
        let mut pipeline = pipeline(&backend, 2);
        pipeline.destroy(&backend);
        assert_eq!(backend.live_resource_count(), 0);
    }

    #[test]
    #[should_panic(expected = "Invalid slot index")]
    fn test_is_slot_ready_invalid() {
        let backend = DummyBackend::new();
        let pipeline = pipeline(&backend, 2);
        let _ = pipeline.is_slot_ready(&backend, 5);
    }
}
