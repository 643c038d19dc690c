//! Graphics configuration.
//!
//! [`GraphicsConfig`] can be built in code with the `with_*` methods or loaded
//! from a TOML file where every field is optional:
//!
//! ```toml
//! frames_in_flight = 2
//! fence_timeout_ms = 2000
//! present_mode = "mailbox"
//! clear_color = [0.1, 0.1, 0.1, 1.0]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::GraphicsError;
use crate::types::PresentMode;

/// Configuration of a [`GraphicsContext`](crate::GraphicsContext).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Number of frames whose GPU work may be pending at once.
    pub frames_in_flight: usize,
    /// Upper bound on waiting for a frame slot's fence.
    pub fence_timeout_ms: u64,
    /// Upper bound on waiting for a swapchain image.
    pub acquire_timeout_ms: u64,
    /// Enable API validation layers.
    pub validation: bool,
    /// Clear color of every color attachment.
    pub clear_color: [f32; 4],
    /// Clear value of the depth attachment.
    pub clear_depth: f32,
    pub present_mode: PresentMode,
    /// Number of indirect draw commands per frame, across all materials.
    pub indirect_command_capacity: u32,
    /// Initial capacity of the shared vertex buffers, in vertices.
    pub vertex_capacity: u32,
    /// Initial capacity of the shared index buffer, in indices.
    pub index_capacity: u32,
    /// Per-frame image blitted into the swapchain by `end_everything`.
    pub primary_color_target: String,
    /// Name under which swapchain images are registered.
    pub swapchain_name: String,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            fence_timeout_ms: 2000,
            acquire_timeout_ms: 2000,
            validation: cfg!(debug_assertions),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            present_mode: PresentMode::Fifo,
            indirect_command_capacity: 512 * 1024,
            vertex_capacity: 1024 * 1024,
            index_capacity: 4 * 1024 * 1024,
            primary_color_target: "forward_pass_color".to_string(),
            swapchain_name: "swapchain".to_string(),
        }
    }
}

impl GraphicsConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the fence and acquire timeouts.
    pub fn with_timeouts(mut self, fence_timeout_ms: u64, acquire_timeout_ms: u64) -> Self {
        self.fence_timeout_ms = fence_timeout_ms;
        self.acquire_timeout_ms = acquire_timeout_ms;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Set the color attachment clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the present mode.
    pub fn with_present_mode(mut self, mode: PresentMode) -> Self {
        self.present_mode = mode;
        self
    }

    /// Set the per-frame indirect command capacity.
    pub fn with_indirect_command_capacity(mut self, capacity: u32) -> Self {
        self.indirect_command_capacity = capacity;
        self
    }

    /// Set the initial shared mesh buffer capacities.
    pub fn with_mesh_capacity(mut self, vertices: u32, indices: u32) -> Self {
        self.vertex_capacity = vertices;
        self.index_capacity = indices;
        self
    }

    /// Set the image blitted to the swapchain at the end of a frame.
    pub fn with_primary_color_target(mut self, name: impl Into<String>) -> Self {
        self.primary_color_target = name.into();
        self
    }

    pub fn fence_timeout(&self) -> Duration {
        Duration::from_millis(self.fence_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, GraphicsError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GraphicsError> {
        if self.frames_in_flight == 0 {
            return Err(GraphicsError::Config(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.indirect_command_capacity == 0 {
            return Err(GraphicsError::Config(
                "indirect_command_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GraphicsConfig, GraphicsError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GraphicsError::Config(format!("failed to read {}: {e}", path.display())))?;
    GraphicsConfig::from_toml_str(&content)
}
