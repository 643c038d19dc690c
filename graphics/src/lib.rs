//! # Prism Graphics
//!
//! GPU resource and render-pipeline management for the Prism renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsContext`] - Owner of every named resource and of the frame loop
//! - [`GpuBackend`] - Trait for graphics backend implementations
//! - [`effect`] - Render targets, bundles, modes and effects, switched lazily
//!   by [`ActiveEffect`]
//! - [`materials`] - Per-material batches culled into indirect draws
//! - [`mesh`] - Shared vertex and index buffers with LOD models
//! - Backends: Vulkan (ash) and Dummy (recording, for testing)
//!
//! ## Example
//!
//! ```ignore
//! use prism_graphics::{GraphicsConfig, GraphicsContext, create_dummy_backend};
//!
//! let mut ctx = GraphicsContext::new(create_dummy_backend(), GraphicsConfig::default(), extent)?;
//! ctx.begin_frame()?;
//! ctx.begin("forward");
//! ctx.end_everything();
//! ctx.end_frame()?;
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod effect;
pub mod error;
pub mod materials;
pub mod mesh;
pub mod pipeline;
pub mod profiling;
pub mod resize;
pub mod resources;
pub mod shader;
pub mod swapchain;
pub mod types;

// Re-export main types for convenience
pub use backend::{DummyBackend, GpuBackend, create_dummy_backend, has_gpu_backend};
#[cfg(feature = "vulkan-backend")]
pub use backend::{WindowSurface, create_backend};
pub use config::{GraphicsConfig, load_config};
pub use context::GraphicsContext;
pub use effect::{
    ActiveEffect, RenderEffectInfo, RenderModeInfo, RenderTargetInfo, ResourceBundleInfo,
    ResourceGroupInfo,
};
pub use error::GraphicsError;
pub use materials::{Drawable, MaterialId, MaterialStats, MaterialTypeInfo, Model, Transform};
pub use mesh::{MeshId, MeshInstance, ModelId, ModelInstance};
pub use resources::{BufferInfo, FrameSlot, ImageInfo, ImageSize, ImageUsage, SamplerInfo};
pub use types::{
    BufferUsage, ClearValue, Extent2d, FilterMode, ImageFormat, ImageUsageFlags, MemoryLocation,
    PresentMode,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Prism Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert!(backend.name() == "Dummy");
    }
}
