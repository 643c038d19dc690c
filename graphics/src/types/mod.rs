//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod barrier;
mod buffer;
mod common;
mod image;
mod pipeline;
mod sampler;

pub use barrier::{AccessFlags, ImageLayout, PipelineStages};
pub use buffer::{
    BufferCopy, BufferDescriptor, BufferUsage, DrawIndexedIndirectArgs, MemoryLocation,
};
pub use common::{ClearValue, LoadOp, PresentMode, ShaderStages, StoreOp};
pub use image::{
    Extent2d, ImageAspect, ImageDescriptor, ImageFormat, ImageUsageFlags, SampleCount,
};
pub use pipeline::{
    AlphaBlendMode, BlendFactor, BlendOp, ColorBlendState, CompareOp, CullMode, FillMode,
    FrontFace, VertexFormat,
};
pub use sampler::{BorderColor, FilterMode, SamplerDescriptor, WrapMode};
