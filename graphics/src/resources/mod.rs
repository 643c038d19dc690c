//! GPU resources.
//!
//! This module contains the registries that own every GPU image, buffer and
//! sampler of a [`GraphicsContext`], the append-only allocation tracker used
//! to pack mesh data, and the image usage state machine.
//!
//! [`GraphicsContext`]: crate::GraphicsContext

mod buffer;
mod image;
mod linear_tracker;
mod registry;
mod sampler;
pub mod usage;

pub use buffer::{BufferInfo, BufferRegistry, BufferResource};
pub use image::{ImageInfo, ImageRegistry, ImageResource, ImageSize};
pub use linear_tracker::LinearAllocationTracker;
pub use registry::{
    Association, Cardinality, FrameSlot, NameTable, Registry, ResourceClass, ResourceKind,
    ResourceSlot,
};
pub use sampler::{SamplerInfo, SamplerRegistry, SamplerResource};
pub use usage::{ImageUsage, UsageState};
