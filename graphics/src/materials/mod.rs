//! Material batching for the graphics engine.
//!
//! A material type owns a batch of drawables that is rebuilt every frame:
//!
//! 1. [`MaterialBatches::push_drawable`] queues (transform, model, material
//!    constants) for the frame.
//! 2. [`MaterialBatches::build_commands`] culls each drawable against the
//!    camera frustum, picks its LOD and writes one indexed indirect command per
//!    survivor into the frame's shared indirect buffer.
//! 3. [`MaterialBatches::draw`] issues one indirect draw per material type.
//! 4. [`MaterialBatches::reset`] snapshots the counters and empties the
//!    batches for the next frame.
//!
//! Drawables are uploaded in batch order, so a command's `first_instance` is
//! the drawable's index in its material's transform and constant buffers.

mod batch;
mod drawable;

pub use batch::{
    INDIRECT_COMMANDS_BUFFER, MaterialBatches, MaterialCounts, MaterialId, MaterialStats,
    MaterialTypeInfo,
};
pub use drawable::{Drawable, Model, Transform};
