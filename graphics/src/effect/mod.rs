//! Render effects and the objects they are built from.
//!
//! Declaration order follows the dependencies: images and buffers, then
//! [`RenderTarget`]s, resource groups and push constants, [`ResourceBundle`]s,
//! [`RenderModeInfo`]s, and finally [`RenderEffect`]s. Everything is named;
//! later objects refer to earlier ones by name.
//!
//! At record time [`ActiveEffect`] switches between effects lazily.

mod active;
mod bundle;
mod effect;
mod group;
mod mode;
mod target;

pub use active::{ActiveEffect, FrameRecorder};
pub use bundle::{MAX_RESOURCE_GROUPS, ResourceBundle, ResourceBundleInfo, ResourceBundleRegistry};
pub use effect::{EffectSources, RenderEffect, RenderEffectInfo, RenderEffectRegistry, VertexStream};
pub use group::{
    GroupBinding, GroupResource, PushConstantRegistry, ResourceGroup, ResourceGroupInfo,
    ResourceGroupRegistry,
};
pub use mode::{RenderModeInfo, RenderModeRegistry};
pub use target::{AttachmentUsage, RenderTarget, RenderTargetInfo, RenderTargetRegistry};
