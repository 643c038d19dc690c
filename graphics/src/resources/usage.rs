//! Image usage state machine.
//!
//! Every registered image carries its last recorded [`ImageUsage`]. Each usage
//! maps to exactly one (access, stage, layout) triple; a transition emits one
//! barrier from the old triple to the new one and updates the tag in the same
//! step, so the tag always matches what the command buffer will do.

use crate::backend::{BlitInfo, CommandBufferHandle, GpuBackend, ImageBarrier, ResolveInfo};
use crate::types::{AccessFlags, FilterMode, ImageLayout, PipelineStages};

use super::image::ImageResource;

/// What an image was last used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageUsage {
    /// Contents undefined, or owned by a render pass that has not finished.
    #[default]
    Unknown,
    /// Transfer source.
    Src,
    /// Transfer destination.
    Dst,
    /// Sampled in a fragment shader.
    Texture,
    RenderTargetColor,
    RenderTargetDepth,
    /// Ready to be handed to the presentation engine.
    Present,
}

/// Synchronization scope of one usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsageState {
    pub access: AccessFlags,
    pub stage: PipelineStages,
    pub layout: ImageLayout,
}

impl ImageUsage {
    /// The (access, stage, layout) triple of this usage.
    pub fn state(self) -> UsageState {
        let (access, stage, layout) = match self {
            Self::Unknown => (
                AccessFlags::empty(),
                PipelineStages::TOP_OF_PIPE,
                ImageLayout::Undefined,
            ),
            Self::Src => (
                AccessFlags::TRANSFER_READ,
                PipelineStages::TRANSFER,
                ImageLayout::TransferSrc,
            ),
            Self::Dst => (
                AccessFlags::TRANSFER_WRITE,
                PipelineStages::TRANSFER,
                ImageLayout::TransferDst,
            ),
            Self::Texture => (
                AccessFlags::SHADER_READ,
                PipelineStages::FRAGMENT_SHADER,
                ImageLayout::ShaderReadOnly,
            ),
            Self::RenderTargetColor => (
                AccessFlags::COLOR_ATTACHMENT_WRITE,
                PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                ImageLayout::ColorAttachment,
            ),
            Self::RenderTargetDepth => (
                AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
                ImageLayout::DepthStencilAttachment,
            ),
            Self::Present => (
                AccessFlags::empty(),
                PipelineStages::BOTTOM_OF_PIPE,
                ImageLayout::PresentSrc,
            ),
        };
        UsageState {
            access,
            stage,
            layout,
        }
    }

    pub fn layout(self) -> ImageLayout {
        self.state().layout
    }
}

fn check_usage_for(image: &ImageResource, usage: ImageUsage) {
    match usage {
        ImageUsage::Unknown => panic!(
            "Cannot transition image {:?} to 'Unknown' usage: contents cannot be discarded through a barrier",
            image.image
        ),
        ImageUsage::RenderTargetColor if image.format.is_depth() => panic!(
            "Image {:?} has depth format {:?} and cannot be used as a color render target",
            image.image, image.format
        ),
        ImageUsage::RenderTargetDepth if !image.format.is_depth() => panic!(
            "Image {:?} has color format {:?} and cannot be used as a depth render target",
            image.image, image.format
        ),
        _ => {}
    }
}

/// Transition `image` to `next`, emitting one barrier unless it is already there.
///
/// # Panics
///
/// Panics if `next` is [`ImageUsage::Unknown`] or an attachment usage that
/// doesn't match the image format.
pub fn transition(
    backend: &dyn GpuBackend,
    cmd: CommandBufferHandle,
    image: &mut ImageResource,
    next: ImageUsage,
) {
    if image.current_usage == next {
        return;
    }
    check_usage_for(image, next);

    let old = image.current_usage.state();
    let new = next.state();
    backend.cmd_pipeline_barrier(
        cmd,
        &ImageBarrier {
            image: image.image,
            aspect: image.format.aspect(),
            src_access: old.access,
            dst_access: new.access,
            src_stage: old.stage,
            dst_stage: new.stage,
            old_layout: old.layout,
            new_layout: new.layout,
        },
    );
    image.current_usage = next;
}

/// Filtered copy of the full extent of `src` onto the full extent of `dst`.
pub fn blit(
    backend: &dyn GpuBackend,
    cmd: CommandBufferHandle,
    dst: &mut ImageResource,
    src: &mut ImageResource,
    filter: FilterMode,
) {
    transition(backend, cmd, src, ImageUsage::Src);
    transition(backend, cmd, dst, ImageUsage::Dst);

    backend.cmd_blit_image(
        cmd,
        &BlitInfo {
            src: src.image,
            src_extent: src.resolution,
            src_aspect: src.format.aspect(),
            dst: dst.image,
            dst_extent: dst.resolution,
            dst_aspect: dst.format.aspect(),
            filter,
        },
    );
}

/// Resolve multisampled `src` into single-sampled `dst`.
///
/// # Panics
///
/// Panics unless `src` is multisampled, `dst` is single-sampled and both share
/// format and resolution. Differently sized images need a resolve into an
/// intermediate image followed by a [`blit`].
pub fn resolve(
    backend: &dyn GpuBackend,
    cmd: CommandBufferHandle,
    dst: &mut ImageResource,
    src: &mut ImageResource,
) {
    assert!(
        src.samples.is_multisampled() && !dst.samples.is_multisampled(),
        "Resolve requires a multisampled source ({:?}) and a single-sampled destination ({:?})",
        src.samples,
        dst.samples
    );
    assert!(
        src.format == dst.format,
        "Resolve requires identical formats ({:?} vs {:?})",
        src.format,
        dst.format
    );
    assert!(
        src.resolution == dst.resolution,
        "Resolve requires identical resolutions ({} vs {}); resolve into an intermediate image and blit instead",
        src.resolution,
        dst.resolution
    );

    transition(backend, cmd, src, ImageUsage::Src);
    transition(backend, cmd, dst, ImageUsage::Dst);

    backend.cmd_resolve_image(
        cmd,
        &ResolveInfo {
            src: src.image,
            dst: dst.image,
            extent: src.resolution,
            aspect: src.format.aspect(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, ImageHandle, ImageViewHandle, RecordedCommand};
    use crate::types::{Extent2d, ImageFormat, ImageUsageFlags, SampleCount};
    use rstest::rstest;

    fn image(format: ImageFormat, samples: SampleCount, width: u32) -> ImageResource {
        ImageResource {
            image: ImageHandle(width as u64),
            view: ImageViewHandle(width as u64 + 1),
            format,
            samples,
            resolution: Extent2d::new(width, width / 2),
            usage_flags: ImageUsageFlags::all(),
            current_usage: ImageUsage::Unknown,
            owned: true,
        }
    }

    fn color(width: u32) -> ImageResource {
        image(ImageFormat::Rgba8Unorm, SampleCount::S1, width)
    }

    #[rstest]
    #[case(ImageFormat::Rgba8Unorm, ImageUsage::Src)]
    #[case(ImageFormat::Rgba8Unorm, ImageUsage::Dst)]
    #[case(ImageFormat::Rgba8Unorm, ImageUsage::Texture)]
    #[case(ImageFormat::Rgba8Unorm, ImageUsage::RenderTargetColor)]
    #[case(ImageFormat::Depth32Float, ImageUsage::RenderTargetDepth)]
    #[case(ImageFormat::Depth32FloatStencil8, ImageUsage::RenderTargetDepth)]
    #[case(ImageFormat::Rgba8Unorm, ImageUsage::Present)]
    fn test_transition_sets_usage(#[case] format: ImageFormat, #[case] next: ImageUsage) {
        let backend = DummyBackend::new();
        let mut img = image(format, SampleCount::S1, 64);
        transition(&backend, CommandBufferHandle(1), &mut img, next);
        assert_eq!(img.current_usage, next);

        let commands = backend.commands();
        assert_eq!(commands.len(), 1);
        let RecordedCommand::PipelineBarrier(barrier) = &commands[0] else {
            panic!("expected a barrier, got {:?}", commands[0]);
        };
        assert_eq!(barrier.aspect, format.aspect());
        assert_eq!(barrier.new_layout, next.state().layout);
        assert_eq!(barrier.dst_stage, next.state().stage);
    }

    #[test]
    fn test_transition_barrier_contents() {
        let backend = DummyBackend::new();
        let mut img = color(64);
        img.current_usage = ImageUsage::RenderTargetColor;
        transition(&backend, CommandBufferHandle(1), &mut img, ImageUsage::Texture);

        let commands = backend.commands();
        let RecordedCommand::PipelineBarrier(barrier) = &commands[0] else {
            panic!("expected a barrier, got {:?}", commands[0]);
        };
        assert_eq!(barrier.old_layout, ImageLayout::ColorAttachment);
        assert_eq!(barrier.new_layout, ImageLayout::ShaderReadOnly);
        assert_eq!(barrier.src_access, AccessFlags::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barrier.dst_access, AccessFlags::SHADER_READ);
        assert_eq!(barrier.src_stage, PipelineStages::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(barrier.dst_stage, PipelineStages::FRAGMENT_SHADER);
    }

    #[test]
    fn test_same_usage_is_noop() {
        let backend = DummyBackend::new();
        let mut img = color(64);
        img.current_usage = ImageUsage::Texture;
        transition(&backend, CommandBufferHandle(1), &mut img, ImageUsage::Texture);
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn test_depth_state_covers_both_test_stages() {
        let state = ImageUsage::RenderTargetDepth.state();
        assert!(state.stage.contains(PipelineStages::EARLY_FRAGMENT_TESTS));
        assert!(state.stage.contains(PipelineStages::LATE_FRAGMENT_TESTS));
        assert_eq!(state.layout, ImageLayout::DepthStencilAttachment);
    }

    #[test]
    #[should_panic(expected = "to 'Unknown' usage")]
    fn test_transition_to_unknown_panics() {
        let backend = DummyBackend::new();
        let mut img = color(64);
        img.current_usage = ImageUsage::Texture;
        transition(&backend, CommandBufferHandle(1), &mut img, ImageUsage::Unknown);
    }

    #[test]
    #[should_panic(expected = "cannot be used as a color render target")]
    fn test_color_usage_on_depth_panics() {
        let backend = DummyBackend::new();
        let mut img = image(ImageFormat::Depth32Float, SampleCount::S1, 64);
        transition(
            &backend,
            CommandBufferHandle(1),
            &mut img,
            ImageUsage::RenderTargetColor,
        );
    }

    #[test]
    #[should_panic(expected = "cannot be used as a depth render target")]
    fn test_depth_usage_on_color_panics() {
        let backend = DummyBackend::new();
        let mut img = color(64);
        transition(
            &backend,
            CommandBufferHandle(1),
            &mut img,
            ImageUsage::RenderTargetDepth,
        );
    }

    #[rstest]
    #[case(ImageUsage::Unknown, ImageUsage::Unknown)]
    #[case(ImageUsage::Src, ImageUsage::Dst)]
    #[case(ImageUsage::Texture, ImageUsage::Present)]
    #[case(ImageUsage::Dst, ImageUsage::Src)]
    fn test_blit_leaves_src_and_dst_usages(#[case] src_usage: ImageUsage, #[case] dst_usage: ImageUsage) {
        let backend = DummyBackend::new();
        let mut src = color(128);
        let mut dst = color(64);
        src.current_usage = src_usage;
        dst.current_usage = dst_usage;

        blit(&backend, CommandBufferHandle(1), &mut dst, &mut src, FilterMode::Linear);

        assert_eq!(src.current_usage, ImageUsage::Src);
        assert_eq!(dst.current_usage, ImageUsage::Dst);
        let commands = backend.commands();
        let Some(RecordedCommand::BlitImage(info)) = commands.last() else {
            panic!("expected a blit, got {:?}", commands.last());
        };
        assert_eq!(info.src_extent, Extent2d::new(128, 64));
        assert_eq!(info.dst_extent, Extent2d::new(64, 32));
        assert_eq!(info.filter, FilterMode::Linear);
    }

    #[test]
    fn test_resolve() {
        let backend = DummyBackend::new();
        let mut src = image(ImageFormat::Rgba16Float, SampleCount::S4, 64);
        let mut dst = image(ImageFormat::Rgba16Float, SampleCount::S1, 64);
        dst.image = ImageHandle(999);

        resolve(&backend, CommandBufferHandle(1), &mut dst, &mut src);

        assert_eq!(src.current_usage, ImageUsage::Src);
        assert_eq!(dst.current_usage, ImageUsage::Dst);
        assert_eq!(
            backend.count_commands(|c| matches!(c, RecordedCommand::ResolveImage(_))),
            1
        );
    }

    #[test]
    #[should_panic(expected = "identical resolutions")]
    fn test_resolve_size_mismatch_panics() {
        let backend = DummyBackend::new();
        let mut src = image(ImageFormat::Rgba16Float, SampleCount::S4, 128);
        let mut dst = image(ImageFormat::Rgba16Float, SampleCount::S1, 64);
        resolve(&backend, CommandBufferHandle(1), &mut dst, &mut src);
    }
}
