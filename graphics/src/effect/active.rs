//! The active-effect state machine.
//!
//! [`ActiveEffect`] remembers what is bound in the frame's command buffer and
//! only records the render pass, pipeline and vertex buffer changes needed to
//! switch to the next effect. It lives for one frame: [`reset`] runs at the
//! start of every frame.
//!
//! Image usage bookkeeping around render passes:
//!
//! - when a pass ends, each attached image takes the usage its effect declared
//!   for it and is recorded as initialized;
//! - when a pass begins, each attached image that is not initialized is set to
//!   [`ImageUsage::Unknown`] (the render pass owns its layout now);
//! - the initialized set is cleared whenever a pass begins with no pass open.
//!
//! [`reset`]: ActiveEffect::reset

use std::collections::HashSet;

use crate::backend::{
    BufferHandle, CommandBufferHandle, GpuBackend, PipelineHandle, PipelineLayoutHandle,
    PushConstantRange, RenderPassBeginInfo, RenderPassHandle,
};
use crate::resources::{BufferRegistry, FrameSlot, ImageRegistry, ImageUsage};
use crate::types::{ClearValue, FilterMode};

use super::effect::{RenderEffect, RenderEffectRegistry};

/// One frame's command buffer and the registries recording touches.
pub struct FrameRecorder<'a> {
    pub backend: &'a dyn GpuBackend,
    pub cmd: CommandBufferHandle,
    pub frame_index: usize,
    pub images: &'a mut ImageRegistry,
    pub buffers: &'a BufferRegistry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    effect: String,
    render_pass: RenderPassHandle,
    pipeline: PipelineHandle,
    layout: PipelineLayoutHandle,
    push_constant: Option<PushConstantRange>,
    vertex_buffers: Vec<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

/// Command buffer binding state of the current frame.
#[derive(Debug)]
pub struct ActiveEffect {
    clear_color: [f32; 4],
    clear_depth: f32,
    current: Option<Bound>,
    initialized: HashSet<String>,
    presentable: bool,
}

impl ActiveEffect {
    pub fn new(clear_color: [f32; 4], clear_depth: f32) -> Self {
        Self {
            clear_color,
            clear_depth,
            current: None,
            initialized: HashSet::new(),
            presentable: false,
        }
    }

    /// Forget all binding state. Called at the start of every frame.
    pub fn reset(&mut self) {
        self.current = None;
        self.initialized.clear();
        self.presentable = false;
    }

    /// Name of the bound effect.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|bound| bound.effect.as_str())
    }

    /// True while a render pass is open.
    pub fn in_render_pass(&self) -> bool {
        self.current.is_some()
    }

    /// True once [`end_everything`](Self::end_everything) closed the frame
    /// and no effect was begun since.
    pub fn is_presentable(&self) -> bool {
        self.presentable
    }

    /// Make `name` the active effect, recording only what differs from the
    /// effect bound before.
    pub fn begin(
        &mut self,
        recorder: &mut FrameRecorder<'_>,
        effects: &RenderEffectRegistry,
        name: &str,
    ) {
        let effect = effects.get(name);
        let frame = recorder.frame_index;
        let vertex_buffers: Vec<BufferHandle> = effect
            .vertex_buffers
            .iter()
            .map(|buffer| recorder.buffers.get(buffer, FrameSlot::Current, frame).handle)
            .collect();
        let index_buffer = effect
            .index_buffer
            .as_deref()
            .map(|buffer| recorder.buffers.get(buffer, FrameSlot::Current, frame).handle);

        self.presentable = false;
        let pass_changed = self
            .current
            .as_ref()
            .is_none_or(|bound| bound.render_pass != effect.render_pass);
        if pass_changed {
            match self.current.take() {
                Some(outgoing) => {
                    recorder.backend.cmd_end_render_pass(recorder.cmd);
                    self.finish_pass(recorder, effects.get(&outgoing.effect));
                    self.current = Some(outgoing);
                }
                None => self.initialized.clear(),
            }
            self.begin_pass(recorder, effect);
        }

        let pipeline_changed = self
            .current
            .as_ref()
            .is_none_or(|bound| bound.pipeline != effect.pipeline);
        if pipeline_changed {
            recorder.backend.cmd_bind_pipeline(recorder.cmd, effect.pipeline);
            let sets = &effect.descriptor_sets[frame];
            if !sets.is_empty() {
                recorder
                    .backend
                    .cmd_bind_descriptor_sets(recorder.cmd, effect.layout, 0, sets);
            }
        }

        let (bound_vertex, bound_index) = match &self.current {
            Some(bound) => (Some(&bound.vertex_buffers), bound.index_buffer),
            None => (None, None),
        };
        if !vertex_buffers.is_empty() && bound_vertex != Some(&vertex_buffers) {
            recorder
                .backend
                .cmd_bind_vertex_buffers(recorder.cmd, &vertex_buffers);
        }
        if let Some(index) = index_buffer
            && bound_index != Some(index)
        {
            recorder.backend.cmd_bind_index_buffer(recorder.cmd, index);
        }

        self.current = Some(Bound {
            effect: name.to_string(),
            render_pass: effect.render_pass,
            pipeline: effect.pipeline,
            layout: effect.layout,
            push_constant: effect.push_constant,
            vertex_buffers,
            index_buffer,
        });
    }

    fn begin_pass(&mut self, recorder: &mut FrameRecorder<'_>, effect: &RenderEffect) {
        let color_count = effect.images.len().saturating_sub(1);
        let mut clear_values = vec![ClearValue::Color(self.clear_color); color_count];
        clear_values.push(ClearValue::DepthStencil {
            depth: self.clear_depth,
            stencil: 0,
        });

        recorder.backend.cmd_begin_render_pass(
            recorder.cmd,
            &RenderPassBeginInfo {
                render_pass: effect.render_pass,
                framebuffer: effect.framebuffers[recorder.frame_index],
                extent: effect.resolution,
                clear_values,
            },
        );

        for image in &effect.images {
            if !self.initialized.contains(image) {
                recorder.images.set_usage(
                    image,
                    FrameSlot::Current,
                    recorder.frame_index,
                    ImageUsage::Unknown,
                );
            }
        }
    }

    fn finish_pass(&mut self, recorder: &mut FrameRecorder<'_>, effect: &RenderEffect) {
        for (image, usage) in effect.images.iter().zip(&effect.next_usages) {
            recorder
                .images
                .set_usage(image, FrameSlot::Current, recorder.frame_index, *usage);
            self.initialized.insert(image.clone());
        }
    }

    /// Bind vertex and index buffers for the draws that follow, skipping
    /// buffers that are already bound.
    ///
    /// # Panics
    ///
    /// Panics if no effect is active.
    pub fn bind_vertex_buffers(
        &mut self,
        backend: &dyn GpuBackend,
        cmd: CommandBufferHandle,
        vertex_buffers: &[BufferHandle],
        index_buffer: BufferHandle,
    ) {
        let bound = self
            .current
            .as_mut()
            .unwrap_or_else(|| panic!("Vertex buffers bound with no active render effect"));
        if bound.vertex_buffers != vertex_buffers {
            backend.cmd_bind_vertex_buffers(cmd, vertex_buffers);
            bound.vertex_buffers = vertex_buffers.to_vec();
        }
        if bound.index_buffer != Some(index_buffer) {
            backend.cmd_bind_index_buffer(cmd, index_buffer);
            bound.index_buffer = Some(index_buffer);
        }
    }

    /// Record a push constant update for the active effect.
    ///
    /// # Panics
    ///
    /// Panics if no effect is active, the effect has no push constant, or
    /// `data` is larger than its push constant.
    pub fn push_constants(&self, backend: &dyn GpuBackend, cmd: CommandBufferHandle, data: &[u8]) {
        let bound = self
            .current
            .as_ref()
            .unwrap_or_else(|| panic!("Push constants recorded with no active render effect"));
        let range = bound.push_constant.unwrap_or_else(|| {
            panic!(
                "RenderEffect '{}' has no push constant in its resource bundle",
                bound.effect
            )
        });
        assert!(
            data.len() as u32 <= range.size,
            "Push constant data of {} bytes exceeds the {} bytes of RenderEffect '{}'",
            data.len(),
            range.size,
            bound.effect
        );
        backend.cmd_push_constants(cmd, bound.layout, range.stages, range.offset, data);
    }

    /// Close the frame's rendering: end the open render pass, blit the
    /// primary color image onto the swapchain image and make it presentable.
    pub fn end_everything(
        &mut self,
        recorder: &mut FrameRecorder<'_>,
        effects: &RenderEffectRegistry,
        primary_color_target: &str,
        swapchain: &str,
        image_index: u32,
    ) {
        if let Some(outgoing) = self.current.take() {
            recorder.backend.cmd_end_render_pass(recorder.cmd);
            self.finish_pass(recorder, effects.get(&outgoing.effect));
        }
        self.initialized.clear();

        let swapchain_slot = FrameSlot::Index(image_index as usize);
        let frame = recorder.frame_index;
        recorder
            .images
            .set_usage(swapchain, swapchain_slot, frame, ImageUsage::Unknown);
        recorder.images.blit(
            recorder.backend,
            recorder.cmd,
            frame,
            (swapchain, swapchain_slot),
            (primary_color_target, FrameSlot::Current),
            FilterMode::Nearest,
        );
        recorder.images.transition(
            recorder.backend,
            recorder.cmd,
            swapchain,
            swapchain_slot,
            frame,
            ImageUsage::Present,
        );
        self.presentable = true;
    }
}
