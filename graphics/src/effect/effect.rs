//! Render effects: one graphics pipeline plus everything needed to bind it.

use std::collections::HashMap;

use crate::backend::{
    DepthState, DescriptorSetHandle, FramebufferHandle, GpuBackend, GraphicsPipelineDescriptor,
    PipelineHandle, PipelineLayoutHandle, PushConstantRange, RenderPassHandle, VertexStreamLayout,
};
use crate::error::GraphicsError;
use crate::resources::{BufferRegistry, ImageUsage};
use crate::shader::ShaderLibrary;
use crate::types::{Extent2d, VertexFormat};

use super::bundle::ResourceBundleRegistry;
use super::mode::RenderModeRegistry;
use super::target::RenderTargetRegistry;

/// A vertex buffer feeding one attribute location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexStream {
    pub buffer: String,
    pub format: VertexFormat,
}

impl VertexStream {
    pub fn new(buffer: impl Into<String>, format: VertexFormat) -> Self {
        Self {
            buffer: buffer.into(),
            format,
        }
    }
}

/// Declaration of a render effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderEffectInfo {
    pub render_target: String,
    pub resource_bundle: String,
    pub render_mode: String,
    pub vertex_shader: String,
    pub fragment_shader: Option<String>,
    /// Vertex buffers in binding order.
    pub vertex_streams: Vec<VertexStream>,
    pub index_buffer: Option<String>,
}

impl RenderEffectInfo {
    pub fn new(
        render_target: impl Into<String>,
        resource_bundle: impl Into<String>,
        render_mode: impl Into<String>,
        vertex_shader: impl Into<String>,
    ) -> Self {
        Self {
            render_target: render_target.into(),
            resource_bundle: resource_bundle.into(),
            render_mode: render_mode.into(),
            vertex_shader: vertex_shader.into(),
            ..Self::default()
        }
    }

    pub fn with_fragment_shader(mut self, shader: impl Into<String>) -> Self {
        self.fragment_shader = Some(shader.into());
        self
    }

    pub fn with_vertex_stream(mut self, buffer: impl Into<String>, format: VertexFormat) -> Self {
        self.vertex_streams.push(VertexStream::new(buffer, format));
        self
    }

    pub fn with_index_buffer(mut self, buffer: impl Into<String>) -> Self {
        self.index_buffer = Some(buffer.into());
        self
    }
}

/// Everything a render effect is built from.
#[derive(Clone, Copy)]
pub struct EffectSources<'a> {
    pub targets: &'a RenderTargetRegistry,
    pub bundles: &'a ResourceBundleRegistry,
    pub modes: &'a RenderModeRegistry,
    pub shaders: &'a ShaderLibrary,
    pub buffers: &'a BufferRegistry,
}

/// A created render effect.
///
/// Buffers are kept by name and resolved when the effect is bound, so a
/// replaced (grown) buffer is picked up without rebuilding the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEffect {
    pub pipeline: PipelineHandle,
    pub layout: PipelineLayoutHandle,
    pub render_pass: RenderPassHandle,
    pub framebuffers: Vec<FramebufferHandle>,
    pub resolution: Extent2d,
    /// Descriptor sets per frame slot.
    pub descriptor_sets: Vec<Vec<DescriptorSetHandle>>,
    pub push_constant: Option<PushConstantRange>,
    pub vertex_buffers: Vec<String>,
    pub index_buffer: Option<String>,
    /// Attached images, colors first.
    pub images: Vec<String>,
    /// Usage of each attached image once the render pass ends.
    pub next_usages: Vec<ImageUsage>,
}

impl RenderEffect {
    /// Build the pipeline of `info`.
    ///
    /// # Panics
    ///
    /// Panics if any referenced target, bundle, mode, shader or buffer is
    /// unknown.
    pub fn create(
        backend: &dyn GpuBackend,
        sources: EffectSources<'_>,
        info: &RenderEffectInfo,
        name: &str,
    ) -> Result<Self, GraphicsError> {
        let target = sources.targets.get(&info.render_target);
        let target_info = sources.targets.info(&info.render_target);
        let bundle = sources.bundles.get(&info.resource_bundle);
        let mode = sources.modes.get(&info.render_mode);

        for stream in &info.vertex_streams {
            assert!(
                sources.buffers.contains(&stream.buffer),
                "RenderEffect '{name}': vertex buffer '{}' does not exist!",
                stream.buffer
            );
        }
        if let Some(index_buffer) = &info.index_buffer {
            assert!(
                sources.buffers.contains(index_buffer),
                "RenderEffect '{name}': index buffer '{index_buffer}' does not exist!"
            );
        }

        let descriptor = GraphicsPipelineDescriptor {
            label: Some(name.to_string()),
            layout: bundle.layout,
            render_pass: target.render_pass,
            vertex_shader: sources.shaders.get(&info.vertex_shader),
            fragment_shader: info
                .fragment_shader
                .as_deref()
                .map(|shader| sources.shaders.get(shader)),
            vertex_streams: info
                .vertex_streams
                .iter()
                .map(|stream| VertexStreamLayout {
                    format: stream.format,
                })
                .collect(),
            rasterization: mode.rasterization(),
            depth: DepthState::default(),
            color_blend: GraphicsPipelineDescriptor::blend_states(
                mode.alpha_blend_mode,
                target_info.color_count(),
            ),
            samples: target.samples,
            extent: target.resolution,
        };
        let pipeline = backend.create_graphics_pipeline(&descriptor)?;

        Ok(Self {
            pipeline,
            layout: bundle.layout,
            render_pass: target.render_pass,
            framebuffers: target.framebuffers.clone(),
            resolution: target.resolution,
            descriptor_sets: bundle.descriptor_sets.clone(),
            push_constant: bundle.push_constant,
            vertex_buffers: info
                .vertex_streams
                .iter()
                .map(|stream| stream.buffer.clone())
                .collect(),
            index_buffer: info.index_buffer.clone(),
            images: target_info.image_resources.clone(),
            next_usages: target_info
                .usage_modes
                .iter()
                .map(|usage| usage.next_usage)
                .collect(),
        })
    }
}

/// All render effects of a context, keyed by name.
#[derive(Debug, Default)]
pub struct RenderEffectRegistry {
    effects: HashMap<String, (RenderEffectInfo, RenderEffect)>,
}

impl RenderEffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the effect `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is taken or a dependency is unknown.
    pub fn create(
        &mut self,
        backend: &dyn GpuBackend,
        sources: EffectSources<'_>,
        info: &RenderEffectInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        assert!(
            !self.effects.contains_key(name),
            "Attempted to create RenderEffect with name: '{name}' which already exists!"
        );
        let effect = RenderEffect::create(backend, sources, info, name)?;
        log::debug!(
            "Created render effect '{}' (target '{}', {})",
            name,
            info.render_target,
            effect.resolution
        );
        self.effects.insert(name.to_string(), (info.clone(), effect));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    fn entry(&self, name: &str) -> &(RenderEffectInfo, RenderEffect) {
        self.effects
            .get(name)
            .unwrap_or_else(|| panic!("RenderEffect '{name}' does not exist!"))
    }

    pub fn get(&self, name: &str) -> &RenderEffect {
        &self.entry(name).1
    }

    pub fn info(&self, name: &str) -> &RenderEffectInfo {
        &self.entry(name).0
    }

    /// Names of effects drawing into any of `targets`.
    pub fn using_targets(&self, targets: &[String]) -> Vec<String> {
        self.effects
            .iter()
            .filter(|(_, (info, _))| targets.contains(&info.render_target))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Rebuild `name` from its stored info, after its target was recreated.
    pub fn recreate(
        &mut self,
        backend: &dyn GpuBackend,
        sources: EffectSources<'_>,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let (info, old) = self
            .effects
            .remove(name)
            .unwrap_or_else(|| panic!("RenderEffect '{name}' does not exist!"));
        backend.destroy_pipeline(old.pipeline);
        let effect = RenderEffect::create(backend, sources, &info, name)?;
        self.effects.insert(name.to_string(), (info, effect));
        Ok(())
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend) {
        for (_, (_, effect)) in self.effects.drain() {
            backend.destroy_pipeline(effect.pipeline);
        }
    }
}
