//! Render passes, framebuffers, descriptor layouts and graphics pipelines.

use ash::vk;
use ash::vk::Handle;

use crate::backend::{
    AttachmentDescriptor, DescriptorBinding, DescriptorResource, DescriptorWrite,
    FramebufferDescriptor, GraphicsPipelineDescriptor, PipelineLayoutDescriptor,
    RenderPassDescriptor,
};
use crate::error::GraphicsError;

use super::conversion::{
    convert_access, convert_blend_state, convert_compare_op, convert_cull_mode,
    convert_descriptor_kind, convert_fill_mode, convert_front_face, convert_image_format,
    convert_layout, convert_load_op, convert_sample_count, convert_shader_stages, convert_stages,
    convert_store_op, convert_vertex_format, vk_error,
};

fn attachment_description(attachment: &AttachmentDescriptor) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(convert_image_format(attachment.format))
        .samples(convert_sample_count(attachment.samples))
        .load_op(convert_load_op(attachment.load_op))
        .store_op(convert_store_op(attachment.store_op))
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(convert_layout(attachment.initial_layout))
        .final_layout(convert_layout(attachment.final_layout))
}

/// Create a single-subpass render pass. Colors come first, depth last.
pub fn create_render_pass(
    device: &ash::Device,
    descriptor: &RenderPassDescriptor,
) -> Result<vk::RenderPass, GraphicsError> {
    let mut attachments: Vec<vk::AttachmentDescription> = descriptor
        .color_attachments
        .iter()
        .map(attachment_description)
        .collect();
    attachments.push(attachment_description(&descriptor.depth_attachment));

    let color_refs: Vec<vk::AttachmentReference> = (0..descriptor.color_attachments.len())
        .map(|index| vk::AttachmentReference {
            attachment: index as u32,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();
    let depth_ref = vk::AttachmentReference {
        attachment: descriptor.color_attachments.len() as u32,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)];

    // Attachment writes of the previous pass using the same images must land
    // before this pass loads or clears them.
    let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let attachment_writes =
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(attachment_stages)
            .dst_stage_mask(attachment_stages)
            .src_access_mask(attachment_writes)
            .dst_access_mask(
                attachment_writes
                    | vk::AccessFlags::COLOR_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            ),
        // Whatever reads the attachments after the pass (sampling, blits,
        // the next pass) waits for these writes.
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(attachment_stages)
            .dst_stage_mask(convert_stages(descriptor.next_stages))
            .src_access_mask(attachment_writes)
            .dst_access_mask(convert_access(descriptor.next_access)),
    ];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&create_info, None) }
        .map_err(|e| vk_error("Failed to create render pass", e))
}

pub fn create_framebuffer(
    device: &ash::Device,
    descriptor: &FramebufferDescriptor,
) -> Result<vk::Framebuffer, GraphicsError> {
    let attachments: Vec<vk::ImageView> = descriptor
        .attachments
        .iter()
        .map(|view| vk::ImageView::from_raw(view.0))
        .collect();

    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(vk::RenderPass::from_raw(descriptor.render_pass.0))
        .attachments(&attachments)
        .width(descriptor.extent.width)
        .height(descriptor.extent.height)
        .layers(1);

    unsafe { device.create_framebuffer(&create_info, None) }
        .map_err(|e| vk_error("Failed to create framebuffer", e))
}

pub fn create_descriptor_set_layout(
    device: &ash::Device,
    bindings: &[DescriptorBinding],
) -> Result<vk::DescriptorSetLayout, GraphicsError> {
    let bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding.binding)
                .descriptor_type(convert_descriptor_kind(binding.kind))
                .descriptor_count(1)
                .stage_flags(convert_shader_stages(binding.stages))
        })
        .collect();

    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

    unsafe { device.create_descriptor_set_layout(&create_info, None) }
        .map_err(|e| vk_error("Failed to create descriptor set layout", e))
}

pub fn allocate_descriptor_set(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
) -> Result<vk::DescriptorSet, GraphicsError> {
    let layouts = [layout];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);

    let sets = unsafe { device.allocate_descriptor_sets(&alloc_info) }
        .map_err(|e| vk_error("Failed to allocate descriptor set", e))?;
    sets.into_iter()
        .next()
        .ok_or_else(|| GraphicsError::Internal("Descriptor set allocation returned nothing".into()))
}

pub fn write_descriptor_set(device: &ash::Device, set: vk::DescriptorSet, writes: &[DescriptorWrite]) {
    // Info structs must outlive the write structs pointing into them.
    let buffer_infos: Vec<vk::DescriptorBufferInfo> = writes
        .iter()
        .map(|write| match write.resource {
            DescriptorResource::Buffer { buffer, size } => vk::DescriptorBufferInfo {
                buffer: vk::Buffer::from_raw(buffer.0),
                offset: 0,
                range: size,
            },
            DescriptorResource::ImageSampler { .. } => vk::DescriptorBufferInfo::default(),
        })
        .collect();
    let image_infos: Vec<vk::DescriptorImageInfo> = writes
        .iter()
        .map(|write| match write.resource {
            DescriptorResource::ImageSampler { view, sampler } => vk::DescriptorImageInfo {
                sampler: vk::Sampler::from_raw(sampler.0),
                image_view: vk::ImageView::from_raw(view.0),
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
            DescriptorResource::Buffer { .. } => vk::DescriptorImageInfo::default(),
        })
        .collect();

    let vk_writes: Vec<vk::WriteDescriptorSet> = writes
        .iter()
        .enumerate()
        .map(|(index, write)| {
            let base = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(write.binding)
                .descriptor_type(convert_descriptor_kind(write.kind));
            match write.resource {
                DescriptorResource::Buffer { .. } => {
                    base.buffer_info(std::slice::from_ref(&buffer_infos[index]))
                }
                DescriptorResource::ImageSampler { .. } => {
                    base.image_info(std::slice::from_ref(&image_infos[index]))
                }
            }
        })
        .collect();

    unsafe { device.update_descriptor_sets(&vk_writes, &[]) };
}

pub fn create_pipeline_layout(
    device: &ash::Device,
    descriptor: &PipelineLayoutDescriptor,
) -> Result<vk::PipelineLayout, GraphicsError> {
    let set_layouts: Vec<vk::DescriptorSetLayout> = descriptor
        .set_layouts
        .iter()
        .map(|layout| vk::DescriptorSetLayout::from_raw(layout.0))
        .collect();
    let push_constant_ranges: Vec<vk::PushConstantRange> = descriptor
        .push_constant
        .iter()
        .map(|range| vk::PushConstantRange {
            stage_flags: convert_shader_stages(range.stages),
            offset: range.offset,
            size: range.size,
        })
        .collect();

    let create_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(&set_layouts)
        .push_constant_ranges(&push_constant_ranges);

    unsafe { device.create_pipeline_layout(&create_info, None) }
        .map_err(|e| vk_error("Failed to create pipeline layout", e))
}

pub fn create_shader_module(
    device: &ash::Device,
    spirv: &[u32],
) -> Result<vk::ShaderModule, GraphicsError> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(spirv);
    unsafe { device.create_shader_module(&create_info, None) }
        .map_err(|e| vk_error("Failed to create shader module", e))
}

/// Create a triangle-list pipeline with one vertex binding per stream and a
/// fixed viewport covering the descriptor's extent.
pub fn create_graphics_pipeline(
    device: &ash::Device,
    descriptor: &GraphicsPipelineDescriptor,
) -> Result<vk::Pipeline, GraphicsError> {
    let mut shader_stages = vec![
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vk::ShaderModule::from_raw(descriptor.vertex_shader.0))
            .name(c"main"),
    ];
    if let Some(fragment) = descriptor.fragment_shader {
        shader_stages.push(
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(vk::ShaderModule::from_raw(fragment.0))
                .name(c"main"),
        );
    }

    let binding_descriptions: Vec<vk::VertexInputBindingDescription> = descriptor
        .vertex_streams
        .iter()
        .enumerate()
        .map(|(index, stream)| {
            vk::VertexInputBindingDescription::default()
                .binding(index as u32)
                .stride(stream.format.size())
                .input_rate(vk::VertexInputRate::VERTEX)
        })
        .collect();
    let attribute_descriptions: Vec<vk::VertexInputAttributeDescription> = descriptor
        .vertex_streams
        .iter()
        .enumerate()
        .map(|(index, stream)| {
            vk::VertexInputAttributeDescription::default()
                .location(index as u32)
                .binding(index as u32)
                .format(convert_vertex_format(stream.format))
                .offset(0)
        })
        .collect();
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&binding_descriptions)
        .vertex_attribute_descriptions(&attribute_descriptions);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let extent = vk::Extent2D {
        width: descriptor.extent.width,
        height: descriptor.extent.height,
    };
    let viewports = [vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }];
    let scissors = [vk::Rect2D {
        offset: vk::Offset2D::default(),
        extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let raster = &descriptor.rasterization;
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(convert_fill_mode(raster.fill_mode))
        .line_width(raster.line_width)
        .cull_mode(convert_cull_mode(raster.cull_mode))
        .front_face(convert_front_face(raster.front_face))
        .depth_bias_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(convert_sample_count(descriptor.samples));

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(descriptor.depth.test_enabled)
        .depth_write_enable(descriptor.depth.write_enabled)
        .depth_compare_op(convert_compare_op(descriptor.depth.compare))
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = descriptor
        .color_blend
        .iter()
        .map(convert_blend_state)
        .collect();
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .depth_stencil_state(&depth_stencil_state)
        .color_blend_state(&color_blend_state)
        .layout(vk::PipelineLayout::from_raw(descriptor.layout.0))
        .render_pass(vk::RenderPass::from_raw(descriptor.render_pass.0))
        .subpass(0);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    }
    .map_err(|(_, e)| vk_error("Failed to create graphics pipeline", e))?;

    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| GraphicsError::Internal("Pipeline creation returned nothing".into()))
}
