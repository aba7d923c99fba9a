//! Bind-group layouts and pipelines for the repro shaders.
//!
//! Render pipelines pull vertices from a read-only storage buffer at
//! `@group(0) @binding(0)` instead of using fixed-function vertex fetch, so
//! the shader reads the host struct bytes directly.

use std::borrow::Cow;

use crate::error::ReproError;
use crate::repro::stencil_clear::{self, StencilClearOptions};
use crate::repro::texture_to_buffer::TextureToBufferOptions;
use crate::shaders::{self, Repro};

use super::context::GpuContext;
use super::occlusion::OcclusionPipelines;

/// Color target used by the occlusion and stencil-clear pipelines.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Name of the combine kernel's pipeline-overridable constant.
pub const COMBINE_CONSTANT: &str = "combine_with_existing_result";

/// Storage buffer binding; read-only unless `writable`.
pub fn storage_buffer(
    binding: u32,
    visibility: wgpu::ShaderStages,
    writable: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage {
                read_only: !writable,
            },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Uniform buffer binding.
pub fn uniform_buffer(
    binding: u32,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Parse and validate a repro shader and hand the IR straight to wgpu.
///
/// # Errors
///
/// [`ReproError::Shader`] if the WGSL is invalid.
pub fn shader_module(
    device: &wgpu::Device,
    repro: Repro,
) -> Result<wgpu::ShaderModule, ReproError> {
    let module = shaders::parse(repro)?;
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(repro.label()),
        source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
    }))
}

/// Layout with the vertex storage buffer at binding 0.
pub fn vertex_pull_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label} Vertex Layout")),
        entries: &[storage_buffer(0, wgpu::ShaderStages::VERTEX, false)],
    })
}

/// Layout for the combine kernel: options, visibility words, combined word.
pub fn combine_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Combine Layout"),
        entries: &[
            uniform_buffer(1, wgpu::ShaderStages::COMPUTE),
            storage_buffer(2, wgpu::ShaderStages::COMPUTE, false),
            storage_buffer(3, wgpu::ShaderStages::COMPUTE, true),
        ],
    })
}

/// Render pipeline with `vs_main` / `fs_main`, no vertex buffers and a
/// single color target.
pub fn create_vertex_pull_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    depth_stencil: Option<wgpu::DepthStencilState>,
) -> wgpu::RenderPipeline {
    let pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label} Pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Value wgpu expects for a boolean override constant.
#[must_use]
pub fn combine_constant_value(combine_with_existing_result: bool) -> f64 {
    if combine_with_existing_result {
        1.0
    } else {
        0.0
    }
}

/// Compute pipeline for `cs_main`, specialized on
/// `combine_with_existing_result`.
pub fn create_combine_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    bind_group_layout: &wgpu::BindGroupLayout,
    combine_with_existing_result: bool,
) -> wgpu::ComputePipeline {
    let pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Combine Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });
    let constants = [(
        COMBINE_CONSTANT,
        combine_constant_value(combine_with_existing_result),
    )];
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Combine Pipeline"),
        layout: Some(&pipeline_layout),
        module: shader,
        entry_point: Some("cs_main"),
        compilation_options: wgpu::PipelineCompilationOptions {
            constants: &constants,
            ..Default::default()
        },
        cache: None,
    })
}

/// Whether a color target of this format accepts a float fragment output.
#[must_use]
pub fn writes_float(format: wgpu::TextureFormat) -> bool {
    matches!(
        format.sample_type(None, None),
        Some(wgpu::TextureSampleType::Float { .. })
    )
}

/// Every pipeline the repros need, built on one device.
pub struct ReproPipelines {
    /// Occlusion triangle pipeline and combine kernel.
    pub occlusion: OcclusionPipelines,
    /// Stencil-tested quad pipeline; `None` without `DEPTH32FLOAT_STENCIL8`.
    pub stencil_clear: Option<wgpu::RenderPipeline>,
    /// Texture-to-buffer pipelines, one per renderable configured format.
    pub texture_to_buffer: Vec<(wgpu::TextureFormat, wgpu::RenderPipeline)>,
}

impl ReproPipelines {
    /// Build every pipeline.
    ///
    /// # Errors
    ///
    /// [`ReproError::Shader`] if a shader is invalid, or
    /// [`ReproError::UnknownFormat`] for an unknown texture format name.
    pub fn build(
        context: &GpuContext,
        combine_with_existing_result: bool,
        stencil: &StencilClearOptions,
        copy: &TextureToBufferOptions,
    ) -> Result<Self, ReproError> {
        let device = &context.device;

        let occlusion = OcclusionPipelines::build(device, combine_with_existing_result)?;

        let stencil_clear = if context.supports_depth32_stencil8() {
            let shader = shader_module(device, Repro::StencilClear)?;
            let layout = vertex_pull_layout(device, "Stencil Clear");
            Some(create_vertex_pull_pipeline(
                device,
                "Stencil Clear",
                &shader,
                &layout,
                COLOR_FORMAT,
                Some(stencil_clear::depth_stencil_state(stencil)),
            ))
        } else {
            None
        };

        let shader = shader_module(device, Repro::TextureToBuffer)?;
        let layout = vertex_pull_layout(device, "Texture To Buffer");
        let mut texture_to_buffer = Vec::new();
        for info in copy.resolve_formats()? {
            let features = info.format.guaranteed_format_features(device.features());
            if !features
                .allowed_usages
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
            {
                log::warn!("{} is not renderable; skipping its pipeline", info.name);
                continue;
            }
            // fs_main writes vec4<f32>
            if !writes_float(info.format) {
                log::warn!("{} is not a float format; skipping its pipeline", info.name);
                continue;
            }
            let pipeline = create_vertex_pull_pipeline(
                device,
                &format!("Texture To Buffer {}", info.name),
                &shader,
                &layout,
                info.format,
                None,
            );
            texture_to_buffer.push((info.format, pipeline));
        }

        log::info!(
            "built pipelines: occlusion, combine, stencil clear: {}, texture to buffer: {}",
            stencil_clear.is_some(),
            texture_to_buffer.len()
        );
        Ok(Self {
            occlusion,
            stencil_clear,
            texture_to_buffer,
        })
    }
}
