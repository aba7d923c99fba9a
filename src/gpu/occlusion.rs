//! Headless run of the occlusion-query repro.
//!
//! Every draw slot of an iteration records its own render pass with an
//! occlusion query, resolves the query, places the result at
//! [`VISIBILITY_RESULT_OFFSET`] of the visibility buffer next to the running
//! result in word 0, and dispatches `cs_main` over both words. The running
//! result is read back once the whole iteration has been submitted.

use crate::error::ReproError;
use crate::layout::occlusion::CombineVisibilityResultOptions;
use crate::repro::occlusion::{
    iteration_draws, IterationOutcome, Triangle, COMBINE_OPTIONS, DRAW_SLOTS,
    VISIBILITY_BUFFER_SIZE, VISIBILITY_RESULT_OFFSET,
};
use crate::shaders::Repro;

use super::buffer;
use super::context::GpuContext;
use super::pipeline::{
    combine_layout, create_combine_pipeline, create_vertex_pull_pipeline, shader_module,
    vertex_pull_layout, COLOR_FORMAT,
};

/// Side of the square color target the triangles are drawn into.
pub const TARGET_SIZE: u32 = 64;
/// Bytes of one resolved occlusion query.
const QUERY_RESULT_SIZE: u64 = 8;
/// Stride between per-slot query resolves.
const RESOLVE_STRIDE: u64 = wgpu::QUERY_RESOLVE_BUFFER_ALIGNMENT;

/// Render and combine pipelines plus the layouts their bind groups need.
pub struct OcclusionPipelines {
    /// Triangle pipeline.
    pub render: wgpu::RenderPipeline,
    /// `cs_main`, specialized on `combine_with_existing_result`.
    pub combine: wgpu::ComputePipeline,
    /// Vertex storage buffer layout.
    pub vertex_layout: wgpu::BindGroupLayout,
    /// Options, visibility words and combined word.
    pub combine_layout: wgpu::BindGroupLayout,
}

impl OcclusionPipelines {
    /// Build both pipelines from the occlusion shader.
    ///
    /// # Errors
    ///
    /// [`ReproError::Shader`] if the shader is invalid.
    pub fn build(
        device: &wgpu::Device,
        combine_with_existing_result: bool,
    ) -> Result<Self, ReproError> {
        let shader = shader_module(device, Repro::Occlusion)?;
        let vertex_layout = vertex_pull_layout(device, "Occlusion");
        let combine_layout = combine_layout(device);
        Ok(Self {
            render: create_vertex_pull_pipeline(
                device,
                "Occlusion",
                &shader,
                &vertex_layout,
                COLOR_FORMAT,
                None,
            ),
            combine: create_combine_pipeline(
                device,
                &shader,
                &combine_layout,
                combine_with_existing_result,
            ),
            vertex_layout,
            combine_layout,
        })
    }
}

/// Buffers and bind groups shared by every iteration.
pub struct OcclusionRun<'a> {
    context: &'a GpuContext,
    pipelines: &'a OcclusionPipelines,
    target: wgpu::TextureView,
    query_set: wgpu::QuerySet,
    on_screen: wgpu::BindGroup,
    off_screen: wgpu::BindGroup,
    options: wgpu::Buffer,
}

impl<'a> OcclusionRun<'a> {
    /// Upload both triangles and the combine options.
    ///
    /// # Errors
    ///
    /// [`ReproError::Encode`] if the options cannot be encoded.
    pub fn new(
        context: &'a GpuContext,
        pipelines: &'a OcclusionPipelines,
    ) -> Result<Self, ReproError> {
        let device = &context.device;
        let target = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Occlusion Target"),
                size: wgpu::Extent3d {
                    width: TARGET_SIZE,
                    height: TARGET_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: COLOR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());
        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("Occlusion Queries"),
            ty: wgpu::QueryType::Occlusion,
            count: DRAW_SLOTS,
        });

        let triangle_group = |triangle: Triangle, label: &str| {
            let vertices = buffer::upload(
                device,
                label,
                &triangle.vertices(),
                wgpu::BufferUsages::STORAGE,
            );
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &pipelines.vertex_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: vertices.as_entire_binding(),
                }],
            })
        };

        Ok(Self {
            context,
            pipelines,
            target,
            query_set,
            on_screen: triangle_group(Triangle::OnScreen, "On-screen Triangle"),
            off_screen: triangle_group(Triangle::OffScreen, "Off-screen Triangle"),
            options: buffer::options_uniform(device, &COMBINE_OPTIONS)?,
        })
    }

    /// Record, submit and read back one iteration.
    ///
    /// # Errors
    ///
    /// [`ReproError::Readback`] if the combined result cannot be read.
    pub fn run_iteration(&self, index: u32) -> Result<IterationOutcome, ReproError> {
        let device = &self.context.device;
        let resolve = buffer::zeroed(
            device,
            "Query Resolve",
            RESOLVE_STRIDE * u64::from(DRAW_SLOTS),
            wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
        );
        let visibility = buffer::zeroed(
            device,
            "Visibility Results",
            VISIBILITY_BUFFER_SIZE,
            wgpu::BufferUsages::STORAGE,
        );
        let combined = buffer::zeroed(
            device,
            "Combined Result",
            QUERY_RESULT_SIZE,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );
        let staging = buffer::zeroed(
            device,
            "Combined Result Staging",
            QUERY_RESULT_SIZE,
            wgpu::BufferUsages::MAP_READ,
        );
        let combine_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Combine Bind Group"),
            layout: &self.pipelines.combine_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.options.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: visibility.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: combined.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.context.create_encoder(&format!("Occlusion Iteration {index}"));
        for (slot, triangle) in iteration_draws(index).into_iter().enumerate() {
            let slot = slot as u32;
            let triangle_group = match triangle {
                Triangle::OnScreen => &self.on_screen,
                Triangle::OffScreen => &self.off_screen,
            };
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Occlusion Draw"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &self.target,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: Some(&self.query_set),
                });
                pass.set_pipeline(&self.pipelines.render);
                pass.set_bind_group(0, triangle_group, &[]);
                pass.begin_occlusion_query(slot);
                pass.draw(0..3, 0..1);
                pass.end_occlusion_query();
            }

            let resolve_offset = RESOLVE_STRIDE * u64::from(slot);
            encoder.resolve_query_set(&self.query_set, slot..slot + 1, &resolve, resolve_offset);
            encoder.copy_buffer_to_buffer(
                &resolve,
                resolve_offset,
                &visibility,
                VISIBILITY_RESULT_OFFSET,
                QUERY_RESULT_SIZE,
            );
            encoder.copy_buffer_to_buffer(&combined, 0, &visibility, 0, QUERY_RESULT_SIZE);
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Combine Visibility Results"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipelines.combine);
                pass.set_bind_group(0, &combine_group, &[]);
                pass.dispatch_workgroups(1, 1, 1);
            }
        }
        encoder.copy_buffer_to_buffer(&combined, 0, &staging, 0, QUERY_RESULT_SIZE);

        let submission = self.context.submit(encoder);
        let bytes = buffer::read_back(self.context, &staging, submission)?;
        let word = bytes
            .get(..8)
            .and_then(|b| b.try_into().ok())
            .map_or(0, u64::from_le_bytes);
        let outcome = IterationOutcome::evaluate(index, word);
        if outcome.is_ok() {
            log::debug!("{outcome}");
        } else {
            log::warn!("{outcome}");
        }
        Ok(outcome)
    }

    /// Run iterations `0..iterations` in order.
    ///
    /// # Errors
    ///
    /// As [`OcclusionRun::run_iteration`].
    pub fn run(&self, iterations: u32) -> Result<Vec<IterationOutcome>, ReproError> {
        (0..iterations).map(|i| self.run_iteration(i)).collect()
    }
}

/// Byte range of the visibility buffer `cs_main` reads for `options`.
#[must_use]
pub fn combined_byte_range(options: &CombineVisibilityResultOptions) -> std::ops::Range<u64> {
    let range = options.range();
    range.start as u64 * QUERY_RESULT_SIZE..range.end as u64 * QUERY_RESULT_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_reads_the_whole_visibility_buffer() {
        let bytes = combined_byte_range(&COMBINE_OPTIONS);
        assert_eq!(bytes, 0..VISIBILITY_BUFFER_SIZE);
        assert!(bytes.contains(&VISIBILITY_RESULT_OFFSET));
    }

    #[test]
    fn per_slot_resolves_are_aligned() {
        assert_eq!(RESOLVE_STRIDE % wgpu::QUERY_RESOLVE_BUFFER_ALIGNMENT, 0);
        assert!(QUERY_RESULT_SIZE <= RESOLVE_STRIDE);
        assert_eq!(QUERY_RESULT_SIZE % wgpu::COPY_BUFFER_ALIGNMENT, 0);
    }
}
