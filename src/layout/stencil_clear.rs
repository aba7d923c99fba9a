use glam::Vec2;

use super::{FieldFormat, FieldLayout, GpuLayout, VertexLayout};

/// 8-byte NDC position vertex. Must match the WGSL `Vertex` in
/// `stencil_clear.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Normalized device coordinates (xy).
    pub pos: [f32; 2],
}

const _: () = assert!(
    size_of::<Vertex>() == 8,
    "size of stencil-clear Vertex does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(Vertex, pos) == 0,
    "offset of stencil-clear Vertex.pos does not match WGSL"
);

impl Vertex {
    /// Vertex at the given NDC position.
    #[must_use]
    pub fn new(pos: Vec2) -> Self {
        Self { pos: pos.to_array() }
    }
}

impl GpuLayout for Vertex {
    const NAME: &'static str = "Vertex";
    const FIELDS: &'static [FieldLayout] = &[FieldLayout {
        name: "pos",
        offset: 0,
        format: FieldFormat::Float32x2,
    }];
}

impl VertexLayout for Vertex {
    const ATTRIBUTES: &'static [wgpu::VertexAttribute] =
        &wgpu::vertex_attr_array![0 => Float32x2];
}
