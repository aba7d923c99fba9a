use glam::Vec4;

use super::{FieldFormat, FieldLayout, GpuLayout, VertexLayout};

/// 16-byte position vertex. Must match the WGSL `Vertex` in
/// `texture_to_buffer.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Homogeneous position (xyzw).
    pub pos: [f32; 4],
}

const _: () = assert!(
    size_of::<Vertex>() == 16,
    "size of texture-to-buffer Vertex does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(Vertex, pos) == 0,
    "offset of texture-to-buffer Vertex.pos does not match WGSL"
);

impl Vertex {
    /// Vertex at the given homogeneous position.
    #[must_use]
    pub fn new(pos: Vec4) -> Self {
        Self { pos: pos.to_array() }
    }
}

impl GpuLayout for Vertex {
    const NAME: &'static str = "Vertex";
    const FIELDS: &'static [FieldLayout] = &[FieldLayout {
        name: "pos",
        offset: 0,
        format: FieldFormat::Float32x4,
    }];
}

impl VertexLayout for Vertex {
    const ATTRIBUTES: &'static [wgpu::VertexAttribute] =
        &wgpu::vertex_attr_array![0 => Float32x4];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::codec;

    #[test]
    fn vertex_is_16_bytes() {
        assert_eq!(Vertex::size(), 16);
        assert_eq!(Vertex::check_host(), Ok(()));
    }

    #[test]
    fn pos_survives_a_flat_buffer_field_by_field() {
        let v = Vertex::new(Vec4::new(1.0, 2.0, 3.0, 4.0));
        let bytes = codec::encode_slice(&[v]);
        assert_eq!(bytes.len(), 16);

        let pos = codec::read_field_f32s::<Vertex>(&bytes, 0, "pos").unwrap();
        assert_eq!(pos, vec![1.0, 2.0, 3.0, 4.0]);

        let back: Vertex = codec::read_at(&bytes, 0).unwrap();
        assert_eq!(back.pos, [1.0, 2.0, 3.0, 4.0]);
    }
}
