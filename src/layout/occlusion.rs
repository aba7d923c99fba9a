use glam::Vec4;

use super::{FieldFormat, FieldLayout, GpuLayout, VertexLayout};

/// 32-byte colored vertex. Must match the WGSL `Vertex` in `occlusion.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// RGBA color.
    pub color: [f32; 4],
    /// Clip-space position (xyzw).
    pub pos: [f32; 4],
}

const _: () = assert!(
    size_of::<Vertex>() == 32,
    "size of occlusion Vertex does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(Vertex, color) == 0,
    "offset of occlusion Vertex.color does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(Vertex, pos) == 16,
    "offset of occlusion Vertex.pos does not match WGSL"
);

impl Vertex {
    /// Vertex from a color and a clip-space position.
    #[must_use]
    pub fn new(color: Vec4, pos: Vec4) -> Self {
        Self {
            color: color.to_array(),
            pos: pos.to_array(),
        }
    }
}

impl GpuLayout for Vertex {
    const NAME: &'static str = "Vertex";
    const FIELDS: &'static [FieldLayout] = &[
        FieldLayout {
            name: "color",
            offset: 0,
            format: FieldFormat::Float32x4,
        },
        FieldLayout {
            name: "pos",
            offset: 16,
            format: FieldFormat::Float32x4,
        },
    ];
}

impl VertexLayout for Vertex {
    const ATTRIBUTES: &'static [wgpu::VertexAttribute] =
        &wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];
}

/// Sub-range of the visibility results the combine kernel folds together.
/// Must match the WGSL `CombineVisibilityResultOptions`.
#[repr(C)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    bytemuck::Pod,
    bytemuck::Zeroable,
    encase::ShaderType,
)]
pub struct CombineVisibilityResultOptions {
    /// First 64-bit result word to combine.
    pub start_offset: u32,
    /// Number of result words to combine.
    pub num_offsets: u32,
}

const _: () = assert!(
    size_of::<CombineVisibilityResultOptions>() == 8,
    "size of CombineVisibilityResultOptions does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(CombineVisibilityResultOptions, start_offset) == 0,
    "offset of CombineVisibilityResultOptions.start_offset does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(CombineVisibilityResultOptions, num_offsets) == 4,
    "offset of CombineVisibilityResultOptions.num_offsets does not match WGSL"
);

impl CombineVisibilityResultOptions {
    /// Options covering `num_offsets` words starting at `start_offset`.
    #[must_use]
    pub const fn new(start_offset: u32, num_offsets: u32) -> Self {
        Self {
            start_offset,
            num_offsets,
        }
    }

    /// Word range as `usize` indices.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.start_offset as usize;
        start..start + self.num_offsets as usize
    }
}

impl GpuLayout for CombineVisibilityResultOptions {
    const NAME: &'static str = "CombineVisibilityResultOptions";
    const FIELDS: &'static [FieldLayout] = &[
        FieldLayout {
            name: "start_offset",
            offset: 0,
            format: FieldFormat::Uint32,
        },
        FieldLayout {
            name: "num_offsets",
            offset: 4,
            format: FieldFormat::Uint32,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::codec;

    #[test]
    fn vertex_is_32_bytes_with_pos_after_color() {
        assert_eq!(Vertex::size(), 32);
        assert_eq!(Vertex::field("color").map(|f| f.offset), Some(0));
        assert_eq!(Vertex::field("pos").map(|f| f.offset), Some(16));
        assert_eq!(Vertex::check_host(), Ok(()));
    }

    #[test]
    fn vertex_attributes_follow_field_table() {
        let layout = Vertex::vertex_buffer_layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), Vertex::FIELDS.len());
        for (attr, field) in layout.attributes.iter().zip(Vertex::FIELDS) {
            assert_eq!(attr.offset as usize, field.offset);
            assert_eq!(attr.format, field.format.vertex_format());
        }
    }

    #[test]
    fn vertex_bytes_keep_color_first() {
        let v = Vertex::new(
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(-1.0, 2.0, 0.5, 1.0),
        );
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[16..20], &(-1.0f32).to_ne_bytes());
        assert_eq!(&bytes[20..24], &2.0f32.to_ne_bytes());
    }

    #[test]
    fn options_are_8_bytes() {
        assert_eq!(CombineVisibilityResultOptions::size(), 8);
        assert_eq!(CombineVisibilityResultOptions::check_host(), Ok(()));
        assert_eq!(
            CombineVisibilityResultOptions::field("num_offsets")
                .map(|f| f.offset),
            Some(4)
        );
    }

    #[test]
    fn zero_options_keep_fixed_footprint() {
        let zero = CombineVisibilityResultOptions::new(0, 0);
        let busy = CombineVisibilityResultOptions::new(7, 1024);
        assert_eq!(codec::encode_slice(&[zero]).len(), 8);
        assert_eq!(codec::encode_slice(&[busy]).len(), 8);
        assert_eq!(bytemuck::bytes_of(&zero), &[0u8; 8]);
        assert!(zero.range().is_empty());
    }

    #[test]
    fn options_range() {
        assert_eq!(CombineVisibilityResultOptions::new(0, 2).range(), 0..2);
        assert_eq!(CombineVisibilityResultOptions::new(3, 4).range(), 3..7);
    }
}
