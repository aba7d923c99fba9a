//! Host-side struct layouts shared with shader code.
//!
//! Every struct in this module is read by a shader as raw bytes, so field
//! order, width and offset are part of the contract. Sizes and offsets are
//! asserted at compile time next to each struct; the static field tables
//! ([`GpuLayout::FIELDS`]) carry the same information at runtime so the
//! shader-side definitions can be checked against them (see
//! [`crate::shaders::reflect`]).

/// Flat byte-buffer encoding and field-by-field reads.
pub mod codec;
/// Occlusion-query repro: colored vertex and combine-kernel options.
pub mod occlusion;
/// Stencil-clear repro: 2D position vertex.
pub mod stencil_clear;
/// Texture-to-buffer repro: homogeneous position vertex.
pub mod texture_to_buffer;

use std::fmt;

/// Element format of one struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Two `f32` components (`vec2<f32>`).
    Float32x2,
    /// Four `f32` components (`vec4<f32>`).
    Float32x4,
    /// One `u32`.
    Uint32,
}

impl FieldFormat {
    /// Size of the field in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x4 => 16,
            Self::Uint32 => 4,
        }
    }

    /// Number of scalar components.
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Float32x2 => 2,
            Self::Float32x4 => 4,
            Self::Uint32 => 1,
        }
    }

    /// Matching vertex attribute format.
    #[must_use]
    pub const fn vertex_format(self) -> wgpu::VertexFormat {
        match self {
            Self::Float32x2 => wgpu::VertexFormat::Float32x2,
            Self::Float32x4 => wgpu::VertexFormat::Float32x4,
            Self::Uint32 => wgpu::VertexFormat::Uint32,
        }
    }

    /// WGSL spelling of the type.
    #[must_use]
    pub const fn wgsl_name(self) -> &'static str {
        match self {
            Self::Float32x2 => "vec2<f32>",
            Self::Float32x4 => "vec4<f32>",
            Self::Uint32 => "u32",
        }
    }
}

impl fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wgsl_name())
    }
}

/// One named field of a host struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Field name, identical on both sides of the interop boundary.
    pub name: &'static str,
    /// Byte offset from the start of the struct.
    pub offset: usize,
    /// Element format.
    pub format: FieldFormat,
}

impl FieldLayout {
    /// Byte offset one past the end of the field.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.format.size()
    }
}

/// A plain-old-data struct with a fixed, shader-visible byte layout.
pub trait GpuLayout: bytemuck::Pod {
    /// Struct name as declared in the shader.
    const NAME: &'static str;
    /// Fields in declaration order.
    const FIELDS: &'static [FieldLayout];

    /// Size of one element in bytes.
    #[must_use]
    fn size() -> usize {
        size_of::<Self>()
    }

    /// Look up a field by name.
    #[must_use]
    fn field(name: &str) -> Option<&'static FieldLayout> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Check that the field table tiles the struct exactly: fields in order,
    /// no gaps, and the last field ends at `size_of::<Self>()`.
    ///
    /// # Errors
    ///
    /// Returns the first [`LayoutError`] found.
    fn check_host() -> Result<(), LayoutError> {
        let mut cursor = 0;
        for field in Self::FIELDS {
            if field.offset != cursor {
                return Err(LayoutError::NotContiguous {
                    structure: Self::NAME,
                    field: field.name,
                    expected: cursor,
                    actual: field.offset,
                });
            }
            cursor = field.end();
        }
        if cursor == Self::size() {
            Ok(())
        } else {
            Err(LayoutError::SizeMismatch {
                structure: Self::NAME,
                host: Self::size(),
                shader: cursor,
            })
        }
    }
}

/// A [`GpuLayout`] that can also be fed through fixed-function vertex fetch.
pub trait VertexLayout: GpuLayout {
    /// Attributes in field order, shader locations starting at 0.
    const ATTRIBUTES: &'static [wgpu::VertexAttribute];

    /// Per-vertex buffer layout with a tightly packed stride.
    #[must_use]
    fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: Self::ATTRIBUTES,
        }
    }
}

/// Disagreement between a layout and the bytes or shader that consume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The shader module declares no struct with this name.
    MissingStruct {
        /// Struct name looked up.
        structure: &'static str,
    },
    /// Total struct size differs.
    SizeMismatch {
        /// Struct name.
        structure: &'static str,
        /// Host size in bytes.
        host: usize,
        /// Shader (or field-table) size in bytes.
        shader: usize,
    },
    /// Number of members differs.
    FieldCount {
        /// Struct name.
        structure: &'static str,
        /// Host field count.
        host: usize,
        /// Shader member count.
        shader: usize,
    },
    /// Member at `index` has a different name.
    FieldName {
        /// Struct name.
        structure: &'static str,
        /// Member position.
        index: usize,
        /// Host field name.
        host: &'static str,
        /// Shader member name.
        shader: String,
    },
    /// Member starts at a different byte offset.
    FieldOffset {
        /// Struct name.
        structure: &'static str,
        /// Field name.
        field: &'static str,
        /// Host offset.
        host: usize,
        /// Shader offset.
        shader: usize,
    },
    /// Member has a different type.
    FieldFormat {
        /// Struct name.
        structure: &'static str,
        /// Field name.
        field: &'static str,
        /// Host format.
        host: FieldFormat,
        /// Shader type, as reflected.
        shader: String,
    },
    /// Field table leaves a gap or overlaps.
    NotContiguous {
        /// Struct name.
        structure: &'static str,
        /// First offending field.
        field: &'static str,
        /// Offset the field should start at.
        expected: usize,
        /// Offset it actually starts at.
        actual: usize,
    },
    /// Byte buffer length is not a whole number of elements.
    BufferLength {
        /// Struct name.
        structure: &'static str,
        /// Buffer length in bytes.
        len: usize,
        /// Element size in bytes.
        size: usize,
    },
    /// Element index past the end of the buffer.
    OutOfBounds {
        /// Struct name.
        structure: &'static str,
        /// Requested element.
        index: usize,
        /// Elements in the buffer.
        count: usize,
    },
    /// No field with this name.
    UnknownField {
        /// Struct name.
        structure: &'static str,
        /// Requested field.
        field: String,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStruct { structure } => {
                write!(f, "shader declares no struct '{structure}'")
            }
            Self::SizeMismatch {
                structure,
                host,
                shader,
            } => write!(
                f,
                "{structure}: host size {host} bytes, shader size {shader} bytes"
            ),
            Self::FieldCount {
                structure,
                host,
                shader,
            } => write!(
                f,
                "{structure}: host has {host} fields, shader has {shader}"
            ),
            Self::FieldName {
                structure,
                index,
                host,
                shader,
            } => write!(
                f,
                "{structure}: field {index} is '{host}' on the host but \
                 '{shader}' in the shader"
            ),
            Self::FieldOffset {
                structure,
                field,
                host,
                shader,
            } => write!(
                f,
                "{structure}.{field}: host offset {host}, shader offset {shader}"
            ),
            Self::FieldFormat {
                structure,
                field,
                host,
                shader,
            } => write!(
                f,
                "{structure}.{field}: host type {host}, shader type {shader}"
            ),
            Self::NotContiguous {
                structure,
                field,
                expected,
                actual,
            } => write!(
                f,
                "{structure}.{field}: expected offset {expected}, found {actual}"
            ),
            Self::BufferLength {
                structure,
                len,
                size,
            } => write!(
                f,
                "{len} bytes is not a whole number of {structure} ({size} bytes)"
            ),
            Self::OutOfBounds {
                structure,
                index,
                count,
            } => write!(
                f,
                "{structure} index {index} out of bounds ({count} elements)"
            ),
            Self::UnknownField { structure, field } => {
                write!(f, "{structure} has no field '{field}'")
            }
        }
    }
}

impl std::error::Error for LayoutError {}
