//! Flat byte-buffer encoding for [`GpuLayout`] structs.
//!
//! Buffers are tightly packed arrays in native byte order, exactly what a
//! GPU buffer upload would copy. Reads accept unaligned input since mapped
//! buffer slices and file contents carry no alignment guarantee.

use super::{FieldFormat, GpuLayout, LayoutError};

/// Value of one field read straight from bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Float vector components in declaration order.
    Floats(Vec<f32>),
    /// Unsigned scalar.
    Uint(u32),
}

/// Tightly packed bytes of `items`.
#[must_use]
pub fn encode_slice<T: bytemuck::Pod>(items: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(items).to_vec()
}

/// Decode a packed array.
///
/// # Errors
///
/// [`LayoutError::BufferLength`] if `bytes` is not a whole number of `T`.
pub fn decode_slice<T: GpuLayout>(bytes: &[u8]) -> Result<Vec<T>, LayoutError> {
    let size = T::size();
    if bytes.len() % size != 0 {
        return Err(LayoutError::BufferLength {
            structure: T::NAME,
            len: bytes.len(),
            size,
        });
    }
    Ok(bytes
        .chunks_exact(size)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

/// Decode element `index` of a packed array.
///
/// # Errors
///
/// [`LayoutError::OutOfBounds`] if the element does not fit in `bytes`.
pub fn read_at<T: GpuLayout>(bytes: &[u8], index: usize) -> Result<T, LayoutError> {
    element_bytes::<T>(bytes, index).map(bytemuck::pod_read_unaligned)
}

/// Read one field of element `index` using the struct's field table.
///
/// # Errors
///
/// [`LayoutError::UnknownField`] for a name missing from the table, or
/// [`LayoutError::OutOfBounds`] if the element does not fit in `bytes`.
pub fn read_field<T: GpuLayout>(
    bytes: &[u8],
    index: usize,
    name: &str,
) -> Result<FieldValue, LayoutError> {
    let field = T::field(name).ok_or_else(|| LayoutError::UnknownField {
        structure: T::NAME,
        field: name.to_owned(),
    })?;
    let element = element_bytes::<T>(bytes, index)?;
    let raw = &element[field.offset..field.end()];
    Ok(match field.format {
        FieldFormat::Float32x2 | FieldFormat::Float32x4 => FieldValue::Floats(
            raw.chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        FieldFormat::Uint32 => {
            FieldValue::Uint(u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]))
        }
    })
}

/// Float components of one field.
///
/// # Errors
///
/// As [`read_field`], plus [`LayoutError::FieldFormat`] when the field is
/// not a float vector.
pub fn read_field_f32s<T: GpuLayout>(
    bytes: &[u8],
    index: usize,
    name: &str,
) -> Result<Vec<f32>, LayoutError> {
    match read_field::<T>(bytes, index, name)? {
        FieldValue::Floats(v) => Ok(v),
        FieldValue::Uint(_) => Err(LayoutError::FieldFormat {
            structure: T::NAME,
            field: T::field(name).map_or("", |f| f.name),
            host: FieldFormat::Uint32,
            shader: "float vector".to_owned(),
        }),
    }
}

/// Unsigned value of one scalar field.
///
/// # Errors
///
/// As [`read_field`], plus [`LayoutError::FieldFormat`] when the field is
/// a float vector.
pub fn read_field_u32<T: GpuLayout>(
    bytes: &[u8],
    index: usize,
    name: &str,
) -> Result<u32, LayoutError> {
    match read_field::<T>(bytes, index, name)? {
        FieldValue::Uint(v) => Ok(v),
        FieldValue::Floats(_) => {
            let field = T::field(name);
            Err(LayoutError::FieldFormat {
                structure: T::NAME,
                field: field.map_or("", |f| f.name),
                host: field.map_or(FieldFormat::Float32x4, |f| f.format),
                shader: "u32".to_owned(),
            })
        }
    }
}

fn element_bytes<T: GpuLayout>(bytes: &[u8], index: usize) -> Result<&[u8], LayoutError> {
    let size = T::size();
    index
        .checked_mul(size)
        .and_then(|start| Some(start..start.checked_add(size)?))
        .and_then(|range| bytes.get(range))
        .ok_or(LayoutError::OutOfBounds {
            structure: T::NAME,
            index,
            count: bytes.len() / size,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{occlusion, stencil_clear, texture_to_buffer};

    #[test]
    fn encode_is_tightly_packed() {
        let verts = [
            stencil_clear::Vertex { pos: [-1.0, -1.0] },
            stencil_clear::Vertex { pos: [1.0, -1.0] },
            stencil_clear::Vertex { pos: [-1.0, 1.0] },
        ];
        assert_eq!(encode_slice(&verts).len(), 24);
    }

    #[test]
    fn decode_rejects_partial_elements() {
        let err = decode_slice::<occlusion::Vertex>(&[0u8; 40]).unwrap_err();
        assert_eq!(
            err,
            LayoutError::BufferLength {
                structure: "Vertex",
                len: 40,
                size: 32,
            }
        );
    }

    #[test]
    fn decode_reads_unaligned_input() {
        let v = occlusion::Vertex {
            color: [0.0, 1.0, 0.0, 1.0],
            pos: [-3.0, -2.0, 0.5, 1.0],
        };
        let mut shifted = vec![0u8];
        shifted.extend(encode_slice(&[v, v]));
        let decoded = decode_slice::<occlusion::Vertex>(&shifted[1..]).unwrap();
        assert_eq!(decoded, vec![v, v]);
    }

    #[test]
    fn read_at_checks_bounds() {
        let bytes = encode_slice(&[stencil_clear::Vertex { pos: [0.5, 0.25] }]);
        assert!(read_at::<stencil_clear::Vertex>(&bytes, 0).is_ok());
        assert_eq!(
            read_at::<stencil_clear::Vertex>(&bytes, 1).unwrap_err(),
            LayoutError::OutOfBounds {
                structure: "Vertex",
                index: 1,
                count: 1,
            }
        );
    }

    #[test]
    fn huge_index_is_out_of_bounds_not_overflow() {
        let bytes = encode_slice(&[texture_to_buffer::Vertex {
            pos: [1.0, 2.0, 3.0, 4.0],
        }]);
        let index = usize::MAX / 16;
        assert_eq!(
            read_at::<texture_to_buffer::Vertex>(&bytes, index).unwrap_err(),
            LayoutError::OutOfBounds {
                structure: "Vertex",
                index,
                count: 1,
            }
        );
        assert!(matches!(
            read_field_f32s::<texture_to_buffer::Vertex>(&bytes, index, "pos"),
            Err(LayoutError::OutOfBounds { .. })
        ));
        assert!(matches!(
            read_at::<texture_to_buffer::Vertex>(&bytes, usize::MAX),
            Err(LayoutError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn options_fields_read_back_individually() {
        let opts = occlusion::CombineVisibilityResultOptions::new(3, 9);
        let bytes = encode_slice(&[opts]);
        assert_eq!(
            read_field_u32::<occlusion::CombineVisibilityResultOptions>(
                &bytes,
                0,
                "start_offset"
            ),
            Ok(3)
        );
        assert_eq!(
            read_field_u32::<occlusion::CombineVisibilityResultOptions>(
                &bytes,
                0,
                "num_offsets"
            ),
            Ok(9)
        );
    }

    #[test]
    fn second_element_fields_use_element_offset() {
        let verts = [
            occlusion::Vertex {
                color: [1.0, 0.0, 0.0, 1.0],
                pos: [-1.0, -1.0, 0.5, 1.0],
            },
            occlusion::Vertex {
                color: [0.0, 1.0, 0.0, 1.0],
                pos: [2.0, -1.0, 0.5, 1.0],
            },
        ];
        let bytes = encode_slice(&verts);
        assert_eq!(
            read_field_f32s::<occlusion::Vertex>(&bytes, 1, "color").unwrap(),
            vec![0.0, 1.0, 0.0, 1.0]
        );
        assert_eq!(
            read_field_f32s::<occlusion::Vertex>(&bytes, 1, "pos").unwrap(),
            vec![2.0, -1.0, 0.5, 1.0]
        );
    }

    #[test]
    fn wrong_field_kind_and_name_are_errors() {
        let bytes = encode_slice(&[occlusion::CombineVisibilityResultOptions::default()]);
        assert!(matches!(
            read_field_f32s::<occlusion::CombineVisibilityResultOptions>(
                &bytes,
                0,
                "start_offset"
            ),
            Err(LayoutError::FieldFormat { .. })
        ));
        assert!(matches!(
            read_field::<occlusion::CombineVisibilityResultOptions>(&bytes, 0, "startOffset"),
            Err(LayoutError::UnknownField { .. })
        ));
    }
}
