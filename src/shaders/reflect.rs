//! Reads struct layouts out of naga IR and compares them against the host
//! field tables.
//!
//! Offsets come from the WGSL frontend, which applies the WGSL memory-layout
//! rules; a shader struct that reorders, widens or pads a field therefore
//! shows up here as a mismatch instead of as silently corrupted data.

use naga::{Scalar, ScalarKind, TypeInner, VectorSize};

use crate::layout::{FieldFormat, GpuLayout, LayoutError};

/// One member of a shader struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedMember {
    /// Member name (empty if the IR carries none).
    pub name: String,
    /// Byte offset within the struct.
    pub offset: usize,
    /// Host format, when the member type has one.
    pub format: Option<FieldFormat>,
    /// Readable type description.
    pub type_name: String,
}

/// A shader struct with its computed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedStruct {
    /// Struct name.
    pub name: String,
    /// Total size in bytes, including trailing padding.
    pub span: usize,
    /// Members in declaration order.
    pub members: Vec<ReflectedMember>,
}

/// Find the struct named `name` in `module`.
#[must_use]
pub fn find_struct(module: &naga::Module, name: &str) -> Option<ReflectedStruct> {
    module.types.iter().find_map(|(_, ty)| {
        let TypeInner::Struct { ref members, span } = ty.inner else {
            return None;
        };
        if ty.name.as_deref() != Some(name) {
            return None;
        }
        Some(ReflectedStruct {
            name: name.to_owned(),
            span: span as usize,
            members: members
                .iter()
                .map(|m| {
                    let inner = &module.types[m.ty].inner;
                    ReflectedMember {
                        name: m.name.clone().unwrap_or_default(),
                        offset: m.offset as usize,
                        format: field_format(inner),
                        type_name: describe(inner),
                    }
                })
                .collect(),
        })
    })
}

/// Check the shader struct named `T::NAME` against `T`'s field table.
///
/// # Errors
///
/// The first [`LayoutError`] found, checked in order: struct present,
/// member count, then per member name, offset and format, then total size.
pub fn verify<T: GpuLayout>(module: &naga::Module) -> Result<(), LayoutError> {
    let reflected = find_struct(module, T::NAME).ok_or(LayoutError::MissingStruct {
        structure: T::NAME,
    })?;
    compare::<T>(&reflected)
}

/// Compare an already reflected struct against `T`.
///
/// # Errors
///
/// See [`verify`].
pub fn compare<T: GpuLayout>(reflected: &ReflectedStruct) -> Result<(), LayoutError> {
    let structure = T::NAME;
    if reflected.members.len() != T::FIELDS.len() {
        return Err(LayoutError::FieldCount {
            structure,
            host: T::FIELDS.len(),
            shader: reflected.members.len(),
        });
    }

    for (index, (field, member)) in T::FIELDS.iter().zip(&reflected.members).enumerate() {
        if field.name != member.name {
            return Err(LayoutError::FieldName {
                structure,
                index,
                host: field.name,
                shader: member.name.clone(),
            });
        }
        if field.offset != member.offset {
            return Err(LayoutError::FieldOffset {
                structure,
                field: field.name,
                host: field.offset,
                shader: member.offset,
            });
        }
        if member.format != Some(field.format) {
            return Err(LayoutError::FieldFormat {
                structure,
                field: field.name,
                host: field.format,
                shader: member.type_name.clone(),
            });
        }
    }

    if reflected.span != T::size() {
        return Err(LayoutError::SizeMismatch {
            structure,
            host: T::size(),
            shader: reflected.span,
        });
    }
    Ok(())
}

fn field_format(inner: &TypeInner) -> Option<FieldFormat> {
    match *inner {
        TypeInner::Vector {
            size,
            scalar:
                Scalar {
                    kind: ScalarKind::Float,
                    width: 4,
                },
        } => match size {
            VectorSize::Bi => Some(FieldFormat::Float32x2),
            VectorSize::Quad => Some(FieldFormat::Float32x4),
            VectorSize::Tri => None,
        },
        TypeInner::Scalar(Scalar {
            kind: ScalarKind::Uint,
            width: 4,
        }) => Some(FieldFormat::Uint32),
        _ => None,
    }
}

fn describe(inner: &TypeInner) -> String {
    match *inner {
        TypeInner::Scalar(scalar) => scalar_name(scalar),
        TypeInner::Vector { size, scalar } => {
            format!("vec{}<{}>", size as u8, scalar_name(scalar))
        }
        ref other => format!("{other:?}"),
    }
}

fn scalar_name(scalar: Scalar) -> String {
    let prefix = match scalar.kind {
        ScalarKind::Float => "f",
        ScalarKind::Uint => "u",
        ScalarKind::Sint => "i",
        ScalarKind::Bool => return "bool".to_owned(),
        ScalarKind::AbstractInt | ScalarKind::AbstractFloat => "abstract",
    };
    format!("{prefix}{}", u32::from(scalar.width) * 8)
}
