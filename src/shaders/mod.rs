//! WGSL sources for each repro and the host/shader layout check.
//!
//! Each repro ships one shader file holding every entry point it needs plus
//! the struct definitions shared with [`crate::layout`]. Vertices are read
//! from a storage buffer indexed by `vertex_index`, so the shader sees the
//! host bytes exactly as uploaded.

/// Struct layout reflection over naga IR.
pub mod reflect;

use crate::error::ReproError;
use crate::layout::{occlusion, stencil_clear, texture_to_buffer};

/// The three bug-repro projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repro {
    /// Occlusion-query result combining.
    Occlusion,
    /// Stencil clear before a stencil-tested draw.
    StencilClear,
    /// Row-by-row texture-to-buffer copies.
    TextureToBuffer,
}

impl Repro {
    /// Every repro, in a stable order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Occlusion, Self::StencilClear, Self::TextureToBuffer]
    }

    /// Shader file name under `assets/shaders/`.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Occlusion => "occlusion.wgsl",
            Self::StencilClear => "stencil_clear.wgsl",
            Self::TextureToBuffer => "texture_to_buffer.wgsl",
        }
    }

    /// Embedded WGSL source.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::Occlusion => include_str!("../../assets/shaders/occlusion.wgsl"),
            Self::StencilClear => {
                include_str!("../../assets/shaders/stencil_clear.wgsl")
            }
            Self::TextureToBuffer => {
                include_str!("../../assets/shaders/texture_to_buffer.wgsl")
            }
        }
    }

    /// Human-readable label for logs and pipeline names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Occlusion => "Occlusion",
            Self::StencilClear => "Stencil Clear",
            Self::TextureToBuffer => "Texture To Buffer",
        }
    }
}

/// Parse and validate the repro's shader.
///
/// # Errors
///
/// [`ReproError::Shader`] with the rendered diagnostic on a parse or
/// validation failure.
pub fn parse(repro: Repro) -> Result<naga::Module, ReproError> {
    let file = repro.file_name();
    let source = repro.source();
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ReproError::Shader {
        file,
        message: e.emit_to_string(source),
    })?;

    let _info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ReproError::Shader {
        file,
        message: e.into_inner().to_string(),
    })?;

    log::debug!("parsed {file}: {} types", module.types.len());
    Ok(module)
}

/// Parse the repro's shader and check every struct it shares with the host.
///
/// # Errors
///
/// [`ReproError::Shader`] if the shader is invalid, [`ReproError::Layout`]
/// on the first layout mismatch.
pub fn verify_repro(repro: Repro) -> Result<(), ReproError> {
    let module = parse(repro)?;
    match repro {
        Repro::Occlusion => {
            reflect::verify::<occlusion::Vertex>(&module)?;
            reflect::verify::<occlusion::CombineVisibilityResultOptions>(&module)?;
        }
        Repro::StencilClear => reflect::verify::<stencil_clear::Vertex>(&module)?,
        Repro::TextureToBuffer => {
            reflect::verify::<texture_to_buffer::Vertex>(&module)?;
        }
    }
    log::info!("{}: host and shader layouts agree", repro.label());
    Ok(())
}
