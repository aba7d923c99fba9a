//! Crate-level error types.

use std::fmt;

use crate::gpu::context::GpuContextError;
use crate::layout::LayoutError;

/// Errors produced by the gpu-repro crate.
#[derive(Debug)]
pub enum ReproError {
    /// Host and shader layouts disagree, or a byte buffer has the wrong shape.
    Layout(LayoutError),
    /// A WGSL source failed to parse or validate.
    Shader {
        /// Shader file the error came from.
        file: &'static str,
        /// Rendered diagnostic.
        message: String,
    },
    /// Headless GPU initialization failure.
    Gpu(GpuContextError),
    /// An index range reaches past the end of a buffer.
    Range {
        /// First index of the requested range.
        start: usize,
        /// Number of elements requested.
        count: usize,
        /// Number of elements available.
        len: usize,
    },
    /// A texture-to-buffer copy does not fit in the destination buffer.
    BufferTooSmall {
        /// One past the last byte the copy writes.
        needed: u64,
        /// Destination buffer size in bytes.
        size: u64,
    },
    /// Mapping a result buffer for reading failed.
    Readback(String),
    /// Uniform encoding failed.
    Encode(String),
    /// Unknown texture format name in the options.
    UnknownFormat(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for ReproError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "layout error: {e}"),
            Self::Shader { file, message } => {
                write!(f, "shader '{file}' is invalid: {message}")
            }
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Range { start, count, len } => write!(
                f,
                "range {start}..{} exceeds buffer of {len} elements",
                start + count
            ),
            Self::BufferTooSmall { needed, size } => write!(
                f,
                "buffer size too small: copy needs {needed} bytes, buffer has {size}"
            ),
            Self::Readback(msg) => write!(f, "buffer read-back failed: {msg}"),
            Self::Encode(msg) => write!(f, "uniform encoding failed: {msg}"),
            Self::UnknownFormat(name) => {
                write!(f, "unknown texture format '{name}'")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for ReproError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(e) => Some(e),
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for ReproError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

impl From<GpuContextError> for ReproError {
    fn from(e: GpuContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for ReproError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
