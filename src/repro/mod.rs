//! Host-side data and result checks for each repro.
//!
//! Everything here runs on the CPU: the vertex data each repro uploads, the
//! result a conforming driver produces, and the comparison against what was
//! actually read back.

pub mod occlusion;
pub mod stencil_clear;
pub mod texture_to_buffer;
