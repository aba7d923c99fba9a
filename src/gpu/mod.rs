//! Headless wgpu plumbing for the repro shaders.
//!
//! Device creation, buffer upload from layout-checked host data, the
//! pipeline builders and a headless run of the occlusion repro. No surface
//! or render loop lives here.

/// Buffer creation and uniform encoding.
pub mod buffer;
/// Headless wgpu device and queue initialization.
pub mod context;
/// Headless occlusion-query iterations.
pub mod occlusion;
/// Bind-group layouts and render/compute pipeline builders.
pub mod pipeline;
