// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Tests unwrap and panic freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Host/shader data-layout contracts for three minimal GPU bug repros.
//!
//! Each repro uploads plain-old-data structs that a shader reads back as the
//! same bytes. This crate owns both sides of that boundary and checks that
//! they agree.
//!
//! # Key entry points
//!
//! - [`layout`] - the `#[repr(C)]` structs, their field tables and the flat
//!   byte codec
//! - [`shaders`] - embedded WGSL and the naga-based layout check
//! - [`repro`] - per-repro vertex data, expected results and read-back checks
//! - [`gpu`] - headless device setup and pipeline builders
//! - [`options::ReproOptions`] - TOML configuration
//!
//! # Repros
//!
//! | Repro | Host structs |
//! |---|---|
//! | occlusion query | `Vertex { color, pos }`, `CombineVisibilityResultOptions` |
//! | stencil clear | `Vertex { pos: vec2 }` |
//! | texture-to-buffer copy | `Vertex { pos: vec4 }` |

pub mod error;
pub mod gpu;
pub mod layout;
pub mod options;
pub mod repro;
pub mod shaders;
