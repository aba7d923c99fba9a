//! Stencil-clear repro: full-screen quad drawn with stencil compare `equal`
//! against a freshly cleared stencil buffer. A correct clear lets every
//! fragment through, so the whole target ends up magenta.

use glam::Vec2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::layout::stencil_clear::Vertex;

/// Depth/stencil format used by the repro.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Depth32FloatStencil8;
/// Color written by the fragment shader.
pub const EXPECTED_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Clear values and stencil test parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct StencilClearOptions {
    /// Color attachment clear value (RGBA).
    pub clear_color: [f64; 4],
    /// Depth clear value.
    pub clear_depth: f32,
    /// Stencil clear value.
    pub clear_stencil: u32,
    /// Stencil reference compared against the cleared value.
    pub stencil_reference: u32,
    /// Stencil read mask.
    pub read_mask: u32,
}

impl Default for StencilClearOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.25, 0.25, 0.25, 1.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            stencil_reference: 0,
            read_mask: 0xFF,
        }
    }
}

impl StencilClearOptions {
    /// Color clear value as a wgpu color.
    #[must_use]
    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }

    /// Whether a fragment passes the stencil test right after the clear.
    #[must_use]
    pub fn passes_after_clear(&self) -> bool {
        (self.clear_stencil & self.read_mask) == (self.stencil_reference & self.read_mask)
    }
}

/// Two triangles covering NDC `[-1, 1]²`.
#[must_use]
pub fn full_screen_quad() -> [Vertex; 6] {
    [
        Vertex::new(Vec2::new(-1.0, -1.0)),
        Vertex::new(Vec2::new(1.0, -1.0)),
        Vertex::new(Vec2::new(-1.0, 1.0)),
        Vertex::new(Vec2::new(-1.0, 1.0)),
        Vertex::new(Vec2::new(1.0, -1.0)),
        Vertex::new(Vec2::new(1.0, 1.0)),
    ]
}

/// Depth always passes without writing; stencil compares `equal` and keeps
/// the stored value on every outcome.
#[must_use]
pub fn depth_stencil_state(options: &StencilClearOptions) -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Equal,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };
    wgpu::DepthStencilState {
        format: DEPTH_STENCIL_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: options.read_mask,
            write_mask: 0,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// A pixel whose color differs from the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMismatch {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
    /// RGBA8 value read back.
    pub actual: [u8; 4],
}

/// `(x, y)` of pixel `index` in a row-major image `width` pixels wide.
fn pixel_coords(index: usize, width: usize) -> (usize, usize) {
    (index % width, index / width)
}

/// Every pixel of a tightly packed RGBA8 image that is not `expected`.
#[must_use]
pub fn check_pixels(rgba: &[u8], width: u32, expected: [u8; 4]) -> Vec<PixelMismatch> {
    let width = width as usize;
    if width == 0 {
        return Vec::new();
    }
    rgba.chunks_exact(4)
        .enumerate()
        .filter(|(_, px)| **px != expected[..])
        .map(|(i, px)| {
            let (x, y) = pixel_coords(i, width);
            PixelMismatch {
                x,
                y,
                actual: [px[0], px[1], px[2], px[3]],
            }
        })
        .collect()
}
