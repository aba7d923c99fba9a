//! Occlusion-query repro: expected results and a CPU reference of the
//! combine kernel.
//!
//! Each iteration encodes up to four render passes. Every pass draws one
//! triangle with boolean visibility results enabled at byte offset 8, copies
//! the running result into word 0, and dispatches the combine kernel over
//! words `0..2`. After the command buffer completes the running result must
//! be non-zero exactly when at least one pass drew the on-screen triangle.

use std::fmt;

use glam::Vec4;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ReproError;
use crate::layout::occlusion::{CombineVisibilityResultOptions, Vertex};

/// Number of draw slots per iteration.
pub const DRAW_SLOTS: u32 = 4;
/// Iterations needed to cover every draw/scissor combination.
pub const ITERATIONS: u32 = 1 << (2 * DRAW_SLOTS);
/// Byte offset the render pass writes its visibility result to.
pub const VISIBILITY_RESULT_OFFSET: u64 = 8;
/// Size of the visibility buffer in bytes (two 64-bit words).
pub const VISIBILITY_BUFFER_SIZE: u64 = 16;
/// Kernel options used after every draw: previous result and new result.
pub const COMBINE_OPTIONS: CombineVisibilityResultOptions =
    CombineVisibilityResultOptions::new(0, 2);

/// Iteration count and kernel specialization for the occlusion repro.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct OcclusionOptions {
    /// Iterations to run; values above [`ITERATIONS`] repeat the schedule.
    pub iterations: u32,
    /// Value of the `combine_with_existing_result` pipeline constant.
    pub combine_with_existing_result: bool,
}

impl Default for OcclusionOptions {
    fn default() -> Self {
        Self {
            iterations: ITERATIONS,
            combine_with_existing_result: false,
        }
    }
}

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);

/// Red triangle larger than the viewport, so every pixel is covered.
#[must_use]
pub fn on_screen_triangle() -> [Vertex; 3] {
    [
        Vertex::new(RED, Vec4::new(-1.0, -1.0, 0.5, 1.0)),
        Vertex::new(RED, Vec4::new(2.0, -1.0, 0.5, 1.0)),
        Vertex::new(RED, Vec4::new(-1.0, 2.0, 0.5, 1.0)),
    ]
}

/// Green triangle entirely outside the viewport; it produces no samples.
#[must_use]
pub fn off_screen_triangle() -> [Vertex; 3] {
    [
        Vertex::new(GREEN, Vec4::new(-3.0, -3.0, 0.5, 1.0)),
        Vertex::new(GREEN, Vec4::new(-3.0, -2.0, 0.5, 1.0)),
        Vertex::new(GREEN, Vec4::new(-2.0, 3.0, 0.5, 1.0)),
    ]
}

/// Which triangle a draw slot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triangle {
    /// Covers the viewport.
    OnScreen,
    /// Fully clipped.
    OffScreen,
}

impl Triangle {
    /// Vertex data for this triangle.
    #[must_use]
    pub fn vertices(self) -> [Vertex; 3] {
        match self {
            Self::OnScreen => on_screen_triangle(),
            Self::OffScreen => off_screen_triangle(),
        }
    }
}

/// The draws encoded in one iteration, in slot order.
///
/// Slot `j` draws when bit `j` of `index` is set; it uses the off-screen
/// triangle when bit `j` of `index >> 4` is set.
#[must_use]
pub fn iteration_draws(index: u32) -> Vec<Triangle> {
    let index = index % ITERATIONS;
    (0..DRAW_SLOTS)
        .filter(|j| index & (1 << j) != 0)
        .map(|j| {
            if ((index >> DRAW_SLOTS) >> j) & 1 != 0 {
                Triangle::OffScreen
            } else {
                Triangle::OnScreen
            }
        })
        .collect()
}

/// Whether iteration `index` renders any samples.
#[must_use]
pub fn expected_drawn(index: u32) -> bool {
    iteration_draws(index).contains(&Triangle::OnScreen)
}

/// CPU reference of the combine kernel.
///
/// ORs every word in `options.range()`; with `keep_existing` set the
/// previous combined result is OR-ed in as well, matching the
/// `combine_with_existing_result` pipeline constant.
///
/// # Errors
///
/// [`ReproError::Range`] if the range reaches past `results`.
pub fn combine_visibility_results(
    options: &CombineVisibilityResultOptions,
    results: &[u64],
    existing: u64,
    keep_existing: bool,
) -> Result<u64, ReproError> {
    let range = options.range();
    let words = results.get(range.clone()).ok_or(ReproError::Range {
        start: range.start,
        count: range.len(),
        len: results.len(),
    })?;
    let seed = if keep_existing { existing } else { 0 };
    Ok(words.iter().fold(seed, |acc, w| acc | w))
}

/// Split 64-bit words into the `(lo, hi)` pairs the shader sees.
#[must_use]
pub fn words_to_pairs(words: &[u64]) -> Vec<[u32; 2]> {
    words.iter().map(|w| [*w as u32, (*w >> 32) as u32]).collect()
}

/// Join a `(lo, hi)` pair back into a 64-bit word.
#[must_use]
pub fn pair_to_word(pair: [u32; 2]) -> u64 {
    u64::from(pair[0]) | (u64::from(pair[1]) << 32)
}

/// Host-side simulation of one iteration's command stream, assuming a
/// conforming driver: returns the final combined result.
#[must_use]
pub fn simulate_iteration(index: u32) -> u64 {
    let mut combined = 0u64;
    for triangle in iteration_draws(index) {
        let new_result = u64::from(triangle == Triangle::OnScreen);
        let visibility = [combined, new_result];
        combined =
            combine_visibility_results(&COMBINE_OPTIONS, &visibility, combined, false)
                .unwrap_or(combined);
    }
    combined
}

/// Expected versus reported result of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOutcome {
    /// Iteration index.
    pub index: u32,
    /// Whether any on-screen draw was encoded.
    pub drawn: bool,
    /// Whether the combined occlusion result was non-zero.
    pub reported: bool,
}

impl IterationOutcome {
    /// Outcome from the raw combined result word.
    #[must_use]
    pub fn evaluate(index: u32, combined: u64) -> Self {
        Self {
            index,
            drawn: expected_drawn(index),
            reported: combined != 0,
        }
    }

    /// `true` when the query agrees with what was drawn.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.drawn == self.reported
    }
}

impl fmt::Display for IterationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: actually drawn: {}, occlusion query drawn result: {}",
            self.index, self.drawn, self.reported
        )?;
        if !self.is_ok() {
            f.write_str(" ----------------- bad! ------------------")?;
        }
        Ok(())
    }
}

/// Expected outcome of every iteration when the driver behaves.
#[must_use]
pub fn expected_outcomes(iterations: u32) -> Vec<IterationOutcome> {
    (0..iterations)
        .map(|i| IterationOutcome::evaluate(i, simulate_iteration(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_iteration_draws_nothing() {
        assert!(iteration_draws(0).is_empty());
        assert!(!expected_drawn(0));
    }

    #[test]
    fn scissor_bits_select_off_screen_triangle() {
        // slot 0 drawn, scissored
        assert_eq!(iteration_draws(0b0001_0001), vec![Triangle::OffScreen]);
        assert!(!expected_drawn(0b0001_0001));
        // slots 0 and 1 drawn, only slot 0 scissored
        assert_eq!(
            iteration_draws(0b0001_0011),
            vec![Triangle::OffScreen, Triangle::OnScreen]
        );
        assert!(expected_drawn(0b0001_0011));
    }

    #[test]
    fn scissor_without_draw_is_ignored() {
        assert!(iteration_draws(0b1111_0000).is_empty());
        assert_eq!(iteration_draws(0b1110_0001), vec![Triangle::OnScreen]);
    }

    #[test]
    fn combine_ors_the_range() {
        let opts = CombineVisibilityResultOptions::new(0, 2);
        assert_eq!(combine_visibility_results(&opts, &[0, 0], 0, false).unwrap(), 0);
        assert_eq!(combine_visibility_results(&opts, &[0, 1], 0, false).unwrap(), 1);
        assert_eq!(
            combine_visibility_results(&opts, &[4, 1], 0, false).unwrap(),
            5
        );
    }

    #[test]
    fn combine_respects_keep_existing() {
        let opts = CombineVisibilityResultOptions::new(1, 1);
        assert_eq!(combine_visibility_results(&opts, &[9, 0], 2, false).unwrap(), 0);
        assert_eq!(combine_visibility_results(&opts, &[9, 0], 2, true).unwrap(), 2);
    }

    #[test]
    fn combine_with_zero_offsets_is_seed() {
        let opts = CombineVisibilityResultOptions::new(0, 0);
        assert_eq!(combine_visibility_results(&opts, &[], 7, true).unwrap(), 7);
        assert_eq!(combine_visibility_results(&opts, &[], 7, false).unwrap(), 0);
    }

    #[test]
    fn combine_range_past_end_is_an_error() {
        let opts = CombineVisibilityResultOptions::new(1, 2);
        assert!(matches!(
            combine_visibility_results(&opts, &[0, 0], 0, false),
            Err(ReproError::Range {
                start: 1,
                count: 2,
                len: 2
            })
        ));
    }

    #[test]
    fn words_split_into_shader_pairs() {
        let pairs = words_to_pairs(&[0x0000_0001_0000_0002]);
        assert_eq!(pairs, vec![[2, 1]]);
        assert_eq!(pair_to_word(pairs[0]), 0x0000_0001_0000_0002);
    }

    #[test]
    fn every_expected_outcome_is_ok() {
        let outcomes = expected_outcomes(ITERATIONS);
        assert_eq!(outcomes.len(), 256);
        assert!(outcomes.iter().all(IterationOutcome::is_ok));
        let drawn = outcomes.iter().filter(|o| o.drawn).count();
        // per slot: drawn+on-screen is one of four bit pairs
        assert_eq!(drawn, 256 - 3usize.pow(4));
    }

    #[test]
    fn mismatch_is_flagged_in_report_line() {
        let bad = IterationOutcome::evaluate(1, 0);
        assert!(!bad.is_ok());
        assert!(bad.to_string().contains("bad!"));
        let good = IterationOutcome::evaluate(1, 1);
        assert_eq!(
            good.to_string(),
            "1: actually drawn: true, occlusion query drawn result: true"
        );
    }

    #[test]
    fn triangles_use_their_colors() {
        assert!(on_screen_triangle().iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
        assert!(off_screen_triangle()
            .iter()
            .all(|v| v.pos[0] < -1.0));
    }
}
