//! Diptych construction: the deterministic part of an edit.
//!
//! The source image goes on the left, a blank canvas of the same size on the
//! right, and a mask marks the right half for regeneration. The instruction
//! tells the fill model that the right panel is the left one with the edit
//! applied.

mod compose;

pub use compose::{compose, crop_result, normalize, Diptych, NormalizedImage};

use rand::Rng;

/// Width every source image is normalized to before composition.
pub const TARGET_WIDTH: u32 = 512;

/// Heights are floored to a multiple of this to satisfy the model's latent grid.
pub const DIMENSION_MULTIPLE: u32 = 8;

/// Tallest normalized image accepted. Four times the largest side the UI
/// exposes, so panoramas pass and extreme aspect ratios are refused before
/// any buffer is allocated.
pub const MAX_HEIGHT: u32 = 4096;

/// Largest seed accepted or produced (`i32::MAX`).
pub const MAX_SEED: u64 = i32::MAX as u64;

pub const MASK_KEEP: u8 = 0;
pub const MASK_FILL: u8 = 255;

const INSTRUCTION_PREFIX: &str = "A diptych with two side-by-side images of the same scene. \
On the right, the scene is exactly the same as on the left but ";

/// Wrap a free-text edit instruction into the diptych description sentence.
///
/// The prompt is inserted verbatim, including the empty string.
pub fn build_instruction(prompt: &str) -> String {
    let mut instruction = String::with_capacity(INSTRUCTION_PREFIX.len() + prompt.len());
    instruction.push_str(INSTRUCTION_PREFIX);
    instruction.push_str(prompt);
    instruction
}

/// Pick the seed for a request.
///
/// With `randomize` set the supplied seed is discarded and a fresh one is drawn
/// uniformly from `[0, MAX_SEED]`.
pub fn resolve_seed<R: Rng + ?Sized>(seed: u64, randomize: bool, rng: &mut R) -> u64 {
    if randomize {
        rng.gen_range(0..=MAX_SEED)
    } else {
        seed
    }
}
