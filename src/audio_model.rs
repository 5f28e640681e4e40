//! Audio model seam for output-synchronous decoding.

use ndarray::Array2;

use crate::errors::BoxError;

/// Produces next-token scores conditioned on hypothesis histories.
///
/// The decoder batches one call per output position: `prev_tokens[i]` and
/// `prev_states[i]` describe hypothesis `i` of the live frontier, and the
/// returned score matrix must have one row per hypothesis. State values are
/// opaque to the decoder; implementations typically hold the encoder
/// output internally and keep per-hypothesis recurrent state behind
/// `Self::State`.
pub trait AudioModel {
    type State: Clone;

    /// State paired with the seed hypothesis, before any token was emitted.
    fn start(&mut self) -> Self::State;

    /// Scores the next token for every live hypothesis.
    ///
    /// Returns a `B x N` matrix of scores and the `B` updated states, where
    /// `B == prev_tokens.len()`. The seed hypothesis passes a token of `-1`.
    fn update(
        &mut self,
        prev_tokens: &[i32],
        prev_states: &[Self::State],
        step: usize,
    ) -> Result<(Array2<f32>, Vec<Self::State>), BoxError>;
}
