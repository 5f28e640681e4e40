//! Language model seam.
//!
//! The decoder never inspects language-model state; it shuttles opaque
//! state values between calls and merges hypotheses according to
//! [`LanguageModel::compare_state`]. Implementations may be word-level
//! (queried at word boundaries) or token-level (queried on every token);
//! the decoder chooses which labels it passes in.

use std::cmp::Ordering;

use crate::errors::BoxError;

/// An opaque incremental scorer over label sequences.
///
/// `score` must be deterministic and pure in the state argument: two states
/// comparing equal under `compare_state` must be interchangeable for all
/// future scoring.
pub trait LanguageModel {
    type State: Clone;

    /// Initial state. With `start_with_nothing` the model starts without a
    /// sentence-begin context.
    fn start(&mut self, start_with_nothing: bool) -> Self::State;

    /// Extends `state` with `label`, returning the new state and the
    /// log-probability of the extension.
    fn score(&mut self, state: &Self::State, label: i32) -> Result<(Self::State, f64), BoxError>;

    /// Terminates a sequence, returning the final state and the
    /// end-of-sentence log-probability.
    fn finish(&mut self, state: &Self::State) -> Result<(Self::State, f64), BoxError>;

    /// Ordered equivalence on states. Defines the merge relation used by
    /// the beam frontier.
    fn compare_state(&self, a: &Self::State, b: &Self::State) -> Ordering;
}

/// Scores everything as certain. Stands in when decoding without a
/// language model.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroLm;

impl LanguageModel for ZeroLm {
    type State = ();

    fn start(&mut self, _start_with_nothing: bool) -> Self::State {}

    fn score(&mut self, _state: &Self::State, _label: i32) -> Result<(Self::State, f64), BoxError> {
        Ok(((), 0.0))
    }

    fn finish(&mut self, _state: &Self::State) -> Result<(Self::State, f64), BoxError> {
        Ok(((), 0.0))
    }

    fn compare_state(&self, _a: &Self::State, _b: &Self::State) -> Ordering {
        Ordering::Equal
    }
}

/// Scores and validates one LM extension, wrapping backend failures and
/// rejecting non-finite log-probabilities.
pub(crate) fn score_checked<L: LanguageModel>(
    lm: &mut L,
    state: &L::State,
    label: i32,
    step: usize,
) -> crate::errors::Result<(L::State, f64)> {
    let (next, log_prob) = lm
        .score(state, label)
        .map_err(|source| crate::errors::DecodeError::LanguageModel { step, source })?;
    if !log_prob.is_finite() {
        return Err(crate::errors::DecodeError::State {
            step,
            token: label,
            reason: format!("language model returned non-finite log-probability {log_prob}"),
        });
    }
    Ok((next, log_prob))
}

/// `finish` counterpart of [`score_checked`].
pub(crate) fn finish_checked<L: LanguageModel>(
    lm: &mut L,
    state: &L::State,
    step: usize,
) -> crate::errors::Result<(L::State, f64)> {
    let (next, log_prob) = lm
        .finish(state)
        .map_err(|source| crate::errors::DecodeError::LanguageModel { step, source })?;
    if !log_prob.is_finite() {
        return Err(crate::errors::DecodeError::State {
            step,
            token: -1,
            reason: format!("language model finish returned non-finite log-probability {log_prob}"),
        });
    }
    Ok((next, log_prob))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_lm_scores_nothing() {
        let mut lm = ZeroLm;
        let state = lm.start(false);
        let (state, score) = lm.score(&state, 42).unwrap();
        assert_eq!(score, 0.0);
        let (_, score) = lm.finish(&state).unwrap();
        assert_eq!(score, 0.0);
    }
}
