//! Decoder configuration.

use crate::errors::{DecodeError, Result};

/// Transition handling used by the frame-synchronous decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CriterionType {
    /// Blank-aware transitions; repeats collapse unless separated by blank.
    Ctc,
    /// No blank; a transition matrix scores every token bigram.
    Asg,
    /// Output-synchronous decoding driven by an audio-model callback.
    Seq2Seq,
}

/// Where the language model is queried during lexicon decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LmMode {
    /// Query only when a lexicon path completes a word.
    WordLevel,
    /// Query on every emitted token; word boundaries add no extra query.
    TokenLevel,
    /// Query on every token and additionally on the completed word label.
    TokenAndWord,
}

/// Beam search parameters shared by all decoder variants.
#[derive(Clone, Debug)]
pub struct DecoderOptions {
    /// Maximum surviving hypotheses per step.
    pub beam_size: usize,
    /// Per-frame cap on the number of token expansions considered.
    pub beam_size_token: usize,
    /// Hypotheses scoring below (best - threshold) are dropped.
    pub beam_threshold: f64,
    /// Multiplier on language-model log-probabilities.
    pub lm_weight: f64,
    /// Additive bonus per completed in-lexicon word.
    pub word_score: f64,
    /// Additive score when the out-of-vocabulary path is taken; negative
    /// infinity disables the path entirely.
    pub unk_score: f64,
    /// Additive score per silence emission.
    pub sil_score: f64,
    /// Merge equivalent hypotheses by log-sum-exp instead of max.
    pub log_add: bool,
    pub criterion: CriterionType,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            beam_size: 25,
            beam_size_token: 100,
            beam_threshold: 25.0,
            lm_weight: 0.0,
            word_score: 0.0,
            unk_score: f64::NEG_INFINITY,
            sil_score: 0.0,
            log_add: false,
            criterion: CriterionType::Ctc,
        }
    }
}

impl DecoderOptions {
    /// Rejects option combinations the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(DecodeError::Config {
                reason: "beam_size cannot be 0".into(),
            });
        }
        if self.beam_size_token == 0 {
            return Err(DecodeError::Config {
                reason: "beam_size_token cannot be 0".into(),
            });
        }
        if self.beam_threshold.is_nan() || self.beam_threshold < 0.0 {
            return Err(DecodeError::Config {
                reason: format!("beam_threshold must be non-negative, got {}", self.beam_threshold),
            });
        }
        for (name, value) in [
            ("lm_weight", self.lm_weight),
            ("word_score", self.word_score),
            ("sil_score", self.sil_score),
        ] {
            if value.is_nan() {
                return Err(DecodeError::Config {
                    reason: format!("{name} is NaN"),
                });
            }
        }
        if self.unk_score.is_nan() {
            return Err(DecodeError::Config {
                reason: "unk_score is NaN".into(),
            });
        }
        Ok(())
    }
}
