//! Error types for the decoding core.

use thiserror::Error;

/// Boxed error used on the language-model and audio-model seams, so that
/// implementations can surface arbitrary backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Decode failure variants.
///
/// Every failure is fatal for the decode in progress; the decoder instance
/// must be discarded afterwards. Variants carry the step index at which the
/// search was halted.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Rejected configuration (options, token indices, lexicon construction).
    #[error("invalid decoder configuration: {reason}")]
    Config { reason: String },

    /// Malformed decode input, e.g. a non-finite emission or a score batch
    /// of the wrong shape.
    #[error("invalid input at step {step}: {reason}")]
    Input { step: usize, reason: String },

    /// The search reached a state it cannot continue from.
    #[error("decode state failure at step {step} (token {token}): {reason}")]
    State { step: usize, token: i32, reason: String },

    /// The language model failed while scoring a hypothesis.
    #[error("language model failure at step {step}")]
    LanguageModel {
        step: usize,
        #[source]
        source: BoxError,
    },

    /// The audio model failed while updating hypothesis states.
    #[error("audio model failure at step {step}")]
    AudioModel {
        step: usize,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
