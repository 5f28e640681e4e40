//! Beam-search decoding for speech recognition.
//!
//! Given per-frame acoustic scores over a token alphabet, the decoders in
//! this crate find the most likely transcription by jointly scoring the
//! acoustic evidence, a lexicon of allowed spellings, an external language
//! model and decoder penalties.
//!
//! # Architecture
//!
//! Two variants share the beam machinery in [`beam`]:
//!
//! - [`LexiconDecoder`]: frame-synchronous CTC/ASG search constrained to a
//!   [`trie::Trie`] of word spellings, with the language model queried at
//!   word boundaries, per token, or both ([`LmMode`]).
//! - [`Seq2SeqDecoder`]: output-synchronous search for attention-style
//!   models, batching the frontier through an [`AudioModel`] callback and
//!   terminating on an end-of-sentence token.
//!
//! Collaborators stay behind the [`LanguageModel`] and [`AudioModel`]
//! seams; the decoders only shuttle opaque state values and merge
//! hypotheses through the models' own equivalence tests.
//!
//! # Quick Start
//!
//! ```
//! use ndarray::array;
//! use rustbeam::{DecoderOptions, LexiconDecoder, LmMode, Trie, ZeroLm};
//!
//! // alphabet {a = 0, b = 1, blank = 2}; one word "ab"
//! let mut lexicon = Trie::new();
//! lexicon.insert(&[0, 1], 0, 0.0)?;
//!
//! let options = DecoderOptions::default();
//! let mut decoder =
//!     LexiconDecoder::new(options, lexicon, ZeroLm, LmMode::WordLevel, -1, 2, -1, Vec::new())?;
//!
//! let emissions = array![[10.0_f32, 0.0, 0.0], [0.0, 10.0, 0.0]];
//! let results = decoder.decode(&emissions)?;
//! assert_eq!(results[0].words, vec![0]);
//! # Ok::<(), rustbeam::DecodeError>(())
//! ```

pub mod audio_model;
pub mod beam;
pub mod errors;
pub mod fast_math;
pub mod language_model;
pub mod options;
pub mod trie;

mod bsearch_lexicon;
mod bsearch_seq2seq;

pub use crate::audio_model::AudioModel;
pub use crate::beam::DecodeResult;
pub use crate::bsearch_lexicon::LexiconDecoder;
pub use crate::bsearch_seq2seq::Seq2SeqDecoder;
pub use crate::errors::{BoxError, DecodeError, Result};
pub use crate::language_model::{LanguageModel, ZeroLm};
pub use crate::options::{CriterionType, DecoderOptions, LmMode};
pub use crate::trie::{Trie, TrieLabel, ROOT_NODE};
