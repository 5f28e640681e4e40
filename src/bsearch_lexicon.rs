//! Frame-synchronous beam search over a lexicon trie.
//!
//! Hypotheses advance through the trie one non-collapsed token per frame.
//! CTC decoding tracks blank emissions so that a repeated token separated
//! by blank is a new unit while an unseparated repeat collapses in place;
//! ASG decoding scores every token bigram with a transition matrix
//! instead. The language model is consulted at word boundaries, at every
//! token, or both, depending on [`LmMode`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::{ArrayBase, Data, Ix2};
use tracing::{debug, trace};

use crate::beam::{best_state, trace_result, CandidatePool, DecodeResult, Hypothesis};
use crate::errors::{DecodeError, Result};
use crate::language_model::{finish_checked, score_checked, LanguageModel};
use crate::options::{CriterionType, DecoderOptions, LmMode};
use crate::trie::{Trie, ROOT_NODE};

/// One partial transcription in the beam.
#[derive(Clone, Debug)]
pub(crate) struct LexiconDecoderState<S> {
    score: f64,
    lm_state: S,
    /// Current trie node; `ROOT_NODE` at word boundaries.
    lex: usize,
    parent: Option<(usize, usize)>,
    /// Emitted token label, `-1` on seed and finish states.
    token: i32,
    /// Completed word label, `-1` while inside a word.
    word: i32,
    /// The last emission was blank (CTC).
    prev_blank: bool,
    am_score: f64,
    lm_score: f64,
}

impl<S: Clone> Hypothesis for LexiconDecoderState<S> {
    fn score(&self) -> f64 {
        self.score
    }
    fn set_score(&mut self, score: f64) {
        self.score = score;
    }
    fn am_score(&self) -> f64 {
        self.am_score
    }
    fn lm_score(&self) -> f64 {
        self.lm_score
    }
    fn token(&self) -> i32 {
        self.token
    }
    fn word(&self) -> i32 {
        self.word
    }
    fn parent(&self) -> Option<(usize, usize)> {
        self.parent
    }
}

/// Beam search decoder constrained to the spellings of a lexicon.
///
/// Constructed once per (lexicon, language model) pair and reusable across
/// utterances: `decode` (or the `decode_begin` / `decode_step` /
/// `decode_end` split, for chunked input with cancellation points between
/// calls) runs one utterance to completion.
pub struct LexiconDecoder<L: LanguageModel> {
    options: DecoderOptions,
    lexicon: Trie,
    lm: L,
    lm_mode: LmMode,
    sil: i32,
    blank: i32,
    unk: i32,
    /// Row-major `trans[prev][cur]` bigram scores, ASG only.
    transitions: Vec<f32>,
    pool: CandidatePool<LexiconDecoderState<L::State>>,
    hyp: BTreeMap<usize, Vec<LexiconDecoderState<L::State>>>,
    n_decoded_frames: usize,
    n_pruned_frames: usize,
}

impl<L: LanguageModel> LexiconDecoder<L> {
    pub fn new(
        options: DecoderOptions,
        lexicon: Trie,
        lm: L,
        lm_mode: LmMode,
        sil: i32,
        blank: i32,
        unk: i32,
        transitions: Vec<f32>,
    ) -> Result<Self> {
        options.validate()?;
        match options.criterion {
            CriterionType::Ctc if blank < 0 => {
                return Err(DecodeError::Config {
                    reason: "CTC decoding requires a blank token index".into(),
                });
            }
            CriterionType::Asg if blank >= 0 => {
                return Err(DecodeError::Config {
                    reason: "ASG decoding has no blank token".into(),
                });
            }
            CriterionType::Asg if transitions.is_empty() => {
                return Err(DecodeError::Config {
                    reason: "ASG decoding requires a transition matrix".into(),
                });
            }
            CriterionType::Seq2Seq => {
                return Err(DecodeError::Config {
                    reason: "Seq2Seq criterion takes the Seq2SeqDecoder".into(),
                });
            }
            _ => {}
        }
        if options.unk_score > f64::NEG_INFINITY && unk < 0 {
            return Err(DecodeError::Config {
                reason: "unk_score is enabled but no unknown-word label was given".into(),
            });
        }
        Ok(Self {
            options,
            lexicon,
            lm,
            lm_mode,
            sil,
            blank,
            unk,
            transitions,
            pool: CandidatePool::new(),
            hyp: BTreeMap::new(),
            n_decoded_frames: 0,
            n_pruned_frames: 0,
        })
    }

    /// Seeds the search with a single hypothesis at the trie root.
    pub fn decode_begin(&mut self) -> Result<()> {
        self.hyp.clear();
        self.n_decoded_frames = 0;
        self.n_pruned_frames = 0;
        let lm_state = self.lm.start(false);
        self.hyp.insert(
            0,
            vec![LexiconDecoderState {
                score: 0.0,
                lm_state,
                lex: ROOT_NODE,
                parent: None,
                token: -1,
                word: -1,
                prev_blank: false,
                am_score: 0.0,
                lm_score: 0.0,
            }],
        );
        debug!(criterion = ?self.options.criterion, beam_size = self.options.beam_size, "decode started");
        Ok(())
    }

    /// Consumes `T` frames of emissions (`T x N`, time-major) and advances
    /// the beam one step per frame.
    pub fn decode_step<D: Data<Elem = f32>>(&mut self, emissions: &ArrayBase<D, Ix2>) -> Result<()> {
        let (_, n) = emissions.dim();
        self.check_input(emissions, n)?;

        let sil = self.sil;
        let blank = self.blank;
        let unk = self.unk;
        let lm_mode = self.lm_mode;
        let Self {
            options,
            lexicon,
            lm,
            transitions,
            pool,
            hyp,
            n_decoded_frames,
            ..
        } = self;

        let mut token_order: Vec<usize> = Vec::with_capacity(n);
        for (t, frame) in emissions.outer_iter().enumerate() {
            let step = *n_decoded_frames + t;
            if hyp.get(&step).map_or(true, Vec::is_empty) {
                return Err(DecodeError::Input {
                    step,
                    reason: "no hypotheses to expand; decode_begin must run first".into(),
                });
            }

            token_order.clear();
            token_order.extend(0..n);
            if n > options.beam_size_token {
                pdqselect::select_by(&mut token_order, options.beam_size_token, |&a, &b| {
                    frame[b].partial_cmp(&frame[a]).unwrap_or(Ordering::Equal)
                });
            }
            let shortlist = &token_order[..options.beam_size_token.min(n)];

            pool.reset();
            let frontier = hyp.get(&step).map(Vec::as_slice).unwrap_or(&[]);
            for (i, prev) in frontier.iter().enumerate() {
                let prev_lex = prev.lex;
                let prev_token = prev.token;

                // walk the trie along the emission short-list
                for &target in shortlist {
                    let token = target as i32;
                    let Some(child) = lexicon.get_child(prev_lex, token) else {
                        continue;
                    };
                    // an unseparated repeat collapses; it is not a new unit
                    if options.criterion == CriterionType::Ctc
                        && token == prev_token
                        && !prev.prev_blank
                    {
                        continue;
                    }

                    let mut am = f64::from(frame[target]);
                    if options.criterion == CriterionType::Asg && prev_token >= 0 {
                        am += f64::from(transitions[prev_token as usize * n + target]);
                    }
                    let mut score = prev.score + am;
                    if token == sil {
                        score += options.sil_score;
                    }

                    let advanced = match lm_mode {
                        LmMode::WordLevel => None,
                        _ => Some(score_checked(lm, &prev.lm_state, token, step)?),
                    };

                    // completed words, one candidate per homophone
                    for label in lexicon.labels(child) {
                        let (lm_state, lm_add) = match &advanced {
                            Some((tok_state, tok_prob)) => {
                                if lm_mode == LmMode::TokenAndWord {
                                    let (word_state, word_prob) =
                                        score_checked(lm, tok_state, label.word, step)?;
                                    (word_state, tok_prob + word_prob)
                                } else {
                                    (tok_state.clone(), *tok_prob)
                                }
                            }
                            None => score_checked(lm, &prev.lm_state, label.word, step)?,
                        };
                        let lm_add = lm_add + f64::from(label.score);
                        pool.add(
                            options.beam_threshold,
                            LexiconDecoderState {
                                score: score + options.lm_weight * lm_add + options.word_score,
                                lm_state,
                                lex: ROOT_NODE,
                                parent: Some((step, i)),
                                token,
                                word: label.word,
                                prev_blank: false,
                                am_score: prev.am_score + am,
                                lm_score: prev.lm_score + lm_add,
                            },
                        );
                    }

                    // keep spelling the word
                    if lexicon.has_children(child) {
                        let (lm_state, lm_add) = match &advanced {
                            Some((tok_state, tok_prob)) => (tok_state.clone(), *tok_prob),
                            None => (prev.lm_state.clone(), 0.0),
                        };
                        pool.add(
                            options.beam_threshold,
                            LexiconDecoderState {
                                score: score + options.lm_weight * lm_add,
                                lm_state,
                                lex: child,
                                parent: Some((step, i)),
                                token,
                                word: -1,
                                prev_blank: false,
                                am_score: prev.am_score + am,
                                lm_score: prev.lm_score + lm_add,
                            },
                        );
                    }

                    // the path so far may end an out-of-lexicon word
                    if lexicon.labels(child).is_empty() && options.unk_score > f64::NEG_INFINITY {
                        let (lm_state, lm_add) = match &advanced {
                            Some((tok_state, tok_prob)) => {
                                if lm_mode == LmMode::TokenAndWord {
                                    let (unk_state, unk_prob) =
                                        score_checked(lm, tok_state, unk, step)?;
                                    (unk_state, tok_prob + unk_prob)
                                } else {
                                    (tok_state.clone(), *tok_prob)
                                }
                            }
                            None => score_checked(lm, &prev.lm_state, unk, step)?,
                        };
                        pool.add(
                            options.beam_threshold,
                            LexiconDecoderState {
                                score: score + options.lm_weight * lm_add + options.unk_score,
                                lm_state,
                                lex: ROOT_NODE,
                                parent: Some((step, i)),
                                token,
                                word: unk,
                                prev_blank: false,
                                am_score: prev.am_score + am,
                                lm_score: prev.lm_score + lm_add,
                            },
                        );
                    }
                }

                // stay on the same node: silence at a word boundary, token
                // repeat inside a word
                let stay_allowed = options.criterion != CriterionType::Ctc
                    || !prev.prev_blank
                    || prev_lex == ROOT_NODE;
                if stay_allowed {
                    let token = if prev_lex == ROOT_NODE { sil } else { prev_token };
                    if token >= 0 {
                        let mut am = f64::from(frame[token as usize]);
                        if options.criterion == CriterionType::Asg && prev_token >= 0 {
                            am += f64::from(transitions[prev_token as usize * n + token as usize]);
                        }
                        let mut score = prev.score + am;
                        if token == sil {
                            score += options.sil_score;
                        }
                        pool.add(
                            options.beam_threshold,
                            LexiconDecoderState {
                                score,
                                lm_state: prev.lm_state.clone(),
                                lex: prev_lex,
                                parent: Some((step, i)),
                                token,
                                word: -1,
                                prev_blank: false,
                                am_score: prev.am_score + am,
                                lm_score: prev.lm_score,
                            },
                        );
                    }
                }

                // blank keeps the hypothesis in place and arms the repeat
                if options.criterion == CriterionType::Ctc {
                    let am = f64::from(frame[blank as usize]);
                    pool.add(
                        options.beam_threshold,
                        LexiconDecoderState {
                            score: prev.score + am,
                            lm_state: prev.lm_state.clone(),
                            lex: prev_lex,
                            parent: Some((step, i)),
                            token: blank,
                            word: -1,
                            prev_blank: true,
                            am_score: prev.am_score + am,
                            lm_score: prev.lm_score,
                        },
                    );
                }
            }

            let lm_ref: &L = &*lm;
            let next = pool.store(
                options.beam_size,
                options.beam_threshold,
                options.log_add,
                true,
                |a, b| {
                    lm_ref
                        .compare_state(&a.lm_state, &b.lm_state)
                        .then(a.lex.cmp(&b.lex))
                        .then(a.token.cmp(&b.token))
                        .then(a.prev_blank.cmp(&b.prev_blank))
                },
            );
            if next.is_empty() {
                return Err(DecodeError::State {
                    step,
                    token: -1,
                    reason: "ran out of search space (beam_threshold too tight?)".into(),
                });
            }
            trace!(step, frontier = frontier.len(), survivors = next.len(), "frame expanded");
            hyp.insert(step + 1, next);
        }
        self.n_decoded_frames += emissions.dim().0;
        Ok(())
    }

    /// Applies the language-model finish score to every surviving
    /// hypothesis and stores the final frontier.
    pub fn decode_end(&mut self) -> Result<()> {
        let step = self.n_decoded_frames;
        let Self {
            options, lm, pool, hyp, ..
        } = self;

        pool.reset();
        let frontier = hyp.get(&step).map(Vec::as_slice).unwrap_or(&[]);
        for (i, prev) in frontier.iter().enumerate() {
            let (lm_state, lm_end) = finish_checked(lm, &prev.lm_state, step)?;
            pool.add(
                options.beam_threshold,
                LexiconDecoderState {
                    score: prev.score + options.lm_weight * lm_end,
                    lm_state,
                    lex: prev.lex,
                    parent: Some((step, i)),
                    token: -1,
                    word: -1,
                    prev_blank: false,
                    am_score: prev.am_score,
                    lm_score: prev.lm_score + lm_end,
                },
            );
        }

        let lm_ref: &L = &*lm;
        let next = pool.store(
            options.beam_size,
            options.beam_threshold,
            options.log_add,
            true,
            |a, b| {
                lm_ref
                    .compare_state(&a.lm_state, &b.lm_state)
                    .then(a.lex.cmp(&b.lex))
                    .then(a.token.cmp(&b.token))
                    .then(a.prev_blank.cmp(&b.prev_blank))
            },
        );
        if next.is_empty() {
            return Err(DecodeError::State {
                step,
                token: -1,
                reason: "no hypotheses survived the finish step".into(),
            });
        }
        hyp.insert(step + 1, next);
        self.n_decoded_frames += 1;
        debug!(frames = self.n_decoded_frames, "decode finished");
        Ok(())
    }

    /// Runs a whole utterance and returns every final hypothesis, best
    /// first.
    pub fn decode<D: Data<Elem = f32>>(&mut self, emissions: &ArrayBase<D, Ix2>) -> Result<Vec<DecodeResult>> {
        self.decode_begin()?;
        self.decode_step(emissions)?;
        self.decode_end()?;
        Ok(self.get_all_final_hypothesis())
    }

    /// Best hypothesis `look_back` steps before the current frontier, if
    /// that step is still stored.
    pub fn get_best_hypothesis(&self, look_back: usize) -> Option<DecodeResult> {
        let frame = self.n_decoded_frames.checked_sub(look_back)?;
        let frontier = self.hyp.get(&frame)?;
        best_state(frontier).map(|best| trace_result(&self.hyp, best))
    }

    /// Every hypothesis of the current frontier, sorted by descending
    /// score.
    pub fn get_all_final_hypothesis(&self) -> Vec<DecodeResult> {
        let Some(frontier) = self.hyp.get(&self.n_decoded_frames) else {
            return Vec::new();
        };
        let mut results: Vec<DecodeResult> = frontier
            .iter()
            .map(|state| trace_result(&self.hyp, state))
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results
    }

    /// Drops stored steps older than `look_back` steps behind the current
    /// frontier.
    ///
    /// Hypotheses extracted afterwards cover only the retained window:
    /// the back-trace origin becomes the oldest stored ancestor and the
    /// reported scores are rebased to it, so every `DecodeResult` still
    /// scores exactly the tokens it carries. Extract before pruning when
    /// the full transcript is needed.
    pub fn prune(&mut self, look_back: usize) {
        let cutoff = self.n_decoded_frames.saturating_sub(look_back);
        self.hyp.retain(|&step, _| step >= cutoff);
        self.n_pruned_frames = cutoff.max(self.n_pruned_frames);
    }

    /// Decoded steps still held in the hypothesis buffer.
    pub fn n_decoded_frames_in_buffer(&self) -> usize {
        self.n_decoded_frames - self.n_pruned_frames
    }

    fn check_input<D: Data<Elem = f32>>(&self, emissions: &ArrayBase<D, Ix2>, n: usize) -> Result<()> {
        // unk is a word label, not an emission index, so only sil and blank
        // are checked against the alphabet
        for special in [self.sil, self.blank] {
            if special >= n as i32 {
                return Err(DecodeError::Input {
                    step: self.n_decoded_frames,
                    reason: format!("special token index {special} outside alphabet of size {n}"),
                });
            }
        }
        if self.options.criterion == CriterionType::Asg && self.transitions.len() != n * n {
            return Err(DecodeError::Input {
                step: self.n_decoded_frames,
                reason: format!(
                    "transition matrix has {} entries, expected {}",
                    self.transitions.len(),
                    n * n
                ),
            });
        }
        for ((t, _), &value) in emissions.indexed_iter() {
            if !value.is_finite() {
                return Err(DecodeError::Input {
                    step: self.n_decoded_frames + t,
                    reason: format!("non-finite emission {value}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BoxError;
    use crate::language_model::ZeroLm;
    use ndarray::array;

    fn ctc_options(beam_size: usize) -> DecoderOptions {
        DecoderOptions {
            beam_size,
            beam_size_token: 8,
            beam_threshold: 1000.0,
            ..DecoderOptions::default()
        }
    }

    // alphabet {a = 0, b = 1, blank = 2}
    const BLANK: i32 = 2;

    #[test]
    fn ctc_requires_a_blank_token() {
        let trie = Trie::new();
        let result = LexiconDecoder::new(
            ctc_options(4),
            trie,
            ZeroLm,
            LmMode::WordLevel,
            -1,
            -1,
            -1,
            Vec::new(),
        );
        assert!(matches!(result, Err(DecodeError::Config { .. })));
    }

    #[test]
    fn asg_rejects_a_blank_token() {
        let trie = Trie::new();
        let options = DecoderOptions {
            criterion: CriterionType::Asg,
            ..ctc_options(4)
        };
        let result = LexiconDecoder::new(
            options,
            trie,
            ZeroLm,
            LmMode::WordLevel,
            -1,
            BLANK,
            -1,
            vec![0.0; 9],
        );
        assert!(matches!(result, Err(DecodeError::Config { .. })));
    }

    #[test]
    fn non_finite_emissions_are_rejected() {
        let mut trie = Trie::new();
        trie.insert(&[0], 0, 0.0).unwrap();
        let mut decoder =
            LexiconDecoder::new(ctc_options(4), trie, ZeroLm, LmMode::WordLevel, -1, BLANK, -1, Vec::new())
                .unwrap();
        decoder.decode_begin().unwrap();
        let emissions = array![[1.0_f32, f32::NAN, 0.0]];
        assert!(matches!(
            decoder.decode_step(&emissions),
            Err(DecodeError::Input { .. })
        ));
    }

    #[test]
    fn collapses_unseparated_repeats() {
        let mut trie = Trie::new();
        trie.insert(&[0, 1], 0, 0.0).unwrap();
        let mut decoder =
            LexiconDecoder::new(ctc_options(4), trie, ZeroLm, LmMode::WordLevel, -1, BLANK, -1, Vec::new())
                .unwrap();
        // a, a, b should collapse to the word "ab"
        let emissions = array![
            [10.0_f32, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
        ];
        let results = decoder.decode(&emissions).unwrap();
        let best = &results[0];
        assert_eq!(best.words, vec![0]);
        assert_eq!(best.collapsed_tokens(BLANK), vec![0, 1]);
        assert!((best.score - 30.0).abs() < 1e-5);
    }

    #[test]
    fn out_of_lexicon_paths_take_the_unk_word() {
        let mut trie = Trie::new();
        trie.insert(&[0, 1], 0, 0.0).unwrap();
        let options = DecoderOptions {
            unk_score: -0.5,
            ..ctc_options(8)
        };
        let unk_word = 99;
        let mut decoder =
            LexiconDecoder::new(options, trie, ZeroLm, LmMode::WordLevel, -1, BLANK, unk_word, Vec::new())
                .unwrap();
        // a single "a" frame reaches a node that ends no word
        let emissions = array![[10.0_f32, 0.0, 0.0]];
        let results = decoder.decode(&emissions).unwrap();
        assert!(results.iter().any(|r| r.words == vec![unk_word]));
        let oov = results.iter().find(|r| r.words == vec![unk_word]).unwrap();
        assert!((oov.score - 9.5).abs() < 1e-5);
    }

    #[test]
    fn each_reached_child_can_end_an_out_of_lexicon_word() {
        // root has two non-word-ending children, a and b
        let mut trie = Trie::new();
        trie.insert(&[0, 1], 0, 0.0).unwrap();
        trie.insert(&[1, 0], 1, 0.0).unwrap();
        let options = DecoderOptions {
            unk_score: -0.5,
            ..ctc_options(8)
        };
        let unk_word = 7;
        let mut decoder =
            LexiconDecoder::new(options, trie, ZeroLm, LmMode::WordLevel, -1, BLANK, unk_word, Vec::new())
                .unwrap();
        let emissions = array![[6.0_f32, 5.0, 0.0]];
        decoder.decode_begin().unwrap();
        decoder.decode_step(&emissions).unwrap();
        let results = decoder.get_all_final_hypothesis();

        // one out-of-lexicon completion per expanded child, each keeping
        // its own token path
        let oov: Vec<_> = results.iter().filter(|r| r.words == vec![unk_word]).collect();
        assert_eq!(oov.len(), 2);
        assert_eq!(oov[0].tokens, vec![0]);
        assert!((oov[0].score - 5.5).abs() < 1e-5);
        assert_eq!(oov[1].tokens, vec![1]);
        assert!((oov[1].score - 4.5).abs() < 1e-5);
    }

    /// Token-level LM with a history state, charging a flat cost per label.
    struct FlatTokenLm;

    impl LanguageModel for FlatTokenLm {
        type State = Vec<i32>;

        fn start(&mut self, _start_with_nothing: bool) -> Self::State {
            Vec::new()
        }

        fn score(&mut self, state: &Self::State, label: i32) -> std::result::Result<(Self::State, f64), BoxError> {
            let mut next = state.clone();
            next.push(label);
            Ok((next, -0.25))
        }

        fn finish(&mut self, state: &Self::State) -> std::result::Result<(Self::State, f64), BoxError> {
            Ok((state.clone(), 0.0))
        }

        fn compare_state(&self, a: &Self::State, b: &Self::State) -> Ordering {
            a.cmp(b)
        }
    }

    #[test]
    fn token_level_mode_charges_every_token() {
        let emissions = array![
            [10.0_f32, 0.0, 0.0],
            [0.0, 10.0, 0.0],
        ];
        let mut word_trie = Trie::new();
        word_trie.insert(&[0, 1], 0, 0.0).unwrap();
        let options = DecoderOptions {
            lm_weight: 1.0,
            ..ctc_options(8)
        };

        let mut word_level = LexiconDecoder::new(
            options.clone(),
            word_trie,
            FlatTokenLm,
            LmMode::WordLevel,
            -1,
            BLANK,
            -1,
            Vec::new(),
        )
        .unwrap();
        let word_best = &word_level.decode(&emissions).unwrap()[0];
        // one word query
        assert!((word_best.lm_score - -0.25).abs() < 1e-9);

        let mut token_trie = Trie::new();
        token_trie.insert(&[0, 1], 0, 0.0).unwrap();
        let mut token_level = LexiconDecoder::new(
            options,
            token_trie,
            FlatTokenLm,
            LmMode::TokenLevel,
            -1,
            BLANK,
            -1,
            Vec::new(),
        )
        .unwrap();
        let token_best = &token_level.decode(&emissions).unwrap()[0];
        // one query per emitted token
        assert!((token_best.lm_score - -0.5).abs() < 1e-9);
    }

    #[test]
    fn pruning_trims_the_stored_history() {
        let mut trie = Trie::new();
        trie.insert(&[0, 1], 0, 0.0).unwrap();
        let mut decoder =
            LexiconDecoder::new(ctc_options(4), trie, ZeroLm, LmMode::WordLevel, -1, BLANK, -1, Vec::new())
                .unwrap();
        let emissions = array![
            [10.0_f32, 0.0, 0.0],
            [0.0, 10.0, 0.0],
        ];
        decoder.decode_begin().unwrap();
        decoder.decode_step(&emissions).unwrap();
        assert_eq!(decoder.n_decoded_frames_in_buffer(), 2);
        decoder.prune(1);
        assert_eq!(decoder.n_decoded_frames_in_buffer(), 1);
        // the frontier survives and the extracted score covers exactly the
        // one retained edge
        let suffix = decoder.get_best_hypothesis(0).unwrap();
        assert_eq!(suffix.tokens, vec![1]);
        assert!((suffix.score - 10.0).abs() < 1e-5);
    }

    #[test]
    fn results_extracted_after_pruning_rebase_to_the_retained_window() {
        let mut trie = Trie::new();
        trie.insert(&[0, 1, 0, 1], 0, 0.0).unwrap();
        let mut decoder =
            LexiconDecoder::new(ctc_options(4), trie, ZeroLm, LmMode::WordLevel, -1, BLANK, -1, Vec::new())
                .unwrap();
        let emissions = array![
            [10.0_f32, 0.0, 0.0],
            [0.0, 9.0, 0.0],
            [8.0, 0.0, 0.0],
            [0.0, 7.0, 0.0],
        ];
        decoder.decode_begin().unwrap();
        decoder.decode_step(&emissions).unwrap();
        let full = decoder.get_best_hypothesis(0).unwrap();
        assert_eq!(full.tokens, vec![0, 1, 0, 1]);
        assert!((full.score - 34.0).abs() < 1e-5);

        decoder.prune(2);
        let suffix = decoder.get_best_hypothesis(0).unwrap();
        assert_eq!(suffix.tokens, vec![0, 1]);
        // replaying the retained frames reproduces the rebased score
        let replayed: f64 = suffix
            .tokens
            .iter()
            .enumerate()
            .map(|(t, &token)| f64::from(emissions[[t + 2, token as usize]]))
            .sum();
        assert!((suffix.score - replayed).abs() < 1e-5);
        // full and suffix scores differ by exactly the dropped prefix
        assert!((full.score - suffix.score - 19.0).abs() < 1e-5);
    }

    #[test]
    fn asg_scores_transitions_between_tokens() {
        let mut trie = Trie::new();
        trie.insert(&[0, 1], 0, 0.0).unwrap();
        let options = DecoderOptions {
            criterion: CriterionType::Asg,
            ..ctc_options(4)
        };
        // trans[prev][cur], 3x3; a -> b transition pays -1.5
        let mut transitions = vec![0.0_f32; 9];
        transitions[1] = -1.5;
        let mut decoder = LexiconDecoder::new(
            options,
            trie,
            ZeroLm,
            LmMode::WordLevel,
            -1,
            -1,
            -1,
            transitions,
        )
        .unwrap();
        let emissions = array![
            [10.0_f32, 0.0, 0.0],
            [0.0, 10.0, 0.0],
        ];
        let results = decoder.decode(&emissions).unwrap();
        let best = &results[0];
        assert_eq!(best.words, vec![0]);
        assert!((best.score - 18.5).abs() < 1e-5);
    }
}
