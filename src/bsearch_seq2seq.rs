//! Output-synchronous beam search driven by an audio-model callback.
//!
//! Instead of consuming a fixed emission matrix, every output position
//! batches the live frontier through [`AudioModel::update`] and expands
//! each hypothesis over the returned score vectors. A hypothesis that
//! emits the end-of-sentence token moves to the completed pool and is
//! never expanded again; the search stops when the frontier empties or
//! the output length cap is reached.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::audio_model::AudioModel;
use crate::beam::{best_state, trace_result, CandidatePool, DecodeResult, Hypothesis};
use crate::errors::{DecodeError, Result};
use crate::language_model::{finish_checked, score_checked, LanguageModel};
use crate::options::{CriterionType, DecoderOptions};

#[derive(Clone, Debug)]
pub(crate) struct Seq2SeqDecoderState<S, A> {
    score: f64,
    lm_state: S,
    parent: Option<(usize, usize)>,
    /// Emitted token label, `-1` on the seed state.
    token: i32,
    /// Opaque audio-model state to resume this hypothesis from.
    am_state: A,
    am_score: f64,
    lm_score: f64,
}

impl<S: Clone, A: Clone> Hypothesis for Seq2SeqDecoderState<S, A> {
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
        -1
    }
    fn parent(&self) -> Option<(usize, usize)> {
        self.parent
    }
}

/// Beam search decoder for attention-style models that score the next
/// token from the hypothesis history.
pub struct Seq2SeqDecoder<L: LanguageModel, A: AudioModel> {
    options: DecoderOptions,
    lm: L,
    am: A,
    eos: i32,
    max_output_length: usize,
    /// Skip tokens scoring below (row best - hard_selection). Infinity
    /// disables the cut.
    hard_selection: f64,
    /// Penalty proportional to the gap from the row best. Infinity
    /// disables the penalty.
    soft_selection: f64,
    pool: CandidatePool<Seq2SeqDecoderState<L::State, A::State>>,
    hyp: BTreeMap<usize, Vec<Seq2SeqDecoderState<L::State, A::State>>>,
    completed: Vec<Seq2SeqDecoderState<L::State, A::State>>,
    frontier_step: usize,
    alphabet_size: Option<usize>,
}

impl<L: LanguageModel, A: AudioModel> Seq2SeqDecoder<L, A> {
    pub fn new(
        options: DecoderOptions,
        lm: L,
        am: A,
        eos: i32,
        max_output_length: usize,
        hard_selection: f64,
        soft_selection: f64,
    ) -> Result<Self> {
        options.validate()?;
        if options.criterion != CriterionType::Seq2Seq {
            return Err(DecodeError::Config {
                reason: format!("Seq2SeqDecoder requires the Seq2Seq criterion, got {:?}", options.criterion),
            });
        }
        if eos < 0 {
            return Err(DecodeError::Config {
                reason: "end-of-sentence token index must be non-negative".into(),
            });
        }
        if max_output_length == 0 {
            return Err(DecodeError::Config {
                reason: "max_output_length cannot be 0".into(),
            });
        }
        if hard_selection.is_nan() || soft_selection.is_nan() {
            return Err(DecodeError::Config {
                reason: "selection parameters must not be NaN".into(),
            });
        }
        Ok(Self {
            options,
            lm,
            am,
            eos,
            max_output_length,
            hard_selection,
            soft_selection,
            pool: CandidatePool::new(),
            hyp: BTreeMap::new(),
            completed: Vec::new(),
            frontier_step: 0,
            alphabet_size: None,
        })
    }

    /// Seeds the search with a single empty hypothesis.
    pub fn decode_begin(&mut self) -> Result<()> {
        self.hyp.clear();
        self.completed.clear();
        self.frontier_step = 0;
        self.alphabet_size = None;
        let lm_state = self.lm.start(false);
        let am_state = self.am.start();
        self.hyp.insert(
            0,
            vec![Seq2SeqDecoderState {
                score: 0.0,
                lm_state,
                parent: None,
                token: -1,
                am_state,
                am_score: 0.0,
                lm_score: 0.0,
            }],
        );
        debug!(beam_size = self.options.beam_size, max_output_length = self.max_output_length, "decode started");
        Ok(())
    }

    /// Expands the frontier by one output position.
    ///
    /// Returns `false` once the search is exhausted: every hypothesis has
    /// emitted end-of-sentence, or the output length cap was reached.
    pub fn decode_step(&mut self) -> Result<bool> {
        let step = self.frontier_step;
        if step >= self.max_output_length {
            return Ok(false);
        }

        let eos = self.eos;
        let hard_selection = self.hard_selection;
        let soft_selection = self.soft_selection;
        let Self {
            options,
            lm,
            am,
            pool,
            hyp,
            completed,
            alphabet_size,
            ..
        } = self;

        let Some(frontier) = hyp.get(&step).filter(|f| !f.is_empty()) else {
            return Err(DecodeError::Input {
                step,
                reason: "no hypotheses to expand; decode_begin must run first".into(),
            });
        };

        let prev_tokens: Vec<i32> = frontier.iter().map(|h| h.token).collect();
        let prev_states: Vec<A::State> = frontier.iter().map(|h| h.am_state.clone()).collect();
        let (scores, new_states) = am
            .update(&prev_tokens, &prev_states, step)
            .map_err(|source| DecodeError::AudioModel { step, source })?;

        let batch = frontier.len();
        let (rows, n) = scores.dim();
        if rows != batch || new_states.len() != batch {
            return Err(DecodeError::Input {
                step,
                reason: format!(
                    "audio model returned {rows} score rows and {} states for a batch of {batch}",
                    new_states.len()
                ),
            });
        }
        match *alphabet_size {
            Some(expected) if expected != n => {
                return Err(DecodeError::Input {
                    step,
                    reason: format!("alphabet size changed from {expected} to {n}"),
                });
            }
            _ => *alphabet_size = Some(n),
        }
        if eos >= n as i32 {
            return Err(DecodeError::Input {
                step,
                reason: format!("end-of-sentence index {eos} outside alphabet of size {n}"),
            });
        }

        pool.reset();
        for (i, prev) in frontier.iter().enumerate() {
            let row = scores.row(i);
            let mut row_best = f64::NEG_INFINITY;
            for &value in row.iter() {
                if value.is_nan() {
                    return Err(DecodeError::Input {
                        step,
                        reason: "audio model returned a NaN score".into(),
                    });
                }
                row_best = row_best.max(f64::from(value));
            }

            for (target, &value) in row.iter().enumerate() {
                let am_add = f64::from(value);
                if am_add < row_best - hard_selection {
                    continue;
                }
                let mut score = prev.score + am_add;
                if soft_selection.is_finite() {
                    score -= soft_selection * (row_best - am_add);
                }
                let token = target as i32;

                if token == eos {
                    let (lm_state, lm_end) = finish_checked(lm, &prev.lm_state, step)?;
                    completed.push(Seq2SeqDecoderState {
                        score: score + options.lm_weight * lm_end + options.word_score,
                        lm_state,
                        parent: Some((step, i)),
                        token,
                        am_state: new_states[i].clone(),
                        am_score: prev.am_score + am_add,
                        lm_score: prev.lm_score + lm_end,
                    });
                } else {
                    let (lm_state, lm_add) = score_checked(lm, &prev.lm_state, token, step)?;
                    pool.add(
                        options.beam_threshold,
                        Seq2SeqDecoderState {
                            score: score + options.lm_weight * lm_add,
                            lm_state,
                            parent: Some((step, i)),
                            token,
                            am_state: new_states[i].clone(),
                            am_score: prev.am_score + am_add,
                            lm_score: prev.lm_score + lm_add,
                        },
                    );
                }
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
                    .then(a.token.cmp(&b.token))
            },
        );
        trace!(step, frontier = batch, survivors = next.len(), completed = completed.len(), "position expanded");
        if next.is_empty() {
            return Ok(false);
        }
        hyp.insert(step + 1, next);
        self.frontier_step = step + 1;
        Ok(true)
    }

    /// Runs a whole utterance and returns every completed hypothesis
    /// (falling back to the final frontier when nothing emitted
    /// end-of-sentence), best first.
    pub fn decode(&mut self) -> Result<Vec<DecodeResult>> {
        self.decode_begin()?;
        while self.decode_step()? {}
        debug!(completed = self.completed.len(), "decode finished");
        Ok(self.get_all_final_hypothesis())
    }

    /// Best completed hypothesis. The `look_back` argument exists for
    /// interface parity with the frame-synchronous decoder and is ignored:
    /// output positions are not frames.
    pub fn get_best_hypothesis(&self, _look_back: usize) -> Option<DecodeResult> {
        if self.completed.is_empty() {
            let frontier = self.hyp.get(&self.frontier_step)?;
            return best_state(frontier).map(|best| trace_result(&self.hyp, best));
        }
        best_state(&self.completed).map(|best| trace_result(&self.hyp, best))
    }

    /// Every completed hypothesis sorted by descending score, or the final
    /// frontier when the length cap cut the search off first.
    pub fn get_all_final_hypothesis(&self) -> Vec<DecodeResult> {
        let mut results: Vec<DecodeResult> = if self.completed.is_empty() {
            self.hyp
                .get(&self.frontier_step)
                .map(|frontier| frontier.iter().map(|s| trace_result(&self.hyp, s)).collect())
                .unwrap_or_default()
        } else {
            self.completed.iter().map(|s| trace_result(&self.hyp, s)).collect()
        };
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results
    }

    /// History trimming is not supported for the output-synchronous
    /// search; the whole back-trace is kept until the next
    /// `decode_begin`. This is a no-op.
    pub fn prune(&mut self, _look_back: usize) {}
}
