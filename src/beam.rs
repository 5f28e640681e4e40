//! Shared beam machinery: candidate pool, hypothesis merging, pruning and
//! back-trace extraction.
//!
//! Both decoder variants expand the current frontier into a scratch
//! candidate buffer, then promote the merged, thresholded, truncated
//! survivors into the per-step hypothesis arena. Parent links are
//! `(step, index)` pairs into that arena, so back-traces never follow
//! owned pointer chains.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::fast_math::log_sum_exp;

/// Accessors the pool needs from a hypothesis state.
pub(crate) trait Hypothesis: Clone {
    fn score(&self) -> f64;
    fn set_score(&mut self, score: f64);
    fn am_score(&self) -> f64;
    fn lm_score(&self) -> f64;
    fn token(&self) -> i32;
    fn word(&self) -> i32;
    fn parent(&self) -> Option<(usize, usize)>;
}

/// Scratch buffer for one expansion phase.
///
/// `add` drops candidates already known to fall outside the beam threshold
/// relative to the running best, which keeps the buffer small before the
/// real pruning in `store`.
pub(crate) struct CandidatePool<S> {
    candidates: Vec<S>,
    best_score: f64,
}

impl<S: Hypothesis> CandidatePool<S> {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            best_score: f64::NEG_INFINITY,
        }
    }

    pub fn reset(&mut self) {
        self.candidates.clear();
        self.best_score = f64::NEG_INFINITY;
    }

    pub fn add(&mut self, beam_threshold: f64, state: S) {
        if state.score() > self.best_score {
            self.best_score = state.score();
        }
        if state.score() >= self.best_score - beam_threshold {
            self.candidates.push(state);
        }
    }

    /// Merges equivalent candidates, prunes and returns the survivors in
    /// descending score order (or unordered top-K when `sort` is false).
    ///
    /// `key_cmp` is the merge equivalence: candidates comparing `Equal` are
    /// interchangeable for all future scoring. With `log_add` their
    /// probability mass is combined; otherwise the best one wins. Either
    /// way the surviving candidate (parent included) is the highest-scoring
    /// input of its class, and all ordering is stable so equal scores keep
    /// insertion order.
    pub fn store<K>(
        &mut self,
        beam_size: usize,
        beam_threshold: f64,
        log_add: bool,
        sort: bool,
        key_cmp: K,
    ) -> Vec<S>
    where
        K: Fn(&S, &S) -> Ordering,
    {
        let cands = &mut self.candidates;
        if cands.is_empty() {
            return Vec::new();
        }

        let floor = self.best_score - beam_threshold;
        let mut kept: Vec<usize> = (0..cands.len()).filter(|&i| cands[i].score() >= floor).collect();

        // group equivalent candidates, best first within each group
        kept.sort_by(|&a, &b| {
            key_cmp(&cands[a], &cands[b]).then_with(|| cmp_score_desc(&cands[a], &cands[b]))
        });

        let mut merged: Vec<usize> = Vec::with_capacity(kept.len());
        for idx in kept {
            if let Some(&head) = merged.last() {
                if key_cmp(&cands[idx], &cands[head]) == Ordering::Equal {
                    if log_add {
                        let combined = log_sum_exp(cands[head].score(), cands[idx].score());
                        cands[head].set_score(combined);
                    }
                    continue;
                }
            }
            merged.push(idx);
        }

        if sort {
            merged.sort_by(|&a, &b| cmp_score_desc(&cands[a], &cands[b]));
            merged.truncate(beam_size);
        } else if merged.len() > beam_size {
            pdqselect::select_by(&mut merged, beam_size, |&a, &b| {
                cmp_score_desc(&cands[a], &cands[b])
            });
            merged.truncate(beam_size);
        }

        merged.iter().map(|&i| cands[i].clone()).collect()
    }
}

fn cmp_score_desc<S: Hypothesis>(a: &S, b: &S) -> Ordering {
    b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal)
}

/// One extracted transcription hypothesis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeResult {
    /// Total decode score along the back-trace.
    pub score: f64,
    /// Emitting-model portion of the score.
    pub am_score: f64,
    /// Language-model portion of the score (unweighted).
    pub lm_score: f64,
    /// Completed word labels, in emission order.
    pub words: Vec<i32>,
    /// Raw emitted token labels, blanks and repeats included.
    pub tokens: Vec<i32>,
}

impl DecodeResult {
    /// Token sequence with blanks removed and un-separated repeats
    /// collapsed, i.e. the CTC reduction of `tokens`.
    pub fn collapsed_tokens(&self, blank: i32) -> Vec<i32> {
        let mut output = Vec::new();
        let mut last = blank;
        for &token in &self.tokens {
            if token != last && token != blank {
                output.push(token);
            }
            last = token;
        }
        output
    }
}

/// Walks the parent chain of `leaf` through the arena and materializes the
/// token/word sequences. Sentinel tokens (`< 0`) are skipped.
///
/// The trace origin is the seed or, after pruning, the oldest ancestor
/// whose own parent step is no longer stored. The origin contributes no
/// token and its accumulated scores are subtracted from the leaf's, so the
/// reported score always covers exactly the emitted token window.
pub(crate) fn trace_result<S: Hypothesis>(arena: &BTreeMap<usize, Vec<S>>, leaf: &S) -> DecodeResult {
    let mut tokens = Vec::new();
    let mut words = Vec::new();

    let mut state = leaf;
    loop {
        let Some((step, idx)) = state.parent() else {
            break;
        };
        let Some(parent) = arena.get(&step).and_then(|frontier| frontier.get(idx)) else {
            break;
        };
        if state.token() >= 0 {
            tokens.push(state.token());
        }
        if state.word() >= 0 {
            words.push(state.word());
        }
        state = parent;
    }
    tokens.reverse();
    words.reverse();

    DecodeResult {
        score: leaf.score() - state.score(),
        am_score: leaf.am_score() - state.am_score(),
        lm_score: leaf.lm_score() - state.lm_score(),
        words,
        tokens,
    }
}

/// Highest-scoring state of a frontier, first one on ties.
pub(crate) fn best_state<S: Hypothesis>(frontier: &[S]) -> Option<&S> {
    frontier.iter().fold(None, |best, state| match best {
        Some(b) if state.score() <= b.score() => Some(b),
        _ => Some(state),
    })
}
