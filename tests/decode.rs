//! End-to-end decoding scenarios through the public API.

use ndarray::array;
use rustbeam::{DecoderOptions, LexiconDecoder, LmMode, Trie, ZeroLm};

// alphabet {a = 0, b = 1, blank = 2}
const BLANK: i32 = 2;

fn options(beam_size: usize) -> DecoderOptions {
    DecoderOptions {
        beam_size,
        beam_size_token: 8,
        beam_threshold: 1000.0,
        ..DecoderOptions::default()
    }
}

fn decoder_for(words: &[&[i32]], opts: DecoderOptions) -> LexiconDecoder<ZeroLm> {
    let mut lexicon = Trie::new();
    for (label, spelling) in words.iter().enumerate() {
        lexicon.insert(spelling, label as i32, 0.0).unwrap();
    }
    LexiconDecoder::new(opts, lexicon, ZeroLm, LmMode::WordLevel, -1, BLANK, -1, Vec::new()).unwrap()
}

#[test]
fn greedy_ctc_path_without_lm() {
    let emissions = array![
        [10.0_f32, 0.0, 0.0],
        [0.0, 10.0, 0.0],
        [0.0, 10.0, 0.0],
        [10.0, 0.0, 0.0],
    ];
    let mut decoder = decoder_for(&[&[0, 1, 0]], options(4));
    let results = decoder.decode(&emissions).unwrap();

    let best = &results[0];
    assert_eq!(best.collapsed_tokens(BLANK), vec![0, 1, 0]);
    assert!((best.score - 40.0).abs() < 1e-5);

    // the stored score is the sum of the per-frame emissions on the path
    let replayed: f64 = best
        .tokens
        .iter()
        .enumerate()
        .map(|(t, &token)| f64::from(emissions[[t, token as usize]]))
        .sum();
    assert!((best.score - replayed).abs() < 1e-5);
}

#[test]
fn blank_separated_repeats_survive_collapse() {
    let emissions = array![
        [10.0_f32, 0.0, 0.0],
        [0.0, 0.0, 10.0],
        [10.0, 0.0, 0.0],
        [0.0, 0.0, 10.0],
        [10.0, 0.0, 0.0],
    ];
    let mut decoder = decoder_for(&[&[0, 0, 0]], options(4));
    let results = decoder.decode(&emissions).unwrap();

    let best = &results[0];
    assert_eq!(best.collapsed_tokens(BLANK), vec![0, 0, 0]);
    assert_eq!(best.words, vec![0]);
    assert!((best.score - 50.0).abs() < 1e-5);
}

#[test]
fn completed_words_collect_the_word_bonus() {
    // alphabet {c = 0, a = 1, t = 2, blank = 3}
    let emissions = array![
        [10.0_f32, 0.0, 0.0, 0.0],
        [0.0, 10.0, 0.0, 0.0],
        [0.0, 0.0, 10.0, 0.0],
    ];
    let mut lexicon = Trie::new();
    lexicon.insert(&[0, 1, 2], 0, 0.0).unwrap();
    let opts = DecoderOptions {
        word_score: 2.0,
        ..options(4)
    };
    let mut decoder =
        LexiconDecoder::new(opts, lexicon, ZeroLm, LmMode::WordLevel, -1, 3, -1, Vec::new()).unwrap();
    let results = decoder.decode(&emissions).unwrap();

    let best = &results[0];
    assert_eq!(best.words, vec![0]);
    assert!((best.score - (best.am_score + 2.0)).abs() < 1e-5);
    assert!((best.am_score - 30.0).abs() < 1e-5);
}

#[test]
fn homophones_merge_by_log_add() {
    let ln2 = std::f64::consts::LN_2 as f32;
    let emissions = array![[ln2, 0.0_f32]];

    // two words spelled identically land on one trie node and merge
    let build = |log_add: bool| {
        let mut lexicon = Trie::new();
        lexicon.insert(&[0], 0, 0.0).unwrap();
        lexicon.insert(&[0], 1, 0.0).unwrap();
        let opts = DecoderOptions {
            log_add,
            beam_size: 4,
            beam_size_token: 4,
            beam_threshold: 1000.0,
            ..DecoderOptions::default()
        };
        LexiconDecoder::new(opts, lexicon, ZeroLm, LmMode::WordLevel, -1, 1, -1, Vec::new()).unwrap()
    };

    // inspect the frontier right after the merging step
    let mut decoder = build(true);
    decoder.decode_begin().unwrap();
    decoder.decode_step(&emissions).unwrap();
    let merged = decoder.get_best_hypothesis(0).unwrap();
    assert!((merged.score - 4.0_f64.ln()).abs() < 1e-5);

    let mut decoder = build(false);
    decoder.decode_begin().unwrap();
    decoder.decode_step(&emissions).unwrap();
    let kept = decoder.get_best_hypothesis(0).unwrap();
    assert!((kept.score - f64::from(ln2)).abs() < 1e-5);
    // the earlier insertion wins the tie
    assert_eq!(kept.words, vec![0]);
}

#[test]
fn identical_inputs_decode_identically() {
    let emissions = array![
        [1.0_f32, 0.9, 0.1],
        [0.8, 1.1, 0.2],
        [0.5, 0.4, 1.5],
        [1.2, 0.3, 0.6],
    ];
    let run = || {
        let mut decoder = decoder_for(&[&[0, 1], &[1, 0], &[0, 1, 0]], options(6));
        decoder.decode(&emissions).unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn widening_the_beam_never_hurts_the_best_score() {
    let emissions = array![
        [1.0_f32, 0.9, 0.1],
        [0.8, 1.1, 0.2],
        [0.5, 0.4, 1.5],
        [1.2, 0.3, 0.6],
    ];
    let best_with = |beam_size: usize| {
        let mut decoder = decoder_for(&[&[0, 1], &[1, 0], &[0, 1, 0]], options(beam_size));
        decoder.decode(&emissions).unwrap()[0].score
    };
    let narrow = best_with(1);
    let wide = best_with(8);
    assert!(wide >= narrow - 1e-9);
}

#[test]
fn beam_and_threshold_bounds_hold() {
    let emissions = array![
        [1.0_f32, 0.9, 0.1],
        [0.8, 1.1, 0.2],
        [0.5, 0.4, 1.5],
    ];
    let opts = DecoderOptions {
        beam_threshold: 2.0,
        ..options(3)
    };
    let mut decoder = decoder_for(&[&[0, 1], &[1, 0], &[0, 1, 0]], opts);
    let results = decoder.decode(&emissions).unwrap();

    assert!(results.len() <= 3);
    let best = results[0].score;
    assert!(results.iter().all(|r| r.score >= best - 2.0 - 1e-9));
}

#[test]
fn best_hypothesis_heads_the_full_list() {
    let emissions = array![
        [1.0_f32, 0.9, 0.1],
        [0.8, 1.1, 0.2],
        [0.5, 0.4, 1.5],
    ];
    let mut decoder = decoder_for(&[&[0, 1], &[1, 0]], options(6));
    let all = decoder.decode(&emissions).unwrap();
    let best = decoder.get_best_hypothesis(0).unwrap();
    assert_eq!(best, all[0]);
}
