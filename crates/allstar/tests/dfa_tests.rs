//! Tests for the shared DFA cache as exercised through prediction.

mod support;

use allstar::dfa::serializer::NumericVocabulary;
use allstar::dfa::{DfaCache, DfaSerializer};
use allstar::prediction::{AdaptivePredictor, NoPredicates, PredictionContext};
use support::{ab_ac, syms};

#[test]
fn equal_inputs_intern_no_new_states() {
    let (atn, d) = ab_ac();
    let cache = DfaCache::new(&atn);
    let predictor = AdaptivePredictor::new(&atn, &cache);
    let ctx = PredictionContext::empty();

    predictor
        .predict(d, &syms("ab"), 0, &ctx, &NoPredicates)
        .unwrap();
    let learned = cache.dfa(d).len();
    for _ in 0..10 {
        predictor
            .predict(d, &syms("ab"), 0, &ctx, &NoPredicates)
            .unwrap();
    }
    assert_eq!(cache.dfa(d).len(), learned);
}

#[test]
fn shared_prefix_shares_the_path() {
    let (atn, d) = ab_ac();
    let cache = DfaCache::new(&atn);
    let predictor = AdaptivePredictor::new(&atn, &cache);
    let ctx = PredictionContext::empty();

    predictor
        .predict(d, &syms("ab"), 0, &ctx, &NoPredicates)
        .unwrap();
    let after_first = cache.dfa(d).len();
    predictor
        .predict(d, &syms("ac"), 0, &ctx, &NoPredicates)
        .unwrap();
    let after_second = cache.dfa(d).len();

    // The path for `a` is shared; only the accept state for `c` is new.
    assert_eq!(after_second, after_first + 1);

    let dfa = cache.dfa(d);
    let s0 = dfa.start_state().unwrap();
    let after_a = dfa.edge(s0, u32::from(b'a')).unwrap();
    assert!(dfa.edge(after_a, u32::from(b'b')).is_some());
    assert!(dfa.edge(after_a, u32::from(b'c')).is_some());
}

#[test]
fn snapshot_renders_through_the_serializer() {
    let (atn, d) = ab_ac();
    let cache = DfaCache::new(&atn);
    let predictor = AdaptivePredictor::new(&atn, &cache);
    let ctx = PredictionContext::empty();
    predictor
        .predict(d, &syms("ab"), 0, &ctx, &NoPredicates)
        .unwrap();

    let text = DfaSerializer::new(cache.dfa(d), &NumericVocabulary).to_string();
    assert!(text.contains("->"));
    // The accept state for alternative 1 shows up with its prediction.
    assert!(text.contains("=>1"));
}

#[test]
fn clear_resets_every_decision() {
    let (atn, d) = ab_ac();
    let cache = DfaCache::new(&atn);
    let predictor = AdaptivePredictor::new(&atn, &cache);
    let ctx = PredictionContext::empty();
    predictor
        .predict(d, &syms("ab"), 0, &ctx, &NoPredicates)
        .unwrap();
    assert!(!cache.dfa(d).is_empty());

    cache.clear();
    assert!(cache.dfa(d).is_empty());
    assert!(cache.dfa(d).start_state().is_none());

    // Relearning from scratch still works.
    let alt = predictor
        .predict(d, &syms("ac"), 0, &ctx, &NoPredicates)
        .unwrap();
    assert_eq!(alt, 2);
}
