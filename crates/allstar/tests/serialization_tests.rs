//! Tests for the ATN wire format against live prediction.

mod support;

use allstar::atn::serial::{decode, encode, FORMAT_VERSION};
use allstar::dfa::DfaCache;
use allstar::error::AtnFormatError;
use allstar::lexer::{LexerSimulator, NoCustomActions};
use allstar::prediction::{AdaptivePredictor, NoPredicates, PredictionContext};
use support::{keyword_lexer, nested, syms};

#[test]
fn decoded_parser_grammar_predicts_like_the_original() {
    let (atn, d, follow) = nested();
    let decoded = decode(&encode(&atn)).unwrap();

    let ctx = PredictionContext::link(PredictionContext::empty(), follow);
    let cache_a = DfaCache::new(&atn);
    let cache_b = DfaCache::new(&decoded);
    let original = AdaptivePredictor::new(&atn, &cache_a);
    let restored = AdaptivePredictor::new(&decoded, &cache_b);

    for input in ["xy", "xb"] {
        let a = original
            .predict(d, &syms(input), 0, &ctx, &NoPredicates)
            .unwrap();
        let b = restored
            .predict(d, &syms(input), 0, &ctx, &NoPredicates)
            .unwrap();
        assert_eq!(a, b, "diverged on {input:?}");
    }
}

#[test]
fn decoded_lexer_grammar_tokenizes_like_the_original() {
    let atn = keyword_lexer();
    let words = encode(&atn);
    let decoded = decode(&words).unwrap();
    assert_eq!(decoded.rules().len(), atn.rules().len());
    assert_eq!(decoded.rule(allstar::RuleId(2)).name, "WS");

    let cache = DfaCache::new(&decoded);
    let mut lexer = LexerSimulator::new(&decoded, &cache);
    let tokens = lexer
        .tokenize(&syms("if foo"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    let types: Vec<_> = tokens.iter().filter_map(|m| m.token_type).collect();
    assert_eq!(types, [0, 1]);
}

#[test]
fn encoding_is_stable_across_a_round_trip() {
    let atn = keyword_lexer();
    let words = encode(&atn);
    assert_eq!(words[0], FORMAT_VERSION);
    assert_eq!(encode(&decode(&words).unwrap()), words);
}

#[test]
fn corrupt_streams_fail_loudly() {
    let words = encode(&keyword_lexer());

    assert!(matches!(
        decode(&[]),
        Err(AtnFormatError::Truncated { .. })
    ));

    let mut wrong_version = words.clone();
    wrong_version[0] = 0;
    assert!(matches!(
        decode(&wrong_version),
        Err(AtnFormatError::UnsupportedVersion { found: 0, .. })
    ));

    assert!(matches!(
        decode(&words[..words.len() / 2]),
        Err(AtnFormatError::Truncated { .. })
    ));
}
