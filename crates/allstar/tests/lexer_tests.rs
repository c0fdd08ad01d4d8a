//! Tests for ATN-driven tokenization.

mod support;

use allstar::atn::{AtnBuilder, GrammarKind, RuleId, StateKind, Transition};
use allstar::dfa::DfaCache;
use allstar::lexer::{LexerAction, LexerSimulator, NoCustomActions};
use allstar::prediction::{NoPredicates, PredicateEvaluator, PredicateRef};
use allstar::PredictionError;
use support::{atom, eps, keyword_lexer, range, syms};

fn token_types(atn: &allstar::Atn, text: &str) -> Vec<u32> {
    let cache = DfaCache::new(atn);
    let mut lexer = LexerSimulator::new(atn, &cache);
    lexer
        .tokenize(&syms(text), &NoPredicates, &mut NoCustomActions)
        .unwrap()
        .into_iter()
        .filter_map(|m| m.token_type)
        .collect()
}

#[test]
fn keyword_beats_identifier_on_exact_text() {
    let atn = keyword_lexer();
    // Equal length: earliest-declared rule wins.
    assert_eq!(token_types(&atn, "if"), [0]);
}

#[test]
fn longest_match_beats_keyword_prefix() {
    let atn = keyword_lexer();
    // `ifx` matches ID for three symbols, IF only for two.
    assert_eq!(token_types(&atn, "ifx"), [1]);
}

#[test]
fn skip_actions_drop_whitespace() {
    let atn = keyword_lexer();
    assert_eq!(token_types(&atn, "if foo  bar"), [0, 1, 1]);
}

#[test]
fn matches_carry_their_spans() {
    let atn = keyword_lexer();
    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let tokens = lexer
        .tokenize(&syms("ab cd"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!((tokens[0].start, tokens[0].end), (0, 2));
    assert_eq!((tokens[1].start, tokens[1].end), (3, 5));
    assert_eq!(tokens[1].rule, RuleId(1));
}

#[test]
fn unmatchable_symbol_is_an_error_at_its_offset() {
    let atn = keyword_lexer();
    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let err = lexer
        .tokenize(&syms("ab!"), &NoPredicates, &mut NoCustomActions)
        .unwrap_err();
    match err {
        PredictionError::NoViableAlternative { offset, .. } => assert_eq!(offset, 2),
        other => panic!("expected NoViableAlternative, got {other:?}"),
    }
}

#[test]
fn no_viable_error_carries_the_live_configurations() {
    let atn = keyword_lexer();
    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let err = lexer
        .tokenize(&syms("ab!"), &NoPredicates, &mut NoCustomActions)
        .unwrap_err();
    match err {
        PredictionError::NoViableAlternative { configs, .. } => assert!(!configs.is_empty()),
        other => panic!("expected NoViableAlternative, got {other:?}"),
    }
}

#[test]
fn fresh_evaluators_are_not_bound_by_cached_predicate_outcomes() {
    struct Gate(bool);
    impl PredicateEvaluator for Gate {
        fn evaluate(&self, _predicate: &PredicateRef, _offset: usize) -> bool {
            self.0
        }
    }

    // A : {p}? 'a' ;  B : 'a' ;
    let mut b = AtnBuilder::new(GrammarKind::Lexer);
    let a = b.rule("A");
    let gate = b.state(a, StateKind::Basic);
    b.transition(
        b.rule_start(a),
        Transition::Predicate {
            target: gate,
            rule: a,
            index: 0,
            ctx_dependent: false,
        },
    );
    b.transition(gate, atom(b.rule_stop(a), 'a'));
    let bee = b.rule("B");
    let b1 = b.state(bee, StateKind::Basic);
    b.transition(b.rule_start(bee), eps(b1));
    b.transition(b1, atom(b.rule_stop(bee), 'a'));
    let entry = b.state(a, StateKind::Decision);
    b.transition(entry, eps(b.rule_start(a)));
    b.transition(entry, eps(b.rule_start(bee)));
    b.mode(entry);
    let atn = b.build().unwrap();

    let cache = DfaCache::new(&atn);
    let mut off = LexerSimulator::new(&atn, &cache);
    let rejected = off
        .tokenize(&syms("a"), &Gate(false), &mut NoCustomActions)
        .unwrap();
    assert_eq!(rejected[0].rule, RuleId(1));

    // A simulator whose predicate now holds must see A, not B's cached win.
    let mut on = LexerSimulator::new(&atn, &cache);
    let admitted = on
        .tokenize(&syms("a"), &Gate(true), &mut NoCustomActions)
        .unwrap();
    assert_eq!(admitted[0].rule, RuleId(0));
}

#[test]
fn empty_input_yields_no_tokens() {
    let atn = keyword_lexer();
    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let tokens = lexer
        .tokenize(&[], &NoPredicates, &mut NoCustomActions)
        .unwrap();
    assert!(tokens.is_empty());
}

#[test]
fn warm_lexer_dfa_stops_growing() {
    let atn = keyword_lexer();
    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    lexer
        .tokenize(&syms("if foo"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    let d = atn.mode_decision(0);
    let learned = cache.dfa(d).len();
    lexer
        .tokenize(&syms("if foo"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    assert_eq!(cache.dfa(d).len(), learned);
}

/// Two modes: `"` enters a string mode where letters tokenize differently,
/// and the closing `"` pops back out.
///
/// ```text
/// mode 0:  OPEN : '"' -> pushMode(1) ;   WORD : [a-z]+ ;
/// mode 1:  TEXT : [a-z]+ ;               CLOSE : '"' -> popMode ;
/// ```
fn string_mode_lexer() -> allstar::Atn {
    let mut b = AtnBuilder::new(GrammarKind::Lexer);

    let open = b.rule("OPEN");
    let o1 = b.state(open, StateKind::Basic);
    b.transition(b.rule_start(open), eps(o1));
    b.transition(o1, atom(b.rule_stop(open), '"'));
    b.actions(open, [LexerAction::PushMode(1)]);

    let word = b.rule("WORD");
    letters(&mut b, word);

    let text = b.rule("TEXT");
    letters(&mut b, text);

    let close = b.rule("CLOSE");
    let c1 = b.state(close, StateKind::Basic);
    b.transition(b.rule_start(close), eps(c1));
    b.transition(c1, atom(b.rule_stop(close), '"'));
    b.actions(close, [LexerAction::PopMode]);

    let default_mode = b.state(open, StateKind::Decision);
    b.transition(default_mode, eps(b.rule_start(open)));
    b.transition(default_mode, eps(b.rule_start(word)));
    b.mode(default_mode);

    let string_mode = b.state(text, StateKind::Decision);
    b.transition(string_mode, eps(b.rule_start(text)));
    b.transition(string_mode, eps(b.rule_start(close)));
    b.mode(string_mode);

    b.build().unwrap()
}

fn letters(b: &mut AtnBuilder, rule: RuleId) {
    let head = b.state(rule, StateKind::PlusLoopEntry);
    b.transition(b.rule_start(rule), eps(head));
    let tail = b.state(rule, StateKind::PlusLoopBack);
    b.transition(head, range(tail, 'a', 'z'));
    b.transition(tail, eps(head));
    b.transition(tail, eps(b.rule_stop(rule)));
}

#[test]
fn push_and_pop_mode_switch_rule_sets() {
    let atn = string_mode_lexer();
    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let tokens = lexer
        .tokenize(&syms("ab\"cd\"ef"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    let rules: Vec<RuleId> = tokens.iter().map(|m| m.rule).collect();
    // WORD OPEN TEXT CLOSE WORD
    assert_eq!(
        rules,
        [RuleId(1), RuleId(0), RuleId(2), RuleId(3), RuleId(1)]
    );
    assert_eq!(lexer.mode(), 0);
}

#[test]
fn more_action_fuses_adjacent_matches() {
    // A : 'a' -> more ;  B : 'b' ;
    let mut b = AtnBuilder::new(GrammarKind::Lexer);
    let a = b.rule("A");
    let a1 = b.state(a, StateKind::Basic);
    b.transition(b.rule_start(a), eps(a1));
    b.transition(a1, atom(b.rule_stop(a), 'a'));
    b.actions(a, [LexerAction::More]);
    let bee = b.rule("B");
    let b1 = b.state(bee, StateKind::Basic);
    b.transition(b.rule_start(bee), eps(b1));
    b.transition(b1, atom(b.rule_stop(bee), 'b'));
    let entry = b.state(a, StateKind::Decision);
    b.transition(entry, eps(b.rule_start(a)));
    b.transition(entry, eps(b.rule_start(bee)));
    b.mode(entry);
    let atn = b.build().unwrap();

    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let tokens = lexer
        .tokenize(&syms("aab"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].rule, RuleId(1));
    assert_eq!((tokens[0].start, tokens[0].end), (0, 3));
}

#[test]
fn channel_and_token_type_actions_apply() {
    let mut b = AtnBuilder::new(GrammarKind::Lexer);
    let r = b.rule("COMMENT");
    let c1 = b.state(r, StateKind::Basic);
    b.transition(b.rule_start(r), eps(c1));
    b.transition(c1, atom(b.rule_stop(r), '#'));
    b.actions(r, [LexerAction::Channel(2), LexerAction::TokenType(77)]);
    let entry = b.state(r, StateKind::Decision);
    b.transition(entry, eps(b.rule_start(r)));
    b.mode(entry);
    let atn = b.build().unwrap();

    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let tokens = lexer
        .tokenize(&syms("#"), &NoPredicates, &mut NoCustomActions)
        .unwrap();
    assert_eq!(tokens[0].token_type, Some(77));
    assert_eq!(tokens[0].channel, 2);
}

#[test]
fn custom_actions_reach_the_sink() {
    struct Count(u32);
    impl allstar::lexer::LexerActionSink for Count {
        fn custom_action(&mut self, _rule: RuleId, index: u32) {
            self.0 += index;
        }
    }

    let mut b = AtnBuilder::new(GrammarKind::Lexer);
    let r = b.rule("X");
    let x1 = b.state(r, StateKind::Basic);
    b.transition(b.rule_start(r), eps(x1));
    b.transition(x1, atom(b.rule_stop(r), 'x'));
    b.actions(r, [LexerAction::Custom(5)]);
    let entry = b.state(r, StateKind::Decision);
    b.transition(entry, eps(b.rule_start(r)));
    b.mode(entry);
    let atn = b.build().unwrap();

    let cache = DfaCache::new(&atn);
    let mut lexer = LexerSimulator::new(&atn, &cache);
    let mut sink = Count(0);
    lexer
        .tokenize(&syms("xx"), &NoPredicates, &mut sink)
        .unwrap();
    assert_eq!(sink.0, 10);
}
