//! Shared grammar builders for the integration tests.

#![allow(dead_code)]

use allstar::atn::{
    Atn, AtnBuilder, DecisionId, GrammarKind, StateId, StateKind, Symbol, Transition,
};
use allstar::lexer::LexerAction;

pub fn sym(c: char) -> Symbol {
    u32::from(c)
}

pub fn syms(text: &str) -> Vec<Symbol> {
    text.chars().map(u32::from).collect()
}

pub fn atom(target: StateId, c: char) -> Transition {
    Transition::Atom {
        target,
        symbol: sym(c),
    }
}

pub fn eps(target: StateId) -> Transition {
    Transition::Epsilon { target }
}

pub fn range(target: StateId, from: char, to: char) -> Transition {
    Transition::Range {
        target,
        from: sym(from),
        to: sym(to),
    }
}

/// `r: 'a' 'b' | 'a' 'c'` — needs two symbols of lookahead, never conflicts.
pub fn ab_ac() -> (Atn, DecisionId) {
    let mut b = AtnBuilder::new(GrammarKind::Parser);
    let r = b.rule("r");
    let entry = b.state(r, StateKind::Decision);
    b.transition(b.rule_start(r), eps(entry));
    let d = b.decision(entry);
    for second in ['b', 'c'] {
        let mid = b.state(r, StateKind::Basic);
        b.transition(entry, eps(mid));
        let tail = b.state(r, StateKind::Basic);
        b.transition(mid, atom(tail, 'a'));
        b.transition(tail, atom(b.rule_stop(r), second));
    }
    (b.build().unwrap(), d)
}

/// `r: 'a'` — a decision with exactly one alternative.
pub fn single_alt() -> (Atn, DecisionId) {
    let mut b = AtnBuilder::new(GrammarKind::Parser);
    let r = b.rule("r");
    let entry = b.state(r, StateKind::Decision);
    b.transition(b.rule_start(r), eps(entry));
    let d = b.decision(entry);
    let mid = b.state(r, StateKind::Basic);
    b.transition(entry, eps(mid));
    b.transition(mid, atom(b.rule_stop(r), 'a'));
    (b.build().unwrap(), d)
}

/// Context-sensitive pair of rules:
///
/// ```text
/// s   : sub 'b' ;
/// sub : 'x' | 'x' 'y' ;
/// ```
///
/// On input `x y`, context-free analysis of `sub`'s decision conflicts
/// (both alternatives can stop), but the real caller resolves it to
/// alternative 2. Returns the decision inside `sub` and the state in `s`
/// following the `sub` call, for building the invocation context.
pub fn nested() -> (Atn, DecisionId, StateId) {
    let mut b = AtnBuilder::new(GrammarKind::Parser);
    let s = b.rule("s");
    let sub = b.rule("sub");

    let call = b.state(s, StateKind::Basic);
    b.transition(b.rule_start(s), eps(call));
    let follow = b.state(s, StateKind::Basic);
    b.transition(
        call,
        Transition::Rule {
            target: b.rule_start(sub),
            rule: sub,
            follow,
        },
    );
    b.transition(follow, atom(b.rule_stop(s), 'b'));

    let entry = b.state(sub, StateKind::Decision);
    b.transition(b.rule_start(sub), eps(entry));
    let d = b.decision(entry);
    let a1 = b.state(sub, StateKind::Basic);
    b.transition(entry, eps(a1));
    b.transition(a1, atom(b.rule_stop(sub), 'x'));
    let a2 = b.state(sub, StateKind::Basic);
    b.transition(entry, eps(a2));
    let a2_mid = b.state(sub, StateKind::Basic);
    b.transition(a2, atom(a2_mid, 'x'));
    b.transition(a2_mid, atom(b.rule_stop(sub), 'y'));

    (b.build().unwrap(), d, follow)
}

/// Genuinely ambiguous rules: `sub` has two identical alternatives, so even
/// full context cannot separate them.
///
/// ```text
/// s   : sub 'b' ;
/// sub : 'x' | 'x' ;
/// ```
pub fn ambiguous() -> (Atn, DecisionId, StateId) {
    let mut b = AtnBuilder::new(GrammarKind::Parser);
    let s = b.rule("s");
    let sub = b.rule("sub");

    let call = b.state(s, StateKind::Basic);
    b.transition(b.rule_start(s), eps(call));
    let follow = b.state(s, StateKind::Basic);
    b.transition(
        call,
        Transition::Rule {
            target: b.rule_start(sub),
            rule: sub,
            follow,
        },
    );
    b.transition(follow, atom(b.rule_stop(s), 'b'));

    let entry = b.state(sub, StateKind::Decision);
    b.transition(b.rule_start(sub), eps(entry));
    let d = b.decision(entry);
    for _ in 0..2 {
        let alt = b.state(sub, StateKind::Basic);
        b.transition(entry, eps(alt));
        b.transition(alt, atom(b.rule_stop(sub), 'x'));
    }

    (b.build().unwrap(), d, follow)
}

/// Lexer with a keyword shadowed by an identifier rule plus skipped
/// whitespace:
///
/// ```text
/// IF : 'if' ;
/// ID : [a-z]+ ;
/// WS : ' '+ -> skip ;
/// ```
///
/// Token types default to the rule indices: `IF` = 0, `ID` = 1, `WS` = 2.
pub fn keyword_lexer() -> Atn {
    let mut b = AtnBuilder::new(GrammarKind::Lexer);

    let kw = b.rule("IF");
    let k1 = b.state(kw, StateKind::Basic);
    b.transition(b.rule_start(kw), eps(k1));
    let k2 = b.state(kw, StateKind::Basic);
    b.transition(k1, atom(k2, 'i'));
    b.transition(k2, atom(b.rule_stop(kw), 'f'));

    let id = b.rule("ID");
    plus_loop(&mut b, id, ('a', 'z'));

    let ws = b.rule("WS");
    plus_loop(&mut b, ws, (' ', ' '));
    b.actions(ws, [LexerAction::Skip]);

    let entry = b.state(kw, StateKind::Decision);
    b.transition(entry, eps(b.rule_start(kw)));
    b.transition(entry, eps(b.rule_start(id)));
    b.transition(entry, eps(b.rule_start(ws)));
    b.mode(entry);

    b.build().unwrap()
}

/// Fill a rule's body with `[from-to]+`.
fn plus_loop(b: &mut AtnBuilder, rule: allstar::atn::RuleId, span: (char, char)) {
    let head = b.state(rule, StateKind::PlusLoopEntry);
    b.transition(b.rule_start(rule), eps(head));
    let tail = b.state(rule, StateKind::PlusLoopBack);
    b.transition(head, range(tail, span.0, span.1));
    b.transition(tail, eps(head));
    b.transition(tail, eps(b.rule_stop(rule)));
}
