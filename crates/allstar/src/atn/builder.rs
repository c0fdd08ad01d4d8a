//! Programmatic ATN construction.
//!
//! The grammar front-end that analyzes rule text lives outside this crate;
//! it hands over the finished graph. [`AtnBuilder`] is that hand-over point:
//! a fluent API that accumulates states, edges, decisions, and lexer modes,
//! validates the graph once, and freezes it into an immutable [`Atn`].

use compact_str::CompactString;
use smallvec::SmallVec;

use super::{
    Atn, AtnState, DecisionId, GrammarKind, RuleId, RuleSpan, StateId, StateKind, Symbol,
    Transition,
};
use crate::error::AtnBuildError;
use crate::lexer::LexerAction;

/// Builder for an [`Atn`]. Create states and rules, wire transitions, then
/// call [`build`](Self::build) to validate and freeze the graph.
#[derive(Debug)]
pub struct AtnBuilder {
    grammar_kind: GrammarKind,
    states: Vec<AtnState>,
    decisions: Vec<StateId>,
    rules: Vec<RuleSpan>,
    mode_starts: Vec<StateId>,
    rule_actions: Vec<SmallVec<[LexerAction; 1]>>,
    max_symbol: Symbol,
}

impl AtnBuilder {
    #[must_use]
    pub fn new(grammar_kind: GrammarKind) -> Self {
        Self {
            grammar_kind,
            states: Vec::new(),
            decisions: Vec::new(),
            rules: Vec::new(),
            mode_starts: Vec::new(),
            rule_actions: Vec::new(),
            max_symbol: 0,
        }
    }

    /// Declare a rule. Its start and stop states are created immediately;
    /// body states are added with [`state`](Self::state).
    pub fn rule(&mut self, name: impl Into<CompactString>) -> RuleId {
        let rule = RuleId(u32::try_from(self.rules.len()).unwrap_or(u32::MAX));
        let start = self.push_state(rule, StateKind::RuleStart);
        let stop = self.push_state(rule, StateKind::RuleStop);
        self.rules.push(RuleSpan {
            name: name.into(),
            start,
            stop,
        });
        self.rule_actions.push(SmallVec::new());
        rule
    }

    #[must_use]
    pub fn rule_start(&self, rule: RuleId) -> StateId {
        self.rules[rule.index()].start
    }

    #[must_use]
    pub fn rule_stop(&self, rule: RuleId) -> StateId {
        self.rules[rule.index()].stop
    }

    /// Add a body state to a rule.
    pub fn state(&mut self, rule: RuleId, kind: StateKind) -> StateId {
        self.push_state(rule, kind)
    }

    /// Add an outgoing edge. Target validity is checked at [`build`](Self::build).
    pub fn transition(&mut self, from: StateId, transition: Transition) {
        match &transition {
            Transition::Atom { symbol, .. } => self.note_symbol(*symbol),
            Transition::Range { to, .. } => self.note_symbol(*to),
            Transition::Set { set, .. } => {
                if let Some(max) = set.max_symbol() {
                    self.note_symbol(max);
                }
            }
            _ => {}
        }
        self.states[from.index()].transitions.push(transition);
    }

    /// Mark a state as a decision point and assign it the next decision
    /// index. Outgoing edges added to it define the alternatives, in order.
    pub fn decision(&mut self, state: StateId) -> DecisionId {
        let id = DecisionId(u32::try_from(self.decisions.len()).unwrap_or(u32::MAX));
        self.states[state.index()].decision = Some(id);
        self.decisions.push(state);
        id
    }

    /// Register a lexer mode rooted at `start`. The start state becomes a
    /// decision whose alternatives are the mode's rules. Returns the mode
    /// index (mode 0 is the default mode).
    pub fn mode(&mut self, start: StateId) -> usize {
        self.decision(start);
        self.mode_starts.push(start);
        self.mode_starts.len() - 1
    }

    /// Attach the action list executed after the given lexer rule matches.
    pub fn actions(&mut self, rule: RuleId, actions: impl IntoIterator<Item = LexerAction>) {
        self.rule_actions[rule.index()] = actions.into_iter().collect();
    }

    /// Raise the vocabulary bound beyond what consuming edges imply. Useful
    /// when wildcard edges must cover symbols no explicit edge names.
    pub fn max_symbol(&mut self, symbol: Symbol) {
        self.note_symbol(symbol);
    }

    /// Validate and freeze the graph.
    ///
    /// # Errors
    ///
    /// Returns [`AtnBuildError`] when a transition points outside the graph,
    /// a rule-call edge does not target a rule start state, or a decision
    /// state carries an input-consuming edge (alternatives must be epsilon
    /// or rule-call edges so they can be numbered during prediction).
    pub fn build(self) -> Result<Atn, AtnBuildError> {
        validate_graph(&self.states)?;

        Ok(Atn {
            grammar_kind: self.grammar_kind,
            states: self.states,
            decisions: self.decisions,
            rules: self.rules,
            max_symbol: self.max_symbol,
            mode_starts: self.mode_starts,
            rule_actions: self.rule_actions,
        })
    }

    fn push_state(&mut self, rule: RuleId, kind: StateKind) -> StateId {
        let id = StateId(u32::try_from(self.states.len()).unwrap_or(u32::MAX));
        self.states.push(AtnState {
            id,
            kind,
            rule,
            decision: None,
            transitions: SmallVec::new(),
        });
        id
    }

    fn note_symbol(&mut self, symbol: Symbol) {
        if symbol != super::EOF {
            self.max_symbol = self.max_symbol.max(symbol);
        }
    }
}

/// Structural checks shared by [`AtnBuilder::build`] and the wire decoder.
pub(crate) fn validate_graph(states: &[AtnState]) -> Result<(), AtnBuildError> {
    let state_count = states.len();
    for state in states {
        for t in state.transitions() {
            let target = t.target();
            if target.index() >= state_count {
                return Err(AtnBuildError::DanglingTarget {
                    from: state.id,
                    to: target,
                });
            }
            if let Transition::Rule { target, follow, .. } = t {
                if !matches!(states[target.index()].kind, StateKind::RuleStart) {
                    return Err(AtnBuildError::RuleCallIntoBody {
                        from: state.id,
                        to: *target,
                    });
                }
                if follow.index() >= state_count {
                    return Err(AtnBuildError::DanglingTarget {
                        from: state.id,
                        to: *follow,
                    });
                }
            }
        }
        if state.decision.is_some() {
            if let Some(bad) = state.transitions().iter().find(|t| {
                !matches!(
                    t,
                    Transition::Epsilon { .. }
                        | Transition::Rule { .. }
                        | Transition::Predicate { .. }
                )
            }) {
                return Err(AtnBuildError::ConsumingAlternative {
                    decision: state.id,
                    target: bad.target(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_dangling_target() {
        let mut b = AtnBuilder::new(GrammarKind::Parser);
        let r = b.rule("broken");
        let s = b.state(r, StateKind::Basic);
        b.transition(
            s,
            Transition::Epsilon {
                target: StateId(999),
            },
        );
        assert!(matches!(
            b.build(),
            Err(AtnBuildError::DanglingTarget { .. })
        ));
    }

    #[test]
    fn build_rejects_consuming_decision_alternative() {
        let mut b = AtnBuilder::new(GrammarKind::Parser);
        let r = b.rule("r");
        let d = b.state(r, StateKind::Decision);
        b.decision(d);
        b.transition(
            d,
            Transition::Atom {
                target: b.rule_stop(r),
                symbol: 3,
            },
        );
        assert!(matches!(
            b.build(),
            Err(AtnBuildError::ConsumingAlternative { .. })
        ));
    }

    #[test]
    fn max_symbol_tracks_consuming_edges() {
        let mut b = AtnBuilder::new(GrammarKind::Parser);
        let r = b.rule("r");
        let s = b.state(r, StateKind::Basic);
        b.transition(
            s,
            Transition::Range {
                target: b.rule_stop(r),
                from: 10,
                to: 42,
            },
        );
        let atn = b.build().unwrap();
        assert_eq!(atn.max_symbol(), 42);
    }
}
