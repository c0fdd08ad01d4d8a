//! # ATN Module
//!
//! The augmented transition network: the static, immutable state graph that
//! the prediction engine interprets at run time.
//!
//! ## Overview
//!
//! An [`Atn`] is built once from a grammar model (here via [`AtnBuilder`] or
//! decoded from the compact wire form in [`serial`]) and then shared
//! read-only by every parse of that grammar. It holds:
//!
//! - the typed states ([`AtnState`], [`StateKind`])
//! - the typed edges ([`Transition`]) hanging off each state
//! - the ordered list of decision states, which index the DFA cache
//! - each rule's start/stop state pair and display name
//! - for lexer grammars, the mode start states and per-rule action lists
//!
//! Prediction-time objects (configurations, DFA states) reference the ATN by
//! [`StateId`]; nothing in this module is mutated after [`AtnBuilder::build`].

pub mod builder;
pub mod serial;
mod transition;

pub use builder::AtnBuilder;
pub use transition::{SymbolSet, Transition};

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::lexer::LexerAction;

/// An input symbol: a token type for parser grammars, a Unicode code point
/// for lexer grammars.
pub type Symbol = u32;

/// End-of-input marker. Sits outside every vocabulary, so wildcard edges
/// never match it.
pub const EOF: Symbol = u32::MAX;

/// Index of a state within its ATN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

impl StateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a rule within its ATN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub u32);

impl RuleId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a decision point; keys the DFA cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecisionId(pub u32);

impl DecisionId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which kind of recognizer this ATN drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    Parser,
    Lexer,
}

/// Structural role of an ATN state. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Basic,
    RuleStart,
    RuleStop,
    BlockStart,
    BlockEnd,
    PlusLoopEntry,
    PlusLoopBack,
    StarLoopEntry,
    StarLoopBack,
    Decision,
}

/// A node in the ATN with its outgoing edges.
#[derive(Debug, Clone)]
pub struct AtnState {
    pub id: StateId,
    pub kind: StateKind,
    /// Rule this state belongs to.
    pub rule: RuleId,
    /// Set when this state is a decision point.
    pub decision: Option<DecisionId>,
    pub(crate) transitions: SmallVec<[Transition; 2]>,
}

impl AtnState {
    /// Outgoing edges in declaration order. For decision states this order
    /// defines alternative numbering (alternative `i + 1` for edge `i`).
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    #[must_use]
    pub const fn is_rule_stop(&self) -> bool {
        matches!(self.kind, StateKind::RuleStop)
    }
}

/// A rule's entry/exit pair plus its display name.
#[derive(Debug, Clone)]
pub struct RuleSpan {
    pub name: CompactString,
    pub start: StateId,
    pub stop: StateId,
}

/// The whole static graph for one grammar. Built once, then read-only.
#[derive(Debug, Clone)]
pub struct Atn {
    grammar_kind: GrammarKind,
    states: Vec<AtnState>,
    /// Decision states in decision-index order.
    decisions: Vec<StateId>,
    rules: Vec<RuleSpan>,
    /// Largest symbol any consuming transition can match; bounds wildcards.
    max_symbol: Symbol,
    /// Lexer mode start states, `mode_starts[0]` is the default mode.
    mode_starts: Vec<StateId>,
    /// Per-rule action lists, applied by the lexer after a match.
    rule_actions: Vec<SmallVec<[LexerAction; 1]>>,
}

impl Atn {
    #[must_use]
    pub const fn grammar_kind(&self) -> GrammarKind {
        self.grammar_kind
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> &AtnState {
        &self.states[id.index()]
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    /// The state carrying the given decision index.
    #[must_use]
    pub fn decision_state(&self, decision: DecisionId) -> StateId {
        self.decisions[decision.index()]
    }

    #[must_use]
    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    #[must_use]
    pub fn rule(&self, rule: RuleId) -> &RuleSpan {
        &self.rules[rule.index()]
    }

    #[must_use]
    pub fn rules(&self) -> &[RuleSpan] {
        &self.rules
    }

    #[must_use]
    pub const fn max_symbol(&self) -> Symbol {
        self.max_symbol
    }

    #[must_use]
    pub fn mode_count(&self) -> usize {
        self.mode_starts.len()
    }

    #[must_use]
    pub fn mode_start(&self, mode: usize) -> StateId {
        self.mode_starts[mode]
    }

    /// Decision index attached to a lexer mode's start state.
    ///
    /// # Panics
    ///
    /// Panics if the mode was not registered through [`AtnBuilder::mode`],
    /// which always marks the start state as a decision.
    #[must_use]
    pub fn mode_decision(&self, mode: usize) -> DecisionId {
        self.state(self.mode_starts[mode])
            .decision
            .expect("mode start states are always decision states")
    }

    /// Action list executed after the given lexer rule matches.
    #[must_use]
    pub fn rule_actions(&self, rule: RuleId) -> &[LexerAction] {
        self.rule_actions
            .get(rule.index())
            .map_or(&[], SmallVec::as_slice)
    }
}
