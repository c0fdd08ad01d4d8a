//! # Lexer Module
//!
//! Tokenization as a specialization of adaptive prediction: every lexer
//! mode is one big decision whose alternatives are the mode's rules, and
//! matching a token is DFA simulation over code points with longest-match
//! semantics. The shared DFA cache makes repeated lexing of similar input
//! nearly table-driven.
//!
//! Differences from parser prediction, all local to this module:
//!
//! - a configuration reaching a rule stop with an empty context means "this
//!   rule can end the token here", recorded as a candidate accept rather
//!   than carried forward;
//! - ties between rules go to the earliest-declared rule;
//! - predicates gate immediately instead of being deferred to an accept
//!   state.

mod action;

pub use action::{LexerAction, LexerActionSink, NoCustomActions};

use crate::atn::{Atn, DecisionId, RuleId, Symbol};
use crate::dfa::{Dfa, DfaCache, DfaStateId};
use crate::error::PredictionError;
use crate::prediction::{
    AtnConfig, AtnConfigSet, PredicateEvaluator, PredictionContext, PredictionMode,
    PredictorConfig, StepBudget, closure, move_configs,
};

/// One matched token, before any user-level token object is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerMatch {
    /// The winning rule.
    pub rule: RuleId,
    /// Token type, `None` when a `Skip` action discarded the match. The
    /// default type is the rule's index; a `TokenType` action overrides it.
    pub token_type: Option<u32>,
    /// Channel, default 0.
    pub channel: u32,
    /// Offset of the first matched symbol. With `More` chains this is the
    /// start of the first piece.
    pub start: usize,
    /// Offset one past the last matched symbol.
    pub end: usize,
}

impl LexerMatch {
    /// True when a `Skip` action discarded the match.
    #[must_use]
    pub const fn skipped(&self) -> bool {
        self.token_type.is_none()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// ATN-driven tokenizer with a mode stack.
///
/// Holds only per-simulation state (current mode, mode stack); the ATN and
/// DFA cache are shared, so simulators are cheap to create per input.
pub struct LexerSimulator<'a> {
    atn: &'a Atn,
    cache: &'a DfaCache,
    config: PredictorConfig,
    mode: usize,
    mode_stack: Vec<usize>,
}

impl<'a> LexerSimulator<'a> {
    #[must_use]
    pub fn new(atn: &'a Atn, cache: &'a DfaCache) -> Self {
        Self {
            atn,
            cache,
            config: PredictorConfig::default(),
            mode: 0,
            mode_stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PredictorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current lexer mode.
    #[must_use]
    pub const fn mode(&self) -> usize {
        self.mode
    }

    /// Match the token starting at `start`, applying the winning rule's
    /// actions. `More` chains are resolved internally; the returned match
    /// spans every chained piece.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// [`PredictionError::NoViableAlternative`] when no rule of the current
    /// mode matches at `start`, and [`PredictionError::StepBudgetExceeded`]
    /// under a configured budget.
    pub fn next_match(
        &mut self,
        input: &[Symbol],
        start: usize,
        evaluator: &dyn PredicateEvaluator,
        sink: &mut dyn LexerActionSink,
    ) -> Result<Option<LexerMatch>, PredictionError> {
        let mut piece_start = start;
        loop {
            let (rule, end) = match self.match_one(input, piece_start, evaluator)? {
                Some(hit) => hit,
                None if piece_start == start => return Ok(None),
                // A `More` prefix with nothing matchable after it.
                None => {
                    let dfa = self.cache.dfa(self.atn.mode_decision(self.mode));
                    return Err(self.no_viable(dfa, dfa.start_state(), piece_start));
                }
            };

            let mut token_type = Some(rule.0);
            let mut channel = 0;
            let mut more = false;
            for action in self.atn.rule_actions(rule) {
                match *action {
                    LexerAction::Skip => token_type = None,
                    LexerAction::More => more = true,
                    LexerAction::TokenType(t) => token_type = Some(t),
                    LexerAction::Channel(c) => channel = c,
                    LexerAction::Mode(m) => self.mode = m,
                    LexerAction::PushMode(m) => {
                        self.mode_stack.push(self.mode);
                        self.mode = m;
                    }
                    LexerAction::PopMode => {
                        if let Some(m) = self.mode_stack.pop() {
                            self.mode = m;
                        }
                    }
                    LexerAction::Custom(index) => sink.custom_action(rule, index),
                }
            }
            if more {
                piece_start = end;
                continue;
            }
            return Ok(Some(LexerMatch {
                rule,
                token_type,
                channel,
                start,
                end,
            }));
        }
    }

    /// Tokenize the whole input, dropping skipped matches.
    ///
    /// # Errors
    ///
    /// Stops at the first [`PredictionError`].
    pub fn tokenize(
        &mut self,
        input: &[Symbol],
        evaluator: &dyn PredicateEvaluator,
        sink: &mut dyn LexerActionSink,
    ) -> Result<Vec<LexerMatch>, PredictionError> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        while let Some(matched) = self.next_match(input, offset, evaluator, sink)? {
            offset = matched.end;
            if !matched.skipped() {
                tokens.push(matched);
            }
        }
        Ok(tokens)
    }

    /// Longest-match DFA walk in the current mode. Returns the winning rule
    /// and the end offset, or `None` when not even one symbol matches and
    /// no rule accepts empty (which no well-formed lexer rule does).
    fn match_one(
        &self,
        input: &[Symbol],
        start: usize,
        evaluator: &dyn PredicateEvaluator,
    ) -> Result<Option<(RuleId, usize)>, PredictionError> {
        let decision = self.atn.mode_decision(self.mode);
        let dfa = self.cache.dfa(decision);
        let mut budget = StepBudget::new(self.config.step_budget, decision);

        let mut state = match dfa.start_state() {
            Some(s0) => s0,
            None => {
                let seed = self.seed_configs();
                // Lexer predicates gate immediately.
                let set = closure(
                    self.atn,
                    seed,
                    PredictionMode::FullContext,
                    evaluator,
                    start,
                    &mut budget,
                )?;
                let gated = set.is_predicate_gated();
                let accept = self.lexer_accept(&set);
                let id = dfa.get_or_create_state(set, accept);
                if gated {
                    // A gated start set reflects this call's predicate
                    // answers; a different evaluator must recompute it.
                    id
                } else {
                    dfa.set_start_state(id)
                }
            }
        };

        let mut offset = start;
        let mut last_accept: Option<(u32, usize)> = None;
        loop {
            if let Some(alt) = dfa.accept_alt(state) {
                last_accept = Some((alt, offset));
            }
            let Some(&symbol) = input.get(offset) else {
                break;
            };
            let next = match dfa.edge(state, symbol) {
                Some(next) => next,
                None => match self.compute_edge(dfa, state, symbol, offset, evaluator, &mut budget)?
                {
                    Some(next) => next,
                    None => break,
                },
            };
            state = next;
            offset += 1;
        }

        match last_accept {
            // A zero-length winner would never advance the caller.
            Some((_, end)) if end == start => Err(self.no_viable(dfa, Some(state), start)),
            Some((alt, end)) => Ok(Some((self.alt_rule(decision, alt), end))),
            None if start >= input.len() => Ok(None),
            None => Err(self.no_viable(dfa, Some(state), start)),
        }
    }

    /// Extend the mode DFA by one edge. `None` means the symbol kills every
    /// surviving configuration; the edge stays uncached and the walk stops.
    fn compute_edge(
        &self,
        dfa: &Dfa,
        state: DfaStateId,
        symbol: Symbol,
        offset: usize,
        evaluator: &dyn PredicateEvaluator,
        budget: &mut StepBudget,
    ) -> Result<Option<DfaStateId>, PredictionError> {
        let configs = dfa.state_configs(state);
        // Completed-rule configurations stay behind: the token candidate was
        // already recorded through the accept alternative.
        let moved = move_configs(self.atn, &configs, symbol, false);
        if moved.is_empty() {
            return Ok(None);
        }
        let set = closure(
            self.atn,
            moved,
            PredictionMode::FullContext,
            evaluator,
            offset + 1,
            budget,
        )?;
        if set.is_empty() {
            return Ok(None);
        }
        let gated = set.is_predicate_gated();
        let accept = self.lexer_accept(&set);
        let next = dfa.get_or_create_state(set, accept);
        if gated {
            // The target depends on predicate answers, so the edge stays
            // uncached and every simulation re-resolves it.
            return Ok(Some(next));
        }
        dfa.add_edge(state, symbol, next);
        Ok(dfa.edge(state, symbol).or(Some(next)))
    }

    /// Accept alternative of a closed set: the lowest alternative with a
    /// configuration at its rule stop. Earliest-declared rule wins ties
    /// because mode alternatives are numbered in declaration order.
    fn lexer_accept(&self, set: &AtnConfigSet) -> Option<u32> {
        set.iter()
            .filter(|config| self.atn.state(config.state).is_rule_stop())
            .map(|config| config.alt)
            .min()
    }

    /// One seed configuration per rule of the current mode, in declaration
    /// order starting at alternative 1.
    fn seed_configs(&self) -> Vec<AtnConfig> {
        let start = self.atn.mode_start(self.mode);
        let context = PredictionContext::empty();
        self.atn
            .state(start)
            .transitions()
            .iter()
            .enumerate()
            .map(|(i, transition)| {
                let alt = u32::try_from(i).unwrap_or(u32::MAX) + 1;
                AtnConfig::new(transition.target(), alt, context.clone())
            })
            .collect()
    }

    /// Map an accept alternative back to the rule it entered.
    fn alt_rule(&self, decision: DecisionId, alt: u32) -> RuleId {
        let start = self.atn.state(self.atn.decision_state(decision));
        let target = start.transitions()[(alt - 1) as usize].target();
        self.atn.state(target).rule
    }

    /// Build the fatal-symbol error carrying the last live configuration
    /// set, so the caller's error strategy can see what was still viable.
    fn no_viable(&self, dfa: &Dfa, state: Option<DfaStateId>, offset: usize) -> PredictionError {
        let configs = state.map_or_else(AtnConfigSet::new, |s| (*dfa.state_configs(s)).clone());
        PredictionError::NoViableAlternative {
            decision: dfa.decision(),
            offset,
            configs,
        }
    }
}
