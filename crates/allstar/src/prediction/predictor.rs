//! Adaptive alternative prediction.
//!
//! [`AdaptivePredictor`] answers "which alternative should the recognizer
//! take at this decision" by simulating the ATN over lookahead symbols,
//! memoizing every step in the shared DFA cache. It tries context-free SLL
//! simulation first and escalates to full-context analysis only when SLL
//! stalls on a conflict; see the module docs of [`crate::prediction`].

use std::sync::Arc;

use super::closure::{closure, move_configs};
use super::config::{AltSet, AtnConfig, AtnConfigSet};
use super::context::PredictionContext;
use super::semantic::{PredicateEvaluator, PredicateRef, SemanticContext};
use super::{PredictionMode, PredictorConfig, StepBudget};
use crate::atn::{Atn, DecisionId, EOF, Symbol, Transition};
use crate::dfa::{Dfa, DfaCache, DfaStateId};
use crate::error::{Ambiguity, ContextSensitivity, PredictionError, PredictionListener};

/// Drives prediction for one grammar: borrows the immutable ATN and the
/// shared DFA cache, so any number of predictor values (one per parser
/// instance, typically) can work over the same grammar concurrently.
pub struct AdaptivePredictor<'a> {
    atn: &'a Atn,
    cache: &'a DfaCache,
    config: PredictorConfig,
    listener: Option<&'a dyn PredictionListener>,
}

impl<'a> AdaptivePredictor<'a> {
    #[must_use]
    pub fn new(atn: &'a Atn, cache: &'a DfaCache) -> Self {
        Self {
            atn,
            cache,
            config: PredictorConfig::default(),
            listener: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PredictorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: &'a dyn PredictionListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Predict the alternative (1-based) taken at `decision`.
    ///
    /// Looks ahead into `input` starting at `start` without committing any
    /// consumption; symbols past the end read as [`EOF`]. `outer` is the
    /// caller's rule invocation stack, used only if full-context analysis
    /// becomes necessary.
    ///
    /// # Errors
    ///
    /// [`PredictionError::NoViableAlternative`] when no alternative can
    /// match, and [`PredictionError::StepBudgetExceeded`] under a configured
    /// budget. Ambiguities are not errors; they resolve to the minimum
    /// alternative and are reported through the listener.
    pub fn predict(
        &self,
        decision: DecisionId,
        input: &[Symbol],
        start: usize,
        outer: &Arc<PredictionContext>,
        evaluator: &dyn PredicateEvaluator,
    ) -> Result<u32, PredictionError> {
        let dfa = self.cache.dfa(decision);
        let mut budget = StepBudget::new(self.config.step_budget, decision);

        if dfa.start_requires_full_context() {
            return self.predict_full(decision, input, start, outer, evaluator, &mut budget);
        }

        let s0 = match dfa.start_state() {
            Some(s0) => s0,
            None => {
                let seed = self.seed_configs(decision, PredictionContext::empty());
                let set = closure(
                    self.atn,
                    seed,
                    PredictionMode::Sll,
                    evaluator,
                    start,
                    &mut budget,
                )?;
                let id = Self::intern_sll_state(dfa, set);
                dfa.set_start_state(id)
            }
        };

        self.sll_loop(decision, dfa, s0, input, start, outer, evaluator, &mut budget)
    }

    /// Walk the SLL DFA, extending it on demand, until an accept state, a
    /// conflict, or a dead end.
    #[allow(clippy::too_many_arguments)]
    fn sll_loop(
        &self,
        decision: DecisionId,
        dfa: &Dfa,
        s0: DfaStateId,
        input: &[Symbol],
        start: usize,
        outer: &Arc<PredictionContext>,
        evaluator: &dyn PredicateEvaluator,
        budget: &mut StepBudget,
    ) -> Result<u32, PredictionError> {
        let mut state = s0;
        let mut offset = start;
        loop {
            if let Some(alt) = dfa.accept_alt(state) {
                return self.resolve_sll_accept(decision, dfa, state, alt, offset, evaluator);
            }
            if dfa.requires_full_context(state) {
                // Cache the escalation so later calls skip the fast path
                dfa.mark_start_requires_full_context();
                return self.predict_full(decision, input, start, outer, evaluator, budget);
            }

            let symbol = look(input, offset);
            let next = match dfa.edge(state, symbol) {
                Some(next) => next,
                None => {
                    self.compute_sll_edge(decision, dfa, state, symbol, offset, evaluator, budget)?
                }
            };
            if symbol == EOF && next == state {
                // Input exhausted with several alternatives still able to
                // complete; only full context can tell them apart.
                dfa.mark_requires_full_context(state);
                dfa.mark_start_requires_full_context();
                return self.predict_full(decision, input, start, outer, evaluator, budget);
            }
            state = next;
            offset += 1;
        }
    }

    /// Build the missing edge: move the memoized set across `symbol`, close
    /// it, hash-cons the result, and cache the edge.
    #[allow(clippy::too_many_arguments)]
    fn compute_sll_edge(
        &self,
        decision: DecisionId,
        dfa: &Dfa,
        state: DfaStateId,
        symbol: Symbol,
        offset: usize,
        evaluator: &dyn PredicateEvaluator,
        budget: &mut StepBudget,
    ) -> Result<DfaStateId, PredictionError> {
        let configs = dfa.state_configs(state);
        let moved = move_configs(self.atn, &configs, symbol, true);
        if moved.is_empty() {
            return Err(PredictionError::NoViableAlternative {
                decision,
                offset,
                configs: (*configs).clone(),
            });
        }
        let set = closure(
            self.atn,
            moved,
            PredictionMode::Sll,
            evaluator,
            offset + 1,
            budget,
        )?;
        if set.is_empty() {
            return Err(PredictionError::NoViableAlternative {
                decision,
                offset,
                configs: set,
            });
        }
        let next = Self::intern_sll_state(dfa, set);
        dfa.add_edge(state, symbol, next);
        // A racing thread may have cached an equal edge first; follow the
        // canonical one either way.
        Ok(dfa.edge(state, symbol).unwrap_or(next))
    }

    /// Intern a closed set as an SLL DFA state, classifying it: a unique
    /// alternative makes it accepting, a stalled conflict (conflicting
    /// alternatives covering every viable one) marks it for full context.
    fn intern_sll_state(dfa: &Dfa, set: AtnConfigSet) -> DfaStateId {
        let accept = set.unique_alt();
        let conflicts = set.conflicting_alts();
        let stalled = accept.is_none() && !conflicts.is_empty() && conflicts == set.alts();
        let id = dfa.get_or_create_state(set, accept);
        if stalled {
            dfa.mark_requires_full_context(id);
        }
        id
    }

    /// An SLL accept state decided the prediction; apply any predicates that
    /// were deferred along the way.
    fn resolve_sll_accept(
        &self,
        decision: DecisionId,
        dfa: &Dfa,
        state: DfaStateId,
        alt: u32,
        offset: usize,
        evaluator: &dyn PredicateEvaluator,
    ) -> Result<u32, PredictionError> {
        let configs = dfa.state_configs(state);
        if !configs.has_predicates() {
            return Ok(alt);
        }
        let passing = configs
            .iter()
            .any(|config| config.semantic.evaluate(evaluator, offset));
        if passing {
            Ok(alt)
        } else {
            Err(PredictionError::NoViableAlternative {
                decision,
                offset,
                configs: (*configs).clone(),
            })
        }
    }

    /// Context-sensitive simulation carrying the caller's real stack.
    /// Uncached by design: full-context sets depend on `outer`, so they are
    /// not shareable across parses the way SLL states are.
    #[allow(clippy::too_many_arguments)]
    fn predict_full(
        &self,
        decision: DecisionId,
        input: &[Symbol],
        start: usize,
        outer: &Arc<PredictionContext>,
        evaluator: &dyn PredicateEvaluator,
        budget: &mut StepBudget,
    ) -> Result<u32, PredictionError> {
        let seed = self.seed_full_configs(decision, outer.clone(), evaluator, start);
        let mut set = closure(
            self.atn,
            seed,
            PredictionMode::FullContext,
            evaluator,
            start,
            budget,
        )?;
        let mut offset = start;
        loop {
            if set.is_empty() {
                return Err(PredictionError::NoViableAlternative {
                    decision,
                    offset,
                    configs: set,
                });
            }
            if let Some(alt) = set.unique_alt() {
                if let Some(listener) = self.listener {
                    listener.context_sensitivity(&ContextSensitivity {
                        decision,
                        start_offset: start,
                        stop_offset: offset,
                        alternative: alt,
                    });
                }
                return Ok(alt);
            }
            let conflicts = set.conflicting_alts();
            if !conflicts.is_empty() && conflicts == set.alts() {
                return Ok(self.resolve_ambiguity(decision, start, offset, conflicts));
            }

            let symbol = look(input, offset);
            let moved = move_configs(self.atn, &set, symbol, true);
            if moved.is_empty() {
                return Err(PredictionError::NoViableAlternative {
                    decision,
                    offset,
                    configs: set,
                });
            }
            offset += 1;
            let next = closure(
                self.atn,
                moved,
                PredictionMode::FullContext,
                evaluator,
                offset,
                budget,
            )?;
            if symbol == EOF && next == set {
                // No further input can separate the survivors.
                let alts = next.alts();
                return Ok(self.resolve_ambiguity(decision, start, offset, alts));
            }
            set = next;
        }
    }

    /// Deterministic ambiguity policy: report, then take the lowest
    /// still-viable alternative.
    fn resolve_ambiguity(
        &self,
        decision: DecisionId,
        start: usize,
        offset: usize,
        alts: AltSet,
    ) -> u32 {
        let chosen = alts.min().unwrap_or(1);
        if let Some(listener) = self.listener {
            listener.ambiguity(&Ambiguity {
                decision,
                start_offset: start,
                stop_offset: offset,
                alternatives: alts,
                full_context: true,
            });
        }
        chosen
    }

    /// One seed configuration per alternative of the decision, numbered from
    /// 1 in edge order, positioned past the alternative's entry edge.
    fn seed_configs(
        &self,
        decision: DecisionId,
        context: Arc<PredictionContext>,
    ) -> Vec<AtnConfig> {
        let state = self.atn.state(self.atn.decision_state(decision));
        state
            .transitions()
            .iter()
            .enumerate()
            .map(|(i, transition)| {
                let alt = u32::try_from(i).unwrap_or(u32::MAX) + 1;
                match transition {
                    Transition::Rule { target, follow, .. } => AtnConfig::new(
                        *target,
                        alt,
                        PredictionContext::link(context.clone(), *follow),
                    ),
                    Transition::Predicate {
                        target,
                        rule,
                        index,
                        ctx_dependent,
                    } => {
                        let mut config = AtnConfig::new(*target, alt, context.clone());
                        config.semantic = SemanticContext::Predicate(PredicateRef {
                            rule: *rule,
                            index: *index,
                            ctx_dependent: *ctx_dependent,
                        });
                        config
                    }
                    other => AtnConfig::new(other.target(), alt, context.clone()),
                }
            })
            .collect()
    }

    /// Full-context seeds evaluate alternative-entry predicates immediately
    /// instead of deferring them.
    fn seed_full_configs(
        &self,
        decision: DecisionId,
        context: Arc<PredictionContext>,
        evaluator: &dyn PredicateEvaluator,
        offset: usize,
    ) -> Vec<AtnConfig> {
        self.seed_configs(decision, context)
            .into_iter()
            .filter_map(|mut config| {
                let gate = std::mem::replace(&mut config.semantic, SemanticContext::None);
                gate.evaluate(evaluator, offset).then_some(config)
            })
            .collect()
    }
}

fn look(input: &[Symbol], offset: usize) -> Symbol {
    input.get(offset).copied().unwrap_or(EOF)
}
