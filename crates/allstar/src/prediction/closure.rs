//! Epsilon-closure over configuration sets.
//!
//! Given configurations positioned at decision-entry states, compute every
//! configuration reachable without consuming input: rule-call edges push a
//! return frame, rule-stop states pop the frames that match the top of the
//! context, predicate edges defer (SLL) or evaluate (full context), and
//! action/precedence edges pass through. A frontier of already-expanded
//! (state, alt, context) triples guards against loops with empty-match
//! alternatives.
//!
//! Closure is referentially transparent: same ATN, same seed, same result.

use hashbrown::HashSet;

use super::config::{AtnConfig, AtnConfigSet};
use super::context::{EMPTY_RETURN_STATE, PredictionContext};
use super::semantic::{PredicateEvaluator, PredicateRef, SemanticContext};
use super::{PredictionMode, StepBudget};
use crate::atn::{Atn, StateKind, Symbol, Transition};
use crate::error::PredictionError;

/// Expand `seed` to its epsilon-closure.
///
/// `offset` is the current lookahead position, handed to predicate
/// evaluation in full-context mode.
///
/// # Errors
///
/// Returns [`PredictionError::StepBudgetExceeded`] if the optional budget
/// runs out; closure itself has no other failure mode.
pub(crate) fn closure(
    atn: &Atn,
    seed: impl IntoIterator<Item = AtnConfig>,
    mode: PredictionMode,
    evaluator: &dyn PredicateEvaluator,
    offset: usize,
    budget: &mut StepBudget,
) -> Result<AtnConfigSet, PredictionError> {
    let mut result = AtnConfigSet::new();
    let mut worklist: Vec<AtnConfig> = seed.into_iter().collect();
    let mut expanded: HashSet<
        (crate::atn::StateId, u32, std::sync::Arc<PredictionContext>),
        ahash::RandomState,
    > = HashSet::default();

    while let Some(config) = worklist.pop() {
        budget.tick()?;
        let guard = (config.state, config.alt, config.context.clone());
        if !expanded.insert(guard) {
            continue;
        }

        let state = atn.state(config.state);
        if state.is_rule_stop() {
            pop_rule_stop(&config, &mut result, &mut worklist);
            continue;
        }

        let mut consuming = false;
        for transition in state.transitions() {
            match transition {
                Transition::Epsilon { target }
                | Transition::Action { target, .. }
                | Transition::Precedence { target, .. } => {
                    worklist.push(config.at(*target));
                }
                Transition::Rule { target, follow, .. } => {
                    let pushed = PredictionContext::link(config.context.clone(), *follow);
                    worklist.push(config.at_with_context(*target, pushed));
                }
                Transition::Predicate {
                    target,
                    rule,
                    index,
                    ctx_dependent,
                } => {
                    let predicate = PredicateRef {
                        rule: *rule,
                        index: *index,
                        ctx_dependent: *ctx_dependent,
                    };
                    match mode {
                        // Defer: carry the predicate along unevaluated so the
                        // decision can still resolve without it.
                        PredictionMode::Sll => {
                            let mut next = config.at(*target);
                            next.semantic = SemanticContext::and(
                                next.semantic,
                                SemanticContext::Predicate(predicate),
                            );
                            worklist.push(next);
                        }
                        // Evaluate against the real call context; a false
                        // predicate kills this path outright. Either way the
                        // resulting set now depends on the evaluator's answer.
                        PredictionMode::FullContext => {
                            result.mark_predicate_gated();
                            if evaluator.evaluate(&predicate, offset) {
                                worklist.push(config.at(*target));
                            }
                        }
                    }
                }
                Transition::Atom { .. }
                | Transition::Range { .. }
                | Transition::Set { .. }
                | Transition::Wildcard { .. } => consuming = true,
            }
        }
        if consuming {
            result.add(config);
        }
    }

    Ok(result)
}

/// Pop a configuration sitting at a rule-stop state: follow each frame that
/// matches the top of its context. A frame whose return state is the
/// empty-stack sentinel (or an entirely empty context) means the caller is
/// unknown; such configurations survive into the result as stopped
/// configurations.
fn pop_rule_stop(config: &AtnConfig, result: &mut AtnConfigSet, worklist: &mut Vec<AtnConfig>) {
    if config.context.is_empty() {
        result.add(config.clone());
        return;
    }
    for (return_state, parent) in config.context.frames() {
        if return_state == EMPTY_RETURN_STATE {
            result.add(config.at_with_context(config.state, PredictionContext::empty()));
        } else {
            worklist.push(config.at_with_context(return_state, parent.clone()));
        }
    }
}

/// Apply one input symbol to a closed set: every configuration whose state
/// has a transition matching `symbol` advances across it.
///
/// `carry_stopped` keeps configurations stopped at a rule end with an empty
/// context (parser prediction: the unknown caller could consume anything);
/// the lexer passes `false` since a stopped lexer rule is a finished token.
pub(crate) fn move_configs(
    atn: &Atn,
    set: &AtnConfigSet,
    symbol: Symbol,
    carry_stopped: bool,
) -> Vec<AtnConfig> {
    let max = atn.max_symbol();
    let mut moved = Vec::with_capacity(set.len());
    for config in set.iter() {
        let state = atn.state(config.state);
        if matches!(state.kind, StateKind::RuleStop) {
            if carry_stopped && config.context.is_empty() {
                moved.push(config.clone());
            }
            continue;
        }
        for transition in state.transitions() {
            if transition.matches(symbol, 0, max) {
                moved.push(config.at(transition.target()));
            }
        }
    }
    moved
}
