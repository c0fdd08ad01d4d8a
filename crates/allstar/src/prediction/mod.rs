//! # Prediction Module
//!
//! The adaptive lookahead engine: configurations, contexts, closure, and the
//! predictor that decides "which alternative should the recognizer take".
//!
//! ## Overview
//!
//! Prediction runs in two gears:
//!
//! - **SLL** (context-free, fast): simulate with an empty call context,
//!   memoizing every step in the shared DFA cache. Correct for the vast
//!   majority of decisions.
//! - **Full context** (exact): on a detected conflict, re-simulate carrying
//!   the caller's real invocation stack. Resolves context-sensitive
//!   decisions SLL cannot, and confirms or refutes true ambiguity.
//!
//! [`AdaptivePredictor`] orchestrates both, escalating only when the fast
//! gear stalls. Results are deterministic regardless of cache state.

mod closure;
mod config;
mod context;
mod predictor;
mod semantic;

pub use config::{AltSet, AtnConfig, AtnConfigSet};
pub use context::{EMPTY_RETURN_STATE, PredictionContext};
pub use predictor::AdaptivePredictor;
pub use semantic::{NoPredicates, PredicateEvaluator, PredicateRef, SemanticContext};

pub(crate) use closure::{closure, move_configs};

use crate::atn::DecisionId;
use crate::error::PredictionError;

/// Which gear a simulation is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionMode {
    /// Context-free simulation with deferred predicates; DFA-memoized.
    Sll,
    /// Context-sensitive simulation carrying the caller's stack.
    FullContext,
}

/// Tuning knobs for the predictor.
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Upper bound on closure expansions per prediction call. `None` means
    /// unbounded; pathological ambiguous grammars can then loop for a long
    /// time on adversarial input.
    pub step_budget: Option<usize>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self { step_budget: None }
    }
}

/// Per-call countdown enforcing [`PredictorConfig::step_budget`].
#[derive(Debug)]
pub(crate) struct StepBudget {
    remaining: Option<usize>,
    limit: usize,
    decision: DecisionId,
}

impl StepBudget {
    pub(crate) const fn new(limit: Option<usize>, decision: DecisionId) -> Self {
        Self {
            remaining: limit,
            limit: match limit {
                Some(n) => n,
                None => 0,
            },
            decision,
        }
    }

    pub(crate) fn tick(&mut self) -> Result<(), PredictionError> {
        match &mut self.remaining {
            None => Ok(()),
            Some(0) => Err(PredictionError::StepBudgetExceeded {
                decision: self.decision,
                steps: self.limit,
            }),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}
