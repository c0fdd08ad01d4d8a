//! # Error Types
//!
//! Error taxonomy for the prediction engine.
//!
//! ## Overview
//!
//! Only two outcomes of a prediction call are errors:
//!
//! - [`PredictionError::NoViableAlternative`]: the configuration set went
//!   empty, no alternative can match. Fatal to the call, surfaced to the
//!   caller's error-recovery strategy, never retried internally.
//! - [`PredictionError::StepBudgetExceeded`]: the optional closure-step
//!   budget ran out on a pathological grammar.
//!
//! Ambiguity is deliberately *not* an error: the engine resolves it to the
//! lowest-numbered alternative and reports it through
//! [`PredictionListener`] as a warning-level diagnostic.
//!
//! Graph construction failures ([`AtnBuildError`], [`AtnFormatError`]) are
//! fatal before any prediction is possible.
//!
//! ## Diagnostics Support
//!
//! With the `diagnostics` feature enabled, errors derive
//! [`miette::Diagnostic`] for rich reporting in grammar tooling.

use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

use crate::atn::{DecisionId, StateId};
use crate::prediction::{AltSet, AtnConfigSet};

/// Failure of a single prediction call.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum PredictionError {
    /// The configuration set became empty: no alternative matches the input
    /// from `offset` on. Carries the set that failed so the error strategy
    /// can inspect what was still viable before the fatal symbol.
    #[error("no viable alternative at decision {}, input offset {offset}", decision.0)]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(allstar::no_viable_alternative))
    )]
    NoViableAlternative {
        decision: DecisionId,
        /// Index of the first symbol that no configuration could consume.
        offset: usize,
        /// The closure result that had no way forward.
        configs: AtnConfigSet,
    },

    /// The configured closure-step budget was exhausted.
    #[error("prediction exceeded its step budget ({steps} steps) at decision {}", decision.0)]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(allstar::step_budget_exceeded))
    )]
    StepBudgetExceeded { decision: DecisionId, steps: usize },
}

/// Graph validation failure in [`crate::atn::AtnBuilder::build`].
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum AtnBuildError {
    #[error("transition from state {} targets nonexistent state {}", from.0, to.0)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::dangling_target)))]
    DanglingTarget { from: StateId, to: StateId },

    #[error("rule call from state {} targets {}, which is not a rule start state", from.0, to.0)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::rule_call_into_body)))]
    RuleCallIntoBody { from: StateId, to: StateId },

    #[error(
        "decision state {} has an input-consuming alternative edge to state {}",
        decision.0, target.0
    )]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(allstar::consuming_alternative))
    )]
    ConsumingAlternative { decision: StateId, target: StateId },
}

/// Malformed serialized ATN, rejected by [`crate::atn::serial::decode`].
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum AtnFormatError {
    #[error("unsupported ATN serialization version {found} (expected {expected})")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::bad_version)))]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("serialized ATN truncated while reading {section}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::truncated)))]
    Truncated { section: &'static str },

    #[error("invalid state kind tag {tag} at state {index}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::bad_state_kind)))]
    InvalidStateKind { index: usize, tag: u32 },

    #[error("invalid transition kind tag {tag} on state {}", state.0)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::bad_transition_kind)))]
    InvalidTransitionKind { state: StateId, tag: u32 },

    #[error("invalid lexer action tag {tag} in rule {rule}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::bad_lexer_action)))]
    InvalidLexerAction { rule: usize, tag: u32 },

    #[error("{section} entry {value} points outside the decoded tables")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::index_out_of_range)))]
    IndexOutOfRange { section: &'static str, value: u32 },

    #[error("mode {mode} starts at state {}, which carries no decision", state.0)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::mode_without_decision)))]
    ModeWithoutDecision { mode: usize, state: StateId },

    #[error("decoded graph failed validation: {source}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(allstar::invalid_graph)))]
    InvalidGraph {
        #[from]
        source: AtnBuildError,
    },
}

/// An ambiguity resolved during prediction: two or more alternatives stayed
/// equally viable. Reported once per occurrence, never aborts parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub decision: DecisionId,
    /// First lookahead offset of the ambiguous span.
    pub start_offset: usize,
    /// Offset at which the tie was (not) broken.
    pub stop_offset: usize,
    /// The tied alternatives; the minimum is the one chosen.
    pub alternatives: AltSet,
    /// Whether full-context analysis confirmed the tie.
    pub full_context: bool,
}

/// A decision that required full-context analysis to resolve: the fast
/// SLL pass conflicted but the caller's context disambiguated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSensitivity {
    pub decision: DecisionId,
    pub start_offset: usize,
    pub stop_offset: usize,
    /// The alternative full-context analysis settled on.
    pub alternative: u32,
}

/// Warning-level diagnostics surfaced by the predictor. All methods default
/// to no-ops; tooling installs an implementation to collect reports.
pub trait PredictionListener {
    fn ambiguity(&self, _report: &Ambiguity) {}
    fn context_sensitivity(&self, _report: &ContextSensitivity) {}
}

/// Listener that drops every report. Useful as an explicit default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentListener;

impl PredictionListener for SilentListener {}
