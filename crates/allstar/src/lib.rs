//! # Allstar
//!
//! An adaptive prediction engine: an ATN (augmented transition network)
//! interpreter with a lazily built, shared DFA cache, in the style of
//! ALL(*) parsing.
//!
//! ## Overview
//!
//! A grammar compiles once into an immutable [`Atn`]. At every decision
//! point, the predictor simulates the network over lookahead symbols to
//! pick an alternative, and memoizes each simulation step as a DFA state in
//! a [`DfaCache`] shared by every parse of that grammar. Hot decisions
//! therefore degenerate into a table walk; cold ones pay for simulation
//! exactly once.
//!
//! - **Adaptive**: the DFA grows on demand, driven by real input.
//! - **Two-gear**: fast context-free SLL prediction, escalating to exact
//!   full-context analysis only on a detected conflict.
//! - **Shared**: the cache is safe to use from many threads; racing
//!   predictions agree because states are hash-consed.
//! - **Lexer-ready**: tokenization runs on the same machinery with
//!   longest-match semantics, modes, and rule actions.
//!
//! ## Quick Start
//!
//! Predict over a two-alternative decision (`r: 'a' 'b' | 'a' 'c'`):
//!
//! ```rust
//! use allstar::atn::{AtnBuilder, GrammarKind, StateKind, Transition};
//! use allstar::dfa::DfaCache;
//! use allstar::prediction::{
//!     AdaptivePredictor, NoPredicates, PredictionContext,
//! };
//!
//! let mut b = AtnBuilder::new(GrammarKind::Parser);
//! let r = b.rule("r");
//! let decision = b.state(r, StateKind::Decision);
//! let d = b.decision(decision);
//! for second in [b'b', b'c'] {
//!     let mid = b.state(r, StateKind::Basic);
//!     b.transition(decision, Transition::Epsilon { target: mid });
//!     let tail = b.state(r, StateKind::Basic);
//!     b.transition(mid, Transition::Atom { target: tail, symbol: b'a'.into() });
//!     b.transition(
//!         tail,
//!         Transition::Atom { target: b.rule_stop(r), symbol: second.into() },
//!     );
//! }
//! let atn = b.build()?;
//!
//! let cache = DfaCache::new(&atn);
//! let predictor = AdaptivePredictor::new(&atn, &cache);
//! let input = [u32::from(b'a'), u32::from(b'c')];
//! let alt = predictor.predict(d, &input, 0, &PredictionContext::empty(), &NoPredicates)?;
//! assert_eq!(alt, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`atn`]: the static grammar graph and its wire form
//! - [`prediction`]: configurations, contexts, closure, and the predictor
//! - [`dfa`]: the shared cache and its debug serializer
//! - [`lexer`]: tokenization built on the same engine
//! - [`error`]: error types and the diagnostics listener

pub mod atn;
pub mod dfa;
pub mod error;
pub mod lexer;
pub mod prediction;

pub use atn::{Atn, AtnBuilder, DecisionId, RuleId, StateId, Symbol, EOF};
pub use dfa::{Dfa, DfaCache, DfaSerializer};
pub use error::{
    Ambiguity, AtnBuildError, AtnFormatError, ContextSensitivity, PredictionError,
    PredictionListener,
};
pub use lexer::{LexerMatch, LexerSimulator};
pub use prediction::{
    AdaptivePredictor, AtnConfig, AtnConfigSet, PredictionContext, PredictionMode, PredictorConfig,
};
