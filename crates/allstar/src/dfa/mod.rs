//! # DFA Module
//!
//! The lazily grown, shared memo of prediction results.
//!
//! ## Overview
//!
//! Each decision point owns one [`Dfa`]. Its states are hash-consed
//! configuration sets: at most one DFA state exists per distinct set
//! content, no matter how many threads race to compute it. Edges are added
//! on demand from live input and never removed; the automaton only grows.
//!
//! ## Concurrency
//!
//! Every `Dfa` guards its state table with its own `RwLock`, so concurrent
//! first-use of *unrelated* decisions never serializes. Within one decision,
//! lookup takes a read lock and state/edge insertion takes a short write
//! lock with insert-if-absent semantics: a race that computes the same
//! configuration set twice converges on one winner.

pub mod serializer;

pub use serializer::{DfaSerializer, Vocabulary};

use std::sync::{Arc, RwLock};

use hashbrown::HashMap;

use crate::atn::{Atn, DecisionId, GrammarKind, Symbol};
use crate::prediction::AtnConfigSet;

/// Index of a state within one decision's DFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DfaStateId(pub u32);

impl DfaStateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Outgoing edges of one DFA state.
///
/// Parser decisions see a handful of token types, so a sparse map wins.
/// Lexer decisions see dense character windows; those get a direct-indexed
/// table over a configured window with a sparse overflow for the rest.
#[derive(Debug)]
enum EdgeMap {
    Sparse(HashMap<Symbol, DfaStateId, ahash::RandomState>),
    Dense {
        min: Symbol,
        table: Box<[Option<DfaStateId>]>,
        overflow: HashMap<Symbol, DfaStateId, ahash::RandomState>,
    },
}

impl EdgeMap {
    fn sparse() -> Self {
        Self::Sparse(HashMap::default())
    }

    fn dense(min: Symbol, max: Symbol) -> Self {
        let width = (max - min + 1) as usize;
        Self::Dense {
            min,
            table: vec![None; width].into_boxed_slice(),
            overflow: HashMap::default(),
        }
    }

    fn get(&self, symbol: Symbol) -> Option<DfaStateId> {
        match self {
            Self::Sparse(map) => map.get(&symbol).copied(),
            Self::Dense {
                min,
                table,
                overflow,
            } => match symbol.checked_sub(*min).map(|i| i as usize) {
                Some(i) if i < table.len() => table[i],
                _ => overflow.get(&symbol).copied(),
            },
        }
    }

    fn insert(&mut self, symbol: Symbol, target: DfaStateId) {
        match self {
            Self::Sparse(map) => {
                // First writer wins; monotonic, never replaced
                map.entry(symbol).or_insert(target);
            }
            Self::Dense {
                min,
                table,
                overflow,
            } => match symbol.checked_sub(*min).map(|i| i as usize) {
                Some(i) if i < table.len() => {
                    if table[i].is_none() {
                        table[i] = Some(target);
                    }
                }
                _ => {
                    overflow.entry(symbol).or_insert(target);
                }
            },
        }
    }

    fn snapshot(&self) -> Vec<(Symbol, DfaStateId)> {
        let mut edges: Vec<(Symbol, DfaStateId)> = match self {
            Self::Sparse(map) => map.iter().map(|(&s, &t)| (s, t)).collect(),
            Self::Dense {
                min,
                table,
                overflow,
            } => table
                .iter()
                .enumerate()
                .filter_map(|(i, t)| t.map(|t| (min + u32::try_from(i).unwrap_or(0), t)))
                .chain(overflow.iter().map(|(&s, &t)| (s, t)))
                .collect(),
        };
        edges.sort_unstable_by_key(|&(symbol, _)| symbol);
        edges
    }
}

#[derive(Debug)]
struct DfaStateData {
    configs: Arc<AtnConfigSet>,
    edges: EdgeMap,
    /// Predicted alternative when this state decides the prediction.
    accept: Option<u32>,
    /// Set when SLL analysis conflicted here and full context is needed.
    requires_full_context: bool,
}

/// Read-only view of one DFA state, for dumps and tests.
#[derive(Debug, Clone)]
pub struct DfaStateView {
    pub id: DfaStateId,
    pub accept: Option<u32>,
    pub requires_full_context: bool,
    /// Edges sorted by symbol.
    pub edges: Vec<(Symbol, DfaStateId)>,
}

#[derive(Debug, Default)]
struct DfaInner {
    states: Vec<DfaStateData>,
    dedup: HashMap<Arc<AtnConfigSet>, DfaStateId, ahash::RandomState>,
    start: Option<DfaStateId>,
    start_requires_full_context: bool,
}

/// One decision's lazily built automaton. Lives as long as the owning ATN;
/// grows monotonically and is safe to read while being extended.
#[derive(Debug)]
pub struct Dfa {
    decision: DecisionId,
    /// Dense direct-index window for new states, if configured.
    dense_window: Option<(Symbol, Symbol)>,
    inner: RwLock<DfaInner>,
}

impl Dfa {
    #[must_use]
    pub fn new(decision: DecisionId) -> Self {
        Self {
            decision,
            dense_window: None,
            inner: RwLock::new(DfaInner::default()),
        }
    }

    /// Like [`new`](Self::new) but with direct-indexed edges over
    /// `min..=max`; symbols outside the window fall back to a sparse map.
    #[must_use]
    pub fn with_dense_window(decision: DecisionId, min: Symbol, max: Symbol) -> Self {
        Self {
            decision,
            dense_window: Some((min, max)),
            inner: RwLock::new(DfaInner::default()),
        }
    }

    #[must_use]
    pub const fn decision(&self) -> DecisionId {
        self.decision
    }

    #[must_use]
    pub fn start_state(&self) -> Option<DfaStateId> {
        self.read().start
    }

    #[must_use]
    pub fn start_requires_full_context(&self) -> bool {
        self.read().start_requires_full_context
    }

    /// Record that SLL analysis of this decision conflicts from the start
    /// state on; later predictions skip straight to full context.
    pub fn mark_start_requires_full_context(&self) {
        self.write().start_requires_full_context = true;
    }

    /// Install `state` as the start state unless a racing thread already
    /// installed one; returns the winner.
    pub fn set_start_state(&self, state: DfaStateId) -> DfaStateId {
        let mut inner = self.write();
        *inner.start.get_or_insert(state)
    }

    /// Hash-cons a configuration set into a DFA state. The set is frozen
    /// here; if an equal set was already interned (possibly by another
    /// thread), that existing state is returned and `accept` is ignored.
    pub fn get_or_create_state(&self, mut configs: AtnConfigSet, accept: Option<u32>) -> DfaStateId {
        configs.freeze();
        let configs = Arc::new(configs);
        let mut inner = self.write();
        if let Some(&existing) = inner.dedup.get(&configs) {
            return existing;
        }
        let id = DfaStateId(u32::try_from(inner.states.len()).unwrap_or(u32::MAX));
        let edges = match self.dense_window {
            Some((min, max)) => EdgeMap::dense(min, max),
            None => EdgeMap::sparse(),
        };
        inner.states.push(DfaStateData {
            configs: configs.clone(),
            edges,
            accept,
            requires_full_context: false,
        });
        inner.dedup.insert(configs, id);
        id
    }

    #[must_use]
    pub fn edge(&self, state: DfaStateId, symbol: Symbol) -> Option<DfaStateId> {
        self.read().states[state.index()].edges.get(symbol)
    }

    /// Cache an edge. Monotonic: an already-present edge is never replaced.
    pub fn add_edge(&self, from: DfaStateId, symbol: Symbol, to: DfaStateId) {
        self.write().states[from.index()].edges.insert(symbol, to);
    }

    #[must_use]
    pub fn accept_alt(&self, state: DfaStateId) -> Option<u32> {
        self.read().states[state.index()].accept
    }

    #[must_use]
    pub fn requires_full_context(&self, state: DfaStateId) -> bool {
        self.read().states[state.index()].requires_full_context
    }

    pub fn mark_requires_full_context(&self, state: DfaStateId) {
        self.write().states[state.index()].requires_full_context = true;
    }

    /// The frozen configuration set this state memoizes.
    #[must_use]
    pub fn state_configs(&self, state: DfaStateId) -> Arc<AtnConfigSet> {
        self.read().states[state.index()].configs.clone()
    }

    /// Number of states interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().states.is_empty()
    }

    /// Consistent point-in-time view of all states, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DfaStateView> {
        let inner = self.read();
        inner
            .states
            .iter()
            .enumerate()
            .map(|(i, data)| DfaStateView {
                id: DfaStateId(u32::try_from(i).unwrap_or(u32::MAX)),
                accept: data.accept,
                requires_full_context: data.requires_full_context,
                edges: data.edges.snapshot(),
            })
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, DfaInner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, DfaInner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// All DFAs for one grammar: one per decision, created empty alongside the
/// ATN and shared by every recognizer instance over that grammar.
#[derive(Debug)]
pub struct DfaCache {
    dfas: Vec<Dfa>,
}

impl DfaCache {
    /// One empty DFA per decision. Lexer grammars get a dense ASCII edge
    /// window; parser token spaces stay sparse.
    #[must_use]
    pub fn new(atn: &Atn) -> Self {
        let dfas = (0..atn.decision_count())
            .map(|i| {
                let decision = DecisionId(u32::try_from(i).unwrap_or(u32::MAX));
                match atn.grammar_kind() {
                    GrammarKind::Lexer => Dfa::with_dense_window(decision, 0, 127),
                    GrammarKind::Parser => Dfa::new(decision),
                }
            })
            .collect();
        Self { dfas }
    }

    #[must_use]
    pub fn dfa(&self, decision: DecisionId) -> &Dfa {
        &self.dfas[decision.index()]
    }

    #[must_use]
    pub fn decision_count(&self) -> usize {
        self.dfas.len()
    }

    /// Drop every memoized state and edge, keeping the per-decision DFAs.
    pub fn clear(&self) {
        for dfa in &self.dfas {
            *dfa.write() = DfaInner::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::StateId;
    use crate::prediction::{AtnConfig, PredictionContext};

    fn set_of(states: &[(u32, u32)]) -> AtnConfigSet {
        let mut set = AtnConfigSet::new();
        for &(state, alt) in states {
            set.add(AtnConfig::new(
                StateId(state),
                alt,
                PredictionContext::empty(),
            ));
        }
        set
    }

    #[test]
    fn equal_sets_intern_to_one_state() {
        let dfa = Dfa::new(DecisionId(0));
        let a = dfa.get_or_create_state(set_of(&[(1, 1), (2, 2)]), None);
        let b = dfa.get_or_create_state(set_of(&[(2, 2), (1, 1)]), None);
        assert_eq!(a, b);
        assert_eq!(dfa.len(), 1);
    }

    #[test]
    fn start_state_first_writer_wins() {
        let dfa = Dfa::new(DecisionId(0));
        let a = dfa.get_or_create_state(set_of(&[(1, 1)]), None);
        let b = dfa.get_or_create_state(set_of(&[(2, 1)]), Some(1));
        assert_eq!(dfa.set_start_state(a), a);
        assert_eq!(dfa.set_start_state(b), a);
    }

    #[test]
    fn edges_are_monotonic() {
        let dfa = Dfa::new(DecisionId(0));
        let a = dfa.get_or_create_state(set_of(&[(1, 1)]), None);
        let b = dfa.get_or_create_state(set_of(&[(2, 1)]), Some(1));
        let c = dfa.get_or_create_state(set_of(&[(3, 1)]), Some(1));
        dfa.add_edge(a, 7, b);
        dfa.add_edge(a, 7, c);
        assert_eq!(dfa.edge(a, 7), Some(b));
    }

    #[test]
    fn dense_window_handles_overflow_symbols() {
        let dfa = Dfa::with_dense_window(DecisionId(0), 0, 127);
        let a = dfa.get_or_create_state(set_of(&[(1, 1)]), None);
        let b = dfa.get_or_create_state(set_of(&[(2, 1)]), Some(1));
        dfa.add_edge(a, u32::from('é'), b);
        dfa.add_edge(a, 65, b);
        assert_eq!(dfa.edge(a, u32::from('é')), Some(b));
        assert_eq!(dfa.edge(a, 65), Some(b));
        let view = &dfa.snapshot()[a.index()];
        assert_eq!(view.edges, vec![(65, b), (u32::from('é'), b)]);
    }
}
