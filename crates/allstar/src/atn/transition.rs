//! Typed edges of the ATN.
//!
//! Every transition carries exactly one kind. The input-consuming kinds
//! (`Atom`, `Range`, `Set`, `Wildcard`) are the only ones for which
//! [`Transition::matches`] can return `true`; everything else is an epsilon
//! variant that the closure engine expands without consuming input.

use smallvec::SmallVec;

use super::{RuleId, StateId, Symbol};

/// A sorted set of non-overlapping, inclusive symbol ranges.
///
/// Ranges are normalized at construction (sorted, adjacent and overlapping
/// ranges merged) so that membership is a binary search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolSet {
    ranges: SmallVec<[(Symbol, Symbol); 4]>,
}

impl SymbolSet {
    /// Build a set from arbitrary inclusive ranges. Empty ranges are dropped.
    #[must_use]
    pub fn from_ranges(ranges: impl IntoIterator<Item = (Symbol, Symbol)>) -> Self {
        let mut raw: SmallVec<[(Symbol, Symbol); 4]> = ranges
            .into_iter()
            .filter(|(lo, hi)| lo <= hi)
            .collect();
        raw.sort_unstable();
        let mut merged: SmallVec<[(Symbol, Symbol); 4]> = SmallVec::new();
        for (lo, hi) in raw {
            match merged.last_mut() {
                // Merge ranges that overlap or touch
                Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                    *prev_hi = (*prev_hi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    /// A set holding exactly the given symbols.
    #[must_use]
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self::from_ranges(symbols.into_iter().map(|s| (s, s)))
    }

    /// Binary search over the sorted ranges.
    #[must_use]
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if symbol < lo {
                    std::cmp::Ordering::Greater
                } else if symbol > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The normalized ranges, sorted ascending.
    #[must_use]
    pub fn ranges(&self) -> &[(Symbol, Symbol)] {
        &self.ranges
    }

    /// Largest symbol in the set, if any.
    #[must_use]
    pub fn max_symbol(&self) -> Option<Symbol> {
        self.ranges.last().map(|&(_, hi)| hi)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// A typed edge from one ATN state to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Unconditional move without consuming input.
    Epsilon { target: StateId },
    /// Consume exactly one symbol.
    Atom { target: StateId, symbol: Symbol },
    /// Consume one symbol within an inclusive range.
    Range {
        target: StateId,
        from: Symbol,
        to: Symbol,
    },
    /// Consume one symbol contained in a set of ranges.
    Set { target: StateId, set: SymbolSet },
    /// Consume any one symbol of the recognizer's vocabulary.
    Wildcard { target: StateId },
    /// Invoke another rule: jump to its start state and remember where to
    /// resume (`follow`) once the callee reaches its stop state.
    Rule {
        target: StateId,
        rule: RuleId,
        follow: StateId,
    },
    /// Gate the path behind a semantic predicate supplied by the grammar.
    Predicate {
        target: StateId,
        rule: RuleId,
        index: u32,
        ctx_dependent: bool,
    },
    /// Embedded action; a no-op during prediction.
    Action { target: StateId, index: u32 },
    /// Precedence check for left-recursive rules; epsilon for prediction.
    Precedence { target: StateId, precedence: u32 },
}

impl Transition {
    /// The state this edge points at.
    #[must_use]
    pub const fn target(&self) -> StateId {
        match *self {
            Self::Epsilon { target }
            | Self::Atom { target, .. }
            | Self::Range { target, .. }
            | Self::Set { target, .. }
            | Self::Wildcard { target }
            | Self::Rule { target, .. }
            | Self::Predicate { target, .. }
            | Self::Action { target, .. }
            | Self::Precedence { target, .. } => target,
        }
    }

    /// `true` for every kind that does not consume an input symbol.
    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        !matches!(
            self,
            Self::Atom { .. } | Self::Range { .. } | Self::Set { .. } | Self::Wildcard { .. }
        )
    }

    /// Whether this edge consumes `symbol`. Pure and total over
    /// `(symbol, min_vocab, max_vocab)`; epsilon kinds never match.
    #[must_use]
    pub fn matches(&self, symbol: Symbol, min_vocab: Symbol, max_vocab: Symbol) -> bool {
        match self {
            Self::Atom { symbol: s, .. } => *s == symbol,
            Self::Range { from, to, .. } => (*from..=*to).contains(&symbol),
            Self::Set { set, .. } => set.contains(symbol),
            Self::Wildcard { .. } => (min_vocab..=max_vocab).contains(&symbol),
            _ => false,
        }
    }
}
