//! Deferred semantic predicates.
//!
//! Grammar-supplied predicates are opaque to this crate: a configuration
//! carries a [`SemanticContext`] expression tree referencing them by
//! `(rule, index)`, and the embedding recognizer evaluates the leaves
//! through [`PredicateEvaluator`]. In fast (SLL) prediction the tree is
//! built up unevaluated; full-context prediction evaluates leaves
//! immediately against the real call context.

use smallvec::SmallVec;

use crate::atn::RuleId;

/// Reference to a grammar-authored predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PredicateRef {
    pub rule: RuleId,
    /// Predicate index within the rule, assigned by the grammar front-end.
    pub index: u32,
    /// Whether the predicate reads the invocation context; such predicates
    /// are only meaningful during full-context analysis.
    pub ctx_dependent: bool,
}

/// Evaluates grammar predicates for the current parse.
///
/// Implementations must be `Send + Sync`; the same evaluator may serve
/// concurrent predictions over a shared grammar. Panics raised inside user
/// code propagate to the caller unchanged; the engine never catches them.
pub trait PredicateEvaluator: Send + Sync {
    /// `true` if the predicate holds at `offset` symbols into the input.
    fn evaluate(&self, predicate: &PredicateRef, offset: usize) -> bool;
}

/// Evaluator for grammars without predicates; every leaf holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPredicates;

impl PredicateEvaluator for NoPredicates {
    fn evaluate(&self, _predicate: &PredicateRef, _offset: usize) -> bool {
        true
    }
}

/// A boolean expression over predicate leaves, evaluated lazily by
/// [`SemanticContext::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticContext {
    /// No predicate gate; always true.
    None,
    Predicate(PredicateRef),
    /// Every operand must hold.
    And(SmallVec<[Box<SemanticContext>; 2]>),
    /// At least one operand must hold.
    Or(SmallVec<[Box<SemanticContext>; 2]>),
    Not(Box<SemanticContext>),
}

impl SemanticContext {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Conjunction, flattening nested `And`s and dropping `None` operands.
    #[must_use]
    pub fn and(a: Self, b: Self) -> Self {
        match (a, b) {
            (Self::None, other) | (other, Self::None) => other,
            (a, b) if a == b => a,
            (a, b) => {
                let mut operands: SmallVec<[Box<Self>; 2]> = SmallVec::new();
                for side in [a, b] {
                    match side {
                        Self::And(inner) => {
                            for op in inner {
                                Self::push_unique(&mut operands, op);
                            }
                        }
                        other => Self::push_unique(&mut operands, Box::new(other)),
                    }
                }
                Self::And(operands)
            }
        }
    }

    /// Disjunction; `None` (always true) absorbs the other side.
    #[must_use]
    pub fn or(a: Self, b: Self) -> Self {
        match (a, b) {
            (Self::None, _) | (_, Self::None) => Self::None,
            (a, b) if a == b => a,
            (a, b) => {
                let mut operands: SmallVec<[Box<Self>; 2]> = SmallVec::new();
                for side in [a, b] {
                    match side {
                        Self::Or(inner) => {
                            for op in inner {
                                Self::push_unique(&mut operands, op);
                            }
                        }
                        other => Self::push_unique(&mut operands, Box::new(other)),
                    }
                }
                Self::Or(operands)
            }
        }
    }

    /// Keeps gates built in different orders comparable: an operand already
    /// present anywhere in the list is dropped, not just an adjacent twin.
    fn push_unique(operands: &mut SmallVec<[Box<Self>; 2]>, op: Box<Self>) {
        if !operands.contains(&op) {
            operands.push(op);
        }
    }

    /// Evaluate the whole tree with short-circuiting.
    #[must_use]
    pub fn evaluate(&self, evaluator: &dyn PredicateEvaluator, offset: usize) -> bool {
        match self {
            Self::None => true,
            Self::Predicate(pred) => evaluator.evaluate(pred, offset),
            Self::And(operands) => operands.iter().all(|op| op.evaluate(evaluator, offset)),
            Self::Or(operands) => operands.iter().any(|op| op.evaluate(evaluator, offset)),
            Self::Not(operand) => !operand.evaluate(evaluator, offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEvaluator(Vec<bool>);

    impl PredicateEvaluator for FixedEvaluator {
        fn evaluate(&self, predicate: &PredicateRef, _offset: usize) -> bool {
            self.0[predicate.index as usize]
        }
    }

    fn pred(index: u32) -> SemanticContext {
        SemanticContext::Predicate(PredicateRef {
            rule: RuleId(0),
            index,
            ctx_dependent: false,
        })
    }

    #[test]
    fn none_is_identity_for_and() {
        let p = pred(0);
        assert_eq!(SemanticContext::and(SemanticContext::None, p.clone()), p);
    }

    #[test]
    fn none_absorbs_or() {
        assert!(SemanticContext::or(SemanticContext::None, pred(0)).is_none());
    }

    #[test]
    fn and_flattens_and_dedups() {
        let both = SemanticContext::and(pred(0), pred(1));
        let widened = SemanticContext::and(both, pred(0));
        match widened {
            SemanticContext::And(ops) => assert_eq!(ops.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn widening_an_or_with_a_known_operand_is_a_no_op() {
        let either = SemanticContext::or(pred(0), pred(1));
        let widened = SemanticContext::or(either.clone(), pred(0));
        assert_eq!(widened, either);
    }

    #[test]
    fn evaluation_short_circuits_over_tree() {
        let eval = FixedEvaluator(vec![true, false]);
        let and = SemanticContext::and(pred(0), pred(1));
        let or = SemanticContext::or(pred(0), pred(1));
        assert!(!and.evaluate(&eval, 0));
        assert!(or.evaluate(&eval, 0));
        assert!(SemanticContext::Not(Box::new(pred(1))).evaluate(&eval, 0));
    }
}
