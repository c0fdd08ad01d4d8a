//! Persistent call-return context.
//!
//! A [`PredictionContext`] is the chain of "return to this state in the
//! invoking rule" frames accumulated by nested rule invocations. Frames are
//! `Arc`-shared and never copied: pushing allocates one node, popping walks
//! the parent links, and merging two divergent contexts during full-context
//! analysis produces an explicit multi-parent [`Fork`](PredictionContext::Fork)
//! node rather than aliasing tricks.
//!
//! Equality is structural over the whole `(return_state, parent)` chain, with
//! a precomputed hash on every node so configuration dedup stays cheap.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

use crate::atn::StateId;

/// Sentinel return state standing for "ran off the top of the stack": the
/// caller is unknown, so the configuration may exit into any context.
pub const EMPTY_RETURN_STATE: StateId = StateId(u32::MAX);

const EMPTY_HASH: u64 = 0x9e37_79b9_7f4a_7c15;

fn mix(hash: u64, value: u64) -> u64 {
    (hash.rotate_left(5) ^ value).wrapping_mul(0x0100_0000_01b3)
}

/// A persistent, shareable call stack.
///
/// The empty context is a distinguished singleton obtained through
/// [`PredictionContext::empty`]. Two contexts are equal iff their
/// `(state, parent)` chains are equal.
#[derive(Debug)]
pub enum PredictionContext {
    /// No invocation frames; the distinguished singleton.
    Empty,
    /// One frame: return to `return_state` in the context of `parent`.
    Link {
        return_state: StateId,
        parent: Arc<PredictionContext>,
        hash: u64,
    },
    /// Merge result: several possible frames at the same stack depth,
    /// sorted by return state for canonical equality.
    Fork {
        entries: SmallVec<[(StateId, Arc<PredictionContext>); 2]>,
        hash: u64,
    },
}

impl PredictionContext {
    /// The shared empty-context singleton.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        static EMPTY: OnceLock<Arc<PredictionContext>> = OnceLock::new();
        EMPTY.get_or_init(|| Arc::new(Self::Empty)).clone()
    }

    /// Push a frame: remember to resume at `return_state` once the invoked
    /// rule finishes.
    #[must_use]
    pub fn link(parent: Arc<Self>, return_state: StateId) -> Arc<Self> {
        let hash = mix(parent.hash_value(), u64::from(return_state.0));
        Arc::new(Self::Link {
            return_state,
            parent,
            hash,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn hash_value(&self) -> u64 {
        match self {
            Self::Empty => EMPTY_HASH,
            Self::Link { hash, .. } | Self::Fork { hash, .. } => *hash,
        }
    }

    /// The frames poppable from this context, outermost link first. Empty
    /// contexts yield nothing; a fork yields one frame per merged parent.
    pub fn frames(&self) -> impl Iterator<Item = (StateId, &Arc<Self>)> + '_ {
        let entries: SmallVec<[(StateId, &Arc<Self>); 2]> = match self {
            Self::Empty => SmallVec::new(),
            Self::Link {
                return_state,
                parent,
                ..
            } => {
                let mut v = SmallVec::new();
                v.push((*return_state, parent));
                v
            }
            Self::Fork { entries, .. } => {
                entries.iter().map(|(s, p)| (*s, p)).collect()
            }
        };
        entries.into_iter()
    }

    /// Join two contexts that describe alternative call histories of the
    /// same configuration. Identical contexts merge to themselves; diverging
    /// ones produce a [`Fork`](Self::Fork) with the union of their frames,
    /// recursively merging parents that share a return state.
    #[must_use]
    pub fn merge(a: &Arc<Self>, b: &Arc<Self>) -> Arc<Self> {
        if Arc::ptr_eq(a, b) || a == b {
            return a.clone();
        }

        let mut entries: SmallVec<[(StateId, Arc<Self>); 2]> = SmallVec::new();
        for source in [a, b] {
            match source.as_ref() {
                Self::Empty => push_entry(&mut entries, EMPTY_RETURN_STATE, Self::empty()),
                Self::Link {
                    return_state,
                    parent,
                    ..
                } => push_entry(&mut entries, *return_state, parent.clone()),
                Self::Fork { entries: own, .. } => {
                    for (state, parent) in own {
                        push_entry(&mut entries, *state, parent.clone());
                    }
                }
            }
        }
        entries.sort_by_key(|(state, _)| *state);

        // Collapse back to the simpler representations when possible
        if entries.len() == 1 {
            let (state, parent) = entries.swap_remove(0);
            return if state == EMPTY_RETURN_STATE {
                Self::empty()
            } else {
                Self::link(parent, state)
            };
        }

        let mut hash = EMPTY_HASH;
        for (state, parent) in &entries {
            hash = mix(hash, u64::from(state.0));
            hash = mix(hash, parent.hash_value());
        }
        Arc::new(Self::Fork { entries, hash })
    }
}

/// Insert keeping entries unique by return state; parents of a shared
/// return state merge recursively.
fn push_entry(
    entries: &mut SmallVec<[(StateId, Arc<PredictionContext>); 2]>,
    state: StateId,
    parent: Arc<PredictionContext>,
) {
    if let Some((_, existing)) = entries.iter_mut().find(|(s, _)| *s == state) {
        *existing = PredictionContext::merge(existing, &parent);
    } else {
        entries.push((state, parent));
    }
}

impl PartialEq for PredictionContext {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (
                Self::Link {
                    return_state: s1,
                    parent: p1,
                    hash: h1,
                },
                Self::Link {
                    return_state: s2,
                    parent: p2,
                    hash: h2,
                },
            ) => h1 == h2 && s1 == s2 && (Arc::ptr_eq(p1, p2) || p1 == p2),
            (
                Self::Fork {
                    entries: e1,
                    hash: h1,
                },
                Self::Fork {
                    entries: e2,
                    hash: h2,
                },
            ) => {
                h1 == h2
                    && e1.len() == e2.len()
                    && e1.iter().zip(e2.iter()).all(|((s1, p1), (s2, p2))| {
                        s1 == s2 && (Arc::ptr_eq(p1, p2) || p1 == p2)
                    })
            }
            _ => false,
        }
    }
}

impl Eq for PredictionContext {}

impl Hash for PredictionContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}
