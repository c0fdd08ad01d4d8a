//! Configurations and configuration sets.
//!
//! An [`AtnConfig`] is the runtime "position" of one prediction thread: an
//! ATN state, the alternative it is pursuing, its call-return context, and
//! any predicate gate collected along the way. An [`AtnConfigSet`] is the
//! deduplicated collection a closure produces; sets are frozen before they
//! become DFA state payloads and hash by content so the cache can hash-cons
//! them.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::context::PredictionContext;
use super::semantic::SemanticContext;
use crate::atn::StateId;

/// A small sorted set of alternative numbers.
#[derive(Debug, Clone, Default, Eq)]
pub struct AltSet {
    bits: SmallVec<[u64; 2]>,
}

impl AltSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alt: u32) {
        let word = (alt / 64) as usize;
        if self.bits.len() <= word {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1 << (alt % 64);
    }

    #[must_use]
    pub fn contains(&self, alt: u32) -> bool {
        let word = (alt / 64) as usize;
        self.bits
            .get(word)
            .is_some_and(|bits| bits & (1 << (alt % 64)) != 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Smallest member; the deterministic pick on unresolved ambiguity.
    #[must_use]
    pub fn min(&self) -> Option<u32> {
        self.iter().next()
    }

    pub fn union_with(&mut self, other: &Self) {
        if self.bits.len() < other.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        for (word, bits) in other.bits.iter().enumerate() {
            self.bits[word] |= bits;
        }
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits.iter().enumerate().flat_map(|(word, &bits)| {
            (0..64)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| u32::try_from(word * 64 + bit).unwrap_or(u32::MAX))
        })
    }
}

impl PartialEq for AltSet {
    fn eq(&self, other: &Self) -> bool {
        // Trailing zero words are insignificant
        let longest = self.bits.len().max(other.bits.len());
        (0..longest).all(|i| {
            self.bits.get(i).copied().unwrap_or(0) == other.bits.get(i).copied().unwrap_or(0)
        })
    }
}

/// One prediction thread's position: state, pursued alternative, call
/// context, and the predicate gate accumulated so far.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtnConfig {
    pub state: StateId,
    /// 1-based alternative number at the decision being predicted.
    pub alt: u32,
    pub context: Arc<PredictionContext>,
    pub semantic: SemanticContext,
}

impl AtnConfig {
    #[must_use]
    pub const fn new(state: StateId, alt: u32, context: Arc<PredictionContext>) -> Self {
        Self {
            state,
            alt,
            context,
            semantic: SemanticContext::None,
        }
    }

    /// Same thread, moved to another state.
    #[must_use]
    pub fn at(&self, state: StateId) -> Self {
        Self {
            state,
            alt: self.alt,
            context: self.context.clone(),
            semantic: self.semantic.clone(),
        }
    }

    /// Same thread at another state with a replaced context (rule push/pop).
    #[must_use]
    pub fn at_with_context(&self, state: StateId, context: Arc<PredictionContext>) -> Self {
        Self {
            state,
            alt: self.alt,
            context,
            semantic: self.semantic.clone(),
        }
    }
}

/// Dedup key: configurations are duplicates iff state, alt, and context all
/// agree; their predicate gates are OR-merged on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConfigKey {
    state: StateId,
    alt: u32,
    context: Arc<PredictionContext>,
}

/// Deduplicated set of configurations reached by a closure.
///
/// Insertion merges duplicates by OR-ing their semantic predicates. Once the
/// set is handed to a DFA state it is [frozen](Self::freeze); inserting into
/// a frozen set is a bug caught by a debug assertion. Equality and hashing
/// are content-based and order-independent, which is what lets the DFA cache
/// hash-cons sets computed in different orders (or by different threads)
/// onto one state.
#[derive(Debug, Clone, Default)]
pub struct AtnConfigSet {
    configs: Vec<AtnConfig>,
    index: HashMap<ConfigKey, usize, ahash::RandomState>,
    frozen: bool,
    // Set when a closure evaluated a predicate while building this set. The
    // flag is per-computation bookkeeping, excluded from equality and hashing.
    predicate_gated: bool,
}

impl AtnConfigSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, merging with an existing duplicate if present.
    pub fn add(&mut self, config: AtnConfig) {
        debug_assert!(!self.frozen, "insert into frozen configuration set");
        let key = ConfigKey {
            state: config.state,
            alt: config.alt,
            context: config.context.clone(),
        };
        match self.index.get(&key) {
            Some(&slot) => {
                let existing = &mut self.configs[slot];
                let merged = SemanticContext::or(
                    std::mem::replace(&mut existing.semantic, SemanticContext::None),
                    config.semantic,
                );
                existing.semantic = merged;
            }
            None => {
                self.index.insert(key, self.configs.len());
                self.configs.push(config);
            }
        }
    }

    /// Mark the set immutable. Called by the DFA cache before retaining it.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AtnConfig> {
        self.configs.iter()
    }

    /// Every alternative some configuration is pursuing.
    #[must_use]
    pub fn alts(&self) -> AltSet {
        let mut alts = AltSet::new();
        for config in &self.configs {
            alts.insert(config.alt);
        }
        alts
    }

    /// The single predicted alternative, if the set spans exactly one.
    #[must_use]
    pub fn unique_alt(&self) -> Option<u32> {
        let mut found = None;
        for config in &self.configs {
            match found {
                None => found = Some(config.alt),
                Some(alt) if alt != config.alt => return None,
                Some(_) => {}
            }
        }
        found
    }

    /// Record that a predicate outcome shaped this set's contents.
    pub(crate) fn mark_predicate_gated(&mut self) {
        self.predicate_gated = true;
    }

    /// Whether a predicate outcome shaped this set. A gated set reflects one
    /// evaluator's answers and must not seed shared cache edges.
    #[must_use]
    pub const fn is_predicate_gated(&self) -> bool {
        self.predicate_gated
    }

    /// Whether any configuration carries a deferred predicate.
    #[must_use]
    pub fn has_predicates(&self) -> bool {
        self.configs.iter().any(|c| !c.semantic.is_none())
    }

    /// Alternatives that look identical to context-free analysis: two or
    /// more configurations agreeing on (state, context) while pursuing
    /// different alternatives. The returned set unions every such collision.
    #[must_use]
    pub fn conflicting_alts(&self) -> AltSet {
        let mut groups: HashMap<(StateId, &Arc<PredictionContext>), AltSet, ahash::RandomState> =
            HashMap::default();
        for config in &self.configs {
            groups
                .entry((config.state, &config.context))
                .or_default()
                .insert(config.alt);
        }
        let mut conflicts = AltSet::new();
        for alts in groups.values() {
            if alts.len() > 1 {
                conflicts.union_with(alts);
            }
        }
        conflicts
    }
}

impl PartialEq for AtnConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.configs.len() == other.configs.len()
            && self.configs.iter().all(|config| {
                let key = ConfigKey {
                    state: config.state,
                    alt: config.alt,
                    context: config.context.clone(),
                };
                other
                    .index
                    .get(&key)
                    .is_some_and(|&slot| other.configs[slot].semantic == config.semantic)
            })
    }
}

impl Eq for AtnConfigSet {}

impl Hash for AtnConfigSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent: sum of per-config hashes under a fixed-key
        // hasher, so sets built in different orders collide onto the same
        // DFA state.
        let mut combined: u64 = 0;
        for config in &self.configs {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            config.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        state.write_u64(combined);
        state.write_usize(self.configs.len());
    }
}
