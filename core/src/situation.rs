//! Dotted-rule situations with a uniqueness index.
//!
//! A situation is `(rule, dot-position, optional lookahead)`,
//! enumerated once during grammar finalization and given a dense id;
//! the engine additionally wants a "vector of transitions" per item
//! set keyed by the symbol after the dot. A `(production, dot)` pair
//! with a per-item lookahead set attached via a surrounding item-set
//! map is a familiar dotted-rule shape; here that "dot into a rule"
//! shape is kept, but situations are interned globally by dense id
//! instead of by pointer identity, so they can be hashed by integer id
//! rather than pointer tuples.

use std::fmt;

use crate::hash_index::HashIndex;
use crate::rule::RuleId;
use crate::symbol::{SymbolId, TerminalSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SituationId(pub u32);

impl SituationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SituationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// The key half of a situation: which rule, how far the dot has
/// advanced. Two situations with the same key but different static
/// lookahead are still distinct situations when lookahead is enabled,
/// so this is *not* by itself the dedup key —
/// [`SituationTable::intern`] hashes `(rule, dot)` plus lookahead
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SituationKey {
    pub rule: RuleId,
    pub dot: usize,
}

#[derive(Debug, Clone)]
pub struct Situation {
    pub id: SituationId,
    pub rule: RuleId,
    pub dot: usize,
    /// Static FOLLOW-derived lookahead, present only when
    /// `LookaheadLevel::Static` or `Dynamic` is configured.
    pub lookahead: Option<TerminalSet>,
}

impl Situation {
    pub fn key(&self) -> SituationKey {
        SituationKey {
            rule: self.rule,
            dot: self.dot,
        }
    }
}

/// The set of all distinct situations over all rules, computed once
/// during grammar finalization. Immutable after that
/// point; `intern` is only ever called from `analysis::analyze`.
#[derive(Debug, Default)]
pub struct SituationTable {
    situations: Vec<Situation>,
    by_key_and_lookahead: HashIndex<(SituationKey, Option<Vec<u32>>), SituationId>,
    /// Every situation sharing a `(rule, dot)` regardless of
    /// lookahead — used by the engine when lookahead is off to find
    /// "the" situation for a key in O(1).
    by_key: HashIndex<SituationKey, SituationId>,
}

fn lookahead_fingerprint(lookahead: &Option<TerminalSet>) -> Option<Vec<u32>> {
    lookahead.as_ref().map(|set| set.iter().map(|s| s.0).collect())
}

impl SituationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.situations.len()
    }

    pub fn get(&self, id: SituationId) -> &Situation {
        &self.situations[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Situation> {
        self.situations.iter()
    }

    /// The situation for `(rule, dot)` with no lookahead
    /// discrimination — correct whenever `LookaheadLevel::None` is in
    /// effect; with lookahead enabled this returns whichever
    /// lookahead-variant was interned first, so callers that need a
    /// specific lookahead should go through [`Self::intern`] instead.
    pub fn find_by_key(&self, key: SituationKey) -> Option<SituationId> {
        self.by_key.get(&key).copied()
    }

    /// Intern a `(rule, dot, lookahead)` triple, returning its dense
    /// id. Idempotent: interning the same triple twice returns the
    /// same id.
    pub fn intern(&mut self, rule: RuleId, dot: usize, lookahead: Option<TerminalSet>) -> SituationId {
        let key = SituationKey { rule, dot };
        let fingerprint = lookahead_fingerprint(&lookahead);
        let situations = &mut self.situations;
        let (index, _existed) = self
            .by_key_and_lookahead
            .find_or_insert((key, fingerprint), || {
                let id = SituationId(situations.len() as u32);
                situations.push(Situation {
                    id,
                    rule,
                    dot,
                    lookahead,
                });
                id
            });
        let id = *self.by_key_and_lookahead.get_by_index(index).unwrap().1;
        self.by_key.find_or_insert(key, || id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_triple_twice_is_idempotent() {
        let mut table = SituationTable::new();
        let a = table.intern(RuleId(0), 1, None);
        let b = table.intern(RuleId(0), 1, None);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn different_dot_positions_are_distinct_situations() {
        let mut table = SituationTable::new();
        let a = table.intern(RuleId(0), 0, None);
        let b = table.intern(RuleId(0), 1, None);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn distinct_lookahead_sets_produce_distinct_situations() {
        let mut table = SituationTable::new();
        let mut la = TerminalSet::with_capacity(2);
        la.insert(SymbolId(0));
        let a = table.intern(RuleId(0), 0, Some(la));
        let b = table.intern(RuleId(0), 0, None);
        assert_ne!(a, b);
    }
}
