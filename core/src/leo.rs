//! Leo optimization: detect deterministic right recursion and install
//! shortcut completions so a chain of n nested completions collapses
//! to O(1) instead of O(n).
//!
//! A set qualifies for a shortcut at symbol `A` when exactly one item
//! in the set is waiting on `A`, and advancing that item's dot past
//! `A` finishes its rule (nothing follows `A` in the rhs) — the
//! textbook "only one link, and it's a tail call" condition. When the
//! waiting rule's own lhs already has a Leo shortcut at its origin,
//! the new shortcut points through to that one's target instead of to
//! itself, so a whole chain collapses to the single topmost link.
//!
//! Collapsing the chain at recognition time means the intermediate
//! links never get their own completed item inserted into a set —
//! only the topmost target does. The forest builder still needs each
//! of those intermediate spans to exist (it reconstructs a derivation
//! by recursing on completed spans), so every `LeoItem` also carries
//! the `(lhs, origin)` pairs the shortcut passes through; `engine::complete`
//! feeds these into [`LeoTable::mark_bypassed`] at the point the
//! shortcut is actually taken, once the completion's end position is
//! known.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::engine::ItemSet;
use crate::grammar::Grammar;
use crate::situation::{SituationId, SituationKey};
use crate::symbol::SymbolId;

#[derive(Debug, Clone)]
pub struct LeoItem {
    pub situation: SituationId,
    pub origin: usize,
    /// `(lhs, origin)` pairs this shortcut passes through on its way
    /// to `situation`/`origin`, nearest first. Each one is a
    /// completion that a literal walk of the chain would have
    /// inserted as its own item and that this shortcut instead skips.
    pub(crate) elided: Rc<Vec<(SymbolId, usize)>>,
}

/// Keyed by `(set-index, symbol-id)`, cleared at the start of every
/// parse — entries never outlive the parse that built them.
#[derive(Debug, Default, Clone)]
pub struct LeoTable {
    table: HashMap<(usize, SymbolId), LeoItem>,
    /// `(symbol, start, end)` spans a shortcut bypassed during this
    /// parse, populated as shortcuts are actually taken (not at
    /// install time, since the end position isn't known until then).
    /// The forest builder treats membership here the same as finding
    /// a literal completed item in `sets[end]`.
    bypassed: HashSet<(SymbolId, usize, usize)>,
}

impl LeoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, set_index: usize, symbol: SymbolId) -> Option<LeoItem> {
        self.table.get(&(set_index, symbol)).cloned()
    }

    fn insert(&mut self, set_index: usize, symbol: SymbolId, item: LeoItem) {
        self.table.insert((set_index, symbol), item);
    }

    pub(crate) fn mark_bypassed(&mut self, symbol: SymbolId, origin: usize, end: usize) {
        self.bypassed.insert((symbol, origin, end));
    }

    /// Whether `symbol` completing over `[start, end)` is known only
    /// because a shortcut bypassed inserting its literal item.
    pub fn completes_via_shortcut(&self, symbol: SymbolId, start: usize, end: usize) -> bool {
        self.bypassed.contains(&(symbol, start, end))
    }
}

pub(crate) fn install_leo_items(grammar: &Grammar, sets: &[ItemSet], k: usize, leo: &mut LeoTable) {
    let candidates: Vec<(SymbolId, usize)> = sets[k]
        .transitions
        .iter()
        .filter(|(_, waiting)| waiting.len() == 1)
        .map(|(&symbol, waiting)| (symbol, waiting[0]))
        .collect();

    for (symbol, item_index) in candidates {
        let item = sets[k].items[item_index];
        let sit = grammar.situations().get(item.situation);
        let rule = grammar.rule(sit.rule);
        if sit.dot + 1 != rule.rhs.len() {
            continue;
        }
        let advanced = match grammar.situations().find_by_key(SituationKey {
            rule: sit.rule,
            dot: sit.dot + 1,
        }) {
            Some(s) => s,
            None => continue,
        };
        let target = match leo.get(item.origin, rule.lhs) {
            Some(prev) => {
                let mut elided = Vec::with_capacity(prev.elided.len() + 1);
                elided.push((rule.lhs, item.origin));
                elided.extend(prev.elided.iter().copied());
                LeoItem {
                    situation: prev.situation,
                    origin: prev.origin,
                    elided: Rc::new(elided),
                }
            }
            None => LeoItem {
                situation: advanced,
                origin: item.origin,
                elided: Rc::new(Vec::new()),
            },
        };
        leo.insert(k, symbol, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_has_no_shortcuts() {
        let table = LeoTable::new();
        assert!(table.get(0, SymbolId(0)).is_none());
    }
}
