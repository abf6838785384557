//! The Earley recognizer: item-set construction across token positions.
//!
//! Item sets are built left to right. Each set starts from a core of
//! scanned-forward items, then closes under predict/complete to a
//! fixed point. Completion consults the Leo table first so a
//! deterministic right-recursive chain can be bypassed in O(1)
//! instead of walking every intermediate link; `leo.rs` owns that
//! table and the predicate for when a shortcut may be installed.
//!
//! When static lookahead is configured (`LookaheadLevel::Static` or
//! `Dynamic`), every situation with a completed dot position carries
//! FOLLOW(lhs); `close`/`predict`/`scan` only insert such a situation
//! when the token that will immediately follow it is actually in that
//! set, pruning completions and epsilon-predictions that cannot lead
//! anywhere. Narrowing the sets this way is also what lets Leo's
//! "exactly one item waiting" predicate stay precise: situations
//! already differ by lookahead (see situation.rs), so fewer spurious
//! single-candidate coincidences survive into `transitions`.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::hash_index::HashIndex;
use crate::leo::{self, LeoTable};
use crate::situation::SituationId;
use crate::symbol::SymbolId;
use crate::token::{ScannedToken, TokenBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    pub situation: SituationId,
    pub origin: usize,
}

/// One Earley set: the items active at a single position, plus the
/// indexing structures the engine and Leo optimizer both need.
#[derive(Debug, Default)]
pub struct ItemSet {
    pub items: Vec<Item>,
    index: HashIndex<(SituationId, usize), usize>,
    /// For every symbol that appears immediately after some item's
    /// dot in this set, the indices of the items waiting on it.
    pub transitions: HashMap<SymbolId, Vec<usize>>,
}

impl ItemSet {
    fn new() -> Self {
        Self::default()
    }

    fn contains(&self, situation: SituationId, origin: usize) -> bool {
        self.index.get(&(situation, origin)).is_some()
    }

    /// Appends `(situation, origin)` unless already present. Returns
    /// the item's index and whether it was newly inserted.
    fn insert(&mut self, grammar: &Grammar, situation: SituationId, origin: usize) -> (usize, bool) {
        let items = &mut self.items;
        let (index, existed) = self.index.find_or_insert((situation, origin), || {
            let index = items.len();
            items.push(Item { situation, origin });
            index
        });
        if !existed {
            if let Some(symbol) = next_symbol(grammar, situation) {
                self.transitions.entry(symbol).or_default().push(index);
            }
        }
        (index, !existed)
    }
}

/// The symbol immediately after a situation's dot, or `None` if the
/// situation is complete (dot at the end of the rhs).
fn next_symbol(grammar: &Grammar, situation: SituationId) -> Option<SymbolId> {
    let sit = grammar.situations().get(situation);
    let rule = grammar.rule(sit.rule);
    rule.rhs.get(sit.dot).copied()
}

fn is_complete(grammar: &Grammar, situation: SituationId) -> bool {
    next_symbol(grammar, situation).is_none()
}

/// Whether `situation` may be inserted given the token that will
/// immediately follow it. Only completed situations carry an
/// actionable lookahead set (FOLLOW of the rule they finish); mid-rule
/// situations and parses with no lookahead configured always pass.
fn passes_lookahead(grammar: &Grammar, situation: SituationId, lookahead: Option<SymbolId>) -> bool {
    if !is_complete(grammar, situation) {
        return true;
    }
    let sit = grammar.situations().get(situation);
    match (&sit.lookahead, lookahead) {
        (Some(follow), Some(token)) => follow.contains(token),
        _ => true,
    }
}

/// Resolves the token buffered at `pos` (if any) to its terminal
/// `SymbolId`, for passing to `close`/`scan` as the upcoming
/// lookahead. A pure peek: `TokenBuffer` is index-addressable and
/// buffers permanently, so this never disturbs later reads.
pub(crate) fn peek_lookahead(grammar: &Grammar, tokens: &mut TokenBuffer<'_>, pos: usize) -> Option<SymbolId> {
    tokens.get(pos).and_then(|t| grammar.symbol_for_code(t.code))
}

/// `S[0]`: one situation per start rule at dot 0, origin 0, not yet
/// closed under predict/complete.
pub(crate) fn seed_initial_set(grammar: &Grammar, start: SymbolId) -> ItemSet {
    let mut set = ItemSet::new();
    for rule in grammar.rules().filter(|r| r.lhs == start) {
        let situation = grammar
            .situations()
            .find_by_key(crate::situation::SituationKey { rule: rule.id, dot: 0 })
            .expect("situation enumeration covers every (rule, dot=0) pair");
        set.insert(grammar, situation, 0);
    }
    set
}

/// Predict/complete `sets[k]` to a fixed point. `sets[..k]` are
/// already closed and are only read for origin lookups. `lookahead`
/// is the terminal that will be scanned immediately after `sets[k]`
/// (`None` at end of input), used to prune completions whose FOLLOW
/// set excludes it.
pub(crate) fn close(grammar: &Grammar, sets: &mut [ItemSet], k: usize, leo: &mut LeoTable, lookahead: Option<SymbolId>) {
    let mut cursor = 0;
    loop {
        let len = sets[k].items.len();
        if cursor >= len {
            break;
        }
        for i in cursor..len {
            let item = sets[k].items[i];
            match next_symbol(grammar, item.situation) {
                Some(symbol) if grammar.symbol(symbol).is_nonterminal() => {
                    predict(grammar, sets, k, symbol, lookahead);
                    if grammar.symbol(symbol).empty_p {
                        complete_epsilon(grammar, sets, k, i, lookahead);
                    }
                }
                None => complete(grammar, sets, k, item, leo, lookahead),
                _ => {}
            }
        }
        cursor = len;
    }
    leo::install_leo_items(grammar, sets, k, leo);
}

fn predict(grammar: &Grammar, sets: &mut [ItemSet], k: usize, nonterminal: SymbolId, lookahead: Option<SymbolId>) {
    for rule in grammar.rules().filter(|r| r.lhs == nonterminal) {
        if let Some(situation) = grammar
            .situations()
            .find_by_key(crate::situation::SituationKey { rule: rule.id, dot: 0 })
        {
            if passes_lookahead(grammar, situation, lookahead) {
                sets[k].insert(grammar, situation, k);
            }
        }
    }
}

/// `(X → α • B β, j)` with `B` nullable also yields `(X → α B • β, j)`
/// directly, without waiting for a real completion of `B`.
fn complete_epsilon(grammar: &Grammar, sets: &mut [ItemSet], k: usize, item_index: usize, lookahead: Option<SymbolId>) {
    let item = sets[k].items[item_index];
    let sit = grammar.situations().get(item.situation);
    if let Some(next) = grammar
        .situations()
        .find_by_key(crate::situation::SituationKey { rule: sit.rule, dot: sit.dot + 1 })
    {
        if passes_lookahead(grammar, next, lookahead) {
            sets[k].insert(grammar, next, item.origin);
        }
    }
}

/// Standard completion: for a finished `(Y → γ •, j)` in `sets[k]`,
/// advance every item in `sets[j]` waiting on `Y`.
fn complete(grammar: &Grammar, sets: &mut [ItemSet], k: usize, item: Item, leo: &mut LeoTable, lookahead: Option<SymbolId>) {
    let sit = grammar.situations().get(item.situation);
    let lhs = grammar.rule(sit.rule).lhs;

    if let Some(shortcut) = leo.get(item.origin, lhs) {
        if passes_lookahead(grammar, shortcut.situation, lookahead) {
            sets[k].insert(grammar, shortcut.situation, shortcut.origin);
            leo.mark_bypassed(lhs, item.origin, k);
            for &(symbol, origin) in shortcut.elided.iter() {
                leo.mark_bypassed(symbol, origin, k);
            }
        }
        return;
    }

    let waiting: Vec<usize> = sets[item.origin]
        .transitions
        .get(&lhs)
        .cloned()
        .unwrap_or_default();
    for waiting_index in waiting {
        let waiting_item = sets[item.origin].items[waiting_index];
        let waiting_sit = grammar.situations().get(waiting_item.situation);
        if let Some(advanced) = grammar.situations().find_by_key(crate::situation::SituationKey {
            rule: waiting_sit.rule,
            dot: waiting_sit.dot + 1,
        }) {
            if passes_lookahead(grammar, advanced, lookahead) {
                sets[k].insert(grammar, advanced, waiting_item.origin);
            }
        }
    }
}

/// Core items of `sets[k+1]`: every item in `sets[k]` whose dot sits
/// before a terminal matching `token_code`, advanced past it.
/// `lookahead` is the terminal scanned immediately after the produced
/// set, used the same way as in `close`.
pub(crate) fn scan(grammar: &Grammar, sets: &[ItemSet], k: usize, token_code: i32, lookahead: Option<SymbolId>) -> ItemSet {
    let mut next = ItemSet::new();
    for &item in &sets[k].items {
        if let Some(symbol) = next_symbol(grammar, item.situation) {
            let sym = grammar.symbol(symbol);
            if sym.is_terminal() && sym.code() == Some(token_code) {
                let sit = grammar.situations().get(item.situation);
                if let Some(advanced) = grammar
                    .situations()
                    .find_by_key(crate::situation::SituationKey { rule: sit.rule, dot: sit.dot + 1 })
                {
                    if passes_lookahead(grammar, advanced, lookahead) {
                        next.insert(grammar, advanced, item.origin);
                    }
                }
            }
        }
    }
    next
}

/// Whether `sets[k]` contains a completed start-rule item spanning
/// back to position 0 — recognition succeeded iff this holds at the
/// final set.
pub(crate) fn has_accepting_item(grammar: &Grammar, set: &ItemSet, start: SymbolId) -> bool {
    set.items.iter().any(|item| {
        let sit = grammar.situations().get(item.situation);
        let rule = grammar.rule(sit.rule);
        rule.lhs == start && item.origin == 0 && is_complete(grammar, item.situation)
    })
}

pub(crate) fn completed_items<'a>(
    grammar: &'a Grammar,
    set: &'a ItemSet,
) -> impl Iterator<Item = Item> + 'a {
    set.items
        .iter()
        .copied()
        .filter(move |item| is_complete(grammar, item.situation))
}

/// Drives the recognizer over the whole token stream, invoking
/// `on_empty` whenever a scan produces an empty set (error recovery's
/// hook); returns the finished item sets, the exact token consumed
/// into each one (real or recovery-synthesized — never the raw host
/// buffer, since discarded tokens and reinsertions both make buffer
/// position diverge from set index), and the Leo table built along
/// the way (the forest builder needs it to recover spans a shortcut
/// bypassed), on success.
///
/// Two positions are tracked separately: `sets.len() - 1` is how many
/// tokens have actually been folded into the parse, while `input_pos`
/// is where to read next from `tokens`. They coincide until a token is
/// discarded by recovery, after which `input_pos` runs ahead of the
/// set count — a discarded token consumes no set of its own.
pub fn recognize(
    grammar: &Grammar,
    tokens: &mut TokenBuffer<'_>,
    mut on_empty: impl FnMut(&Grammar, &mut Vec<ItemSet>, &mut LeoTable, &mut Vec<ScannedToken>, &mut TokenBuffer<'_>, usize) -> Result<usize>,
) -> Result<(Vec<ItemSet>, Vec<ScannedToken>, LeoTable)> {
    let start = grammar
        .start_symbol()
        .expect("a finalized grammar always has a start symbol");
    let mut leo = LeoTable::new();
    let mut sets = vec![seed_initial_set(grammar, start)];
    let mut consumed: Vec<ScannedToken> = Vec::new();
    let lookahead = peek_lookahead(grammar, tokens, 0);
    close(grammar, &mut sets, 0, &mut leo, lookahead);

    let mut input_pos = 0;
    loop {
        let token = match tokens.get(input_pos) {
            Some(t) => t.clone(),
            None => break,
        };
        let k = sets.len() - 1;
        let lookahead = peek_lookahead(grammar, tokens, input_pos + 1);
        let next = scan(grammar, &sets, k, token.code, lookahead);
        if next.items.is_empty() {
            input_pos = on_empty(grammar, &mut sets, &mut leo, &mut consumed, tokens, input_pos)?;
            continue;
        }
        sets.push(next);
        consumed.push(token);
        close(grammar, &mut sets, k + 1, &mut leo, lookahead);
        input_pos += 1;
    }

    let last = sets.last().expect("sets always has at least S[0]");
    if !has_accepting_item(grammar, last, start) {
        return Err(Error::SyntaxError { position: input_pos });
    }
    Ok((sets, consumed, leo))
}
