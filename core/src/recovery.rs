//! Error recovery: skip/resynchronize when a scan produces an empty
//! item set.
//!
//! Two dimensions are tried together, per §4.9: discarding up to
//! `max_error_tokens` bad input tokens, and inserting up to
//! `max_recovery_insert` synthetic ones (a terminal the failed set was
//! already waiting on). Combinations are tried in order of increasing
//! total `discard + insert` cost, so the first one that resynchronizes
//! is a minimum-cost pair. An inserted token carries
//! [`SyntheticAttribute`] rather than a host-supplied value, since
//! nothing real was scanned for it.

use std::rc::Rc;

use crate::config::ParserOptions;
use crate::engine::{self, ItemSet};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::leo::LeoTable;
use crate::symbol::SymbolId;
use crate::token::{Attribute, ScannedToken, SyntheticAttribute, TokenBuffer};

/// One resynchronization: which position failed, how many input
/// tokens were discarded, and how many synthetic tokens were inserted
/// to regain sync.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryEvent {
    pub position: usize,
    pub discarded: u32,
    pub inserted: u32,
}

/// Called from [`crate::engine::recognize`] whenever a scan at `k`
/// produces an empty set. Tries every `(discard, insert)` pair with
/// `discard <= max_error_tokens` and `insert <= max_recovery_insert`,
/// in order of increasing `discard + insert`, so the first pair that
/// resynchronizes — confirmed once `recovery_match` further tokens
/// scan cleanly, or input ends — is accepted at minimum total cost.
pub fn attempt(
    grammar: &Grammar,
    sets: &mut Vec<ItemSet>,
    leo: &mut LeoTable,
    consumed: &mut Vec<ScannedToken>,
    tokens: &mut TokenBuffer<'_>,
    k: usize,
    options: &ParserOptions,
    events: &mut Vec<RecoveryEvent>,
) -> Result<usize> {
    if !options.error_recovery_enabled {
        return Err(Error::SyntaxError { position: k });
    }

    let max_discard = options.max_error_tokens as usize;
    let max_insert = options.max_recovery_insert as usize;
    for total in 0..=(max_discard + max_insert) {
        for discard in 0..=total.min(max_discard) {
            let insert = total - discard;
            if insert > max_insert {
                continue;
            }
            if let Some(resumed_at) = try_resync(grammar, sets, leo, consumed, tokens, k, discard, insert, options.recovery_match) {
                log::warn!("recovered from syntax error at token {k} by discarding {discard} and inserting {insert} token(s)");
                events.push(RecoveryEvent {
                    position: k,
                    discarded: discard as u32,
                    inserted: insert as u32,
                });
                return Ok(resumed_at);
            }
        }
    }
    Err(Error::SyntaxError { position: k })
}

/// The terminal some item in `set` is waiting on, lowest `SymbolId`
/// first for determinism — the candidate to synthesize when inserting
/// a token to bridge past a gap in the input.
fn expected_terminal(grammar: &Grammar, set: &ItemSet) -> Option<SymbolId> {
    set.transitions
        .keys()
        .copied()
        .filter(|&symbol| grammar.symbol(symbol).is_terminal())
        .min_by_key(|s| s.0)
}

/// Try discarding `discard` tokens starting at `k`, then inserting
/// `insert` synthetic ones the failed set was waiting on, then
/// confirming with up to `match_len` further real tokens. On success,
/// returns the raw buffer position to resume real scanning from; on
/// failure rolls `sets`/`leo`/`consumed` back to their state on entry.
fn try_resync(
    grammar: &Grammar,
    sets: &mut Vec<ItemSet>,
    leo: &mut LeoTable,
    consumed: &mut Vec<ScannedToken>,
    tokens: &mut TokenBuffer<'_>,
    k: usize,
    discard: usize,
    insert: usize,
    match_len: u32,
) -> Option<usize> {
    let checkpoint_sets = sets.len();
    let checkpoint_consumed = consumed.len();
    let leo_backup = leo.clone();

    for _ in 0..insert {
        let cur = sets.len() - 1;
        let symbol = match expected_terminal(grammar, &sets[cur]) {
            Some(s) => s,
            None => {
                sets.truncate(checkpoint_sets);
                consumed.truncate(checkpoint_consumed);
                *leo = leo_backup;
                return None;
            }
        };
        let code = grammar.symbol(symbol).code().expect("expected_terminal only returns terminals");
        let synthetic = ScannedToken {
            code,
            attribute: Rc::new(SyntheticAttribute) as Attribute,
        };
        let lookahead = engine::peek_lookahead(grammar, tokens, k + discard);
        let next = engine::scan(grammar, sets, cur, code, lookahead);
        if next.items.is_empty() {
            sets.truncate(checkpoint_sets);
            consumed.truncate(checkpoint_consumed);
            *leo = leo_backup;
            return None;
        }
        sets.push(next);
        consumed.push(synthetic);
        engine::close(grammar, sets, cur + 1, leo, lookahead);
    }

    let mut pos = k + discard;
    let mut matched = 0u32;
    while matched < match_len {
        let token = match tokens.get(pos) {
            Some(t) => t.clone(),
            None => break, // input ended during confirmation: treat as resynced
        };
        let cur = sets.len() - 1;
        let lookahead = engine::peek_lookahead(grammar, tokens, pos + 1);
        let next = engine::scan(grammar, sets, cur, token.code, lookahead);
        if next.items.is_empty() {
            sets.truncate(checkpoint_sets);
            consumed.truncate(checkpoint_consumed);
            *leo = leo_backup;
            return None;
        }
        sets.push(next);
        consumed.push(token);
        engine::close(grammar, sets, cur + 1, leo, lookahead);
        pos += 1;
        matched += 1;
    }
    Some(pos)
}
