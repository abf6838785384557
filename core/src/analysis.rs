//! Grammar analyzer: nullable/reachable/derivation/loop analyses,
//! FIRST/FOLLOW, and situation enumeration.
//!
//! A grammar-table generator for a fixed grammar class typically
//! computes FIRST/FOLLOW once at table-build time via a
//! fixed-point-over-a-worklist, and rejects cyclic unit productions
//! outright instead of reporting them to the embedder. This module
//! keeps that fixed-point idiom but adds nullable/reachable/
//! derivation/loop passes so a grammar that isn't restricted to
//! LALR(1) can still be diagnosed instead of rejected.

use crate::config::LookaheadLevel;
use crate::error::{Error, Result};
use crate::rule::RuleTable;
use crate::situation::SituationTable;
use crate::symbol::{SymbolId, SymbolTable, TerminalSet};

/// The results of `analyze` that aren't stored directly on each
/// `Symbol` (those get `empty_p`/`access_p`/`derivation_p`/`first`/
/// `follow` mutated in place): diagnostics about symbols that are
/// unreachable, unproductive, or involved in a derivation loop.
#[derive(Debug, Default, Clone)]
pub struct GrammarAnalysis {
    pub unreachable: Vec<SymbolId>,
    pub unproductive: Vec<SymbolId>,
    pub looping: Vec<SymbolId>,
}

/// Step 1: `empty_p(A)` iff some rule `A -> α` has
/// every symbol in `α` nullable. Fixed point over rules.
fn compute_nullable(symbols: &mut SymbolTable, rules: &RuleTable) {
    loop {
        let mut changed = false;
        for rule in rules.iter() {
            if symbols.get(rule.lhs).empty_p {
                continue;
            }
            let all_nullable = rule.rhs.iter().all(|&s| symbols.get(s).empty_p);
            if all_nullable {
                symbols.get_mut(rule.lhs).empty_p = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Step 2: BFS from the start symbol through rule
/// RHSs, marking `access_p`.
fn compute_reachable(symbols: &mut SymbolTable, rules: &RuleTable, start: SymbolId) {
    let mut worklist = vec![start];
    symbols.get_mut(start).access_p = true;
    while let Some(symbol) = worklist.pop() {
        for rule in rules.rules_for_lhs(symbol) {
            for &rhs_symbol in &rule.rhs {
                if !symbols.get(rhs_symbol).access_p {
                    symbols.get_mut(rhs_symbol).access_p = true;
                    worklist.push(rhs_symbol);
                }
            }
        }
    }
}

/// Step 3: a nonterminal derives terminals iff some
/// rule `A -> α` has every symbol in `α` derivable (terminals are
/// trivially derivable, hence `derivation_p = true` at interning).
fn compute_derivation(symbols: &mut SymbolTable, rules: &RuleTable) {
    loop {
        let mut changed = false;
        for rule in rules.iter() {
            if symbols.get(rule.lhs).derivation_p {
                continue;
            }
            let all_derivable = rule.rhs.iter().all(|&s| symbols.get(s).derivation_p);
            if all_derivable {
                symbols.get_mut(rule.lhs).derivation_p = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Step 4: detect nonterminals `A` with a nontrivial
/// derivation `A ⇒+ A`. A rule `A -> α` contributes a "unit edge"
/// `A -> B` when every symbol of `α` other than a single nonterminal
/// `B` is nullable — i.e. `α` can shrink, by discarding nullable
/// symbols, to exactly `B`. Cycles in the resulting graph (including
/// self-loops, e.g. `A -> A`) are the loops this flags.
fn detect_loops(symbols: &SymbolTable, rules: &RuleTable) -> Vec<SymbolId> {
    let mut edges: Vec<Vec<SymbolId>> = vec![Vec::new(); symbols.len()];
    for rule in rules.iter() {
        let mut sole_nonterminal: Option<SymbolId> = None;
        let mut ok = true;
        for &symbol in &rule.rhs {
            let sym = symbols.get(symbol);
            if sym.is_nonterminal() && !sym.empty_p {
                if sole_nonterminal.is_some() {
                    ok = false;
                    break;
                }
                sole_nonterminal = Some(symbol);
            } else if !sym.empty_p {
                // A non-nullable terminal in the rhs means this rule
                // can never reduce to a single nonterminal.
                ok = false;
                break;
            }
        }
        if ok {
            if let Some(b) = sole_nonterminal {
                edges[rule.lhs.index()].push(b);
            }
        }
    }

    let n = symbols.len();
    let mut looping = Vec::new();
    let mut state = vec![0u8; n]; // 0 = unvisited, 1 = on stack, 2 = done
    let mut stack = Vec::new();

    fn visit(
        node: usize,
        edges: &[Vec<SymbolId>],
        state: &mut [u8],
        stack: &mut Vec<usize>,
        looping: &mut Vec<SymbolId>,
    ) {
        state[node] = 1;
        stack.push(node);
        for &next in &edges[node] {
            let next = next.index();
            if state[next] == 1 {
                // found a cycle: everything from `next` to the top of
                // the stack participates in a derivation loop.
                if let Some(pos) = stack.iter().position(|&s| s == next) {
                    for &s in &stack[pos..] {
                        let id = SymbolId(s as u32);
                        if !looping.contains(&id) {
                            looping.push(id);
                        }
                    }
                }
            } else if state[next] == 0 {
                visit(next, edges, state, stack, looping);
            }
        }
        stack.pop();
        state[node] = 2;
    }

    for start in 0..n {
        if state[start] == 0 {
            visit(start, &edges, &mut state, &mut stack, &mut looping);
        }
    }
    looping
}

/// Step 6: standard fixed-point FIRST/FOLLOW,
/// computed even when lookahead is disabled so a `Static`/`Dynamic`
/// level can be turned on later without re-running the whole
/// analysis — cheap relative to the rest of `finalize`.
fn compute_first(symbols: &mut SymbolTable, rules: &RuleTable) {
    loop {
        let mut changed = false;
        for rule in rules.iter() {
            let mut rhs_nullable_so_far = true;
            let mut additions: Vec<SymbolId> = Vec::new();
            for &symbol in &rule.rhs {
                let sym = symbols.get(symbol);
                if sym.is_terminal() {
                    additions.push(symbol);
                    rhs_nullable_so_far = false;
                    break;
                } else {
                    let first_of_symbol: Vec<SymbolId> = sym.first.iter().collect();
                    additions.extend(first_of_symbol);
                    if !sym.empty_p {
                        rhs_nullable_so_far = false;
                        break;
                    }
                }
            }
            let _ = rhs_nullable_so_far;
            let lhs_first = &mut symbols.get_mut(rule.lhs).first;
            for addition in additions {
                if lhs_first.insert(addition) {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

fn compute_follow(symbols: &mut SymbolTable, rules: &RuleTable, start: SymbolId) {
    // Conventionally FOLLOW(start) always contains the end marker;
    // since the core doesn't reify an end-marker symbol (the host's
    // token stream simply ends), we leave that implicit and only
    // track FOLLOW sets derived from grammar context.
    let _ = start;
    loop {
        let mut changed = false;
        for rule in rules.iter() {
            for (i, &symbol) in rule.rhs.iter().enumerate() {
                if symbols.get(symbol).is_terminal() {
                    continue;
                }
                let rest = &rule.rhs[i + 1..];
                let mut rest_nullable = true;
                let mut additions: Vec<SymbolId> = Vec::new();
                for &next in rest {
                    let next_sym = symbols.get(next);
                    if next_sym.is_terminal() {
                        additions.push(next);
                        rest_nullable = false;
                        break;
                    } else {
                        additions.extend(next_sym.first.iter());
                        if !next_sym.empty_p {
                            rest_nullable = false;
                            break;
                        }
                    }
                }
                if rest_nullable {
                    let lhs_follow: Vec<SymbolId> = symbols.get(rule.lhs).follow.iter().collect();
                    additions.extend(lhs_follow);
                }
                let follow = &mut symbols.get_mut(symbol).follow;
                for addition in additions {
                    if follow.insert(addition) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// Runs the full analysis pipeline. `UNDEFINED_SYMBOL` is fatal;
/// unreachable/unproductive symbols are recorded for the caller to
/// inspect, not rejected, since a grammar with dead productions is
/// still well-formed. `LOOPS_GRAMMAR` is fatal unless `loops_enabled`.
pub fn analyze(
    symbols: &mut SymbolTable,
    rules: &RuleTable,
    start: SymbolId,
    loops_enabled: bool,
) -> Result<GrammarAnalysis> {
    // Step 5 (partial, "undefined"): every nonterminal that appears
    // as an LHS or RHS symbol must have at least one production, or
    // it can never be recognized.
    for symbol in symbols.iter().filter(|s| s.is_nonterminal()) {
        if rules.rules_for_lhs(symbol.id).next().is_none() {
            return Err(Error::UndefinedSymbol {
                name: symbol.repr.clone(),
            });
        }
    }

    compute_nullable(symbols, rules);
    compute_reachable(symbols, rules, start);
    compute_derivation(symbols, rules);
    compute_first(symbols, rules);
    compute_follow(symbols, rules, start);

    let looping = detect_loops(symbols, rules);
    if !looping.is_empty() && !loops_enabled {
        let symbol = &symbols.get(looping[0]).repr;
        return Err(Error::LoopsGrammar {
            symbol: symbol.clone(),
        });
    }

    let unreachable: Vec<SymbolId> = symbols
        .iter()
        .filter(|s| !s.access_p)
        .map(|s| s.id)
        .collect();
    let unproductive: Vec<SymbolId> = symbols
        .iter()
        .filter(|s| s.is_nonterminal() && !s.derivation_p)
        .map(|s| s.id)
        .collect();

    if !unreachable.is_empty() {
        log::warn!("{} unreachable symbol(s) in grammar", unreachable.len());
    }
    if !unproductive.is_empty() {
        log::warn!("{} unproductive nonterminal(s) in grammar", unproductive.len());
    }

    Ok(GrammarAnalysis {
        unreachable,
        unproductive,
        looping,
    })
}

/// Step 7: for each rule and each dot position
/// `0..=|rhs|`, create a situation. With lookahead enabled, each
/// situation is additionally parameterized by a *static*
/// FOLLOW-derived lookahead set — FOLLOW(lhs) of the rule the
/// situation belongs to. (`Dynamic` lookahead instead recomputes the
/// deterministic-chain predicate per parse; see leo.rs.)
pub fn enumerate_situations(
    rules: &RuleTable,
    symbols: &SymbolTable,
    _analysis: &GrammarAnalysis,
    lookahead: LookaheadLevel,
    situations: &mut SituationTable,
) {
    for rule in rules.iter() {
        let static_lookahead = if matches!(lookahead, LookaheadLevel::Static | LookaheadLevel::Dynamic) {
            Some(symbols.get(rule.lhs).follow.clone())
        } else {
            None
        };
        for dot in 0..=rule.rhs.len() {
            situations.intern(rule.id, dot, static_lookahead.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Translation;

    fn build(rules_spec: &[(&str, &[&str])]) -> (SymbolTable, RuleTable, SymbolId) {
        let mut symbols = SymbolTable::new();
        let mut rules = RuleTable::new();
        let mut start = None;
        for (lhs_name, rhs_names) in rules_spec {
            let lhs = symbols.intern_nonterminal(lhs_name);
            if start.is_none() {
                start = Some(lhs);
            }
            let mut rhs = Vec::new();
            for name in *rhs_names {
                let id = if let Some(existing) = symbols.lookup(name) {
                    existing
                } else if name.starts_with('\'') {
                    symbols.intern_terminal(name, rhs.len() as i32 + 100).unwrap()
                } else {
                    symbols.intern_nonterminal(name)
                };
                rhs.push(id);
            }
            rules.add(lhs, rhs, Translation::pass_through()).unwrap();
        }
        (symbols, rules, start.unwrap())
    }

    #[test]
    fn nullable_propagates_through_epsilon_chain() {
        let (mut symbols, rules, start) = build(&[("S", &["A", "B"]), ("A", &[]), ("B", &["'b'"])]);
        compute_nullable(&mut symbols, &rules);
        let a = symbols.lookup("A").unwrap();
        let s = symbols.lookup("S").unwrap();
        assert!(symbols.get(a).empty_p);
        assert!(!symbols.get(s).empty_p);
        let _ = start;
    }

    #[test]
    fn self_loop_is_detected() {
        let (symbols, rules, _start) = build(&[("A", &["A"]), ("A", &["'a'"])]);
        let looping = detect_loops(&symbols, &rules);
        let a = symbols.lookup("A").unwrap();
        assert!(looping.contains(&a));
    }

    #[test]
    fn non_looping_grammar_reports_no_loops() {
        let (symbols, rules, _start) = build(&[("E", &["E", "'+'", "T"]), ("E", &["T"]), ("T", &["'t'"])]);
        let looping = detect_loops(&symbols, &rules);
        assert!(looping.is_empty());
    }

    #[test]
    fn unreachable_symbol_is_flagged_not_rejected() {
        let (mut symbols, rules, start) = build(&[("S", &["'s'"]), ("Dead", &["'d'"])]);
        let result = analyze(&mut symbols, &rules, start, false).unwrap();
        let dead = symbols.lookup("Dead").unwrap();
        assert!(result.unreachable.contains(&dead));
    }

    #[test]
    fn undefined_nonterminal_is_fatal() {
        let mut symbols = SymbolTable::new();
        let mut rules = RuleTable::new();
        let s = symbols.intern_nonterminal("S");
        let undefined = symbols.intern_nonterminal("Undefined");
        rules.add(s, vec![undefined], Translation::pass_through()).unwrap();
        let err = analyze(&mut symbols, &rules, s, false).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::UndefinedSymbol);
    }
}
