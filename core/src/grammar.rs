//! The grammar handle: symbol/rule tables, configuration, and the
//! finalize step that runs the grammar analyses.
//!
//! A `SymbolTable` owner that exposes `add_token`/`add_rule`-shaped
//! mutators plus an error/warning sink is a familiar shape for a
//! grammar builder. Here the mutators are the public API surface
//! (`create_grammar`, `intern_terminal`, `intern_nonterminal`,
//! `add_rule`, `read_grammar`), and the error sink is the
//! `ErrorContext` from error.rs instead of `eprintln!`-ing straight
//! to stderr.

use crate::analysis::{self, GrammarAnalysis};
use crate::config::ParserOptions;
use crate::error::{Error, ErrorCode, ErrorContext, Result};
use crate::rule::{Rule, RuleId, RuleTable, Translation};
use crate::situation::SituationTable;
use crate::symbol::{Symbol, SymbolId, SymbolTable};

/// One rule of the grammar as described to `read_grammar`: an LHS name, an RHS of symbol names, and a translation.
pub struct RuleDescription<'a> {
    pub lhs: &'a str,
    pub rhs: &'a [&'a str],
    pub anode_name: Option<&'a str>,
    pub anode_cost: u32,
    pub translation_positions: &'a [usize],
}

/// A grammar being built or finalized.
///
/// Before `finalize`, `symbols`/`rules` are append-only and
/// `analysis`/`situations` are absent. After `finalize` they are
/// immutable and a parse may run. This split mirrors:
/// "the grammar's long-lived pool is... append-only during grammar
/// building and read-only thereafter."
pub struct Grammar {
    pub(crate) symbols: SymbolTable,
    pub(crate) rules: RuleTable,
    pub(crate) options: ParserOptions,
    pub(crate) start_symbol: Option<SymbolId>,
    pub(crate) analysis: Option<GrammarAnalysis>,
    pub(crate) situations: SituationTable,
    pub(crate) error_context: ErrorContext,
    finalized: bool,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    /// Starts an empty grammar with no symbols, rules, or start symbol.
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            rules: RuleTable::new(),
            options: ParserOptions::default(),
            start_symbol: None,
            analysis: None,
            situations: SituationTable::new(),
            error_context: ErrorContext::new(),
            finalized: false,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ParserOptions {
        &mut self.options
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.error_context.last_error()
    }

    pub fn last_error_code(&self) -> Option<ErrorCode> {
        self.error_context.last_error_code()
    }

    pub fn last_error_message(&self) -> Option<String> {
        self.error_context.last_error_message()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id)
    }

    pub fn symbol_named(&self, name: &str) -> Option<SymbolId> {
        self.symbols.lookup(name)
    }

    /// The terminal interned with this host token code, if any — used
    /// to resolve a raw scanned code into a `SymbolId` for lookahead
    /// checks against a situation's FOLLOW set.
    pub fn symbol_for_code(&self, code: i32) -> Option<SymbolId> {
        self.symbols.lookup_by_code(code)
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        self.rules.get(id)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn analysis(&self) -> Option<&GrammarAnalysis> {
        self.analysis.as_ref()
    }

    pub fn situations(&self) -> &SituationTable {
        &self.situations
    }

    pub fn start_symbol(&self) -> Option<SymbolId> {
        self.start_symbol
    }

    /// The nonterminal on the LHS of the first rule added becomes the
    /// start symbol: the first production in the grammar description
    /// is the goal production, generalized away from requiring a
    /// specific augmenting rule.
    fn ensure_start_symbol(&mut self, lhs: SymbolId) {
        if self.start_symbol.is_none() {
            self.start_symbol = Some(lhs);
        }
    }

    pub fn intern_terminal(&mut self, repr: &str, code: i32) -> Result<SymbolId> {
        self.error_context.guard(|| {
            if self.finalized {
                return Err(Error::InvalidValue {
                    what: "cannot intern a terminal after finalize".to_string(),
                });
            }
            self.symbols.intern_terminal(repr, code)
        })
    }

    pub fn intern_nonterminal(&mut self, repr: &str) -> Result<SymbolId> {
        self.error_context.guard(|| {
            if self.finalized {
                return Err(Error::InvalidValue {
                    what: "cannot intern a nonterminal after finalize".to_string(),
                });
            }
            Ok(self.symbols.intern_nonterminal(repr))
        })
    }

    /// `add_rule(lhs, rhs[], translation) -> rule-id`.
    /// Validates that `lhs` is a nonterminal and that every `rhs`
    /// symbol is interned in this grammar (a foreign `SymbolId` would
    /// silently alias an unrelated symbol otherwise, since ids are
    /// dense per-grammar integers).
    pub fn add_rule(&mut self, lhs: SymbolId, rhs: &[SymbolId], translation: Translation) -> Result<RuleId> {
        self.error_context.guard(|| {
            if self.finalized {
                return Err(Error::InvalidValue {
                    what: "cannot add a rule after finalize".to_string(),
                });
            }
            if lhs.index() >= self.symbols.len() || self.symbols.get(lhs).is_terminal() {
                return Err(Error::UndefinedSymbol {
                    name: format!("lhs symbol {lhs} is not a nonterminal of this grammar"),
                });
            }
            for &symbol in rhs {
                if symbol.index() >= self.symbols.len() {
                    return Err(Error::UndefinedSymbol {
                        name: format!("rhs symbol {symbol} is not interned in this grammar"),
                    });
                }
            }
            let id = self.rules.add(lhs, rhs.to_vec(), translation)?;
            self.ensure_start_symbol(lhs);
            Ok(id)
        })
    }

    /// Drains two host callbacks, each returning `None`
    /// to signal end-of-input. `strict` rejects rules referencing a
    /// symbol name no `read_terminal_cb`/earlier `read_rule_cb` call
    /// has introduced; when `false`, unseen RHS names are silently
    /// interned as fresh nonterminals (useful for grammars where
    /// nonterminals are only ever mentioned as RHS references before
    /// their own rule appears).
    pub fn read_grammar<'a>(
        &mut self,
        strict: bool,
        mut read_terminal: impl FnMut() -> Option<(&'a str, i32)>,
        mut read_rule: impl FnMut() -> Option<RuleDescription<'a>>,
    ) -> Result<()> {
        self.error_context.guard(|| {
            while let Some((name, code)) = read_terminal() {
                self.symbols.intern_terminal(name, code)?;
            }
            while let Some(desc) = read_rule() {
                let lhs = self.symbols.intern_nonterminal(desc.lhs);
                let mut rhs = Vec::with_capacity(desc.rhs.len());
                for name in desc.rhs {
                    let symbol = match self.symbols.lookup(name) {
                        Some(id) => id,
                        None if strict => {
                            return Err(Error::UndefinedSymbol {
                                name: (*name).to_string(),
                            })
                        }
                        None => self.symbols.intern_nonterminal(name),
                    };
                    rhs.push(symbol);
                }
                let translation = Translation {
                    anode_name: desc.anode_name.map(str::to_string),
                    items: desc
                        .translation_positions
                        .iter()
                        .map(|&p| crate::rule::TranslationItem::Position(p))
                        .collect(),
                    cost: desc.anode_cost,
                };
                let id = self.rules.add(lhs, rhs, translation)?;
                let _ = id;
                self.ensure_start_symbol(lhs);
            }
            Ok(())
        })
    }

    /// Runs nullable/reachable/derivation/loop analysis and enumerates
    /// situations for every rule. Must be called exactly once, after
    /// the last rule is added and before the first `parse`.
    pub fn finalize(&mut self) -> Result<()> {
        self.error_context.guard(|| {
            if self.finalized {
                return Ok(());
            }
            let start_symbol = self.start_symbol.ok_or_else(|| Error::InvalidValue {
                what: "grammar has no rules; cannot determine a start symbol".to_string(),
            })?;
            let result = analysis::analyze(&mut self.symbols, &self.rules, start_symbol, self.options.loops_enabled)?;
            analysis::enumerate_situations(&self.rules, &self.symbols, &result, self.options.lookahead, &mut self.situations);
            self.analysis = Some(result);
            self.finalized = true;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic_grammar() -> Grammar {
        // E -> E '+' T | T ; T -> T '*' F | F ; F -> '(' E ')' | id
        let mut g = Grammar::new();
        let plus = g.intern_terminal("+", 1).unwrap();
        let star = g.intern_terminal("*", 2).unwrap();
        let lpar = g.intern_terminal("(", 3).unwrap();
        let rpar = g.intern_terminal(")", 4).unwrap();
        let id = g.intern_terminal("id", 5).unwrap();
        let e = g.intern_nonterminal("E").unwrap();
        let t = g.intern_nonterminal("T").unwrap();
        let f = g.intern_nonterminal("F").unwrap();
        g.add_rule(e, &[e, plus, t], Translation::anode("Add", [0, 2], 1)).unwrap();
        g.add_rule(e, &[t], Translation::pass_through()).unwrap();
        g.add_rule(t, &[t, star, f], Translation::anode("Mul", [0, 2], 1)).unwrap();
        g.add_rule(t, &[f], Translation::pass_through()).unwrap();
        g.add_rule(f, &[lpar, e, rpar], Translation::anode("Paren", [1], 0)).unwrap();
        g.add_rule(f, &[id], Translation::pass_through()).unwrap();
        g
    }

    #[test]
    fn add_rule_before_interning_lhs_is_rejected() {
        let mut g = Grammar::new();
        let bogus = SymbolId(99);
        let err = g.add_rule(bogus, &[], Translation::pass_through()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UndefinedSymbol);
    }

    #[test]
    fn translation_position_out_of_range_is_rejected() {
        let mut g = Grammar::new();
        let a = g.intern_nonterminal("A").unwrap();
        let b = g.intern_terminal("b", 1).unwrap();
        let err = g
            .add_rule(a, &[b], Translation::anode("X", [5], 0))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
    }

    #[test]
    fn finalize_computes_first_start_symbol_as_start() {
        let mut g = arithmetic_grammar();
        g.finalize().unwrap();
        let e = g.symbol_named("E").unwrap();
        assert_eq!(g.start_symbol(), Some(e));
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut g = arithmetic_grammar();
        g.finalize().unwrap();
        g.finalize().unwrap();
        assert!(g.is_finalized());
    }
}
