//! Interned terminals/nonterminals.
//!
//! Dense `ident`s assigned on insertion, `add_token`/`is_known_*`
//! style accessors, generalized from "tokens known to a bootstrap
//! grammar-description parser" to "symbols interned by a host
//! building a grammar at runtime".

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bit set of terminal ids, used for FIRST/FOLLOW.
/// Dense and small enough in practice (terminal counts are usually in
/// the hundreds) that a flat `Vec<bool>` beats the bookkeeping of a
/// real bitset; `union_from` reports whether anything changed so
/// analysis.rs can drive its fixed points off it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalSet {
    bits: Vec<bool>,
}

impl TerminalSet {
    pub fn with_capacity(terminal_count: usize) -> Self {
        Self {
            bits: vec![false; terminal_count],
        }
    }

    pub fn insert(&mut self, terminal: SymbolId) -> bool {
        let i = terminal.index();
        if i >= self.bits.len() {
            self.bits.resize(i + 1, false);
        }
        let changed = !self.bits[i];
        self.bits[i] = true;
        changed
    }

    pub fn contains(&self, terminal: SymbolId) -> bool {
        self.bits.get(terminal.index()).copied().unwrap_or(false)
    }

    /// Merge `other` into `self`, returning whether `self` grew.
    /// Used by the FIRST/FOLLOW fixed points in analysis.rs.
    pub fn union_from(&mut self, other: &TerminalSet) -> bool {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), false);
        }
        let mut changed = false;
        for (i, &bit) in other.bits.iter().enumerate() {
            if bit && !self.bits[i] {
                self.bits[i] = true;
                changed = true;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| SymbolId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal { code: i32 },
    NonTerminal,
}

/// A single interned symbol. Owned by the grammar for
/// the grammar's whole lifetime; the flags here (`empty_p`,
/// `access_p`, `derivation_p`) and the FIRST/FOLLOW sets are filled in
/// by `analysis::analyze` during `Grammar::finalize` and are immutable
/// afterward.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub repr: String,
    pub kind: SymbolKind,
    pub empty_p: bool,
    pub access_p: bool,
    pub derivation_p: bool,
    pub first: TerminalSet,
    pub follow: TerminalSet,
}

impl Symbol {
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal { .. })
    }

    pub fn is_nonterminal(&self) -> bool {
        !self.is_terminal()
    }

    pub fn code(&self) -> Option<i32> {
        match self.kind {
            SymbolKind::Terminal { code } => Some(code),
            SymbolKind::NonTerminal => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

/// The symbol table: `intern_terminal` fails if the
/// name or code is already bound to a *different* symbol;
/// `intern_nonterminal` is idempotent.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    by_code: HashMap<i32, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_by_code(&self, code: i32) -> Option<SymbolId> {
        self.by_code.get(&code).copied()
    }

    pub fn intern_terminal(&mut self, repr: &str, code: i32) -> Result<SymbolId> {
        if let Some(&existing) = self.by_name.get(repr) {
            let symbol = &self.symbols[existing.index()];
            return if symbol.is_terminal() && symbol.code() == Some(code) {
                Ok(existing)
            } else {
                Err(Error::InvalidValue {
                    what: format!("\"{repr}\" is already bound to a different symbol"),
                })
            };
        }
        if let Some(&existing) = self.by_code.get(&code) {
            return Err(Error::RepeatedTerminalCode {
                code,
                existing: self.symbols[existing.index()].repr.clone(),
            });
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            repr: repr.to_string(),
            kind: SymbolKind::Terminal { code },
            empty_p: false,
            access_p: false,
            derivation_p: true,
            first: TerminalSet::default(),
            follow: TerminalSet::default(),
        });
        self.by_name.insert(repr.to_string(), id);
        self.by_code.insert(code, id);
        log::trace!("interned terminal {repr:?} (code {code}) as {id}");
        Ok(id)
    }

    pub fn intern_nonterminal(&mut self, repr: &str) -> SymbolId {
        if let Some(&existing) = self.by_name.get(repr) {
            return existing;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            repr: repr.to_string(),
            kind: SymbolKind::NonTerminal,
            empty_p: false,
            access_p: false,
            derivation_p: false,
            first: TerminalSet::default(),
            follow: TerminalSet::default(),
        });
        self.by_name.insert(repr.to_string(), id);
        log::trace!("interned nonterminal {repr:?} as {id}");
        id
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_terminal_twice_returns_same_id() {
        let mut table = SymbolTable::new();
        let a = table.intern_terminal("+", 1).unwrap();
        let b = table.intern_terminal("+", 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn interning_same_nonterminal_twice_returns_same_id() {
        let mut table = SymbolTable::new();
        let a = table.intern_nonterminal("Expr");
        let b = table.intern_nonterminal("Expr");
        assert_eq!(a, b);
    }

    #[test]
    fn repeated_terminal_code_is_rejected() {
        let mut table = SymbolTable::new();
        table.intern_terminal("+", 1).unwrap();
        let err = table.intern_terminal("-", 1).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::RepeatedTerminalCode);
    }

    #[test]
    fn reusing_a_name_with_a_different_code_is_invalid() {
        let mut table = SymbolTable::new();
        table.intern_terminal("+", 1).unwrap();
        let err = table.intern_terminal("+", 2).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidValue);
    }
}
