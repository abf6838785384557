//! Rule storage and translation templates.
//!
//! Invariants: LHS is a nonterminal, every RHS symbol is interned in
//! the same grammar, rule-ids are assigned in insertion order from 0.
//! An LHS symbol plus an RHS symbol vector plus a tail carrying the
//! semantic action is a familiar production shape; here the tail is
//! scaled down from "action string plus predicate" to an abstract-node
//! translation template.

use crate::error::{Error, Result};
use crate::symbol::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// One element of a rule's translation template: a
/// literal constant that passes straight through, or a reference to
/// the decomposed child at `rhs[position]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationItem {
    Constant(String),
    Position(usize),
}

/// The user-supplied mapping from a rule's RHS to an abstract-tree
/// node. `anode_name` absent
/// means pass-through: the forest builder projects the single
/// surviving child instead of building a new abstract node.
#[derive(Debug, Clone, Default)]
pub struct Translation {
    pub anode_name: Option<String>,
    pub items: Vec<TranslationItem>,
    pub cost: u32,
}

impl Translation {
    pub fn pass_through() -> Self {
        Self {
            anode_name: None,
            items: vec![TranslationItem::Position(0)],
            cost: 0,
        }
    }

    pub fn anode(name: impl Into<String>, positions: impl IntoIterator<Item = usize>, cost: u32) -> Self {
        Self {
            anode_name: Some(name.into()),
            items: positions.into_iter().map(TranslationItem::Position).collect(),
            cost,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
    pub translation: Translation,
}

impl Rule {
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// Rule storage: `add_rule` appends, validating that
/// every translation position reference lands within the RHS.
/// Validating that RHS symbols are interned in *this* grammar is the
/// caller's (`Grammar::add_rule`'s) job, since only the grammar knows
/// its own symbol table's extent.
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn rules_for_lhs(&self, lhs: SymbolId) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.lhs == lhs)
    }

    pub fn add(&mut self, lhs: SymbolId, rhs: Vec<SymbolId>, translation: Translation) -> Result<RuleId> {
        for item in &translation.items {
            if let TranslationItem::Position(p) = item {
                if *p >= rhs.len() {
                    return Err(Error::InvalidValue {
                        what: format!(
                            "translation references rhs position {p} but rhs has only {} symbols",
                            rhs.len()
                        ),
                    });
                }
            }
        }
        let id = RuleId(self.rules.len() as u32);
        log::trace!("added rule {id} with {} rhs symbols", rhs.len());
        self.rules.push(Rule {
            id,
            lhs,
            rhs,
            translation,
        });
        Ok(id)
    }
}
