//! Shared-packed parse forest construction: backward traversal from
//! the accepting item, content-addressed node sharing, cost-based
//! disambiguation, and translation-template projection.

use std::collections::{HashMap, HashSet};

use crate::alloc::{Arena, Id};
use crate::config::AmbiguityPolicy;
use crate::engine::{self, ItemSet};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::leo::LeoTable;
use crate::rule::{Rule, RuleId, TranslationItem};
use crate::symbol::SymbolId;
use crate::token::{Attribute, ScannedToken};

/// A node in the forest. Identity for `Abstract` nodes is
/// `(rule, span, children)` — the content-addressed key duplicate
/// constructions collapse onto the same id.
#[derive(Debug, Clone)]
pub enum ForestNode {
    Leaf {
        terminal: SymbolId,
        attribute: Attribute,
    },
    /// A translation constant, materialized once per occurrence (no
    /// rhs position to dedup against).
    Constant(String),
    Abstract {
        name: Option<String>,
        rule: RuleId,
        span: (usize, usize),
        cost: u32,
        children: Vec<Id>,
    },
    /// Present only when the grammar is genuinely ambiguous at this
    /// span (multiple minimum-cost or all-candidates policy), or when
    /// a derivation loop is represented by self-reference.
    Alternatives {
        span: (usize, usize),
        candidates: Vec<Id>,
    },
}

pub struct ParseForest {
    pub nodes: Arena<ForestNode>,
    pub root: Id,
    pub ambiguous: bool,
}

impl ParseForest {
    pub fn node(&self, id: Id) -> &ForestNode {
        self.nodes.get(id)
    }

    /// Every node id, sorted by `(rule-id, span)` — the canonical
    /// order for callers that need one, since iteration order over
    /// the arena itself is only insertion order.
    pub fn canonical_nodes(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.nodes.iter_with_ids().map(|(id, _)| id).collect();
        ids.sort_by_key(|&id| self.sort_key(id));
        ids
    }

    fn sort_key(&self, id: Id) -> (u32, usize, usize, u32) {
        match self.nodes.get(id) {
            ForestNode::Abstract { rule, span, .. } => (rule.0, span.0, span.1, id.0),
            ForestNode::Alternatives { span, .. } => (u32::MAX - 1, span.0, span.1, id.0),
            ForestNode::Leaf { .. } | ForestNode::Constant(_) => (u32::MAX, 0, 0, id.0),
        }
    }
}

type NodeKey = (RuleId, usize, usize, Vec<Id>);

struct Builder<'g> {
    grammar: &'g Grammar,
    sets: &'g [ItemSet],
    tokens: &'g [ScannedToken],
    leo: &'g LeoTable,
    nodes: Arena<ForestNode>,
    abstract_dedup: crate::hash_index::HashIndex<NodeKey, Id>,
    leaf_memo: HashMap<(SymbolId, usize), Id>,
    memo: HashMap<(SymbolId, usize, usize), Id>,
    in_progress: HashSet<(SymbolId, usize, usize)>,
    loops_enabled: bool,
    ambiguity_policy: AmbiguityPolicy,
    ambiguous: bool,
}

impl<'g> Builder<'g> {
    /// A completed item for `(symbol, start, end)` may have been
    /// elided from `sets[end]` by a Leo shortcut — `engine::complete`
    /// records those spans in `leo` as it takes each shortcut, so a
    /// span the literal item-set walk won't find can still be
    /// confirmed and expanded here.
    fn nonterminal_completes_at(&self, symbol: SymbolId, start: usize, end: usize) -> bool {
        engine::completed_items(self.grammar, &self.sets[end]).any(|item| {
            let sit = self.grammar.situations().get(item.situation);
            item.origin == start && self.grammar.rule(sit.rule).lhs == symbol
        }) || self.leo.completes_via_shortcut(symbol, start, end)
    }

    /// Leaves at the same `(terminal, position)` are the same token
    /// from the host's stream, so they share a node id the same way
    /// `build_rule_node` dedups abstract nodes — two candidate
    /// decompositions that both pass through this token should end up
    /// pointing at the identical leaf, not two copies of it.
    fn leaf_for(&mut self, terminal: SymbolId, pos: usize) -> Result<Id> {
        let key = (terminal, pos);
        if let Some(&id) = self.leaf_memo.get(&key) {
            return Ok(id);
        }
        let id = self.nodes.alloc(ForestNode::Leaf {
            terminal,
            attribute: self.tokens[pos].attribute.clone(),
        })?;
        self.leaf_memo.insert(key, id);
        Ok(id)
    }

    fn node_for_nonterminal(&mut self, symbol: SymbolId, start: usize, end: usize) -> Result<Id> {
        let key = (symbol, start, end);
        if let Some(&id) = self.memo.get(&key) {
            return Ok(id);
        }
        if self.in_progress.contains(&key) {
            if !self.loops_enabled {
                return Err(Error::InvalidValue {
                    what: format!("unexpected derivation cycle at span [{start},{end}) with loops disabled"),
                });
            }
            let id = self.nodes.alloc(ForestNode::Alternatives {
                span: (start, end),
                candidates: Vec::new(),
            })?;
            self.memo.insert(key, id);
            self.ambiguous = true;
            return Ok(id);
        }

        self.in_progress.insert(key);
        let mut candidates: Vec<(RuleId, Vec<Id>, u32)> = Vec::new();
        for rule in self.grammar.rules().filter(|r| r.lhs == symbol) {
            if !self.nonterminal_completes_at(symbol, start, end) {
                continue;
            }
            for children in self.decompose(rule, 0, start, start, end)? {
                let cost = rule.translation.cost + children.iter().map(|&c| self.cost_of(c)).sum::<u32>();
                candidates.push((rule.id, children, cost));
            }
        }
        self.in_progress.remove(&key);

        if candidates.is_empty() {
            return Err(Error::SyntaxError { position: end });
        }

        let id = self.materialize(symbol, start, end, candidates)?;
        self.memo.insert(key, id);
        Ok(id)
    }

    fn cost_of(&self, id: Id) -> u32 {
        match self.nodes.get(id) {
            ForestNode::Abstract { cost, .. } => *cost,
            _ => 0,
        }
    }

    /// All ways to decompose `rule.rhs[dot..]` over the span
    /// `[pos, end)`, given that `rule.rhs[..dot]` already accounts for
    /// `[start, pos)`. Returns the full per-rhs-position child list
    /// for each valid decomposition.
    fn decompose(&mut self, rule: &Rule, dot: usize, start: usize, pos: usize, end: usize) -> Result<Vec<Vec<Id>>> {
        if dot == rule.rhs.len() {
            return Ok(if pos == end { vec![Vec::new()] } else { Vec::new() });
        }
        let symbol = rule.rhs[dot];
        let mut out = Vec::new();
        if self.grammar.symbol(symbol).is_terminal() {
            if pos < end && self.tokens[pos].code == self.grammar.symbol(symbol).code().unwrap() {
                let leaf = self.leaf_for(symbol, pos)?;
                for rest in self.decompose(rule, dot + 1, start, pos + 1, end)? {
                    let mut v = vec![leaf];
                    v.extend(rest);
                    out.push(v);
                }
            } else if self.grammar.symbol(symbol).empty_p {
                // terminals are never nullable, kept for symmetry with the nonterminal branch
            }
        } else {
            for mid in pos..=end {
                if mid == pos && !self.grammar.symbol(symbol).empty_p {
                    continue;
                }
                if !self.nonterminal_completes_at(symbol, pos, mid) {
                    continue;
                }
                let child = self.node_for_nonterminal(symbol, pos, mid)?;
                for rest in self.decompose(rule, dot + 1, start, mid, end)? {
                    let mut v = vec![child];
                    v.extend(rest);
                    out.push(v);
                }
            }
        }
        Ok(out)
    }

    /// Pick the winning candidate(s) per the ambiguity policy, apply
    /// the translation template, and either return a single node or
    /// wrap several under an `Alternatives` node.
    fn materialize(&mut self, symbol: SymbolId, start: usize, end: usize, mut candidates: Vec<(RuleId, Vec<Id>, u32)>) -> Result<Id> {
        let _ = symbol;
        candidates.sort_by(|a, b| a.2.cmp(&b.2).then_with(|| a.0.cmp(&b.0)).then_with(|| a.1.cmp(&b.1)));
        let min_cost = candidates[0].2;

        let chosen: Vec<(RuleId, Vec<Id>, u32)> = match self.ambiguity_policy {
            AmbiguityPolicy::MinimumCost => vec![candidates.into_iter().next().unwrap()],
            AmbiguityPolicy::AllMinimumCost => candidates.into_iter().filter(|c| c.2 == min_cost).collect(),
            AmbiguityPolicy::AllCandidates => candidates,
        };

        if chosen.len() == 1 {
            let (rule_id, children, _) = chosen.into_iter().next().unwrap();
            self.build_rule_node(rule_id, start, end, children)
        } else {
            self.ambiguous = true;
            let mut ids = Vec::with_capacity(chosen.len());
            for (rule_id, children, _) in chosen {
                ids.push(self.build_rule_node(rule_id, start, end, children)?);
            }
            self.nodes.alloc(ForestNode::Alternatives { span: (start, end), candidates: ids })
        }
    }

    fn build_rule_node(&mut self, rule_id: RuleId, start: usize, end: usize, children: Vec<Id>) -> Result<Id> {
        let rule = self.grammar.rule(rule_id).clone();
        if rule.translation.anode_name.is_none() {
            if let Some(TranslationItem::Position(p)) = rule.translation.items.first() {
                return Ok(children[*p]);
            }
        }

        let key: NodeKey = (rule_id, start, end, children.clone());
        if let Some(&existing) = self.abstract_dedup.get(&key) {
            return Ok(existing);
        }

        let mut final_children = Vec::with_capacity(rule.translation.items.len());
        for item in &rule.translation.items {
            match item {
                TranslationItem::Position(p) => final_children.push(children[*p]),
                TranslationItem::Constant(s) => {
                    final_children.push(self.nodes.alloc(ForestNode::Constant(s.clone()))?)
                }
            }
        }
        let id = self.nodes.alloc(ForestNode::Abstract {
            name: rule.translation.anode_name.clone(),
            rule: rule_id,
            span: (start, end),
            cost: rule.translation.cost,
            children: final_children,
        })?;
        self.abstract_dedup.find_or_insert(key, || id);
        Ok(id)
    }
}

/// Builds the forest for a successful recognition. `sets.len() - 1`
/// is the number of tokens consumed. `leo` is the shortcut table built
/// alongside `sets` during recognition, needed to reconstruct spans a
/// shortcut bypassed inserting as a literal item.
pub fn build(grammar: &Grammar, sets: &[ItemSet], tokens: &[ScannedToken], leo: &LeoTable, options: &crate::config::ParserOptions) -> Result<ParseForest> {
    let start = grammar.start_symbol().expect("finalized grammar has a start symbol");
    let n = sets.len() - 1;
    let mut builder = Builder {
        grammar,
        sets,
        tokens,
        leo,
        nodes: Arena::new(),
        abstract_dedup: crate::hash_index::HashIndex::new(),
        leaf_memo: HashMap::new(),
        memo: HashMap::new(),
        in_progress: HashSet::new(),
        loops_enabled: options.loops_enabled,
        ambiguity_policy: options.ambiguity_policy,
        ambiguous: false,
    };
    let root = builder.node_for_nonterminal(start, 0, n)?;
    Ok(ParseForest {
        nodes: builder.nodes,
        root,
        ambiguous: builder.ambiguous,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserOptions;
    use crate::grammar::Grammar;
    use crate::rule::Translation;
    use std::rc::Rc;

    fn epsilon_grammar() -> Grammar {
        // S -> A B ; A -> ε ; B -> 'b'
        let mut g = Grammar::new();
        let b_tok = g.intern_terminal("b", 1).unwrap();
        let s = g.intern_nonterminal("S").unwrap();
        let a = g.intern_nonterminal("A").unwrap();
        let b = g.intern_nonterminal("B").unwrap();
        g.add_rule(s, &[a, b], Translation::anode("S", [0, 1], 0)).unwrap();
        g.add_rule(a, &[], Translation::anode("A", [], 0)).unwrap();
        g.add_rule(b, &[b_tok], Translation::pass_through()).unwrap();
        g
    }

    #[test]
    fn epsilon_grammar_parses_single_token() {
        let mut g = epsilon_grammar();
        g.finalize().unwrap();
        let b_tok = g.symbol_named("b").unwrap();
        let scanned = vec![ScannedToken {
            code: g.symbol(b_tok).code().unwrap(),
            attribute: Rc::new(()) as Attribute,
        }];
        let mut buffer_source = scanned.clone().into_iter();
        let mut source = move || buffer_source.next().map(|t| (t.code, t.attribute));
        let mut buf = crate::token::TokenBuffer::new(&mut source);
        let (sets, tokens, leo) = engine::recognize(&g, &mut buf, |_, _, _, _, _, k| {
            Err(Error::SyntaxError { position: k })
        })
        .unwrap();
        let options = ParserOptions::default();
        let forest = build(&g, &sets, &tokens, &leo, &options).unwrap();
        match forest.node(forest.root) {
            ForestNode::Abstract { name, children, .. } => {
                assert_eq!(name.as_deref(), Some("S"));
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected an abstract S node, got {other:?}"),
        }
    }
}
