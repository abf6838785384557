//! Top-level entry point: recognize a token stream against a finalized
//! grammar and build its parse forest.

use crate::engine;
use crate::error::Result;
use crate::forest::{self, ParseForest};
use crate::grammar::Grammar;
use crate::recovery::{self, RecoveryEvent};
use crate::token::{TokenBuffer, TokenSource};

/// A finished parse: the forest plus a log of any recovery performed
/// along the way (empty when the input parsed cleanly).
pub struct ParseOutcome {
    pub forest: ParseForest,
    pub recovered: Vec<RecoveryEvent>,
}

impl Grammar {
    /// Recognizes `source` against this grammar and builds its forest.
    /// Calls `finalize` first if it hasn't run yet. When
    /// `error_recovery_enabled` is set, a scan failure is resynced by
    /// discarding and/or inserting tokens rather than aborting; see
    /// [`crate::recovery`].
    pub fn parse(&mut self, source: &mut dyn TokenSource) -> Result<ParseOutcome> {
        self.finalize()?;
        self.error_context.clear();
        let options = self.options.clone();
        let mut events: Vec<RecoveryEvent> = Vec::new();

        // Not routed through `ErrorContext::guard`: that helper assumes
        // its closure only touches disjoint fields of `self`, but
        // recognition and forest-building both need the whole `Grammar`
        // (rules, symbols, situations together), so the borrow is done
        // by hand here instead.
        let result = (|| {
            let mut buffer = TokenBuffer::new(source);
            let (sets, tokens, leo) = engine::recognize(self, &mut buffer, |grammar, sets, leo, consumed, tokens, k| {
                recovery::attempt(grammar, sets, leo, consumed, tokens, k, &options, &mut events)
            })?;

            forest::build(self, &sets, &tokens, &leo, &options)
        })();

        if let Err(ref error) = result {
            self.error_context.record(error.clone());
        }
        result.map(|forest| ParseOutcome {
            forest,
            recovered: events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Translation;
    use crate::token::Attribute;
    use std::rc::Rc;

    fn arithmetic_grammar() -> (Grammar, crate::symbol::SymbolId, crate::symbol::SymbolId) {
        let mut g = Grammar::new();
        let plus = g.intern_terminal("+", 1).unwrap();
        let id = g.intern_terminal("id", 2).unwrap();
        let e = g.intern_nonterminal("E").unwrap();
        g.add_rule(e, &[e, plus, id], Translation::anode("Add", [0, 2], 0)).unwrap();
        g.add_rule(e, &[id], Translation::pass_through()).unwrap();
        (g, plus, id)
    }

    fn token_source(codes: Vec<i32>) -> impl FnMut() -> Option<(i32, Attribute)> {
        let mut iter = codes.into_iter();
        move || iter.next().map(|code| (code, Rc::new(()) as Attribute))
    }

    #[test]
    fn parses_left_recursive_sum() {
        let (mut g, plus, id) = arithmetic_grammar();
        let mut source = token_source(vec![
            g.symbol(id).code().unwrap(),
            g.symbol(plus).code().unwrap(),
            g.symbol(id).code().unwrap(),
            g.symbol(plus).code().unwrap(),
            g.symbol(id).code().unwrap(),
        ]);
        let outcome = g.parse(&mut source).unwrap();
        assert!(!outcome.forest.ambiguous);
        assert!(outcome.recovered.is_empty());
    }

    #[test]
    fn syntax_error_without_recovery_fails() {
        let (mut g, _plus, id) = arithmetic_grammar();
        let mut source = token_source(vec![g.symbol(id).code().unwrap(), 999]);
        let err = g.parse(&mut source).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::SyntaxError);
    }

    #[test]
    fn recovers_by_discarding_a_bad_token() {
        let (mut g, plus, id) = arithmetic_grammar();
        g.options_mut().set_error_recovery(true);
        g.options_mut().set_recovery_match(1);
        let mut source = token_source(vec![
            g.symbol(id).code().unwrap(),
            999, // unexpected token: discarded
            g.symbol(plus).code().unwrap(),
            g.symbol(id).code().unwrap(),
        ]);
        let outcome = g.parse(&mut source).unwrap();
        assert_eq!(outcome.recovered.len(), 1);
        assert_eq!(outcome.recovered[0].discarded, 1);
    }
}
