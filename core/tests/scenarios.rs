//! End-to-end scenarios exercising the public parsing API: an
//! unambiguous left-recursive grammar, a genuinely ambiguous one,
//! epsilon productions, deep right recursion, error recovery, and
//! opt-in derivation loops.

use std::rc::Rc;

use yaep_core::{Attribute, ErrorCode, ForestNode, Grammar, Translation};

fn token_source(codes: Vec<i32>) -> impl FnMut() -> Option<(i32, Attribute)> {
    let mut iter = codes.into_iter();
    move || iter.next().map(|code| (code, Rc::new(()) as Attribute))
}

fn leaves_under(forest: &yaep_core::ParseForest, id: yaep_core::ForestId, out: &mut Vec<yaep_core::ForestId>) {
    match forest.node(id) {
        ForestNode::Leaf { .. } => out.push(id),
        ForestNode::Constant(_) => {}
        ForestNode::Abstract { children, .. } => {
            for &child in children {
                leaves_under(forest, child, out);
            }
        }
        ForestNode::Alternatives { candidates, .. } => {
            for &candidate in candidates {
                leaves_under(forest, candidate, out);
            }
        }
    }
}

/// S1: a left-recursive, unambiguous arithmetic grammar parses
/// cleanly to a single tree with the expected shape.
#[test]
fn arithmetic_parses_to_a_single_unambiguous_tree() {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", 1).unwrap();
    let star = g.intern_terminal("*", 2).unwrap();
    let num = g.intern_terminal("num", 3).unwrap();
    let e = g.intern_nonterminal("E").unwrap();
    let t = g.intern_nonterminal("T").unwrap();
    g.add_rule(e, &[e, plus, t], Translation::anode("Add", [0, 2], 1)).unwrap();
    g.add_rule(e, &[t], Translation::pass_through()).unwrap();
    g.add_rule(t, &[t, star, num], Translation::anode("Mul", [0, 2], 1)).unwrap();
    g.add_rule(t, &[num], Translation::pass_through()).unwrap();

    // 1 + 2 * 3
    let mut source = token_source(vec![
        g.symbol(num).code().unwrap(),
        g.symbol(plus).code().unwrap(),
        g.symbol(num).code().unwrap(),
        g.symbol(star).code().unwrap(),
        g.symbol(num).code().unwrap(),
    ]);
    let outcome = g.parse(&mut source).unwrap();
    assert!(!outcome.forest.ambiguous);
    match outcome.forest.node(outcome.forest.root) {
        ForestNode::Abstract { name, children, .. } => {
            assert_eq!(name.as_deref(), Some("Add"));
            assert_eq!(children.len(), 2);
            match outcome.forest.node(children[1]) {
                ForestNode::Abstract { name, .. } => assert_eq!(name.as_deref(), Some("Mul")),
                other => panic!("expected the right child to be a Mul node, got {other:?}"),
            }
        }
        other => panic!("expected an Add node at the root, got {other:?}"),
    }
}

/// S2: a genuinely ambiguous grammar (no precedence between two uses
/// of `+`) produces an `Alternatives` node, and both candidates share
/// the same leading leaf instead of allocating two copies of it.
#[test]
fn ambiguous_grammar_shares_leaves_across_candidates() {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", 1).unwrap();
    let num = g.intern_terminal("num", 2).unwrap();
    let e = g.intern_nonterminal("E").unwrap();
    g.add_rule(e, &[e, plus, e], Translation::anode("Add", [0, 2], 1)).unwrap();
    g.add_rule(e, &[num], Translation::pass_through()).unwrap();
    g.options_mut().set_one_parse(false);
    g.options_mut().set_cost(true);

    // 1 + 2 + 3
    let mut source = token_source(vec![
        g.symbol(num).code().unwrap(),
        g.symbol(plus).code().unwrap(),
        g.symbol(num).code().unwrap(),
        g.symbol(plus).code().unwrap(),
        g.symbol(num).code().unwrap(),
    ]);
    let outcome = g.parse(&mut source).unwrap();
    assert!(outcome.forest.ambiguous);

    let candidates = match outcome.forest.node(outcome.forest.root) {
        ForestNode::Alternatives { candidates, .. } => candidates.clone(),
        other => panic!("expected two parses of equal cost, got {other:?}"),
    };
    assert_eq!(candidates.len(), 2);

    let mut leaves_a = Vec::new();
    let mut leaves_b = Vec::new();
    leaves_under(&outcome.forest, candidates[0], &mut leaves_a);
    leaves_under(&outcome.forest, candidates[1], &mut leaves_b);
    // Both candidates consume the same leading `1` token; it must be
    // the identical node id in both trees, not a duplicate allocation.
    assert_eq!(leaves_a[0], leaves_b[0]);
}

/// S3: an epsilon production nested inside a larger rule parses, and
/// the empty nonterminal still materializes as its own node.
#[test]
fn epsilon_production_parses_through_the_public_api() {
    let mut g = Grammar::new();
    let b_tok = g.intern_terminal("b", 1).unwrap();
    let s = g.intern_nonterminal("S").unwrap();
    let a = g.intern_nonterminal("A").unwrap();
    let b = g.intern_nonterminal("B").unwrap();
    g.add_rule(s, &[a, b], Translation::anode("S", [0, 1], 0)).unwrap();
    g.add_rule(a, &[], Translation::anode("A", [], 0)).unwrap();
    g.add_rule(b, &[b_tok], Translation::pass_through()).unwrap();

    let mut source = token_source(vec![g.symbol(b_tok).code().unwrap()]);
    let outcome = g.parse(&mut source).unwrap();
    match outcome.forest.node(outcome.forest.root) {
        ForestNode::Abstract { name, children, .. } => {
            assert_eq!(name.as_deref(), Some("S"));
            match outcome.forest.node(children[0]) {
                ForestNode::Abstract { name, children, .. } => {
                    assert_eq!(name.as_deref(), Some("A"));
                    assert!(children.is_empty());
                }
                other => panic!("expected an empty A node, got {other:?}"),
            }
        }
        other => panic!("expected an S node at the root, got {other:?}"),
    }
}

/// S4: deep right recursion (`R -> 'a' R | 'a'`) still parses, and the
/// Leo shortcut keeps the item-set machinery from blowing up the way a
/// naive completion chain would — a loose proxy for that is that the
/// forest's node count stays linear in the input length rather than
/// exploding.
#[test]
fn deep_right_recursion_parses_and_stays_linear() {
    let mut g = Grammar::new();
    let a_tok = g.intern_terminal("a", 1).unwrap();
    let r = g.intern_nonterminal("R").unwrap();
    g.add_rule(r, &[a_tok, r], Translation::anode("Cons", [0, 1], 0)).unwrap();
    g.add_rule(r, &[a_tok], Translation::pass_through()).unwrap();

    const N: usize = 500;
    let code = g.symbol(a_tok).code().unwrap();
    let mut source = token_source(vec![code; N]);
    let outcome = g.parse(&mut source).unwrap();
    assert!(!outcome.forest.ambiguous);
    assert!(outcome.forest.nodes.len() < 3 * N);

    // Walk the right-recursive spine; it should be exactly N deep.
    let mut depth = 0;
    let mut node = outcome.forest.root;
    loop {
        match outcome.forest.node(node) {
            ForestNode::Abstract { name, children, .. } if name.as_deref() == Some("Cons") => {
                depth += 1;
                node = children[1];
            }
            ForestNode::Leaf { .. } => {
                depth += 1;
                break;
            }
            other => panic!("unexpected node in the Cons spine: {other:?}"),
        }
    }
    assert_eq!(depth, N);
}

/// S5: a single garbled token in the middle of an otherwise-valid
/// sentence is discarded and the parse still completes.
#[test]
fn error_recovery_discards_one_bad_token_and_resumes() {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", 1).unwrap();
    let num = g.intern_terminal("num", 2).unwrap();
    let e = g.intern_nonterminal("E").unwrap();
    g.add_rule(e, &[e, plus, num], Translation::anode("Add", [0, 2], 0)).unwrap();
    g.add_rule(e, &[num], Translation::pass_through()).unwrap();
    g.options_mut().set_error_recovery(true);
    g.options_mut().set_recovery_match(2);

    // num, <garbage>, +, num
    let mut source = token_source(vec![
        g.symbol(num).code().unwrap(),
        9999,
        g.symbol(plus).code().unwrap(),
        g.symbol(num).code().unwrap(),
    ]);
    let outcome = g.parse(&mut source).unwrap();
    assert_eq!(outcome.recovered.len(), 1);
    assert_eq!(outcome.recovered[0].discarded, 1);
    match outcome.forest.node(outcome.forest.root) {
        ForestNode::Abstract { name, .. } => assert_eq!(name.as_deref(), Some("Add")),
        other => panic!("expected a completed Add node after recovery, got {other:?}"),
    }
}

/// Without recovery enabled the same garbled input is a hard syntax
/// error.
#[test]
fn without_recovery_a_bad_token_is_a_hard_error() {
    let mut g = Grammar::new();
    let num = g.intern_terminal("num", 1).unwrap();
    let e = g.intern_nonterminal("E").unwrap();
    g.add_rule(e, &[num], Translation::pass_through()).unwrap();

    let mut source = token_source(vec![9999]);
    let err = g.parse(&mut source).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SyntaxError);
}

/// S6: a grammar with a nontrivial unit-production cycle is rejected
/// by default, but finalizes and parses once loops are opted into.
#[test]
fn derivation_loops_are_rejected_unless_opted_in() {
    let mut g = Grammar::new();
    let x_tok = g.intern_terminal("x", 1).unwrap();
    let x = g.intern_nonterminal("X").unwrap();
    let y = g.intern_nonterminal("Y").unwrap();
    g.add_rule(x, &[y], Translation::pass_through()).unwrap();
    g.add_rule(y, &[x], Translation::pass_through()).unwrap();
    g.add_rule(y, &[x_tok], Translation::pass_through()).unwrap();

    let err = g.finalize().unwrap_err();
    assert_eq!(err.code(), ErrorCode::LoopsGrammar);
}

#[test]
fn derivation_loops_parse_once_enabled() {
    let mut g = Grammar::new();
    let x_tok = g.intern_terminal("x", 1).unwrap();
    let x = g.intern_nonterminal("X").unwrap();
    let y = g.intern_nonterminal("Y").unwrap();
    g.add_rule(x, &[y], Translation::pass_through()).unwrap();
    g.add_rule(y, &[x], Translation::pass_through()).unwrap();
    g.add_rule(y, &[x_tok], Translation::pass_through()).unwrap();
    g.options_mut().set_loops_enabled(true);

    let mut source = token_source(vec![g.symbol(x_tok).code().unwrap()]);
    let outcome = g.parse(&mut source).unwrap();
    // The loop collapses to a self-reference rather than an infinite
    // tree; just confirm the parse completes and flags the ambiguity.
    assert!(outcome.forest.ambiguous);
}
