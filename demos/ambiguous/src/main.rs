//! Parses `1+2+3` against a deliberately ambiguous grammar (no
//! precedence or associativity rule between the two `+` uses) and
//! prints every minimum-cost parse. Exercises the ambiguous, multi-
//! candidate path of the forest builder.

use std::rc::Rc;

use yaep_core::{AmbiguityPolicy, Attribute, ForestNode, Grammar, Translation};

const PLUS: i32 = 1;
const NUM: i32 = 2;

fn build_grammar() -> Grammar {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", PLUS).unwrap();
    let num = g.intern_terminal("num", NUM).unwrap();
    let e = g.intern_nonterminal("E").unwrap();

    // Every `+` binds E to E to E with no precedence tiebreak, so
    // `1+2+3` has two distinct derivations of equal cost.
    g.add_rule(e, &[e, plus, e], Translation::anode("Add", [0, 2], 1)).unwrap();
    g.add_rule(e, &[num], Translation::pass_through()).unwrap();
    g
}

fn tokenize(input: &str) -> Vec<(i32, Attribute)> {
    let mut tokens = Vec::new();
    for c in input.chars() {
        match c {
            '+' => tokens.push((PLUS, Rc::new(()) as Attribute)),
            d if d.is_ascii_digit() => {
                let value = d.to_digit(10).unwrap() as i64;
                tokens.push((NUM, Rc::new(value) as Attribute));
            }
            other => panic!("unexpected character {other:?} in input"),
        }
    }
    tokens
}

fn print_node(forest: &yaep_core::ParseForest, id: yaep_core::ForestId, depth: usize) {
    let indent = "  ".repeat(depth);
    match forest.node(id) {
        ForestNode::Leaf { attribute, .. } => match attribute.downcast_ref::<i64>() {
            Some(value) => println!("{indent}num({value})"),
            None => println!("{indent}<token>"),
        },
        ForestNode::Constant(s) => println!("{indent}const({s:?})"),
        ForestNode::Abstract { name, children, .. } => {
            println!("{indent}{}", name.as_deref().unwrap_or("<anon>"));
            for &child in children {
                print_node(forest, child, depth + 1);
            }
        }
        ForestNode::Alternatives { candidates, .. } => {
            println!("{indent}<alternatives: {}>", candidates.len());
            for (i, &candidate) in candidates.iter().enumerate() {
                println!("{indent}  candidate {i}:");
                print_node(forest, candidate, depth + 2);
            }
        }
    }
}

fn main() {
    env_logger::init();

    let mut grammar = build_grammar();
    grammar.options_mut().set_one_parse(false);
    grammar.options_mut().set_cost(true);
    debug_assert_eq!(grammar.options().ambiguity_policy, AmbiguityPolicy::AllMinimumCost);

    let tokens = tokenize("1+2+3");
    let mut iter = tokens.into_iter();
    let mut source = move || iter.next();

    let outcome = grammar.parse(&mut source).expect("1+2+3 is valid under this grammar");
    println!("ambiguous: {}", outcome.forest.ambiguous);
    print_node(&outcome.forest, outcome.forest.root, 0);
}
