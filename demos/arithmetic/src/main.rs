//! Parses `1+2*3` against a left-recursive arithmetic grammar and
//! prints the resulting parse forest. Exercises the unambiguous,
//! single-parse path: no recovery, no alternatives.

use std::rc::Rc;

use yaep_core::{Attribute, ForestNode, Grammar, Translation};

const PLUS: i32 = 1;
const STAR: i32 = 2;
const LPAR: i32 = 3;
const RPAR: i32 = 4;
const NUM: i32 = 5;

fn build_grammar() -> Grammar {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", PLUS).unwrap();
    let star = g.intern_terminal("*", STAR).unwrap();
    let lpar = g.intern_terminal("(", LPAR).unwrap();
    let rpar = g.intern_terminal(")", RPAR).unwrap();
    let num = g.intern_terminal("num", NUM).unwrap();
    let e = g.intern_nonterminal("E").unwrap();
    let t = g.intern_nonterminal("T").unwrap();
    let f = g.intern_nonterminal("F").unwrap();

    g.add_rule(e, &[e, plus, t], Translation::anode("Add", [0, 2], 1)).unwrap();
    g.add_rule(e, &[t], Translation::pass_through()).unwrap();
    g.add_rule(t, &[t, star, f], Translation::anode("Mul", [0, 2], 1)).unwrap();
    g.add_rule(t, &[f], Translation::pass_through()).unwrap();
    g.add_rule(f, &[lpar, e, rpar], Translation::anode("Paren", [1], 0)).unwrap();
    g.add_rule(f, &[num], Translation::pass_through()).unwrap();
    g
}

/// A tiny hand-rolled lexer: single-character operators, and runs of
/// ASCII digits as `num` tokens carrying their parsed `i64` value.
fn tokenize(input: &str) -> Vec<(i32, Attribute)> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '+' => {
                chars.next();
                tokens.push((PLUS, Rc::new(()) as Attribute));
            }
            '*' => {
                chars.next();
                tokens.push((STAR, Rc::new(()) as Attribute));
            }
            '(' => {
                chars.next();
                tokens.push((LPAR, Rc::new(()) as Attribute));
            }
            ')' => {
                chars.next();
                tokens.push((RPAR, Rc::new(()) as Attribute));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: i64 = digits.parse().expect("scanned only ascii digits");
                tokens.push((NUM, Rc::new(value) as Attribute));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            other => panic!("unexpected character {other:?} in input"),
        }
    }
    tokens
}

fn print_node(forest: &yaep_core::ParseForest, id: yaep_core::ForestId, depth: usize) {
    let indent = "  ".repeat(depth);
    match forest.node(id) {
        ForestNode::Leaf { attribute, .. } => {
            if let Some(value) = attribute.downcast_ref::<i64>() {
                println!("{indent}num({value})");
            } else {
                println!("{indent}<token>");
            }
        }
        ForestNode::Constant(s) => println!("{indent}const({s:?})"),
        ForestNode::Abstract { name, children, .. } => {
            println!("{indent}{}", name.as_deref().unwrap_or("<anon>"));
            for &child in children {
                print_node(forest, child, depth + 1);
            }
        }
        ForestNode::Alternatives { candidates, .. } => {
            println!("{indent}<alternatives: {}>", candidates.len());
            for &candidate in candidates {
                print_node(forest, candidate, depth + 1);
            }
        }
    }
}

fn main() {
    env_logger::init();

    let mut grammar = build_grammar();
    let tokens = tokenize("1+2*3");
    let mut iter = tokens.into_iter();
    let mut source = move || iter.next();

    let outcome = grammar.parse(&mut source).expect("1+2*3 is valid arithmetic");
    println!("ambiguous: {}", outcome.forest.ambiguous);
    print_node(&outcome.forest, outcome.forest.root, 0);
}
