//! A generalized Earley parser: arbitrary context-free grammars
//! (ambiguous, left- or right-recursive), a shared-packed parse
//! forest as output, Leo-style right-recursion compression, and
//! error recovery that discards and/or inserts tokens to resync.
//!
//! Building a grammar is the same three-step shape throughout: intern
//! symbols, add rules, `finalize`. Only a finalized grammar can
//! `parse`. [`Grammar`] owns its own [`ErrorContext`] rather than a
//! process-global one, so independent grammars on independent threads
//! never contend for it.

mod alloc;
mod analysis;
mod config;
mod engine;
mod error;
mod forest;
mod grammar;
mod hash_index;
mod leo;
mod parse;
mod recovery;
mod rule;
mod situation;
mod symbol;
mod token;

pub use config::{AmbiguityPolicy, LookaheadLevel, ParserOptions};
pub use error::{Error, ErrorCode, ErrorContext, Result};
pub use forest::{ForestNode, ParseForest};
pub use grammar::{Grammar, RuleDescription};
pub use parse::ParseOutcome;
pub use recovery::RecoveryEvent;
pub use rule::{Rule, RuleId, Translation, TranslationItem};
pub use symbol::{Symbol, SymbolId, SymbolKind, TerminalSet};
pub use token::{Attribute, ScannedToken, TokenBuffer, TokenSource};

pub use alloc::{Arena, Id as ForestId};
