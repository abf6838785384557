//! Error taxonomy and the per-grammar error context.
//!
//! Parser errors are a plain enum with a hand written `Display` impl
//! in the lexer/parser runtime this crate grew out of. We keep that
//! shape but derive it with `thiserror`, and add [`ErrorCode`] so a
//! host that wants C-library style status codes can get one back from
//! any `Error` without matching on variants.

use std::fmt;

/// The error code taxonomy exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    NoMemory,
    UndefinedSymbol,
    InvalidValue,
    RepeatedTerminalCode,
    RepeatedRule,
    DescriptionSyntax,
    LoopsGrammar,
    SyntaxError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::NoMemory => "NO_MEMORY",
            ErrorCode::UndefinedSymbol => "UNDEFINED_SYMBOL",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::RepeatedTerminalCode => "REPEATED_TERMINAL_CODE",
            ErrorCode::RepeatedRule => "REPEATED_RULE",
            ErrorCode::DescriptionSyntax => "DESCRIPTION_SYNTAX",
            ErrorCode::LoopsGrammar => "LOOPS_GRAMMAR",
            ErrorCode::SyntaxError => "SYNTAX_ERROR",
        };
        f.write_str(name)
    }
}

/// A position within the token stream, used by syntax errors.
pub type Position = usize;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("out of memory while {context}")]
    NoMemory { context: String },

    #[error("undefined symbol \"{name}\"")]
    UndefinedSymbol { name: String },

    #[error("invalid value: {what}")]
    InvalidValue { what: String },

    #[error("terminal code {code} is already bound to \"{existing}\"")]
    RepeatedTerminalCode { code: i32, existing: String },

    #[error("rule already defined: {lhs} -> {rhs:?}")]
    RepeatedRule { lhs: String, rhs: Vec<String> },

    #[error("grammar description syntax error: {what}")]
    DescriptionSyntax { what: String },

    #[error("grammar contains a nontrivial derivation loop through \"{symbol}\" and loops are not enabled")]
    LoopsGrammar { symbol: String },

    #[error("syntax error at token position {position}")]
    SyntaxError { position: Position },
}

impl Error {
    /// The taxonomy code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NoMemory { .. } => ErrorCode::NoMemory,
            Error::UndefinedSymbol { .. } => ErrorCode::UndefinedSymbol,
            Error::InvalidValue { .. } => ErrorCode::InvalidValue,
            Error::RepeatedTerminalCode { .. } => ErrorCode::RepeatedTerminalCode,
            Error::RepeatedRule { .. } => ErrorCode::RepeatedRule,
            Error::DescriptionSyntax { .. } => ErrorCode::DescriptionSyntax,
            Error::LoopsGrammar { .. } => ErrorCode::LoopsGrammar,
            Error::SyntaxError { .. } => ErrorCode::SyntaxError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Per-grammar error context.
///
/// Every fallible public operation on [`crate::Grammar`] clears this on
/// entry and records the failure here before returning a non-zero
/// status. Deliberately *not* a process-global: it lives on the
/// `Grammar` handle so independent grammars on independent threads
/// never contend for it.
#[derive(Debug, Default)]
pub struct ErrorContext {
    last_error: Option<Error>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self { last_error: None }
    }

    pub fn clear(&mut self) {
        self.last_error = None;
    }

    pub fn record(&mut self, error: Error) {
        log::debug!("error context: {} ({})", error, error.code());
        self.last_error = Some(error);
    }

    /// Run `f`, clearing the context first and recording any error it
    /// returns. Every fallible public operation on `Grammar` follows
    /// this "(1) clear on entry, (2) set on failure" contract.
    pub fn guard<T>(&mut self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.clear();
        let result = f();
        if let Err(ref error) = result {
            self.record(error.clone());
        }
        result
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn last_error_code(&self) -> Option<ErrorCode> {
        self.last_error.as_ref().map(Error::code)
    }

    pub fn last_error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(ToString::to_string)
    }
}
