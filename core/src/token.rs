//! Host-supplied token stream.
//!
//! A lazy finite sequence of (code, attribute) pairs pulled from a
//! host callback. Position is addressable by integer index during
//! error recovery, so instead of a strictly forward-only pull (as a
//! single-pass lexer would give you) this buffers every token it has
//! ever pulled and lets the engine index back into it.

use std::any::Any;
use std::rc::Rc;

/// The value a host attaches to a scanned token — carried through to
/// a terminal leaf of the parse forest untouched. `Rc` rather than an
/// owned box because a shared leaf can be referenced from many
/// forest nodes without cloning the host's payload.
pub type Attribute = Rc<dyn Any>;

/// The attribute error recovery attaches to a token it synthesized
/// rather than read from the host — a caller can `downcast_ref` a
/// leaf's attribute to this to tell a recovered leaf from a real one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticAttribute;

/// One token as read from the host: an integer code matching a
/// terminal's `code`, plus its attribute.
#[derive(Clone)]
pub struct ScannedToken {
    pub code: i32,
    pub attribute: Attribute,
}

/// The host callback invoked once per token until it returns `None`.
pub trait TokenSource {
    fn next_token(&mut self) -> Option<(i32, Attribute)>;
}

impl<F> TokenSource for F
where
    F: FnMut() -> Option<(i32, Attribute)>,
{
    fn next_token(&mut self) -> Option<(i32, Attribute)> {
        self()
    }
}

/// Buffers tokens pulled from a [`TokenSource`] so the engine and
/// error recovery can both address them by position without the
/// source being asked for the same token twice.
pub struct TokenBuffer<'s> {
    source: &'s mut dyn TokenSource,
    buffer: Vec<ScannedToken>,
    exhausted: bool,
}

impl<'s> TokenBuffer<'s> {
    pub fn new(source: &'s mut dyn TokenSource) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    fn pull_until(&mut self, index: usize) {
        while !self.exhausted && self.buffer.len() <= index {
            match self.source.next_token() {
                Some((code, attribute)) => self.buffer.push(ScannedToken { code, attribute }),
                None => self.exhausted = true,
            }
        }
    }

    /// The token at `index`, pulling from the host as needed. `None`
    /// once the host's stream has ended.
    pub fn get(&mut self, index: usize) -> Option<&ScannedToken> {
        self.pull_until(index);
        self.buffer.get(index)
    }

    /// How many tokens have been pulled and buffered so far (a lower
    /// bound on the stream's real length until `is_exhausted`).
    pub fn known_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_exhausted_at(&mut self, index: usize) -> bool {
        self.get(index).is_none()
    }
}
