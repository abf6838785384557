//! Parser configuration.
//!
//! Plain setter methods on the long-lived object they configure,
//! rather than a builder consumed by value: [`ParserOptions`] is
//! mutated via `Grammar::set_*` before the first `parse` call.

/// How much lookahead the recognizer and Leo optimizer use.
///
/// - `None`: pure Earley, no lookahead filtering of predictions.
/// - `Static`: situations are parameterized by a FOLLOW-derived
///   lookahead computed once at grammar finalization.
/// - `Dynamic`: lookahead is recomputed per parse from the live item
///   sets; required for Leo's "deterministic chain" predicate to stay
///   correct in the presence of lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookaheadLevel {
    #[default]
    None,
    Static,
    Dynamic,
}

impl LookaheadLevel {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::None),
            1 => Some(Self::Static),
            2 => Some(Self::Dynamic),
            _ => None,
        }
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Which candidates the forest builder keeps at each ambiguous node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Keep only the minimum-cost subtree.
    #[default]
    MinimumCost,
    /// Keep every minimum-cost candidate under an alternatives node.
    AllMinimumCost,
    /// Keep every candidate, regardless of cost.
    AllCandidates,
}

#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub lookahead: LookaheadLevel,
    pub one_parse: bool,
    pub cost_enabled: bool,
    pub error_recovery_enabled: bool,
    pub recovery_match: u32,
    pub loops_enabled: bool,
    pub ambiguity_policy: AmbiguityPolicy,
    /// Discarding this many tokens without regaining sync gives up.
    pub max_error_tokens: u32,
    /// Upper bound on synthetic tokens reinserted per recovery
    /// attempt, tried alongside discards in increasing total-cost
    /// order (see `recovery::attempt`).
    pub max_recovery_insert: u32,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            lookahead: LookaheadLevel::None,
            one_parse: true,
            cost_enabled: false,
            error_recovery_enabled: false,
            recovery_match: 3,
            loops_enabled: false,
            ambiguity_policy: AmbiguityPolicy::MinimumCost,
            max_error_tokens: 32,
            max_recovery_insert: 4,
        }
    }
}

impl ParserOptions {
    pub fn set_one_parse(&mut self, one_parse: bool) {
        self.one_parse = one_parse;
        if !one_parse && matches!(self.ambiguity_policy, AmbiguityPolicy::MinimumCost) {
            self.ambiguity_policy = AmbiguityPolicy::AllMinimumCost;
        }
    }

    pub fn set_cost(&mut self, enabled: bool) {
        self.cost_enabled = enabled;
    }

    pub fn set_error_recovery(&mut self, enabled: bool) {
        self.error_recovery_enabled = enabled;
    }

    pub fn set_recovery_match(&mut self, n: u32) {
        self.recovery_match = n;
    }

    pub fn set_lookahead_level(&mut self, level: u8) -> Option<()> {
        self.lookahead = LookaheadLevel::from_level(level)?;
        Some(())
    }

    pub fn set_loops_enabled(&mut self, enabled: bool) {
        self.loops_enabled = enabled;
    }
}
