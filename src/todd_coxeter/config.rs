//! The flat option record for [`super::ToddCoxeterCore`] (spec.md §9).

/// Which of the two interleavable enumeration strategies drives the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Hlt,
    Felsch,
}

/// What happens to the Felsch definition stack once it grows past `def_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionPolicy {
    NoStackIfNoSpace,
    PurgeFromTop,
    PurgeAll,
    DiscardAll,
    Unlimited,
}

/// Whether a lookahead pass considers only nodes added since the last lookahead, or the
/// whole graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadExtent {
    Partial,
    Full,
}

/// The order enumeration is standardized into once it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardizeOrder {
    ShortLex,
    Lex,
    Recursive,
}

/// Options never change the congruence computed, only the path taken to compute it
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToddCoxeterSettings {
    pub strategy: Strategy,
    pub def_policy: DefinitionPolicy,
    pub def_max: usize,
    pub lookahead_style: Strategy,
    pub lookahead_extent: LookaheadExtent,
    pub lookahead_next: usize,
    pub lookahead_min: usize,
    pub lookahead_growth_factor: f64,
    pub lookahead_growth_threshold: usize,
    pub lower_bound: Option<usize>,
    pub standardize: bool,
    pub use_relations_in_extra: bool,
    pub standardize_order: StandardizeOrder,
}

impl Default for ToddCoxeterSettings {
    fn default() -> Self {
        ToddCoxeterSettings {
            strategy: Strategy::Hlt,
            def_policy: DefinitionPolicy::Unlimited,
            def_max: usize::MAX,
            lookahead_style: Strategy::Hlt,
            lookahead_extent: LookaheadExtent::Partial,
            lookahead_next: 2_000,
            lookahead_min: 500,
            lookahead_growth_factor: 2.0,
            lookahead_growth_threshold: 4,
            lower_bound: None,
            standardize: true,
            use_relations_in_extra: false,
            standardize_order: StandardizeOrder::ShortLex,
        }
    }
}
