//! The single error type surfaced across the crate.

/// Every way a [`crate::presentation::Presentation`], [`crate::congruence::Congruence`]
/// or one of the solvers underneath it can fail.
///
/// Construction-time problems (`InvalidPresentation`, `AlphabetTooLarge`) are reported
/// synchronously from the call that created the offending object; everything else is
/// reported from the call that needed the unavailable information. See `spec.md` §7 for
/// the propagation policy this mirrors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CongruenceError {
    /// A rule referenced a letter outside the presentation's alphabet, or one side of a
    /// rule was empty while the presentation does not admit the empty word.
    #[error("invalid presentation: {0}")]
    InvalidPresentation(String),

    /// Knuth–Bendix represents letters internally as a bounded integer; presentations
    /// with more letters than that representation can hold are rejected at construction.
    #[error("alphabet of size {size} is too large for Knuth-Bendix (limit is {limit})")]
    AlphabetTooLarge { size: usize, limit: usize },

    /// A runner was asked to solve a congruence kind it cannot handle directly (a left
    /// congruence presented without having gone through the reverse trick first).
    #[error("runner cannot handle this congruence kind directly")]
    IncompatibleCongruenceKind,

    /// `winner()` was called before any runner had finished.
    #[error("no runner has finished yet")]
    NoWinner,

    /// `get::<T>()` was called for a runner type the dispatcher never instantiated.
    #[error("dispatcher has no runner of the requested type")]
    MissingRunner,

    /// A generating pair was added after the dispatcher had already started racing.
    #[error("cannot mutate the congruence after the race has started")]
    MutationAfterStart,

    /// A runner returned because cancellation was observed, not because it finished.
    #[error("computation was cancelled before it finished")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CongruenceError>;
