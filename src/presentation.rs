//! Presentations `⟨A | R⟩` and the kind of congruence they generate.

use crate::alphabet::{Letter, Word};
use crate::error::{CongruenceError, Result};

/// Whether a congruence is compatible with multiplication on one side or both.
///
/// Left congruences are never represented directly by a runner: the facade reverses
/// every word at the boundary (spec.md §7, "the reverse trick") so that every runner
/// only ever has to deal with `OneSided` (meaning "right") or `TwoSided`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    OneSided,
    TwoSided,
}

/// The tri-state answer to a word-problem query (spec.md §6,
/// `contains`/`currently_contains`): a solver may not yet know enough to say `No`, but
/// never claims `Yes` without certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Containment {
    Yes,
    No,
    Unknown,
}

/// A finite presentation `⟨A | R⟩`.
///
/// `alphabet_size` letters, numbered `0..alphabet_size`; `rules` is a user-ordered
/// sequence of `(u, v)` pairs. Rule order is preserved verbatim by `rules()` even though
/// solvers are free to reorder their own internal copies (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation<L: Letter> {
    alphabet_size: usize,
    rules: Vec<(Word<L>, Word<L>)>,
    contains_empty_word: bool,
}

impl<L: Letter> Presentation<L> {
    /// Create an empty presentation over `alphabet_size` letters.
    pub fn new(alphabet_size: usize, contains_empty_word: bool) -> Self {
        Presentation { alphabet_size, rules: Vec::new(), contains_empty_word }
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn contains_empty_word(&self) -> bool {
        self.contains_empty_word
    }

    pub fn rules(&self) -> &[(Word<L>, Word<L>)] {
        &self.rules
    }

    /// Add a rule, checking the invariants from spec.md §3.
    pub fn add_rule(&mut self, u: Word<L>, v: Word<L>) -> Result<()> {
        self.validate_word(&u)?;
        self.validate_word(&v)?;
        if !self.contains_empty_word && (u.is_empty() || v.is_empty()) {
            return Err(CongruenceError::InvalidPresentation(
                "rule has an empty side but the presentation does not contain the empty word"
                    .into(),
            ));
        }
        self.rules.push((u, v));
        Ok(())
    }

    fn validate_word(&self, w: &Word<L>) -> Result<()> {
        for letter in w.iter() {
            if letter.as_usize() >= self.alphabet_size {
                return Err(CongruenceError::InvalidPresentation(format!(
                    "letter {:?} is not in the alphabet of size {}",
                    letter.as_usize(),
                    self.alphabet_size
                )));
            }
        }
        Ok(())
    }

    /// The presentation obtained by reversing every rule, used to reduce a left
    /// congruence to a right one (spec.md §7).
    pub fn reversed(&self) -> Presentation<L> {
        Presentation {
            alphabet_size: self.alphabet_size,
            rules: self.rules.iter().map(|(u, v)| (u.reversed(), v.reversed())).collect(),
            contains_empty_word: self.contains_empty_word,
        }
    }

    /// A presentation identical to this one but over `alphabet_size + 1` letters, the new
    /// letter being the highest index. Used by Knuth–Bendix's one-sided adaptation
    /// (spec.md §4.6, "extra letter trick").
    pub fn with_extra_letter(&self) -> Presentation<L> {
        Presentation {
            alphabet_size: self.alphabet_size + 1,
            rules: self.rules.clone(),
            contains_empty_word: self.contains_empty_word,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_letters_outside_alphabet() {
        let mut p: Presentation<u16> = Presentation::new(2, false);
        let bad: Word<u16> = vec![5u16].into();
        assert!(p.add_rule(bad, vec![0u16].into()).is_err());
    }

    #[test]
    fn rejects_empty_sides_unless_declared() {
        let mut p: Presentation<u16> = Presentation::new(2, false);
        assert!(p.add_rule(Word::empty(), vec![0u16].into()).is_err());

        let mut q: Presentation<u16> = Presentation::new(2, true);
        assert!(q.add_rule(Word::empty(), vec![0u16].into()).is_ok());
    }

    #[test]
    fn reversed_flips_every_rule() {
        let mut p: Presentation<u16> = Presentation::new(2, false);
        p.add_rule(vec![0u16, 1].into(), vec![1u16].into()).unwrap();
        let r = p.reversed();
        assert_eq!(r.rules()[0].0.as_slice(), &[1u16, 0]);
    }
}
