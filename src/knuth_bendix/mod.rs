//! Knuth–Bendix completion: turn a congruence's generating relations into a confluent
//! rewriting system, from which the word problem is decidable by rewriting both sides to
//! normal form and comparing (spec.md §4.6).
//!
//! A one-sided congruence with generating pairs is handled via the extra-letter trick: the
//! alphabet gets one fresh letter `#` appended, and each pair `(u, v)` contributes the rule
//! `u·# → v·#` instead of `u → v`, anchoring the match to the end of the word so completion
//! only identifies words sharing a common right multiplier rather than rewriting anywhere
//! inside them. `#` never appears in a caller-visible word; see [`KnuthBendixCore::new`] and
//! [`KnuthBendixCore::reduce`].

pub mod config;

use crate::alphabet::{Letter, Word};
use crate::error::{CongruenceError, Result};
use crate::order::ReductionOrder;
use crate::presentation::{Containment, Kind, Presentation};
use crate::rewrite_trie::RewriteTrie;
use config::{KnuthBendixSettings, OverlapPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Knuth–Bendix represents a letter as a bounded integer internally (via [`Letter`]); this
/// is the largest alphabet it will accept, matching spec.md §7's `AlphabetTooLarge`.
pub const MAX_ALPHABET: usize = 255;

#[derive(Debug, Clone)]
struct Rule<L: Letter> {
    lhs: Word<L>,
    rhs: Word<L>,
    active: bool,
}

/// A confluent (once [`Self::run`] finishes) rewriting system equivalent to a
/// presentation plus a set of two-sided generating pairs.
pub struct KnuthBendixCore<L: Letter, O: ReductionOrder<L>> {
    presentation: Presentation<L>,
    kind: Kind,
    order: O,
    settings: KnuthBendixSettings,
    extra: Vec<(Word<L>, Word<L>)>,
    rules: Vec<Rule<L>>,
    trie: Option<RewriteTrie>,
    started: bool,
    finished: bool,
    confluent: bool,
    stop: Arc<AtomicBool>,
}

impl<L: Letter, O: ReductionOrder<L>> KnuthBendixCore<L, O> {
    /// Build a runner for `presentation` under `order`. Fails if the alphabet exceeds
    /// [`MAX_ALPHABET`].
    pub fn new(presentation: Presentation<L>, kind: Kind, order: O) -> Result<Self> {
        if presentation.alphabet_size() > MAX_ALPHABET {
            return Err(CongruenceError::AlphabetTooLarge {
                size: presentation.alphabet_size(),
                limit: MAX_ALPHABET,
            });
        }
        Ok(KnuthBendixCore {
            presentation,
            kind,
            order,
            settings: KnuthBendixSettings::default(),
            extra: Vec::new(),
            rules: Vec::new(),
            trie: None,
            started: false,
            finished: false,
            confluent: false,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// True once a one-sided congruence has at least one generating pair, at which point
    /// the extra letter `#` is appended to the working alphabet (spec.md §4.6).
    fn requires_extra_letter(&self) -> bool {
        self.kind == Kind::OneSided && !self.extra.is_empty()
    }

    /// The index of the marker letter `#`, once [`Self::requires_extra_letter`] is true.
    fn extra_letter(&self) -> Option<usize> {
        self.requires_extra_letter().then(|| self.presentation.alphabet_size())
    }

    fn effective_alphabet_size(&self) -> usize {
        if self.requires_extra_letter() {
            self.presentation.with_extra_letter().alphabet_size()
        } else {
            self.presentation.alphabet_size()
        }
    }

    /// Append the marker letter, if one is in use, so boundary-anchored rules can match.
    fn with_marker(&self, w: &Word<L>) -> Word<L> {
        match self.extra_letter() {
            Some(m) => {
                let mut letters = w.as_slice().to_vec();
                letters.push(L::from_usize(m));
                Word::new(letters)
            }
            None => w.clone(),
        }
    }

    /// Strip a trailing marker letter back off, so callers never see `#`.
    fn strip_marker(&self, w: Word<L>) -> Word<L> {
        match self.extra_letter() {
            Some(m) => {
                let mut letters = w.as_slice().to_vec();
                if letters.last().map(|l| l.as_usize()) == Some(m) {
                    letters.pop();
                }
                Word::new(letters)
            }
            None => w,
        }
    }

    pub fn with_settings(mut self, settings: KnuthBendixSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn presentation(&self) -> &Presentation<L> {
        &self.presentation
    }

    pub fn generating_pairs(&self) -> &[(Word<L>, Word<L>)] {
        &self.extra
    }

    pub fn add_generating_pair(&mut self, u: Word<L>, v: Word<L>) -> Result<()> {
        if self.started {
            return Err(CongruenceError::MutationAfterStart);
        }
        if self.kind == Kind::OneSided
            && self.extra.is_empty()
            && self.presentation.alphabet_size() + 1 > MAX_ALPHABET
        {
            return Err(CongruenceError::AlphabetTooLarge {
                size: self.presentation.alphabet_size() + 1,
                limit: MAX_ALPHABET,
            });
        }
        self.extra.push((u, v));
        Ok(())
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_confluent(&self) -> bool {
        self.confluent
    }

    pub fn active_rule_count(&self) -> usize {
        self.rules.iter().filter(|r| r.active).count()
    }

    /// Reduce `w` to normal form under the currently active rules (not necessarily
    /// confluent yet, if called mid-run).
    pub fn rewrite(&self, w: &Word<L>) -> Word<L> {
        let Some(trie) = self.trie.as_ref() else { return w.clone() };
        let mut cur = w.clone();
        loop {
            match trie.find_match(&cur) {
                None => return cur,
                Some((start, end, rule_id)) => {
                    let rule = &self.rules[rule_id];
                    debug_assert!(rule.active, "trie matched a retired rule");
                    let mut out = cur.as_slice()[..start].to_vec();
                    out.extend_from_slice(rule.rhs.as_slice());
                    out.extend_from_slice(&cur.as_slice()[end..]);
                    cur = Word::new(out);
                }
            }
        }
    }

    /// Run completion to a fixed point, or until [`Self::cancel`] is observed. Returns
    /// `true` if a confluent system was reached.
    pub fn run(&mut self) -> bool {
        if self.finished {
            return true;
        }
        self.started = true;
        log::debug!("knuth-bendix: starting completion");
        let alphabet_size = self.effective_alphabet_size();
        self.trie.get_or_insert_with(|| RewriteTrie::new(alphabet_size));
        self.seed_rules();
        let mut i = 0;
        while i < self.rules.len() {
            if self.stop.load(Ordering::Relaxed) {
                log::info!("knuth-bendix: cancelled before confluence");
                return false;
            }
            if self.rules[i].active {
                for j in 0..=i {
                    if !self.rules[j].active {
                        continue;
                    }
                    let pairs = self.overlaps(i, j);
                    for (u, v) in pairs {
                        self.add_rule_internal(u, v);
                        if self.stop.load(Ordering::Relaxed) {
                            return false;
                        }
                    }
                    if self.rules.len() > self.settings.max_rules {
                        log::warn!("knuth-bendix: hit max_rules, stopping without confluence");
                        self.finished = true;
                        self.confluent = false;
                        return true;
                    }
                }
            }
            i += 1;
        }
        self.finished = true;
        self.confluent = true;
        log::info!("knuth-bendix: confluent with {} active rules", self.active_rule_count());
        true
    }

    pub fn resume(&mut self) -> bool {
        self.stop.store(false, Ordering::Relaxed);
        self.run()
    }

    fn seed_rules(&mut self) {
        let rules: Vec<(Word<L>, Word<L>)> = self.presentation.rules().to_vec();
        for (u, v) in rules {
            self.add_rule_internal(u, v);
        }
        let extra = self.extra.clone();
        for (u, v) in extra {
            let (u, v) = (self.with_marker(&u), self.with_marker(&v));
            self.add_rule_internal(u, v);
        }
    }

    /// Orient a (rewritten) candidate rule, insert it, and retire or shrink any existing
    /// rule it makes redundant (spec.md §4.6, rule management).
    fn add_rule_internal(&mut self, u: Word<L>, v: Word<L>) {
        let u = self.rewrite(&u);
        let v = self.rewrite(&v);
        if u == v {
            return;
        }
        let Some((lhs, rhs)) = self.order.orient(u, v) else { return };
        let id = self.rules.len();
        self.trie.as_mut().expect("trie built before rule seeding").add_rule(&lhs, id);
        log::debug!("knuth-bendix: rule {id}: {lhs:?} -> {rhs:?}");
        self.rules.push(Rule { lhs: lhs.clone(), rhs, active: true });
        self.retire_redundant_rules(id, &lhs);
    }

    fn retire_redundant_rules(&mut self, new_id: usize, new_lhs: &Word<L>) {
        let mut requeue = Vec::new();
        for i in 0..self.rules.len() {
            if i == new_id || !self.rules[i].active {
                continue;
            }
            if contains_factor(self.rules[i].lhs.as_slice(), new_lhs.as_slice()) {
                self.rules[i].active = false;
                let lhs = self.rules[i].lhs.clone();
                self.trie.as_mut().expect("trie built before rule seeding").remove_rule(&lhs);
                requeue.push((self.rules[i].lhs.clone(), self.rules[i].rhs.clone()));
                log::debug!("knuth-bendix: rule {i} retired, subsumed by rule {new_id}");
                continue;
            }
            if contains_factor(self.rules[i].rhs.as_slice(), new_lhs.as_slice()) {
                let reduced = self.rewrite(&self.rules[i].rhs.clone());
                self.rules[i].rhs = reduced;
            }
        }
        for (u, v) in requeue {
            self.add_rule_internal(u, v);
        }
    }

    /// Every critical pair from overlapping `lhs_i` and `lhs_j` (spec.md §4.6, "overlap
    /// search"). `i == j` covers self-overlaps.
    fn overlaps(&self, i: usize, j: usize) -> Vec<(Word<L>, Word<L>)> {
        let a = &self.rules[i];
        let b = &self.rules[j];
        if !a.active || !b.active {
            return Vec::new();
        }
        let la = a.lhs.as_slice();
        let lb = b.lhs.as_slice();
        let max_k = la.len().min(lb.len());
        if max_k < 1 {
            return Vec::new();
        }
        let candidate_ks: Vec<usize> = match self.settings.overlap_policy {
            OverlapPolicy::MaxAbBc => {
                if max_k >= 2 {
                    vec![max_k - 1]
                } else {
                    Vec::new()
                }
            }
            OverlapPolicy::Abc | OverlapPolicy::AbBc => (1..max_k).collect(),
        };
        let mut out = Vec::new();
        for k in candidate_ks {
            if let Some(limit) = self.settings.max_overlap_length {
                if la.len() + lb.len() - k > limit {
                    continue;
                }
            }
            if la[la.len() - k..] == lb[..k] {
                let mut left = a.rhs.as_slice().to_vec();
                left.extend_from_slice(&lb[k..]);
                let mut right = la[..la.len() - k].to_vec();
                right.extend_from_slice(b.rhs.as_slice());
                out.push((Word::new(left), Word::new(right)));
            }
        }
        out
    }

    pub fn contains(&mut self, u: &Word<L>, v: &Word<L>) -> Containment {
        if !self.run() {
            return Containment::Unknown;
        }
        let (u, v) = (self.with_marker(u), self.with_marker(v));
        if self.rewrite(&u) == self.rewrite(&v) {
            Containment::Yes
        } else {
            Containment::No
        }
    }

    pub fn currently_contains(&self, u: &Word<L>, v: &Word<L>) -> Containment {
        let (u, v) = (self.with_marker(u), self.with_marker(v));
        let ru = self.rewrite(&u);
        let rv = self.rewrite(&v);
        if ru == rv {
            Containment::Yes
        } else if self.confluent {
            Containment::No
        } else {
            Containment::Unknown
        }
    }

    pub fn reduce(&mut self, w: &Word<L>) -> Word<L> {
        self.run();
        let marked = self.with_marker(w);
        self.strip_marker(self.rewrite(&marked))
    }

    /// The Gilman graph: the deterministic automaton of normal forms, one node per
    /// distinct prefix of an active rule's left-hand side (including the empty prefix)
    /// that is itself irreducible, edges labelled by the letter that extends it (omitted
    /// if doing so would immediately match some rule's LHS). Requires a confluent system.
    pub fn gilman_graph(&self) -> Option<crate::word_graph::WordGraph> {
        if !self.confluent {
            return None;
        }
        let mut prefixes: Vec<Vec<usize>> = vec![Vec::new()];
        for rule in self.rules.iter().filter(|r| r.active) {
            let letters: Vec<usize> = rule.lhs.iter().map(|l| l.as_usize()).collect();
            for end in 1..letters.len() {
                let prefix = letters[..end].to_vec();
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }
        let d = self.effective_alphabet_size();
        let mut graph = crate::word_graph::WordGraph::new(prefixes.len(), d);
        for (idx, prefix) in prefixes.iter().enumerate() {
            for a in 0..d {
                let mut candidate = prefix.clone();
                candidate.push(a);
                if self.rules.iter().any(|r| r.active && r.lhs.as_slice().iter().map(|l| l.as_usize()).eq(candidate.iter().copied())) {
                    continue; // extending here would immediately reduce; no edge.
                }
                if let Some(target) = prefixes.iter().position(|p| p == &candidate) {
                    graph.set_target(idx, a, target);
                }
            }
        }
        Some(graph)
    }
}

impl<L: Letter, O: ReductionOrder<L>> crate::race::Runner for KnuthBendixCore<L, O> {
    fn run(&mut self) -> bool {
        KnuthBendixCore::run(self)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn stop_flag(&self) -> Arc<AtomicBool> {
        KnuthBendixCore::stop_flag(self)
    }

    fn label(&self) -> &'static str {
        "knuth-bendix"
    }
}

fn contains_factor<L: Letter>(haystack: &[L], needle: &[L]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ShortLex;

    fn kb(rules: &[(&[u16], &[u16])], alphabet: usize) -> KnuthBendixCore<u16, ShortLex> {
        let mut p: Presentation<u16> = Presentation::new(alphabet, false);
        for (u, v) in rules {
            p.add_rule(u.to_vec().into(), v.to_vec().into()).unwrap();
        }
        KnuthBendixCore::new(p, Kind::TwoSided, ShortLex).unwrap()
    }

    fn kb_one_sided(alphabet: usize) -> KnuthBendixCore<u16, ShortLex> {
        let p: Presentation<u16> = Presentation::new(alphabet, false);
        KnuthBendixCore::new(p, Kind::OneSided, ShortLex).unwrap()
    }

    #[test]
    fn alphabet_too_large_is_rejected_at_construction() {
        let p: Presentation<u16> = Presentation::new(MAX_ALPHABET + 1, false);
        assert!(KnuthBendixCore::new(p, Kind::TwoSided, ShortLex).is_err());
    }

    #[test]
    fn one_sided_generating_pair_is_accepted_via_extra_letter() {
        let mut k = kb_one_sided(1);
        k.add_generating_pair(vec![0u16].into(), vec![0u16, 0].into()).unwrap();
        assert!(k.run());
        assert!(k.active_rule_count() >= 1);
    }

    #[test]
    fn one_sided_reduce_never_emits_the_marker() {
        let mut k = kb_one_sided(1);
        k.add_generating_pair(vec![0u16].into(), vec![0u16, 0].into()).unwrap();
        let reduced = k.reduce(&vec![0u16, 0, 0].into());
        assert!(reduced.as_slice().iter().all(|&l| (l as usize) < 1));
    }

    #[test]
    fn one_sided_without_pairs_behaves_like_plain_completion() {
        let mut k = kb_one_sided(1);
        k.run();
        assert_eq!(k.extra_letter(), None);
        assert_eq!(
            k.contains(&vec![0u16].into(), &vec![0u16].into()),
            Containment::Yes
        );
    }

    #[test]
    fn rewrites_using_active_rule() {
        let mut k = kb(&[(&[0, 0], &[0])], 1);
        k.run();
        let w: Word<u16> = vec![0u16, 0, 0, 0].into();
        assert_eq!(k.rewrite(&w), vec![0u16].into());
    }

    #[test]
    fn confluent_system_decides_equal_words() {
        let mut k = kb(&[(&[0, 1], &[1, 0]), (&[0, 0], &[0]), (&[1, 1], &[1])], 2);
        assert_eq!(
            k.contains(&vec![0u16, 1, 0].into(), &vec![1u16, 0, 0].into()),
            Containment::Yes
        );
    }

    #[test]
    fn distinct_normal_forms_are_not_contained() {
        let mut k = kb(&[(&[0, 0], &[0])], 2);
        assert_eq!(
            k.contains(&vec![0u16].into(), &vec![1u16].into()),
            Containment::No
        );
    }
}
