//! A trie over rewrite-rule left-hand sides, used by Knuth–Bendix to reduce a word to
//! normal form in time roughly linear in its length (spec.md §4.6).
//!
//! Unlike [`crate::felsch_tree::FelschTree`] (built over reversed sides, queried backward,
//! never removed from), this trie is built over sides read left-to-right and supports
//! removing a rule — Knuth–Bendix constantly retires rules that a new, smaller rule makes
//! redundant.

use crate::alphabet::{Letter, Word};

const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct Node {
    children: Vec<usize>, // usize::MAX = absent
    rule: Option<usize>,  // rule id whose LHS ends exactly here
}

impl Node {
    fn new(alphabet: usize) -> Self {
        Node { children: vec![usize::MAX; alphabet], rule: None }
    }
}

/// Maps rewrite rule left-hand sides to rule ids, supporting insertion, lazy removal, and
/// "does any LHS occur as a factor of this word" queries via [`RewriteTrie::rewrite`].
#[derive(Debug, Clone)]
pub struct RewriteTrie {
    alphabet: usize,
    nodes: Vec<Node>,
}

impl RewriteTrie {
    pub fn new(alphabet: usize) -> Self {
        RewriteTrie { alphabet, nodes: vec![Node::new(alphabet)] }
    }

    /// Register `lhs` as the left-hand side of rule `rule_id`.
    pub fn add_rule<L: Letter>(&mut self, lhs: &Word<L>, rule_id: usize) {
        let mut node = ROOT;
        for letter in lhs.iter() {
            let a = letter.as_usize();
            if self.nodes[node].children[a] == usize::MAX {
                self.nodes.push(Node::new(self.alphabet));
                let new_id = self.nodes.len() - 1;
                self.nodes[node].children[a] = new_id;
            }
            node = self.nodes[node].children[a];
        }
        self.nodes[node].rule = Some(rule_id);
    }

    /// Forget `lhs` as an active rule's left-hand side; its trie nodes are left in place
    /// (lazy removal — they may still be shared prefixes of other rules).
    pub fn remove_rule<L: Letter>(&mut self, lhs: &Word<L>) {
        let mut node = ROOT;
        for letter in lhs.iter() {
            let a = letter.as_usize();
            let next = self.nodes[node].children[a];
            if next == usize::MAX {
                return;
            }
            node = next;
        }
        self.nodes[node].rule = None;
    }

    /// Find the first position in `w` (scanning left to right) at which some registered
    /// LHS occurs as a factor, and which rule id matched. Used by [`Self::rewrite`], and
    /// exposed directly for critical-pair search over overlapping LHSs.
    pub fn find_match<L: Letter>(&self, w: &Word<L>) -> Option<(usize, usize, usize)> {
        let letters = w.as_slice();
        for start in 0..letters.len() {
            let mut node = ROOT;
            for (offset, letter) in letters[start..].iter().enumerate() {
                let a = letter.as_usize();
                let next = self.nodes[node].children[a];
                if next == usize::MAX {
                    break;
                }
                node = next;
                if let Some(rule_id) = self.nodes[node].rule {
                    return Some((start, start + offset + 1, rule_id));
                }
            }
        }
        None
    }

    /// `true` if this trie has a node at all (a nonempty alphabet was used); mainly a
    /// guard for degenerate zero-letter presentations.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[ROOT].rule.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_registered_lhs_as_factor() {
        let mut t = RewriteTrie::new(2);
        let lhs: Word<u16> = vec![0u16, 0].into();
        t.add_rule(&lhs, 7);
        let w: Word<u16> = vec![1u16, 0, 0, 1].into();
        let (start, end, rule) = t.find_match(&w).unwrap();
        assert_eq!((start, end, rule), (1, 3, 7));
    }

    #[test]
    fn removed_rule_no_longer_matches() {
        let mut t = RewriteTrie::new(2);
        let lhs: Word<u16> = vec![0u16].into();
        t.add_rule(&lhs, 1);
        t.remove_rule(&lhs);
        let w: Word<u16> = vec![0u16, 1].into();
        assert!(t.find_match(&w).is_none());
    }

    #[test]
    fn no_match_when_nothing_occurs() {
        let t = RewriteTrie::new(2);
        let w: Word<u16> = vec![0u16, 1].into();
        assert!(t.find_match(&w).is_none());
    }
}
