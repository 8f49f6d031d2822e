//! Aho–Corasick-style automaton over the left- and right-hand sides of a presentation's
//! rules, used by the Felsch strategy to find which relations could fire at a node
//! (spec.md §3/§4.4).
//!
//! The trie is built over the *reversed* sides of every rule. Walking it with
//! [`FelschTree::push_front`] one letter at a time, starting from the letter nearest a
//! newly defined edge and working backwards through the word graph's predecessors,
//! therefore walks the trie *forwards* — so a plain child lookup (no failure-link
//! fallback) is exactly the query we need: "does the suffix read so far equal some
//! relation side exactly". Failure links are built anyway (this is the Aho–Corasick
//! automaton the spec names) and are used only by [`FelschTree::skip_forward`], a
//! streaming convenience for callers that walk a fixed word without backtracking.

use crate::alphabet::{Letter, Word};
use crate::presentation::Presentation;

const ROOT: usize = 0;

/// Which side of a rule a trie entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A relation side recorded at a trie's terminal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub rule: usize,
    pub side: Side,
}

#[derive(Debug, Clone)]
struct Node {
    children: Vec<usize>, // indexed by letter, ROOT (0) used as "absent" sentinel offset by +1
    fail: usize,
    output: Vec<Match>,
    merged_output: Vec<Match>,
}

impl Node {
    fn new(alphabet: usize) -> Self {
        Node { children: vec![usize::MAX; alphabet], fail: ROOT, output: Vec::new(), merged_output: Vec::new() }
    }
}

/// See the module documentation for the orientation this trie is built in.
#[derive(Debug, Clone)]
pub struct FelschTree {
    alphabet: usize,
    nodes: Vec<Node>,
    current: usize,
    history: Vec<usize>,
}

impl FelschTree {
    pub fn new(alphabet: usize) -> Self {
        FelschTree { alphabet, nodes: vec![Node::new(alphabet)], current: ROOT, history: Vec::new() }
    }

    /// Build from every rule of `p`, inserting both sides reversed.
    pub fn from_presentation<L: Letter>(p: &Presentation<L>) -> Self {
        let mut tree = FelschTree::new(p.alphabet_size());
        for (i, (u, v)) in p.rules().iter().enumerate() {
            tree.insert(u, Match { rule: i, side: Side::Left });
            tree.insert(v, Match { rule: i, side: Side::Right });
        }
        tree.build_failure_links();
        tree
    }

    fn insert<L: Letter>(&mut self, word: &Word<L>, m: Match) {
        if word.is_empty() {
            return;
        }
        let mut node = ROOT;
        for letter in word.as_slice().iter().rev() {
            let a = letter.as_usize();
            if self.nodes[node].children[a] == usize::MAX {
                self.nodes.push(Node::new(self.alphabet));
                let new_id = self.nodes.len() - 1;
                self.nodes[node].children[a] = new_id;
            }
            node = self.nodes[node].children[a];
        }
        self.nodes[node].output.push(m);
    }

    fn build_failure_links(&mut self) {
        let mut queue = std::collections::VecDeque::new();
        for a in 0..self.alphabet {
            let child = self.nodes[ROOT].children[a];
            if child != usize::MAX {
                self.nodes[child].fail = ROOT;
                queue.push_back(child);
            }
        }
        while let Some(v) = queue.pop_front() {
            let merged = {
                let mut m = self.nodes[v].output.clone();
                m.extend(self.nodes[self.nodes[v].fail].merged_output.clone());
                m
            };
            self.nodes[v].merged_output = merged;
            for a in 0..self.alphabet {
                let child = self.nodes[v].children[a];
                if child == usize::MAX {
                    continue;
                }
                let mut f = self.nodes[v].fail;
                loop {
                    if self.nodes[f].children[a] != usize::MAX {
                        self.nodes[child].fail = self.nodes[f].children[a];
                        break;
                    }
                    if f == ROOT {
                        self.nodes[child].fail = ROOT;
                        break;
                    }
                    f = self.nodes[f].fail;
                }
                queue.push_back(child);
            }
        }
        // root's own merged output is just its (empty) direct output.
        self.nodes[ROOT].merged_output = self.nodes[ROOT].output.clone();
    }

    /// Reset to a fresh single-letter suffix, as if the history were cleared.
    pub fn push_back(&mut self, a: usize) -> bool {
        self.current = ROOT;
        self.history.clear();
        self.push_front(a)
    }

    /// Extend the tracked suffix one letter earlier in the word. Returns `false` (and
    /// leaves the state unchanged) if no relation side has this suffix as a factor.
    pub fn push_front(&mut self, a: usize) -> bool {
        let child = self.nodes[self.current].children[a];
        if child == usize::MAX {
            return false;
        }
        self.history.push(self.current);
        self.current = child;
        true
    }

    /// Undo the most recent successful `push_front`.
    pub fn pop_front(&mut self) {
        if let Some(prev) = self.history.pop() {
            self.current = prev;
        }
    }

    /// Relations whose side ends *exactly* at the current state (the accumulated suffix
    /// equals that side of the relation in full).
    pub fn matches(&self) -> impl Iterator<Item = Match> + '_ {
        self.nodes[self.current].output.iter().copied()
    }

    /// Depth (number of letters) of the currently tracked suffix.
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    /// Failure-link-following transition, for callers streaming through a fixed word who
    /// want every relation-side-ending reported without backtracking. Matches returned
    /// include shorter suffixes reachable through the failure chain.
    pub fn skip_forward(&mut self, a: usize) -> Vec<Match> {
        loop {
            if self.nodes[self.current].children[a] != usize::MAX {
                self.current = self.nodes[self.current].children[a];
                break;
            }
            if self.current == ROOT {
                break;
            }
            self.current = self.nodes[self.current].fail;
        }
        self.history.clear();
        self.nodes[self.current].merged_output.clone()
    }

    pub fn reset(&mut self) {
        self.current = ROOT;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::Presentation;

    fn p() -> Presentation<u16> {
        let mut p: Presentation<u16> = Presentation::new(2, false);
        p.add_rule(vec![0u16, 0, 0].into(), vec![0u16].into()).unwrap();
        p.add_rule(vec![0u16].into(), vec![1u16, 1].into()).unwrap();
        p
    }

    #[test]
    fn matches_exact_suffix() {
        let mut tree = FelschTree::from_presentation(&p());
        // suffix "0" should match rule 1's right side "11"? no - match only full equality.
        // Build suffix "000" letter by letter, from the back: last letter '0', then '0', then '0'.
        assert!(tree.push_back(0));
        assert!(tree.push_front(0));
        assert!(tree.push_front(0));
        let ms: Vec<Match> = tree.matches().collect();
        assert!(ms.iter().any(|m| m.rule == 0 && m.side == Side::Left));
    }

    #[test]
    fn pop_front_restores_state() {
        let mut tree = FelschTree::from_presentation(&p());
        tree.push_back(1);
        tree.push_front(1);
        let depth_before = tree.depth();
        tree.pop_front();
        assert_eq!(tree.depth(), depth_before - 1);
    }

    #[test]
    fn no_match_on_unrelated_suffix() {
        let mut tree = FelschTree::from_presentation(&p());
        tree.push_back(1);
        assert!(tree.matches().next().is_none());
    }
}
