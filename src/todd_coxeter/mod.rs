//! Coset enumeration: build the word graph of a congruence's quotient action and decide
//! the word problem against it (spec.md §4.5).
//!
//! Two interleavable strategies make definitions — HLT traces every relation and
//! generating pair eagerly from every active node, allocating new nodes as needed; Felsch
//! never guesses, forcing exactly one undefined edge at a time and propagating its
//! consequences through [`FelschGraph`] before forcing the next. Both strategies feed the
//! same coincidence queue, drained by [`ToddCoxeterCore::drain_coincidences`] exactly as
//! spec.md §4.5's pseudocode describes: pop a pair, redirect the larger-numbered node's
//! sources and out-edges onto the smaller, free the larger.

pub mod config;

use crate::alphabet::{Letter, Word};
use crate::felsch_graph::FelschGraph;
use crate::node_manager::NodeManager;
use crate::presentation::{Containment, Kind, Presentation};
use crate::union_find::UnionFind;
use crate::word_graph::UNDEFINED;
use config::{DefinitionPolicy, LookaheadExtent, Strategy, ToddCoxeterSettings};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const ROOT: usize = 0;

/// Coset enumeration's mutable working state, built lazily on the first [`ToddCoxeterCore::run`]
/// call so that a presentation can still gain generating pairs right up until then.
struct RunState<L: Letter> {
    felsch: FelschGraph<L>,
    node_manager: NodeManager,
    coincidences: VecDeque<(usize, usize)>,
    next_undefined_cursor: usize,
    merges_since_lookahead: usize,
    lookahead_threshold: usize,
    lookahead_growths: usize,
    class_words: Option<Vec<Word<L>>>,
}

/// Enumerates the coset/word graph of `presentation` together with a set of generating
/// pairs, deciding membership in the congruence those pairs generate.
pub struct ToddCoxeterCore<L: Letter> {
    presentation: Presentation<L>,
    kind: Kind,
    extra: Vec<(Word<L>, Word<L>)>,
    settings: ToddCoxeterSettings,
    started: bool,
    finished: bool,
    state: Option<RunState<L>>,
    stop: Arc<AtomicBool>,
}

impl<L: Letter> ToddCoxeterCore<L> {
    pub fn new(presentation: Presentation<L>, kind: Kind) -> Self {
        ToddCoxeterCore {
            presentation,
            kind,
            extra: Vec::new(),
            settings: ToddCoxeterSettings::default(),
            started: false,
            finished: false,
            state: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_settings(mut self, settings: ToddCoxeterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn presentation(&self) -> &Presentation<L> {
        &self.presentation
    }

    pub fn generating_pairs(&self) -> &[(Word<L>, Word<L>)] {
        &self.extra
    }

    /// Add a generating pair `(u, v)`; rejected once enumeration has begun, matching
    /// spec.md §7's `MutationAfterStart`.
    pub fn add_generating_pair(&mut self, u: Word<L>, v: Word<L>) -> crate::error::Result<()> {
        if self.started {
            return Err(crate::error::CongruenceError::MutationAfterStart);
        }
        self.extra.push((u, v));
        Ok(())
    }

    /// The shared cancellation flag; clone it to hand to a dispatcher racing this runner
    /// against others.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_state(&mut self) -> &mut RunState<L> {
        if self.state.is_none() {
            let felsch_presentation = if self.kind == Kind::TwoSided {
                let mut p = self.presentation.clone();
                for (u, v) in &self.extra {
                    // ignore invalid; extras are validated against the same alphabet at
                    // the facade boundary before ever reaching here.
                    let _ = p.add_rule(u.clone(), v.clone());
                }
                p
            } else {
                self.presentation.clone()
            };
            let state = RunState {
                felsch: FelschGraph::new(1, felsch_presentation),
                node_manager: NodeManager::new(1),
                coincidences: VecDeque::new(),
                next_undefined_cursor: ROOT,
                merges_since_lookahead: 0,
                lookahead_threshold: self.settings.lookahead_next,
                lookahead_growths: 0,
                class_words: None,
            };
            self.state = Some(state);
        }
        self.state.as_mut().unwrap()
    }

    /// Run (or resume) enumeration until it completes or [`Self::cancel`] is observed.
    /// Returns `true` if enumeration finished.
    pub fn run(&mut self) -> bool {
        if self.finished {
            return true;
        }
        self.started = true;
        log::debug!("todd-coxeter: starting enumeration ({:?} strategy)", self.settings.strategy);
        self.ensure_state();
        loop {
            if self.stop.load(Ordering::Relaxed) {
                log::info!("todd-coxeter: cancelled before completion");
                return false;
            }
            let progressed = match self.settings.strategy {
                Strategy::Hlt => self.hlt_pass(),
                Strategy::Felsch => self.felsch_pass(),
            };
            if let Some(bound) = self.settings.lower_bound {
                if self.active_class_count() >= bound && self.graph_is_complete_and_consistent() {
                    break;
                }
            }
            if !progressed {
                if self.complete_one_missing_edge() {
                    continue;
                }
                break;
            }
            self.clear_definitions_if_needed();
            self.maybe_run_lookahead();
        }
        self.run_lookahead();
        self.finished = true;
        log::info!(
            "todd-coxeter: finished with {} classes",
            self.number_of_classes_unchecked()
        );
        if self.settings.standardize {
            self.standardize();
        }
        true
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn resume(&mut self) -> bool {
        self.stop.store(false, Ordering::Relaxed);
        self.run()
    }

    // ---- HLT strategy -----------------------------------------------------------

    fn hlt_pass(&mut self) -> bool {
        let rules = self.presentation.rules().to_vec();
        let extra = self.extra.clone();
        let kind = self.kind;
        let snapshot: Vec<usize> = {
            let st = self.ensure_state();
            st.node_manager.active_nodes().collect()
        };
        let mut progressed = false;
        for v in snapshot {
            if !self.ensure_state().node_manager.is_active(v) {
                continue;
            }
            for (u, w) in &rules {
                // A coincidence processed by an earlier rule in this loop may have
                // identified `v` with some other node and freed it; nothing further about
                // `v` is meaningful once that happens, so move on to the next node.
                if !self.ensure_state().node_manager.is_active(v) {
                    break;
                }
                if self.trace_and_compare(v, u, w) {
                    progressed = true;
                }
            }
            if self.ensure_state().node_manager.is_active(v) && (kind == Kind::TwoSided || v == ROOT) {
                for (u, w) in &extra {
                    if !self.ensure_state().node_manager.is_active(v) {
                        break;
                    }
                    if self.trace_and_compare(v, u, w) {
                        progressed = true;
                    }
                }
            }
        }
        progressed
    }

    /// Trace `u` and `w` from `v`, allocating new nodes as needed; if they disagree,
    /// enqueue and process the coincidence. Returns whether any new node was allocated or
    /// a coincidence was processed.
    fn trace_and_compare(&mut self, v: usize, u: &Word<L>, w: &Word<L>) -> bool {
        let cap_before = self.ensure_state().node_manager.capacity();
        let nu = self.trace_with_alloc(v, u);
        let nw = self.trace_with_alloc(v, w);
        let mut changed = self.ensure_state().node_manager.capacity() != cap_before;
        if nu != nw {
            self.ensure_state().coincidences.push_back((nu, nw));
            self.drain_coincidences();
            changed = true;
        }
        changed
    }

    fn trace_with_alloc(&mut self, start: usize, word: &Word<L>) -> usize {
        let mut cur = start;
        for letter in word.iter() {
            let a = letter.as_usize();
            let st = self.ensure_state();
            let next = st.felsch.target(cur, a);
            cur = if next == UNDEFINED {
                let new_node = st.node_manager.allocate();
                if new_node >= st.felsch.graph().node_count() {
                    st.felsch.add_nodes(new_node + 1 - st.felsch.graph().node_count());
                }
                st.felsch.define_edge(cur, a, new_node);
                new_node
            } else {
                next
            };
        }
        cur
    }

    // ---- Felsch strategy ----------------------------------------------------------

    fn felsch_pass(&mut self) -> bool {
        if let Some((v, a)) = self.next_undefined_active() {
            let st = self.ensure_state();
            let new_node = st.node_manager.allocate();
            if new_node >= st.felsch.graph().node_count() {
                st.felsch.add_nodes(new_node + 1 - st.felsch.graph().node_count());
            }
            st.felsch.define_edge(v, a, new_node);
            let found = st.felsch.process_definitions();
            for c in found {
                st.coincidences.push_back(c);
            }
            self.drain_coincidences();
            self.check_root_extras();
            true
        } else {
            self.check_root_extras();
            false
        }
    }

    /// For a one-sided congruence, generating pairs are only valid from the root; Felsch's
    /// tree-based matching can't express "only from this node", so they're checked
    /// directly here using only already-defined edges (no allocation, matching Felsch's
    /// never-guess discipline).
    fn check_root_extras(&mut self) {
        if self.kind != Kind::OneSided {
            return;
        }
        let extra = self.extra.clone();
        for (u, w) in &extra {
            let st = self.ensure_state();
            let (nu, cu) = st.felsch.graph().graph().follow_path_partial(ROOT, u);
            let (nw, cw) = st.felsch.graph().graph().follow_path_partial(ROOT, w);
            if cu == u.len() && cw == w.len() && nu != nw {
                st.coincidences.push_back((nu, nw));
            }
        }
        self.drain_coincidences();
    }

    fn next_undefined_active(&mut self) -> Option<(usize, usize)> {
        let st = self.ensure_state();
        let d = st.felsch.graph().out_degree();
        if d == 0 {
            return None;
        }
        let start = st.next_undefined_cursor;
        let nodes: Vec<usize> = st.node_manager.active_nodes().collect();
        if nodes.is_empty() {
            return None;
        }
        let start_pos = nodes.iter().position(|&n| n >= start).unwrap_or(0);
        for &v in nodes[start_pos..].iter().chain(nodes[..start_pos].iter()) {
            for a in 0..d {
                if st.felsch.target(v, a) == UNDEFINED {
                    st.next_undefined_cursor = v;
                    return Some((v, a));
                }
            }
        }
        None
    }

    /// Standard HLT cleanup: any active node with a still-undefined out-edge gets it
    /// forced to a fresh node. Needed because plain relation tracing never touches a
    /// generator absent from every rule.
    fn complete_one_missing_edge(&mut self) -> bool {
        match self.next_undefined_active() {
            Some((v, a)) => {
                let st = self.ensure_state();
                let new_node = st.node_manager.allocate();
                if new_node >= st.felsch.graph().node_count() {
                    st.felsch.add_nodes(new_node + 1 - st.felsch.graph().node_count());
                }
                st.felsch.define_edge(v, a, new_node);
                true
            }
            None => false,
        }
    }

    // ---- Coincidence processing (spec.md §4.5) -------------------------------------

    /// Drain every pending coincidence to a fixed point (including ones process_definitions
    /// discovers along the way), using a single [`UnionFind`] for the whole session.
    ///
    /// One instance matters for correctness, not just efficiency: a pair popped off the
    /// queue may name a node already merged away earlier in this same session (e.g. `x`
    /// was `hi` in an earlier merge). Since no node allocation happens anywhere in this
    /// function, node ids are stable for its whole duration, so `uf.find` alone resolves
    /// such a stale reference to its true surviving representative; recreating the
    /// union-find mid-session would instead treat that dead id as a fresh singleton and
    /// double-free it in [`NodeManager::free`].
    fn drain_coincidences(&mut self) {
        if self.ensure_state().coincidences.is_empty() {
            return;
        }
        let mut uf = UnionFind::new(self.ensure_state().node_manager.capacity());
        loop {
            let next = self.ensure_state().coincidences.pop_front();
            let Some((x, y)) = next else {
                let found = self.ensure_state().felsch.process_definitions();
                if found.is_empty() {
                    break;
                }
                for c in found {
                    self.ensure_state().coincidences.push_back(c);
                }
                continue;
            };
            let Some((lo, hi)) = uf.union_keep_min(x, y) else { continue };
            log::debug!("todd-coxeter: merging node {hi} into {lo}");
            let d = self.ensure_state().felsch.graph().out_degree();
            for label in 0..d {
                let sources: Vec<usize> = self.ensure_state().felsch.graph().sources(hi, label).collect();
                for u in sources {
                    self.ensure_state().felsch.define_edge(u, label, lo);
                }
                let target_hi = self.ensure_state().felsch.target(hi, label);
                if target_hi != UNDEFINED {
                    let target_lo = self.ensure_state().felsch.target(lo, label);
                    self.ensure_state().felsch.graph_mut().remove_edge(hi, label);
                    if target_lo != UNDEFINED {
                        if target_lo != target_hi {
                            self.ensure_state().coincidences.push_back((target_lo, target_hi));
                        }
                    } else {
                        self.ensure_state().felsch.define_edge(lo, label, target_hi);
                    }
                }
            }
            self.ensure_state().node_manager.free(hi);
            self.ensure_state().merges_since_lookahead += 1;
        }
    }

    fn clear_definitions_if_needed(&mut self) {
        let max = self.settings.def_max;
        let policy = self.settings.def_policy;
        let st = self.ensure_state();
        match policy {
            DefinitionPolicy::Unlimited => {}
            DefinitionPolicy::DiscardAll => st.felsch.clear_definitions_if_over(max),
            DefinitionPolicy::NoStackIfNoSpace => st.felsch.truncate_to(max),
            DefinitionPolicy::PurgeFromTop => {
                st.felsch.purge_active_from_top(max, |n| st.node_manager.is_active(n));
            }
            DefinitionPolicy::PurgeAll => {
                st.felsch.purge_inactive(max, |n| st.node_manager.is_active(n));
            }
        }
    }

    /// Trigger an intermediate lookahead once enough merges have accumulated since the
    /// last one, growing the threshold geometrically up to `lookahead_growth_threshold`
    /// times (spec.md §9's `lookahead_growth_factor`/`lookahead_growth_threshold`).
    fn maybe_run_lookahead(&mut self) {
        let factor = self.settings.lookahead_growth_factor;
        let min = self.settings.lookahead_min;
        let cap = self.settings.lookahead_growth_threshold;
        let due = {
            let st = self.ensure_state();
            st.merges_since_lookahead >= st.lookahead_threshold
        };
        if !due {
            return;
        }
        {
            let st = self.ensure_state();
            st.merges_since_lookahead = 0;
            if st.lookahead_growths < cap {
                st.lookahead_threshold = ((st.lookahead_threshold as f64 * factor) as usize).max(min);
                st.lookahead_growths += 1;
            }
        }
        self.run_lookahead();
    }

    fn run_lookahead(&mut self) {
        let extent = self.settings.lookahead_extent;
        let style = self.settings.lookahead_style;
        log::debug!("todd-coxeter: running {style:?} lookahead ({extent:?})");
        // A lookahead pass is just one more application of the chosen strategy to a fixed
        // point; partial vs. full only changes which nodes a real implementation would
        // restrict itself to. We always sweep every active node, which is the `Full`
        // behavior and a safe (if occasionally slower) superset of `Partial`.
        loop {
            let progressed = match style {
                Strategy::Hlt => self.hlt_pass(),
                Strategy::Felsch => self.felsch_pass(),
            };
            if !progressed && !self.complete_one_missing_edge() {
                break;
            }
        }
    }

    fn active_class_count(&self) -> usize {
        self.state.as_ref().map_or(0, |st| st.node_manager.active_nodes().count())
    }

    fn graph_is_complete_and_consistent(&self) -> bool {
        self.state.as_ref().map_or(false, |st| {
            let d = st.felsch.graph().out_degree();
            st.node_manager.active_nodes().all(|v| (0..d).all(|a| st.felsch.target(v, a) != UNDEFINED))
        })
    }

    fn number_of_classes_unchecked(&self) -> usize {
        let active = self.active_class_count();
        if self.presentation.contains_empty_word() {
            active
        } else {
            active.saturating_sub(1)
        }
    }

    /// Total count of congruence classes, or `None` if enumeration hasn't finished
    /// (running it to completion first).
    pub fn number_of_classes(&mut self) -> Option<usize> {
        self.run();
        self.finished.then(|| self.number_of_classes_unchecked())
    }

    // ---- Standardization & normal forms --------------------------------------------

    /// Assign each class its canonical representative word: a BFS spanning tree rooted at
    /// the identity class, labels visited in increasing generator order, which is exactly
    /// a shortlex-least root-to-node path. `Lex`/`Recursive` standardization would need a
    /// different traversal to match those orders' own notion of "least"; this crate only
    /// special-cases `ShortLex` (spec.md §9's Open Question on standardization leaves the
    /// others unresolved, so `Lex`/`Recursive` currently standardize the same way).
    fn standardize(&mut self) {
        let roots = vec![ROOT];
        let parents = self.state.as_ref().unwrap().felsch.graph().graph().spanning_forest(&roots);
        let mut words: Vec<Word<L>> = vec![Word::empty(); parents.len()];
        let mut order_ids: Vec<usize> = (0..parents.len())
            .filter(|&v| self.state.as_ref().unwrap().node_manager.is_active(v))
            .collect();
        order_ids.sort_by_key(|&v| spanning_depth(&parents, v));
        for v in order_ids {
            if v == ROOT {
                continue;
            }
            if let Some((p, a)) = parents[v] {
                let mut w = words[p].clone();
                w.push(L::from_usize(a));
                words[v] = w;
            }
        }
        self.state.as_mut().unwrap().class_words = Some(words);
    }

    /// Rewrite `w` to the canonical representative of its class: the shortlex-least word
    /// labelling a root-to-class path in the spanning tree built at standardization.
    pub fn reduce(&mut self, w: &Word<L>) -> Word<L> {
        self.run();
        let st = self.state.as_mut().unwrap();
        if st.class_words.is_none() {
            drop(st);
            self.standardize();
        }
        let st = self.state.as_ref().unwrap();
        let node = st.felsch.graph().graph().follow_path(ROOT, w);
        debug_assert_ne!(node, UNDEFINED, "reduce called on a word outside the alphabet's reach");
        st.class_words.as_ref().unwrap()[node].clone()
    }

    /// Word-problem query, running enumeration to completion (or until cancelled) first.
    pub fn contains(&mut self, u: &Word<L>, v: &Word<L>) -> Containment {
        if !self.run() {
            return Containment::Unknown;
        }
        if self.reduce(u) == self.reduce(v) {
            Containment::Yes
        } else {
            Containment::No
        }
    }

    /// Best-effort query against whatever has been enumerated so far, without driving
    /// enumeration further.
    pub fn currently_contains(&self, u: &Word<L>, v: &Word<L>) -> Containment {
        let Some(st) = self.state.as_ref() else { return Containment::Unknown };
        let (nu, cu) = st.felsch.graph().graph().follow_path_partial(ROOT, u);
        let (nv, cv) = st.felsch.graph().graph().follow_path_partial(ROOT, v);
        if cu != u.len() || cv != v.len() {
            return Containment::Unknown;
        }
        if nu == nv {
            Containment::Yes
        } else if self.finished {
            Containment::No
        } else {
            Containment::Unknown
        }
    }

    /// Every class's canonical representative, in node order (excluding the identity's
    /// placeholder class when the presentation has none).
    pub fn normal_forms(&mut self) -> Vec<Word<L>> {
        self.run();
        if self.state.as_ref().unwrap().class_words.is_none() {
            self.standardize();
        }
        let st = self.state.as_ref().unwrap();
        let words = st.class_words.as_ref().unwrap();
        let skip_root = !self.presentation.contains_empty_word();
        words
            .iter()
            .enumerate()
            .filter(|&(i, _)| !(skip_root && i == ROOT) && st.node_manager.is_active(i))
            .map(|(_, w)| w.clone())
            .collect()
    }
}

impl<L: Letter> crate::race::Runner for ToddCoxeterCore<L> {
    fn run(&mut self) -> bool {
        ToddCoxeterCore::run(self)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn stop_flag(&self) -> Arc<AtomicBool> {
        ToddCoxeterCore::stop_flag(self)
    }

    fn label(&self) -> &'static str {
        "todd-coxeter"
    }
}

fn spanning_depth(parents: &[Option<(usize, usize)>], mut v: usize) -> usize {
    let mut depth = 0;
    while let Some((p, _)) = parents[v] {
        depth += 1;
        v = p;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::DefaultLetter as Letter16;

    fn presentation(rules: &[(&[u16], &[u16])]) -> Presentation<Letter16> {
        let mut p = Presentation::new(2, false);
        for (u, w) in rules {
            p.add_rule(u.to_vec().into(), w.to_vec().into()).unwrap();
        }
        p
    }

    #[test]
    fn z2_has_two_classes() {
        // <a | a^2 = a^0> over monoid with empty word: a has order 2.
        let mut p: Presentation<Letter16> = Presentation::new(1, true);
        p.add_rule(vec![0u16, 0].into(), Word::empty()).unwrap();
        let mut tc = ToddCoxeterCore::new(p, Kind::TwoSided);
        assert_eq!(tc.number_of_classes(), Some(2));
    }

    #[test]
    fn free_semigroup_on_one_generator_has_one_class_without_identity() {
        let p: Presentation<Letter16> = Presentation::new(1, false);
        let mut tc = ToddCoxeterCore::new(p, Kind::TwoSided);
        // Bound the enumeration or it diverges: a free semigroup is infinite. Instead
        // check only that a congruence collapsing everything to one class behaves.
        tc.add_generating_pair(vec![0u16].into(), vec![0u16, 0].into()).unwrap();
        assert_eq!(tc.number_of_classes(), Some(1));
    }

    #[test]
    fn reduce_picks_shortlex_representative() {
        let p = presentation(&[(&[0, 0, 0], &[0]), (&[0], &[1, 1])]);
        let mut tc = ToddCoxeterCore::new(p, Kind::TwoSided);
        let r1 = tc.reduce(&vec![0u16, 0, 0].into());
        let r2 = tc.reduce(&vec![0u16].into());
        assert_eq!(r1, r2);
    }

    #[test]
    fn one_sided_extra_only_applies_from_root() {
        let p = presentation(&[(&[0, 0], &[0])]);
        let mut tc = ToddCoxeterCore::new(p, Kind::OneSided);
        tc.add_generating_pair(vec![1u16].into(), vec![1u16, 1].into()).unwrap();
        assert!(tc.number_of_classes().unwrap() >= 1);
    }

    #[test]
    fn contains_detects_equal_and_distinct_words() {
        let p = presentation(&[(&[0, 0, 0], &[0]), (&[0], &[1, 1])]);
        let mut tc = ToddCoxeterCore::new(p, Kind::TwoSided);
        let u: Word<u16> = vec![0u16, 0, 0].into();
        let v: Word<u16> = vec![0u16].into();
        assert_eq!(tc.contains(&u, &v), Containment::Yes);
    }
}
