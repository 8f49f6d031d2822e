//! The public facade: own a presentation and generating pairs, race the available solvers,
//! and answer word-problem queries from whichever wins (spec.md §4.8/§6).

use crate::alphabet::{Letter, Word};
use crate::error::{CongruenceError, Result};
use crate::knuth_bendix::KnuthBendixCore;
use crate::order::ShortLex;
use crate::presentation::{Containment, Kind as RunnerKind, Presentation};
use crate::race::{RaceDispatcher, Runner};
use crate::todd_coxeter::ToddCoxeterCore;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The three congruence kinds a caller can ask for. Internally only [`RunnerKind::OneSided`]
/// ("right") and [`RunnerKind::TwoSided`] exist — a left congruence is handled by reversing
/// every word at this boundary (spec.md §7's "reverse trick") so that no runner underneath
/// ever has to know left from right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CongruenceKind {
    Left,
    Right,
    TwoSided,
}

impl CongruenceKind {
    fn runner_kind(self) -> RunnerKind {
        match self {
            CongruenceKind::TwoSided => RunnerKind::TwoSided,
            CongruenceKind::Left | CongruenceKind::Right => RunnerKind::OneSided,
        }
    }

    fn reverses(self) -> bool {
        matches!(self, CongruenceKind::Left)
    }
}

/// Either of the two solvers this crate races, wrapped so [`RaceDispatcher`] can run them
/// side by side despite their being distinct concrete types (spec.md §4.8 races
/// Todd–Coxeter, Knuth–Bendix, and — when eligible — a small-overlap solver; this crate
/// implements the first two, see [`SmallOverlapCheck`] for the third's stubbed boundary).
enum SolverRunner<L: Letter> {
    ToddCoxeter(ToddCoxeterCore<L>),
    KnuthBendix(KnuthBendixCore<L, ShortLex>),
}

impl<L: Letter> Runner for SolverRunner<L> {
    fn run(&mut self) -> bool {
        match self {
            SolverRunner::ToddCoxeter(r) => r.run(),
            SolverRunner::KnuthBendix(r) => r.run(),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            SolverRunner::ToddCoxeter(r) => r.is_finished(),
            SolverRunner::KnuthBendix(r) => r.is_finished(),
        }
    }

    fn stop_flag(&self) -> Arc<AtomicBool> {
        match self {
            SolverRunner::ToddCoxeter(r) => r.stop_flag(),
            SolverRunner::KnuthBendix(r) => r.stop_flag(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SolverRunner::ToddCoxeter(r) => Runner::label(r),
            SolverRunner::KnuthBendix(r) => Runner::label(r),
        }
    }
}

impl<L: Letter> SolverRunner<L> {
    fn as_any(&self) -> &dyn Any {
        match self {
            SolverRunner::ToddCoxeter(r) => r,
            SolverRunner::KnuthBendix(r) => r,
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            SolverRunner::ToddCoxeter(r) => r,
            SolverRunner::KnuthBendix(r) => r,
        }
    }
}

/// The minimal boundary this crate models for a small-overlap (Kambites) collaborator: the
/// dispatcher would add a third runner only once `success` can be established on the
/// presentation. No small-overlap algorithm is implemented (see the crate's Non-goals) —
/// this trait exists only so the boundary type-checks for a caller who supplies one.
pub trait SmallOverlapCheck<L: Letter> {
    fn success(&self, presentation: &Presentation<L>) -> bool;
}

/// Stands in for seeding a [`Congruence`] from a `FroidurePin`'s Cayley graph
/// (spec.md §6). Not implemented — out of scope for this crate — present only so the
/// boundary function signature type-checks for callers porting code that expects it.
pub fn to_congruence<L: Letter>(
    _kind: CongruenceKind,
    _cayley_graph: &crate::word_graph::WordGraph,
) -> Result<Congruence<L>> {
    unimplemented!("FroidurePin -> Congruence seeding is out of scope")
}

/// Owns a presentation, a set of generating pairs, and the race between solvers that
/// decides queries against the congruence they generate (spec.md §4.8).
pub struct Congruence<L: Letter> {
    presentation: Presentation<L>,
    kind: CongruenceKind,
    extra: Vec<(Word<L>, Word<L>)>,
    max_threads: usize,
    timeout: Option<Duration>,
    started: bool,
    dispatcher: Option<RaceDispatcher<SolverRunner<L>>>,
}

impl<L: Letter> Congruence<L> {
    pub fn new(kind: CongruenceKind, presentation: Presentation<L>) -> Self {
        Congruence {
            presentation,
            kind,
            extra: Vec::new(),
            max_threads: usize::MAX,
            timeout: None,
            started: false,
            dispatcher: None,
        }
    }

    pub fn kind(&self) -> CongruenceKind {
        self.kind
    }

    pub fn presentation(&self) -> &Presentation<L> {
        &self.presentation
    }

    pub fn generating_pairs(&self) -> &[(Word<L>, Word<L>)] {
        &self.extra
    }

    /// Add a generating pair. Reinitializes the dispatcher if one had already been built
    /// but racing hadn't started yet; rejected outright once it had (spec.md §4.8, §7's
    /// `MutationAfterStart`).
    pub fn add_generating_pair(&mut self, u: Word<L>, v: Word<L>) -> Result<&mut Self> {
        if self.started {
            return Err(CongruenceError::MutationAfterStart);
        }
        self.extra.push((u, v));
        self.dispatcher = None;
        Ok(self)
    }

    pub fn max_threads(&mut self, n: usize) -> Result<&mut Self> {
        if self.started {
            return Err(CongruenceError::MutationAfterStart);
        }
        self.max_threads = n.max(1);
        Ok(self)
    }

    /// Install a per-race time budget (spec.md §5's "optional per-solver time budget").
    /// Once it elapses without any runner finishing, every runner's `stop_requested` flag
    /// is set — equivalent to external cancellation — and `contains`/`reduce`/
    /// `number_of_classes` surface [`CongruenceError::Cancelled`] instead of blocking
    /// further. With no timeout installed, those calls keep blocking until a runner
    /// finishes, however long that takes.
    pub fn timeout(&mut self, d: Duration) -> Result<&mut Self> {
        if self.started {
            return Err(CongruenceError::MutationAfterStart);
        }
        self.timeout = Some(d);
        Ok(self)
    }

    fn oriented_presentation_and_pairs(&self) -> (Presentation<L>, Vec<(Word<L>, Word<L>)>) {
        if self.kind.reverses() {
            let p = self.presentation.reversed();
            let pairs = self.extra.iter().map(|(u, v)| (u.reversed(), v.reversed())).collect();
            (p, pairs)
        } else {
            (self.presentation.clone(), self.extra.clone())
        }
    }

    fn ensure_dispatcher(&mut self) -> &mut RaceDispatcher<SolverRunner<L>> {
        if self.dispatcher.is_none() {
            self.started = true;
            let (presentation, pairs) = self.oriented_presentation_and_pairs();
            let runner_kind = self.kind.runner_kind();

            let mut tc = ToddCoxeterCore::new(presentation.clone(), runner_kind);
            for (u, v) in &pairs {
                tc.add_generating_pair(u.clone(), v.clone()).expect("fresh runner");
            }

            let mut dispatcher = RaceDispatcher::new();
            dispatcher.max_threads(self.max_threads.min(2).max(1));
            dispatcher.add_runner(SolverRunner::ToddCoxeter(tc));

            if let Ok(mut kb) = KnuthBendixCore::new(presentation, runner_kind, ShortLex) {
                let mut ok = true;
                for (u, v) in &pairs {
                    if kb.add_generating_pair(u.clone(), v.clone()).is_err() {
                        ok = false;
                        break;
                    }
                }
                if ok {
                    dispatcher.add_runner(SolverRunner::KnuthBendix(kb));
                }
            }

            self.dispatcher = Some(dispatcher);
        }
        self.dispatcher.as_mut().unwrap()
    }

    /// Runs the race, honoring `self.timeout` if one was installed. Returns `true` if a
    /// runner actually finished; `false` only happens when a timeout expired first (the
    /// dispatcher always has at least a Todd–Coxeter runner, so an empty-dispatcher `None`
    /// never occurs here).
    fn run_race(&mut self) -> bool {
        let timeout = self.timeout;
        let dispatcher = self.ensure_dispatcher();
        let Some(budget) = timeout else {
            return dispatcher.run().is_some();
        };
        let flags: Vec<Arc<AtomicBool>> = dispatcher.runners().iter().map(|r| r.stop_flag()).collect();
        let done = Arc::new(AtomicBool::new(false));
        let done_for_timer = Arc::clone(&done);
        let timer = std::thread::spawn(move || {
            std::thread::sleep(budget);
            if !done_for_timer.load(Ordering::Relaxed) {
                for flag in &flags {
                    flag.store(true, Ordering::Relaxed);
                }
            }
        });
        let finished = dispatcher.run().is_some();
        done.store(true, Ordering::Relaxed);
        let _ = timer.join();
        finished
    }

    pub fn number_of_classes(&mut self) -> Result<Option<usize>> {
        if !self.run_race() {
            return Err(CongruenceError::Cancelled);
        }
        let dispatcher = self.dispatcher.as_mut().unwrap();
        let Ok(winner) = dispatcher.winner_mut() else { return Ok(None) };
        Ok(match winner {
            SolverRunner::ToddCoxeter(tc) => tc.number_of_classes(),
            SolverRunner::KnuthBendix(_) => None, // KB alone doesn't enumerate classes.
        })
    }

    pub fn contains(&mut self, u: &Word<L>, v: &Word<L>) -> Result<Containment> {
        let (u, v) = if self.kind.reverses() { (u.reversed(), v.reversed()) } else { (u.clone(), v.clone()) };
        if !self.run_race() {
            return Err(CongruenceError::Cancelled);
        }
        let dispatcher = self.dispatcher.as_mut().unwrap();
        Ok(match dispatcher.winner_mut() {
            Ok(SolverRunner::ToddCoxeter(tc)) => tc.contains(&u, &v),
            Ok(SolverRunner::KnuthBendix(kb)) => kb.contains(&u, &v),
            Err(_) => Containment::Unknown,
        })
    }

    pub fn currently_contains(&self, u: &Word<L>, v: &Word<L>) -> Containment {
        let (u, v) = if self.kind.reverses() { (u.reversed(), v.reversed()) } else { (u.clone(), v.clone()) };
        let Some(dispatcher) = self.dispatcher.as_ref() else { return Containment::Unknown };
        match dispatcher.winner() {
            Ok(SolverRunner::ToddCoxeter(tc)) => tc.currently_contains(&u, &v),
            Ok(SolverRunner::KnuthBendix(kb)) => kb.currently_contains(&u, &v),
            Err(_) => Containment::Unknown,
        }
    }

    pub fn reduce(&mut self, w: &Word<L>) -> Result<Word<L>> {
        let input = if self.kind.reverses() { w.reversed() } else { w.clone() };
        if !self.run_race() {
            return Err(CongruenceError::Cancelled);
        }
        let dispatcher = self.dispatcher.as_mut().unwrap();
        let reduced = match dispatcher.winner_mut() {
            Ok(SolverRunner::ToddCoxeter(tc)) => tc.reduce(&input),
            Ok(SolverRunner::KnuthBendix(kb)) => kb.reduce(&input),
            Err(_) => input,
        };
        Ok(if self.kind.reverses() { reduced.reversed() } else { reduced })
    }

    /// `true` if a runner of type `T` exists in the dispatcher (spec.md §4.8's `has<T>()`).
    pub fn has<T: 'static>(&self) -> bool {
        self.dispatcher
            .as_ref()
            .map_or(false, |d| d.runners().iter().any(|r| r.as_any().is::<T>()))
    }

    /// Borrow the runner of type `T`, if the dispatcher has one (spec.md §4.8's `get<T>()`).
    pub fn get<T: 'static>(&self) -> Result<&T> {
        self.dispatcher
            .as_ref()
            .and_then(|d| d.runners().iter().find_map(|r| r.as_any().downcast_ref::<T>()))
            .ok_or(CongruenceError::MissingRunner)
    }

    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T> {
        self.dispatcher
            .as_mut()
            .and_then(|d| d.runners_mut().iter_mut().find_map(|r| r.as_any_mut().downcast_mut::<T>()))
            .ok_or(CongruenceError::MissingRunner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::DefaultLetter as L16;

    fn z2() -> Presentation<L16> {
        let mut p: Presentation<L16> = Presentation::new(1, true);
        p.add_rule(vec![0u16, 0].into(), Word::empty()).unwrap();
        p
    }

    #[test]
    fn number_of_classes_via_race() {
        let mut c = Congruence::new(CongruenceKind::TwoSided, z2());
        assert_eq!(c.number_of_classes().unwrap(), Some(2));
    }

    #[test]
    fn has_and_get_todd_coxeter_runner() {
        let mut c = Congruence::new(CongruenceKind::TwoSided, z2());
        c.number_of_classes().unwrap();
        assert!(c.has::<ToddCoxeterCore<L16>>());
        assert!(c.get::<ToddCoxeterCore<L16>>().is_ok());
    }

    #[test]
    fn contains_respects_left_reversal() {
        let mut p: Presentation<L16> = Presentation::new(2, false);
        p.add_rule(vec![0u16, 1].into(), vec![1u16, 0].into()).unwrap();
        let mut c = Congruence::new(CongruenceKind::Left, p);
        let u: Word<L16> = vec![0u16, 1].into();
        let v: Word<L16> = vec![1u16, 0].into();
        assert_eq!(c.contains(&u, &v).unwrap(), Containment::Yes);
    }

    #[test]
    fn timeout_surfaces_cancelled_instead_of_blocking() {
        // A free semigroup on 2 generators (no relations) never terminates enumeration.
        let p: Presentation<L16> = Presentation::new(2, false);
        let mut c = Congruence::new(CongruenceKind::TwoSided, p);
        c.timeout(std::time::Duration::from_millis(20)).unwrap();
        let u: Word<L16> = vec![0u16].into();
        let v: Word<L16> = vec![1u16].into();
        assert_eq!(c.contains(&u, &v), Err(CongruenceError::Cancelled));
    }

    #[test]
    fn timeout_cannot_be_installed_after_the_race_has_started() {
        let mut c = Congruence::new(CongruenceKind::TwoSided, z2());
        c.number_of_classes().unwrap();
        assert!(matches!(
            c.timeout(std::time::Duration::from_secs(1)),
            Err(CongruenceError::MutationAfterStart)
        ));
    }

    #[test]
    fn mutation_after_start_is_rejected() {
        let mut c = Congruence::new(CongruenceKind::TwoSided, z2());
        c.number_of_classes();
        assert!(c.add_generating_pair(Word::empty(), Word::empty()).is_err());
    }
}
