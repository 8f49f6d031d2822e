//! A dispatcher that runs several solvers for the same congruence in parallel and reports
//! whichever one finishes first (spec.md §4.7/§5, "race").
//!
//! Each solver already knows how to cancel itself cooperatively (a shared
//! `Arc<AtomicBool>` flag, checked between incremental steps of its own main loop); the
//! dispatcher's only job is to start every runner on its own scoped thread, wait for the
//! first to report it finished, and flip every other runner's flag so the losers wind
//! down promptly instead of running to completion uselessly.

use crate::error::{CongruenceError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// The common shape every racing solver presents: [`crate::todd_coxeter::ToddCoxeterCore`]
/// and [`crate::knuth_bendix::KnuthBendixCore`] both satisfy this directly.
pub trait Runner: Send {
    /// Run to completion or until [`Self::stop_flag`] is observed set. Returns `true` if
    /// the computation actually finished (as opposed to being cancelled).
    fn run(&mut self) -> bool;

    fn is_finished(&self) -> bool;

    /// The flag this runner polls cooperatively; the dispatcher sets it on every runner
    /// that didn't win.
    fn stop_flag(&self) -> Arc<AtomicBool>;

    /// A short label for logging (e.g. `"todd-coxeter"`).
    fn label(&self) -> &'static str;
}

/// Runs a fixed set of [`Runner`]s concurrently and reports the first to finish.
///
/// Generic over `R` rather than `Box<dyn Runner>` because [`crate::congruence::Congruence`]
/// only ever races a known, small, fixed pair of concrete solver types — see
/// [`crate::congruence`] for how it builds one [`RaceDispatcher`] per solver type pairing.
pub struct RaceDispatcher<R: Runner> {
    runners: Vec<R>,
    max_threads: Option<usize>,
    winner: Option<usize>,
}

impl<R: Runner> RaceDispatcher<R> {
    pub fn new() -> Self {
        RaceDispatcher { runners: Vec::new(), max_threads: None, winner: None }
    }

    pub fn add_runner(&mut self, runner: R) -> &mut Self {
        self.runners.push(runner);
        self
    }

    pub fn max_threads(&mut self, n: usize) -> &mut Self {
        self.max_threads = Some(n);
        self
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Run every runner concurrently (bounded by [`Self::max_threads`] if set; otherwise
    /// one thread per runner) and block until the first one finishes. Every other
    /// runner's stop flag is set as soon as a winner is known. Returns the winning
    /// runner's index, or `None` if every runner was cancelled without finishing (this
    /// only happens if something outside the dispatcher sets a runner's flag first).
    pub fn run(&mut self) -> Option<usize> {
        if self.runners.is_empty() {
            return None;
        }
        if let Some(0) = self.max_threads {
            return None;
        }
        let worker_count = self.max_threads.unwrap_or(self.runners.len()).clamp(1, self.runners.len());
        let winner_slot: AtomicUsize = AtomicUsize::new(usize::MAX);
        let flags: Vec<Arc<AtomicBool>> = self.runners.iter().map(|r| r.stop_flag()).collect();
        log::info!(
            "race: starting {} runner(s) on {} worker thread(s)",
            self.runners.len(),
            worker_count
        );

        // Static round-robin partition so each worker thread owns a disjoint, exclusive set
        // of runners for the whole race; a runner whose group-mate already won is skipped
        // without ever being started.
        let mut groups: Vec<Vec<(usize, &mut R)>> = (0..worker_count).map(|_| Vec::new()).collect();
        for (idx, runner) in self.runners.iter_mut().enumerate() {
            groups[idx % worker_count].push((idx, runner));
        }

        std::thread::scope(|scope| {
            for group in groups {
                let winner_slot = &winner_slot;
                let flags = &flags;
                scope.spawn(move || {
                    for (idx, runner) in group {
                        if winner_slot.load(Ordering::SeqCst) != usize::MAX {
                            break;
                        }
                        let label = runner.label();
                        let finished = runner.run();
                        if finished
                            && winner_slot
                                .compare_exchange(usize::MAX, idx, Ordering::SeqCst, Ordering::SeqCst)
                                .is_ok()
                        {
                            log::info!("race: {label} (runner {idx}) won");
                            for (j, flag) in flags.iter().enumerate() {
                                if j != idx {
                                    flag.store(true, Ordering::Relaxed);
                                }
                            }
                        }
                    }
                });
            }
        });
        let winner = winner_slot.load(Ordering::SeqCst);
        self.winner = if winner == usize::MAX { None } else { Some(winner) };
        self.winner
    }

    pub fn winner_index(&self) -> Result<usize> {
        self.winner.ok_or(CongruenceError::NoWinner)
    }

    pub fn winner(&self) -> Result<&R> {
        self.winner.map(|i| &self.runners[i]).ok_or(CongruenceError::NoWinner)
    }

    pub fn winner_mut(&mut self) -> Result<&mut R> {
        self.winner.map(move |i| &mut self.runners[i]).ok_or(CongruenceError::NoWinner)
    }

    pub fn runner(&self, index: usize) -> Option<&R> {
        self.runners.get(index)
    }

    pub fn runner_mut(&mut self, index: usize) -> Option<&mut R> {
        self.runners.get_mut(index)
    }

    pub fn runners(&self) -> &[R] {
        &self.runners
    }

    pub fn runners_mut(&mut self) -> &mut [R] {
        &mut self.runners
    }
}

impl<R: Runner> Default for RaceDispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct Counting {
        steps: Arc<AtomicU32>,
        target: u32,
        stop: Arc<AtomicBool>,
        finished: bool,
        label: &'static str,
    }

    impl Runner for Counting {
        fn run(&mut self) -> bool {
            while self.steps.load(Ordering::Relaxed) < self.target {
                if self.stop.load(Ordering::Relaxed) {
                    return false;
                }
                self.steps.fetch_add(1, Ordering::Relaxed);
                std::thread::yield_now();
            }
            self.finished = true;
            true
        }

        fn is_finished(&self) -> bool {
            self.finished
        }

        fn stop_flag(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.stop)
        }

        fn label(&self) -> &'static str {
            self.label
        }
    }

    #[test]
    fn fastest_runner_wins_and_cancels_the_other() {
        let mut dispatcher: RaceDispatcher<Counting> = RaceDispatcher::new();
        dispatcher.add_runner(Counting {
            steps: Arc::new(AtomicU32::new(0)),
            target: 5,
            stop: Arc::new(AtomicBool::new(false)),
            finished: false,
            label: "fast",
        });
        dispatcher.add_runner(Counting {
            steps: Arc::new(AtomicU32::new(0)),
            target: 50_000,
            stop: Arc::new(AtomicBool::new(false)),
            finished: false,
            label: "slow",
        });
        let winner = dispatcher.run().expect("some runner should finish");
        assert_eq!(winner, 0);
        assert!(dispatcher.runner(1).unwrap().stop_flag().load(Ordering::Relaxed));
    }

    #[test]
    fn empty_dispatcher_has_no_winner() {
        let mut dispatcher: RaceDispatcher<Counting> = RaceDispatcher::new();
        assert_eq!(dispatcher.run(), None);
        assert!(dispatcher.winner_index().is_err());
    }

    #[test]
    fn max_threads_zero_runs_nothing() {
        let mut dispatcher: RaceDispatcher<Counting> = RaceDispatcher::new();
        dispatcher.add_runner(Counting {
            steps: Arc::new(AtomicU32::new(0)),
            target: 1,
            stop: Arc::new(AtomicBool::new(false)),
            finished: false,
            label: "only",
        });
        dispatcher.max_threads(0);
        assert_eq!(dispatcher.run(), None);
    }

    #[test]
    fn max_threads_one_still_finds_a_winner() {
        let mut dispatcher: RaceDispatcher<Counting> = RaceDispatcher::new();
        dispatcher.add_runner(Counting {
            steps: Arc::new(AtomicU32::new(0)),
            target: 3,
            stop: Arc::new(AtomicBool::new(false)),
            finished: false,
            label: "first",
        });
        dispatcher.add_runner(Counting {
            steps: Arc::new(AtomicU32::new(0)),
            target: 3,
            stop: Arc::new(AtomicBool::new(false)),
            finished: false,
            label: "second",
        });
        dispatcher.max_threads(1);
        // A single worker thread owns both runners and runs them in order, so the first
        // one always wins; this also exercises that bounding threads still completes the
        // whole race instead of deadlocking or starving the later runners.
        let winner = dispatcher.run().expect("some runner should finish");
        assert_eq!(winner, 0);
        assert!(dispatcher.runner(0).unwrap().is_finished());
    }
}
