//! The speculative parallel-for engine.
//!
//! Workers draw items from a shared worklist and apply the operator to each
//! under an iteration context. A conflicted iteration rolls back, its item
//! lands on the aborted queue, and the leader worker retries it between
//! pops. The loop drains when ring-token termination detection observes
//! global quiescence, or earlier when a committed iteration requests a
//! break.

use crate::runtime::operator::Operator;
use crate::runtime::stats::{LogReporter, LoopReport, LoopStatistics, StatsReporter};
use crate::runtime::termination::TerminationDetection;
use crate::runtime::user_context::UserContext;
use crate::runtime::worklist::{AbortedQueue, InjectorWorklist, PopResult, Worklist};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Barrier;

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct ForEachConfig {
    /// Worker thread count.
    pub workers: usize,
    /// Loop name used in reported statistics.
    pub loopname: &'static str,
}

impl Default for ForEachConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            loopname: "(anon)",
        }
    }
}

/// Accept-all initial-work filter.
pub fn select_all<T>(_: &T) -> bool {
    true
}

struct WorkerTld<'g, T> {
    facing: UserContext<'g, T>,
    stat: LoopStatistics,
}

struct Engine<'a, 'g, T, F, W> {
    wl: &'a W,
    f: &'a F,
    aborted: AbortedQueue<T>,
    term: TerminationDetection,
    break_happened: CachePadded<AtomicBool>,
    abort_happened: CachePadded<AtomicBool>,
    _loop_data: PhantomData<&'g ()>,
}

impl<'a, 'g, T, F, W> Engine<'a, 'g, T, F, W>
where
    T: Send + Clone,
    F: Operator<'g, T>,
    W: Worklist<T>,
{
    fn new(wl: &'a W, f: &'a F, workers: usize) -> Self {
        Self {
            wl,
            f,
            aborted: AbortedQueue::new(workers),
            term: TerminationDetection::new(workers),
            break_happened: CachePadded::new(AtomicBool::new(false)),
            abort_happened: CachePadded::new(AtomicBool::new(false)),
            _loop_data: PhantomData,
        }
    }

    #[inline]
    fn break_raised(&self) -> bool {
        F::NEEDS_BREAK && self.break_happened.load(Ordering::Relaxed)
    }

    /// Tail of one iteration: flush or discard side effects, then commit or
    /// roll back.
    fn finish_iteration(&self, aborting: bool, item: T, wid: usize, tld: &mut WorkerTld<'g, T>) {
        if aborting {
            tld.facing.cancel_iteration();
            if F::COLLECT_STATS {
                tld.stat.inc_conflicts();
            }
            // The fence orders the rollback before the requeue becomes
            // visible through the abort flag.
            fence(Ordering::SeqCst);
            self.aborted.push(wid, item);
            self.abort_happened.store(true, Ordering::Relaxed);
            // An aborted iteration may neither break the loop nor publish
            // its pushes.
            tld.facing.reset_break();
            tld.facing.clear_pushes();
        }

        if F::NEEDS_PUSH {
            for v in tld.facing.take_pushes() {
                self.wl.push(v);
            }
        }
        if F::NEEDS_PER_ITER_ALLOC {
            tld.facing.reset_scratch();
        }
        if F::NEEDS_BREAK && tld.facing.break_requested() {
            self.break_happened.store(true, Ordering::Relaxed);
        }
        if !aborting {
            tld.facing.commit_iteration();
        }
    }

    fn do_process(&self, item: T, wid: usize, tld: &mut WorkerTld<'g, T>) {
        if F::COLLECT_STATS {
            tld.stat.inc_iterations();
        }
        tld.facing.start_iteration();
        let aborted = self.f.apply(item.clone(), &mut tld.facing).is_err();
        self.finish_iteration(aborted, item, wid, tld);
    }

    /// Leader-only: retry rolled-back items so they do not wait for global
    /// quiescence.
    fn drain_aborted<const IS_LEADER: bool>(&self, wid: usize, tld: &mut WorkerTld<'g, T>) {
        if !IS_LEADER {
            return;
        }
        if !self.abort_happened.load(Ordering::Relaxed) {
            return;
        }
        self.term.work_happened(wid);
        self.abort_happened.store(false, Ordering::Relaxed);
        while let Some(item) = self.aborted.pop(wid) {
            if self.break_raised() {
                return;
            }
            self.do_process(item, wid, tld);
        }
    }

    fn go<const IS_LEADER: bool>(&self, wid: usize, tld: &mut WorkerTld<'g, T>) {
        'run: loop {
            loop {
                match self.wl.pop() {
                    PopResult::Item(item) => {
                        self.term.work_happened(wid);
                        // Break observed before the item begins: the item is
                        // consumed but never executed.
                        if self.break_raised() {
                            break 'run;
                        }
                        self.do_process(item, wid, tld);
                        self.drain_aborted::<IS_LEADER>(wid, tld);
                    }
                    PopResult::Retry => {
                        std::hint::spin_loop();
                        continue;
                    }
                    PopResult::Empty => break,
                }
            }

            self.drain_aborted::<IS_LEADER>(wid, tld);
            if self.break_raised() {
                break 'run;
            }
            self.term.local_termination(wid);
            if self.term.global_termination() {
                break 'run;
            }
            std::hint::spin_loop();
        }
    }
}

/// Run `f` over `initial` and everything it pushes, with the default
/// worklist, accept-all filter, and log-based statistics reporting.
pub fn for_each<'g, T, F>(initial: Vec<T>, f: &F, config: &ForEachConfig) -> LoopReport
where
    T: Send + Sync + Clone,
    F: Operator<'g, T>,
{
    for_each_filtered(initial, f, select_all, config, &LogReporter)
}

/// Full-control entry point: initial-work filter and statistics sink.
///
/// Initial items are split into `ceil(n / workers)`-sized contiguous slices;
/// each worker pushes its slice through `filter` into the worklist, then all
/// workers synchronize on a barrier before the engine starts.
pub fn for_each_filtered<'g, T, F, P, R>(
    initial: Vec<T>,
    f: &F,
    filter: P,
    config: &ForEachConfig,
    reporter: &R,
) -> LoopReport
where
    T: Send + Sync + Clone,
    F: Operator<'g, T>,
    P: Fn(&T) -> bool + Sync,
    R: StatsReporter,
{
    let workers = config.workers.max(1);
    let wl = InjectorWorklist::new();
    let engine = Engine::new(&wl, f, workers);
    let barrier = Barrier::new(workers);
    let stats: Mutex<Vec<LoopStatistics>> = Mutex::new(vec![LoopStatistics::default(); workers]);

    let dist = initial.len();
    let per_worker = dist.div_ceil(workers);

    log::trace!(
        "{}: {} workers, {} initial items",
        config.loopname,
        workers,
        dist
    );

    std::thread::scope(|s| {
        for wid in 0..workers {
            let engine = &engine;
            let barrier = &barrier;
            let stats = &stats;
            let initial = &initial;
            let filter = &filter;
            s.spawn(move || {
                let lo = (per_worker * wid).min(dist);
                let hi = (per_worker * (wid + 1)).min(dist);
                for item in &initial[lo..hi] {
                    if filter(item) {
                        engine.wl.push(item.clone());
                    }
                }
                barrier.wait();

                let mut tld = WorkerTld {
                    facing: UserContext::new(wid),
                    stat: LoopStatistics::default(),
                };
                if wid == 0 {
                    engine.go::<true>(wid, &mut tld);
                } else {
                    engine.go::<false>(wid, &mut tld);
                }
                stats.lock()[wid] = tld.stat;
            });
        }
    });

    let report = LoopReport::merge(stats.into_inner());
    report.report(config.loopname, reporter);
    report
}
