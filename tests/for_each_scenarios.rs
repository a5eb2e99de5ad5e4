//! End-to-end scenarios for the speculative for-each engine.

use amorph::runtime::{
    for_each, for_each_filtered, select_all, Conflict, ForEachConfig, Lockable, MemoryReporter,
    Operator, OperatorFn, UserContext,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

fn config(workers: usize, loopname: &'static str) -> ForEachConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    ForEachConfig { workers, loopname }
}

/// Trivial for-each: five items, pure accumulation, no pushes.
#[test]
fn trivial_sum() {
    struct SumOp<'a> {
        sum: &'a AtomicU64,
    }
    impl<'g, 'a> Operator<'g, u64> for SumOp<'a> {
        const NEEDS_PUSH: bool = false;
        const NEEDS_CONTEXT: bool = false;
        fn apply(&self, x: u64, _ctx: &mut UserContext<'g, u64>) -> Result<(), Conflict> {
            self.sum.fetch_add(x, Ordering::Relaxed);
            Ok(())
        }
    }

    let sum = AtomicU64::new(0);
    let reporter = MemoryReporter::new();
    let report = for_each_filtered(
        vec![1, 2, 3, 4, 5],
        &SumOp { sum: &sum },
        select_all,
        &config(4, "trivial-sum"),
        &reporter,
    );

    assert_eq!(sum.load(Ordering::Relaxed), 15);
    assert_eq!(report.iterations, 5);
    assert_eq!(report.conflicts, 0);
    assert_eq!(reporter.sum("trivial-sum", "Iterations"), Some(5));
    assert_eq!(reporter.sum("trivial-sum", "Conflicts"), Some(0));
}

/// Push cascade: `[10]` seeds a countdown; every value down to zero runs.
#[test]
fn push_cascade() {
    let processed = AtomicU64::new(0);
    let op = OperatorFn(|x: u64, ctx: &mut UserContext<'_, u64>| {
        processed.fetch_add(x, Ordering::Relaxed);
        if x > 0 {
            ctx.push(x - 1);
        }
        Ok(())
    });

    let report = for_each(vec![10], &op, &config(4, "cascade"));
    assert_eq!(report.iterations, 11);
    assert_eq!(report.conflicts, 0);
    assert_eq!(processed.load(Ordering::Relaxed), 55);
}

/// Forced abort: every item conflicts on its first attempt and commits on
/// the retry.
#[test]
fn abort_then_retry_commits_each_item_once() {
    let attempts: Mutex<HashMap<u32, u32>> = Mutex::new(HashMap::new());
    let commits: Mutex<HashMap<u32, u32>> = Mutex::new(HashMap::new());
    let op = OperatorFn(|x: u32, _ctx: &mut UserContext<'_, u32>| {
        let n = {
            let mut attempts = attempts.lock();
            let n = attempts.entry(x).or_insert(0);
            *n += 1;
            *n
        };
        if n == 1 {
            return Err(Conflict);
        }
        *commits.lock().entry(x).or_insert(0) += 1;
        Ok(())
    });

    let report = for_each(vec![1, 2, 3], &op, &config(2, "forced-abort"));
    assert_eq!(report.iterations, 6);
    assert_eq!(report.conflicts, 3);
    let commits = commits.lock();
    assert_eq!(commits.len(), 3);
    assert!(commits.values().all(|&c| c == 1));
    // conflicts equals aborted executions, summed across workers
    let worker_conflicts: u64 = report.per_worker.iter().map(|&(_, c)| c).sum();
    assert_eq!(worker_conflicts, 3);
}

/// Pushes from aborted iterations are discarded; only the committed retry's
/// effects survive.
#[test]
fn aborted_pushes_are_discarded() {
    let attempts: Mutex<HashMap<u32, u32>> = Mutex::new(HashMap::new());
    let committed: Mutex<Vec<u32>> = Mutex::new(Vec::new());
    let op = OperatorFn(|x: u32, ctx: &mut UserContext<'_, u32>| {
        let n = {
            let mut attempts = attempts.lock();
            let n = attempts.entry(x).or_insert(0);
            *n += 1;
            *n
        };
        if x == 1 && n == 1 {
            ctx.push(100); // must never run
            return Err(Conflict);
        }
        committed.lock().push(x);
        Ok(())
    });

    let report = for_each(vec![1], &op, &config(2, "aborted-push"));
    assert_eq!(report.conflicts, 1);
    let committed = committed.lock();
    assert_eq!(&*committed, &[1]);
    assert!(!committed.contains(&100));
}

/// Break with one worker is fully deterministic: items run in order until
/// the break commits, then nothing else begins.
#[test]
fn break_single_worker_stops_exactly() {
    struct BreakAt50;
    impl<'g> Operator<'g, u32> for BreakAt50 {
        const NEEDS_BREAK: bool = true;
        const NEEDS_PUSH: bool = false;
        fn apply(&self, x: u32, ctx: &mut UserContext<'g, u32>) -> Result<(), Conflict> {
            if x == 50 {
                ctx.break_loop();
            }
            Ok(())
        }
    }

    let report = for_each((1..=100).collect(), &BreakAt50, &config(1, "break-1w"));
    assert_eq!(report.iterations, 50);
    assert_eq!(report.conflicts, 0);
}

/// Break with several workers: the engine returns, and nothing beyond the
/// in-flight window runs.
#[test]
fn break_multi_worker_returns_promptly() {
    struct BreakOp<'a> {
        committed: &'a Mutex<Vec<u32>>,
    }
    impl<'g, 'a> Operator<'g, u32> for BreakOp<'a> {
        const NEEDS_BREAK: bool = true;
        const NEEDS_PUSH: bool = false;
        fn apply(&self, x: u32, ctx: &mut UserContext<'g, u32>) -> Result<(), Conflict> {
            self.committed.lock().push(x);
            if x == 50 {
                ctx.break_loop();
            }
            Ok(())
        }
    }

    let committed = Mutex::new(Vec::new());
    let report = for_each(
        (1..=100).collect(),
        &BreakOp {
            committed: &committed,
        },
        &config(4, "break-4w"),
    );

    let committed = committed.lock();
    assert!(committed.contains(&50));
    assert_eq!(report.iterations as usize, committed.len());
    assert!(report.iterations <= 100);
}

/// Real lock contention: every iteration guards the same lock; conflicted
/// items retry until each has committed exactly once.
#[test]
fn contended_lock_retries_until_commit() {
    struct ContendedOp<'a> {
        lock: &'a Lockable,
        counter: &'a AtomicU64,
    }
    impl<'g, 'a> Operator<'g, u32> for ContendedOp<'a>
    where
        'a: 'g,
    {
        fn apply(&self, _x: u32, ctx: &mut UserContext<'g, u32>) -> Result<(), Conflict> {
            ctx.acquire(self.lock)?;
            self.counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    let lock = Lockable::new();
    let counter = AtomicU64::new(0);
    let op = ContendedOp {
        lock: &lock,
        counter: &counter,
    };

    let report = for_each(vec![7; 100], &op, &config(4, "contended"));
    assert_eq!(counter.load(Ordering::Relaxed), 100);
    assert_eq!(report.iterations - report.conflicts, 100);
}

/// The initial-fill filter drops items before the loop begins.
#[test]
fn initial_fill_filter_applies() {
    let processed = AtomicU64::new(0);
    let op = OperatorFn(|x: u64, _ctx: &mut UserContext<'_, u64>| {
        processed.fetch_add(x, Ordering::Relaxed);
        Ok(())
    });

    let reporter = MemoryReporter::new();
    let report = for_each_filtered(
        (1..=10).collect(),
        &op,
        |x: &u64| x % 2 == 0,
        &config(3, "filtered"),
        &reporter,
    );
    assert_eq!(report.iterations, 5);
    assert_eq!(processed.load(Ordering::Relaxed), 2 + 4 + 6 + 8 + 10);
}

/// An empty initial range quiesces immediately.
#[test]
fn empty_input_terminates() {
    let op = OperatorFn(|_x: u32, _ctx: &mut UserContext<'_, u32>| Ok(()));
    let report = for_each(Vec::new(), &op, &config(4, "empty"));
    assert_eq!(report.iterations, 0);
    assert_eq!(report.conflicts, 0);
}

/// The per-iteration scratch region is usable and resets between
/// iterations without affecting results.
#[test]
fn scratch_region_is_per_iteration() {
    struct ScratchOp<'a> {
        sum: &'a AtomicU64,
    }
    impl<'g, 'a> Operator<'g, u64> for ScratchOp<'a> {
        const NEEDS_PUSH: bool = false;
        const NEEDS_PER_ITER_ALLOC: bool = true;
        fn apply(&self, x: u64, ctx: &mut UserContext<'g, u64>) -> Result<(), Conflict> {
            let tmp = ctx.scratch().alloc_slice_fill(8, x);
            self.sum.fetch_add(tmp.iter().sum::<u64>() / 8, Ordering::Relaxed);
            Ok(())
        }
    }

    let sum = AtomicU64::new(0);
    let report = for_each(
        (1..=20).collect(),
        &ScratchOp { sum: &sum },
        &config(4, "scratch"),
    );
    assert_eq!(report.iterations, 20);
    assert_eq!(sum.load(Ordering::Relaxed), (1..=20).sum::<u64>());
}
