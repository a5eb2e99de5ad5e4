//! Loop statistics and the reporting seam.

use parking_lot::Mutex;

/// Counters one worker accumulates over one loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopStatistics {
    iterations: u64,
    conflicts: u64,
}

impl LoopStatistics {
    #[inline]
    pub fn inc_iterations(&mut self) {
        self.iterations += 1;
    }

    #[inline]
    pub fn inc_conflicts(&mut self) {
        self.conflicts += 1;
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }
}

/// Merged statistics for one completed loop.
#[derive(Clone, Debug, Default)]
pub struct LoopReport {
    /// Total operator invocations, committed and aborted.
    pub iterations: u64,
    /// Total aborted invocations.
    pub conflicts: u64,
    /// Per-worker `(iterations, conflicts)` pairs.
    pub per_worker: Vec<(u64, u64)>,
}

impl LoopReport {
    pub(crate) fn merge(per_worker: Vec<LoopStatistics>) -> Self {
        Self {
            iterations: per_worker.iter().map(|s| s.iterations).sum(),
            conflicts: per_worker.iter().map(|s| s.conflicts).sum(),
            per_worker: per_worker
                .iter()
                .map(|s| (s.iterations, s.conflicts))
                .collect(),
        }
    }

    /// Emit the standard statistics through `reporter`.
    pub(crate) fn report(&self, loopname: &str, reporter: &dyn StatsReporter) {
        reporter.report_sum(loopname, "Iterations", self.iterations);
        reporter.report_sum(loopname, "Conflicts", self.conflicts);
        let iters: Vec<u64> = self.per_worker.iter().map(|&(i, _)| i).collect();
        let confs: Vec<u64> = self.per_worker.iter().map(|&(_, c)| c).collect();
        reporter.report_distribution(loopname, "IterationsDistribution", &iters);
        reporter.report_distribution(loopname, "ConflictsDistribution", &confs);
    }
}

/// Sink for per-loop statistics.
pub trait StatsReporter: Sync {
    fn report_sum(&self, loopname: &str, stat: &str, value: u64);
    fn report_distribution(&self, loopname: &str, stat: &str, per_worker: &[u64]);
}

/// Default reporter: one `info!` line per statistic.
#[derive(Debug, Default)]
pub struct LogReporter;

impl StatsReporter for LogReporter {
    fn report_sum(&self, loopname: &str, stat: &str, value: u64) {
        log::info!("{loopname}: {stat} = {value}");
    }

    fn report_distribution(&self, loopname: &str, stat: &str, per_worker: &[u64]) {
        log::debug!("{loopname}: {stat} = {per_worker:?}");
    }
}

/// Reporter that records everything, for tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    sums: Mutex<Vec<(String, String, u64)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded sum for `(loopname, stat)`, if reported.
    pub fn sum(&self, loopname: &str, stat: &str) -> Option<u64> {
        self.sums
            .lock()
            .iter()
            .find(|(l, s, _)| l == loopname && s == stat)
            .map(|&(_, _, v)| v)
    }
}

impl StatsReporter for MemoryReporter {
    fn report_sum(&self, loopname: &str, stat: &str, value: u64) {
        self.sums
            .lock()
            .push((loopname.to_string(), stat.to_string(), value));
    }

    fn report_distribution(&self, _loopname: &str, _stat: &str, _per_worker: &[u64]) {}
}
