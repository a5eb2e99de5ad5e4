//! Distributed termination detection.
//!
//! Ring-token quiescence detection across the worker pool. A white token
//! starts at worker 0; an idle worker passes the token onward, blackening it
//! if the worker found any work since its previous pass. Worker 0 declares
//! global termination after two consecutive circulations come back entirely
//! white.
//!
//! Guarantee: once every worker has announced idleness and no work has been
//! found since, `global_termination` eventually turns true; a worker that
//! finds work after announcing idleness dirties the ring before the
//! declaration can complete, so no worker exits while work remains.

use crate::runtime::per_worker::PerWorker;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
struct TokenHolder {
    has_token: AtomicBool,
    token_is_black: AtomicBool,
    process_is_black: AtomicBool,
}

/// Quiescence detector for one worker pool.
#[derive(Debug)]
pub struct TerminationDetection {
    holders: PerWorker<TokenHolder>,
    /// Initiator's memory: was the previous full circulation white?
    last_was_white: AtomicBool,
    global_term: AtomicBool,
}

impl TerminationDetection {
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0);
        Self {
            holders: PerWorker::from_fn(workers, |w| TokenHolder {
                has_token: AtomicBool::new(w == 0),
                token_is_black: AtomicBool::new(false),
                process_is_black: AtomicBool::new(false),
            }),
            last_was_white: AtomicBool::new(false),
            global_term: AtomicBool::new(false),
        }
    }

    /// Advisory: `worker` found work. Dirties the worker's next token pass.
    #[inline]
    pub fn work_happened(&self, worker: usize) {
        self.holders
            .local(worker)
            .process_is_black
            .store(true, Ordering::Release);
    }

    /// `worker` announces idleness; passes the token if it holds it.
    pub fn local_termination(&self, worker: usize) {
        let th = self.holders.local(worker);
        if !th.has_token.load(Ordering::Acquire) {
            return;
        }
        let dirty = th.process_is_black.swap(false, Ordering::AcqRel)
            | th.token_is_black.swap(false, Ordering::AcqRel);
        th.has_token.store(false, Ordering::Release);

        let n = self.holders.len();
        if worker == 0 {
            if !dirty && self.last_was_white.load(Ordering::Acquire) {
                // Second all-white circulation: the ring is quiescent.
                self.global_term.store(true, Ordering::Release);
                return;
            }
            self.last_was_white.store(!dirty, Ordering::Release);
            let next = self.holders.remote(1 % n);
            next.token_is_black.store(false, Ordering::Release);
            next.has_token.store(true, Ordering::Release);
        } else {
            let next = self.holders.remote((worker + 1) % n);
            next.token_is_black.store(dirty, Ordering::Release);
            next.has_token.store(true, Ordering::Release);
        }
    }

    /// Whether global quiescence has been declared.
    #[inline]
    pub fn global_termination(&self) -> bool {
        self.global_term.load(Ordering::Acquire)
    }
}
