//! The shared worklist contract and the aborted-item queue.

use crossbeam_deque::{Injector, Steal};

/// Outcome of a pop attempt.
#[derive(Debug)]
pub enum PopResult<T> {
    /// An item was drawn.
    Item(T),
    /// The worklist was observed empty.
    Empty,
    /// The attempt lost a race; the worklist may or may not be empty.
    Retry,
}

/// A concurrent bag of pending work items.
///
/// `pop` may fail spuriously ([`PopResult::Retry`]); the engine tolerates it.
/// Pushes and pops are individually linearizable but carry no ordering
/// promise between items.
pub trait Worklist<T: Send>: Send + Sync {
    fn push(&self, item: T);
    fn pop(&self) -> PopResult<T>;
}

/// Default worklist: a crossbeam injector shared by all workers.
#[derive(Debug, Default)]
pub struct InjectorWorklist<T> {
    inner: Injector<T>,
}

impl<T> InjectorWorklist<T> {
    pub fn new() -> Self {
        Self {
            inner: Injector::new(),
        }
    }
}

impl<T: Send> Worklist<T> for InjectorWorklist<T> {
    fn push(&self, item: T) {
        self.inner.push(item);
    }

    fn pop(&self) -> PopResult<T> {
        match self.inner.steal() {
            Steal::Success(v) => PopResult::Item(v),
            Steal::Empty => PopResult::Empty,
            Steal::Retry => PopResult::Retry,
        }
    }
}

/// Items whose iterations rolled back, awaiting retry.
///
/// Structured by worker: each worker pushes to its own queue (no contention
/// on the push path); a consumer drains its own queue first and then steals
/// from victims in order. `pop` returns `None` only when every queue was
/// observed empty.
#[derive(Debug)]
pub struct AbortedQueue<T> {
    queues: Vec<Injector<T>>,
}

impl<T: Send> AbortedQueue<T> {
    pub fn new(workers: usize) -> Self {
        Self {
            queues: (0..workers).map(|_| Injector::new()).collect(),
        }
    }

    /// Enqueue a rolled-back item on `worker`'s own queue.
    pub fn push(&self, worker: usize, item: T) {
        self.queues[worker].push(item);
    }

    /// Dequeue, preferring `worker`'s own queue, stealing otherwise.
    pub fn pop(&self, worker: usize) -> Option<T> {
        let n = self.queues.len();
        for off in 0..n {
            let q = &self.queues[(worker + off) % n];
            loop {
                match q.steal() {
                    Steal::Success(v) => return Some(v),
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }
        None
    }
}
