//! The context handed to user operators.

use crate::runtime::context::{Conflict, IterationCtx, Lockable};
use crate::util::ScratchRegion;

/// Per-worker context passed to the operator on every iteration.
///
/// Exposes the three operator-facing services: the push buffer for newly
/// generated work, conflict-checked lock acquisition, and a scratch region
/// that lives exactly one iteration. The engine owns the lifecycle; operators
/// only ever see the context between `start` and commit/cancel.
pub struct UserContext<'g, T> {
    ctx: IterationCtx<'g>,
    push_buf: Vec<T>,
    break_requested: bool,
    scratch: ScratchRegion,
}

impl<'g, T> UserContext<'g, T> {
    pub(crate) fn new(worker: usize) -> Self {
        Self {
            ctx: IterationCtx::new(worker),
            push_buf: Vec::new(),
            break_requested: false,
            scratch: ScratchRegion::new(),
        }
    }

    /// Queue `item` for execution. The push becomes durable only if this
    /// iteration commits; aborted iterations discard their pushes.
    #[inline]
    pub fn push(&mut self, item: T) {
        self.push_buf.push(item);
    }

    /// Guard `lock` for the rest of this iteration.
    #[inline]
    pub fn acquire(&mut self, lock: &'g Lockable) -> Result<(), Conflict> {
        self.ctx.acquire(lock)
    }

    /// Request that the surrounding loop stop. Honored only if this
    /// iteration commits and the operator declares `NEEDS_BREAK`.
    #[inline]
    pub fn break_loop(&mut self) {
        self.break_requested = true;
    }

    /// Scratch storage reclaimed at the next iteration boundary.
    #[inline]
    pub fn scratch(&self) -> &ScratchRegion {
        &self.scratch
    }

    // --- engine-facing lifecycle ---

    pub(crate) fn start_iteration(&mut self) {
        self.ctx.start_iteration();
    }

    pub(crate) fn commit_iteration(&mut self) {
        self.ctx.commit_iteration();
    }

    pub(crate) fn cancel_iteration(&mut self) {
        self.ctx.cancel_iteration();
    }

    pub(crate) fn take_pushes(&mut self) -> std::vec::Drain<'_, T> {
        self.push_buf.drain(..)
    }

    pub(crate) fn clear_pushes(&mut self) {
        self.push_buf.clear();
    }

    pub(crate) fn break_requested(&self) -> bool {
        self.break_requested
    }

    pub(crate) fn reset_break(&mut self) {
        self.break_requested = false;
    }

    pub(crate) fn reset_scratch(&mut self) {
        self.scratch.reset();
    }
}
