//! The operator trait and its capability probe.

use crate::runtime::context::Conflict;
use crate::runtime::user_context::UserContext;

/// A user operator applied to every item drawn from the work-set.
///
/// The associated constants are the capability probe: the engine reads them
/// in `const` positions, so paths an operator declares away compile out. The
/// defaults assume the operator needs everything except breaks and
/// per-iteration allocation.
///
/// `'g` is the lifetime of the data the loop runs over; locks acquired
/// through the context borrow it.
pub trait Operator<'g, T>: Sync {
    /// Count iterations and conflicts for this loop.
    const COLLECT_STATS: bool = true;
    /// The operator may call [`UserContext::break_loop`].
    const NEEDS_BREAK: bool = false;
    /// The operator may push new work.
    const NEEDS_PUSH: bool = true;
    /// The operator acquires locks through the context. Advisory; the
    /// iteration lifecycle runs either way.
    const NEEDS_CONTEXT: bool = true;
    /// The operator uses the per-iteration scratch region.
    const NEEDS_PER_ITER_ALLOC: bool = false;

    /// Run one speculative iteration. Returning `Err(Conflict)` aborts the
    /// iteration; the engine rolls back and retries `item` later.
    fn apply(&self, item: T, ctx: &mut UserContext<'g, T>) -> Result<(), Conflict>;
}

/// Adapter for plain closures, carrying the default capability set.
pub struct OperatorFn<F>(pub F);

impl<'g, T, F> Operator<'g, T> for OperatorFn<F>
where
    F: Fn(T, &mut UserContext<'g, T>) -> Result<(), Conflict> + Sync,
{
    fn apply(&self, item: T, ctx: &mut UserContext<'g, T>) -> Result<(), Conflict> {
        (self.0)(item, ctx)
    }
}
