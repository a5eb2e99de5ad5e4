//! The speculative optimistic parallel-for engine.
//!
//! Entry points are [`for_each`] and [`for_each_filtered`]. The operator's
//! capability constants ([`Operator`]) specialize the engine at compile time;
//! conflicts surface as [`Conflict`] results and drive abort-and-retry, not
//! failure.

pub mod context;
pub mod for_each;
pub mod operator;
pub mod per_worker;
pub mod stats;
pub mod termination;
pub mod user_context;
pub mod worklist;

pub use context::{Conflict, Lockable};
pub use for_each::{for_each, for_each_filtered, select_all, ForEachConfig};
pub use operator::{Operator, OperatorFn};
pub use per_worker::PerWorker;
pub use stats::{LogReporter, LoopReport, LoopStatistics, MemoryReporter, StatsReporter};
pub use termination::TerminationDetection;
pub use user_context::UserContext;
pub use worklist::{AbortedQueue, InjectorWorklist, PopResult, Worklist};
