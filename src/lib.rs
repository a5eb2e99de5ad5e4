//! # amorph
//!
//! amorph is a framework for exploiting amorphous data parallelism in
//! irregular graph computations. It pairs two subsystems that share an
//! execution model:
//!
//! - [`runtime`]: a speculative optimistic parallel-for engine: a worker
//!   pool draws items from a dynamic work-set, applies a user operator under
//!   per-iteration conflict detection, rolls conflicting iterations back for
//!   retry, and drains on distributed termination detection. Operator
//!   capabilities (pushing new work, breaking the loop, per-iteration
//!   allocation) are declared as constants and specialize the engine at
//!   compile time.
//! - [`partition`]: a custom edge-cut partitioner for distributed graphs:
//!   consumes a global edge list plus a precomputed vertex-to-host
//!   assignment, exchanges metadata across hosts over a tagged transport,
//!   materializes local masters, ghosts, and edges, and publishes the
//!   mirror lists later bulk-synchronous phases need.
//!
//! Supporting layers: [`comm`] (the transport seam, the in-process cluster
//! transport, and the LE wire codec), [`util`] (lazy array, atomic bitset,
//! scratch region), and [`error`].
//!
//! ## Example
//!
//! ```rust
//! use amorph::prelude::*;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let sum = AtomicU64::new(0);
//! let op = OperatorFn(|x: u64, _ctx: &mut UserContext<'_, u64>| {
//!     sum.fetch_add(x, Ordering::Relaxed);
//!     Ok(())
//! });
//! let config = ForEachConfig { workers: 4, loopname: "sum" };
//! let report = for_each((1..=5).collect(), &op, &config);
//! assert_eq!(sum.load(Ordering::Relaxed), 15);
//! assert_eq!(report.iterations, 5);
//! ```

pub mod comm;
pub mod error;
pub mod partition;
pub mod runtime;
pub mod util;

/// The most-used traits and types in one import.
pub mod prelude {
    pub use crate::comm::{LocalCluster, NoTransport, PhaseCounter, Transport};
    pub use crate::error::AmorphError;
    pub use crate::partition::{CustomEdgeCut, EdgeSource, HostTopology, InMemoryEdgeSource};
    pub use crate::runtime::{
        for_each, for_each_filtered, Conflict, ForEachConfig, Lockable, LoopReport, Operator,
        OperatorFn, UserContext,
    };
}
