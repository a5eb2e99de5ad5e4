//! Host-to-host communication: the transport seam and the wire encoding.

pub mod transport;
pub mod wire;

pub use transport::{LocalCluster, LocalTransport, NoTransport, PhaseCounter, Transport};
