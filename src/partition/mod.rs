//! Edge-cut partitioning of a distributed graph.
//!
//! Driven once at startup: read the vertex-to-host assignment
//! ([`meta`]), then run [`CustomEdgeCut::build`] on every host against the
//! shared [`EdgeSource`] and a connected [`Transport`](crate::comm::Transport).

pub mod edge_cut;
pub mod graph;
pub mod meta;
pub mod source;

pub use edge_cut::{CustomEdgeCut, EDGE_SEND_BUFFER_BYTES};
pub use graph::LocalCsr;
pub use meta::{meta_file_name, partition_file_name, read_meta_file, read_vertex_owner_map, NodeInfo};
pub use source::{EdgeSource, HostTopology, InMemoryEdgeSource};
