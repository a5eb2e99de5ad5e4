//! AmorphError: unified error type for amorph public APIs.
//!
//! Conflicts are *not* errors: a conflict is a retry signal local to the
//! for-each engine and is represented by [`crate::runtime::Conflict`]. This
//! type covers everything that unwinds out of a public API.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for amorph operations.
#[derive(Debug, Error)]
pub enum AmorphError {
    /// The partition metadata sidecar file could not be opened.
    #[error("unable to open partition metadata file {path}: {source}")]
    MetaFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The metadata file ended before the announced number of records.
    #[error("partition metadata file {path} truncated: expected {expected} records, read {got}")]
    MetaFileTruncated {
        path: PathBuf,
        expected: u64,
        got: u64,
    },
    /// The vertex-to-host map file could not be opened.
    #[error("unable to open vertex owner map {path}: {source}")]
    VertexMapOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The vertex-to-host map file is shorter than the requested range.
    #[error("vertex owner map {path} too short: need entries [{lo}, {hi})")]
    VertexMapTruncated { path: PathBuf, lo: u64, hi: u64 },
    /// An owner id in the vertex map does not name a host.
    #[error("vertex owner map assigns vertex {gid} to host {owner}, but only {num_hosts} hosts exist")]
    OwnerOutOfRange {
        gid: u64,
        owner: i32,
        num_hosts: u32,
    },
    /// A peer announced a different global-bitset width than ours.
    #[error("incoming-edge bitset from host {host} has {got} bits, expected {expected}")]
    BitsetSizeMismatch {
        host: u32,
        expected: u64,
        got: u64,
    },
    /// A received edge batch names a source this host does not own.
    #[error("received edges for global id {gid}, which host {host} does not own")]
    EdgeForUnownedSource { gid: u64, host: u32 },
    /// Installed edges for a source did not match its announced degree.
    #[error("edge count mismatch for global id {gid}: announced {expected}, installed {got}")]
    EdgeCountMismatch { gid: u64, expected: u64, got: u64 },
    /// A wire buffer ended mid-record.
    #[error("wire buffer underrun: wanted {wanted} bytes, {remaining} remain")]
    WireUnderrun { wanted: usize, remaining: usize },
    /// A ghost vertex was never claimed by any peer's master list.
    #[error("ghost vertex {gid} is owned by no host")]
    UnclaimedGhost { gid: u64 },
}
