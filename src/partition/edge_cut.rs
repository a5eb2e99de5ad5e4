//! Custom edge-cut construction.
//!
//! Consumes the global edge list through an [`EdgeSource`], a per-vertex
//! owner assignment, and a tagged transport, and materializes this host's
//! share of the distributed graph: masters first, ghosts after, edges in a
//! local CSR, and per-peer mirror lists for the communication layer that
//! runs bulk-synchronous iteration afterwards.
//!
//! Construction is all-or-nothing: any protocol or file failure unwinds as
//! an error and the host is expected to abort.
//!
//! Five phases, each an all-to-all or a local pass:
//! 1. edge inspection: count outgoing edges per owner host, mark incoming;
//! 2. metadata exchange: counts, per-vertex degrees, incoming bitsets;
//! 3. local node construction: masters then ghosts, prefix sum of edges;
//! 4. edge distribution: stream edges to their owners, install locally;
//! 5. mirror assignment: resolve the owning host of every ghost.

use crate::comm::transport::{PhaseCounter, Transport};
use crate::comm::wire::{WireMetaHdr, WireReader, WireWriter};
use crate::error::AmorphError;
use crate::partition::graph::LocalCsr;
use crate::partition::source::{EdgeSource, HostTopology};
use crate::util::DynamicBitset;
use bytemuck::Pod;
use hashbrown::HashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// High-water mark for one edge-distribution send buffer.
pub const EDGE_SEND_BUFFER_BYTES: usize = 8 << 20;

/// This host's share of an edge-cut partitioned graph.
///
/// Local ids `[0, num_owned)` are masters; `[num_owned, num_nodes)` are
/// ghosts. Immutable once constructed.
#[derive(Debug)]
pub struct CustomEdgeCut<E> {
    topo: HostTopology,
    num_global_nodes: u64,
    num_global_edges: u64,
    num_owned: u32,
    num_edges: u64,
    local_to_global: Vec<u64>,
    global_to_local: HashMap<u64, u32>,
    prefix_sum_edges: Vec<u64>,
    /// Owning host of each ghost, indexed by `lid - num_owned`.
    ghost_owner: Vec<u32>,
    /// Ghost gids grouped by their owning host.
    mirror_nodes: Vec<Vec<u64>>,
    graph: LocalCsr<E>,
}

fn spin_receive<N: Transport>(net: &N, tag: u32) -> (u32, Vec<u8>) {
    loop {
        if let Some(msg) = net.receive_tagged(tag) {
            return msg;
        }
        std::hint::spin_loop();
    }
}

impl<E: Pod + Default + Send + Sync> CustomEdgeCut<E> {
    /// Build this host's partition.
    ///
    /// `assignment[j]` is the owner of global vertex `topo.local_range().start + j`
    /// (the vertex owner map slice for this host's read range, see
    /// [`crate::partition::meta::read_vertex_owner_map`]). Every host must
    /// call `build` with the same `source` totals and a phase counter at the
    /// same value.
    pub fn build<G, N>(
        source: &G,
        assignment: &[i32],
        net: &N,
        phase: &PhaseCounter,
        topo: &HostTopology,
    ) -> Result<Self, AmorphError>
    where
        G: EdgeSource<EdgeData = E>,
        N: Transport,
    {
        let host = topo.host;
        let num_hosts = topo.num_hosts as usize;
        let range = topo.local_range();
        assert_eq!(assignment.len() as u64, range.end - range.start);

        let num_global_nodes = source.num_nodes();
        let num_global_edges = source.num_edges();
        log::info!(
            "[{host}] total nodes: {num_global_nodes}, total edges: {num_global_edges}"
        );

        for (j, &owner) in assignment.iter().enumerate() {
            if owner < 0 || owner as u32 >= topo.num_hosts {
                return Err(AmorphError::OwnerOutOfRange {
                    gid: range.start + j as u64,
                    owner,
                    num_hosts: topo.num_hosts,
                });
            }
        }

        // --- Phase 1: edge inspection -----------------------------------
        let lo = range.start;
        let range_len = (range.end - range.start) as usize;
        let outgoing_atomic: Vec<Vec<AtomicU64>> = (0..num_hosts)
            .map(|_| (0..range_len).map(|_| AtomicU64::new(0)).collect())
            .collect();
        let incoming: Vec<DynamicBitset> = (0..num_hosts)
            .map(|_| DynamicBitset::new(num_global_nodes as usize))
            .collect();
        let nodes_per_host: Vec<AtomicU32> = (0..num_hosts).map(|_| AtomicU32::new(0)).collect();
        let edges_per_host: Vec<AtomicU64> = (0..num_hosts).map(|_| AtomicU64::new(0)).collect();

        (range.start..range.end).into_par_iter().for_each(|gid| {
            let j = (gid - lo) as usize;
            let h = assignment[j] as usize;
            let degree = source.degree(gid);
            // The +1 marks gid as owned by h even when it has no outgoing
            // edges; the receive side subtracts it when materializing.
            outgoing_atomic[h][j].store(1 + degree, Ordering::Relaxed);
            nodes_per_host[h].fetch_add(1, Ordering::Relaxed);
            edges_per_host[h].fetch_add(degree, Ordering::Relaxed);
            for (dst, _) in source.edges(gid) {
                incoming[h].set(dst as usize);
            }
        });

        let edges_scanned: u64 = (range.start..range.end).map(|g| source.degree(g)).sum();
        let edges_assigned: u64 = edges_per_host.iter().map(|a| a.load(Ordering::Relaxed)).sum();
        assert_eq!(edges_assigned, edges_scanned);
        log::debug!("[{host}] inspection done: {edges_scanned} edges to distribute");

        let mut outgoing: Vec<Vec<u64>> = outgoing_atomic
            .into_iter()
            .map(|v| v.into_iter().map(AtomicU64::into_inner).collect())
            .collect();

        // --- Phase 2: metadata exchange ---------------------------------
        let tag = phase.current();
        for x in 0..num_hosts as u32 {
            if x == host {
                continue;
            }
            let mut w = WireWriter::new();
            w.put_pod(&WireMetaHdr::new(
                nodes_per_host[x as usize].load(Ordering::Relaxed),
                edges_per_host[x as usize].load(Ordering::Relaxed),
            ));
            w.put_pod_slice(&outgoing[x as usize]);
            w.put_u64(incoming[x as usize].len() as u64);
            w.put_pod_slice(&incoming[x as usize].to_words());
            net.send_tagged(x, tag, w.into_vec());
        }
        net.flush();

        let mut num_owned = nodes_per_host[host as usize].load(Ordering::Relaxed);
        let mut edges_to_receive: u64 = 0;
        let mut incoming_union = DynamicBitset::new(num_global_nodes as usize);
        incoming_union.union_with(&incoming[host as usize]);

        for _ in 1..num_hosts {
            let (src, buf) = spin_receive(net, tag);
            let mut r = WireReader::new(&buf);
            let hdr: WireMetaHdr = r.get_pod()?;
            let peer_outgoing: Vec<u64> = r.get_pod_vec()?;
            let bits = r.get_u64()?;
            let words: Vec<u64> = r.get_pod_vec()?;
            if bits != num_global_nodes {
                return Err(AmorphError::BitsetSizeMismatch {
                    host: src,
                    expected: num_global_nodes,
                    got: bits,
                });
            }
            num_owned += hdr.num_nodes();
            edges_to_receive += hdr.num_edges();
            outgoing[src as usize] = peer_outgoing;
            incoming_union.union_with(&DynamicBitset::from_words(bits as usize, words));
        }
        phase.advance();
        log::debug!("[{host}] metadata exchanged: numOwned = {num_owned}");

        // --- Phase 3: local node construction ---------------------------
        // Masters first so they occupy contiguous local ids before ghosts.
        let mut num_nodes: u32 = 0;
        let mut num_edges: u64 = 0;
        let mut local_to_global: Vec<u64> = Vec::with_capacity(num_owned as usize);
        let mut global_to_local: HashMap<u64, u32> = HashMap::with_capacity(num_owned as usize);
        let mut prefix_sum_edges: Vec<u64> = Vec::with_capacity(num_owned as usize);

        for (i, counts) in outgoing.iter().enumerate() {
            let base = topo.gid2host[i].start;
            for (j, &count) in counts.iter().enumerate() {
                if count > 0 {
                    // Subtract the ownership marker added at inspection.
                    num_edges += count - 1;
                    let gid = base + j as u64;
                    local_to_global.push(gid);
                    global_to_local.insert(gid, num_nodes);
                    num_nodes += 1;
                    prefix_sum_edges.push(num_edges);
                }
            }
        }
        assert_eq!(num_nodes, num_owned);
        assert_eq!(local_to_global.len() as u32, num_owned);

        // Ghosts: any vertex with an incoming edge here that we do not own.
        // Edge cut means ghosts contribute nothing to the prefix sum.
        for gid in 0..num_global_nodes {
            if incoming_union.test(gid as usize) && !global_to_local.contains_key(&gid) {
                local_to_global.push(gid);
                global_to_local.insert(gid, num_nodes);
                num_nodes += 1;
                prefix_sum_edges.push(num_edges);
            }
        }
        log::debug!("[{host}] resident nodes: {num_nodes} ({num_owned} masters), resident edges: {num_edges}");

        let mut graph = LocalCsr::from_prefix_sum(&prefix_sum_edges, num_edges);

        // --- Phase 4: edge distribution ---------------------------------
        let tag = phase.current();
        let num_hosts_u32 = topo.num_hosts;
        (range.start..range.end)
            .into_par_iter()
            .filter(|&gid| assignment[(gid - lo) as usize] as u32 != host)
            .fold(
                || (0..num_hosts).map(|_| WireWriter::new()).collect::<Vec<_>>(),
                |mut bufs, gid| {
                    let h = assignment[(gid - lo) as usize] as usize;
                    let (dsts, data): (Vec<u64>, Vec<E>) = source.edges(gid).unzip();
                    let w = &mut bufs[h];
                    w.put_u64(gid);
                    w.put_pod_slice(&dsts);
                    w.put_pod_slice(&data);
                    if w.len() > EDGE_SEND_BUFFER_BYTES {
                        net.send_tagged(h as u32, tag, w.take());
                    }
                    bufs
                },
            )
            .for_each(|bufs| {
                for (h, w) in bufs.into_iter().enumerate() {
                    if !w.is_empty() {
                        net.send_tagged(h as u32, tag, w.into_vec());
                    }
                }
            });
        net.flush();

        // Self-owned sources: every outgoing edge stays local.
        for gid in range.clone() {
            if assignment[(gid - lo) as usize] as u32 != host {
                continue;
            }
            let lsrc = global_to_local[&gid];
            let mut cur = graph.edge_begin(lsrc);
            for (dst, data) in source.edges(gid) {
                let ldst = global_to_local[&dst];
                graph.install(cur, ldst, data);
                cur += 1;
            }
            debug_assert_eq!(cur, graph.edge_end(lsrc));
        }

        // Receive remotely read edges until the pre-announced count is in.
        let mut remaining = edges_to_receive;
        while remaining > 0 {
            let (_, buf) = spin_receive(net, tag);
            let mut r = WireReader::new(&buf);
            while !r.is_empty() {
                let src = r.get_u64()?;
                let dsts: Vec<u64> = r.get_pod_vec()?;
                let data: Vec<E> = r.get_pod_vec()?;
                let lsrc = match global_to_local.get(&src) {
                    Some(&l) if l < num_owned => l,
                    _ => return Err(AmorphError::EdgeForUnownedSource { gid: src, host }),
                };
                let row = graph.edge_end(lsrc) - graph.edge_begin(lsrc);
                if row != dsts.len() as u64 {
                    return Err(AmorphError::EdgeCountMismatch {
                        gid: src,
                        expected: row,
                        got: dsts.len() as u64,
                    });
                }
                let mut cur = graph.edge_begin(lsrc);
                for (dst, payload) in dsts.iter().zip(data) {
                    graph.install(cur, global_to_local[dst], payload);
                    cur += 1;
                }
                remaining -= dsts.len() as u64;
            }
        }
        phase.advance();
        log::debug!("[{host}] edge distribution done");

        // --- Phase 5: mirror assignment ---------------------------------
        let tag = phase.current();
        let masters = &local_to_global[..num_owned as usize];
        debug_assert!(masters.windows(2).all(|w| w[0] < w[1]));
        for x in 0..num_hosts_u32 {
            if x == host {
                continue;
            }
            let mut w = WireWriter::new();
            w.put_pod_slice(masters);
            net.send_tagged(x, tag, w.into_vec());
        }
        net.flush();

        let ghosts = &local_to_global[num_owned as usize..];
        let mut ghost_owner = vec![u32::MAX; ghosts.len()];
        for _ in 1..num_hosts {
            let (src, buf) = spin_receive(net, tag);
            let peer_masters: Vec<u64> = WireReader::new(&buf).get_pod_vec()?;
            debug_assert!(peer_masters.windows(2).all(|w| w[0] < w[1]));
            ghost_owner
                .par_iter_mut()
                .zip(ghosts.par_iter())
                .for_each(|(owner, gid)| {
                    if peer_masters.binary_search(gid).is_ok() {
                        *owner = src;
                    }
                });
        }
        phase.advance();

        let mut mirror_nodes: Vec<Vec<u64>> = vec![Vec::new(); num_hosts];
        for (i, &gid) in ghosts.iter().enumerate() {
            if ghost_owner[i] == u32::MAX {
                return Err(AmorphError::UnclaimedGhost { gid });
            }
            mirror_nodes[ghost_owner[i] as usize].push(gid);
        }
        log::info!(
            "[{host}] partition built: {num_nodes} nodes, {num_edges} edges, {} ghosts",
            ghosts.len()
        );
        net.barrier();

        Ok(Self {
            topo: topo.clone(),
            num_global_nodes,
            num_global_edges,
            num_owned,
            num_edges,
            local_to_global,
            global_to_local,
            prefix_sum_edges,
            ghost_owner,
            mirror_nodes,
            graph,
        })
    }
}

impl<E> CustomEdgeCut<E> {
    #[inline]
    pub fn host(&self) -> u32 {
        self.topo.host
    }

    #[inline]
    pub fn num_hosts(&self) -> u32 {
        self.topo.num_hosts
    }

    #[inline]
    pub fn num_global_nodes(&self) -> u64 {
        self.num_global_nodes
    }

    #[inline]
    pub fn num_global_edges(&self) -> u64 {
        self.num_global_edges
    }

    /// Masters resident on this host.
    #[inline]
    pub fn num_owned(&self) -> u32 {
        self.num_owned
    }

    /// Masters plus ghosts.
    #[inline]
    pub fn num_nodes(&self) -> u32 {
        self.local_to_global.len() as u32
    }

    /// Edges installed locally.
    #[inline]
    pub fn num_edges(&self) -> u64 {
        self.num_edges
    }

    /// Whether `gid` has a local id here (master or ghost).
    pub fn is_local(&self, gid: u64) -> bool {
        debug_assert!(gid < self.num_global_nodes);
        self.global_to_local.contains_key(&gid)
    }

    /// Whether `gid` is mastered here.
    pub fn is_owned(&self, gid: u64) -> bool {
        matches!(self.global_to_local.get(&gid), Some(&lid) if lid < self.num_owned)
    }

    /// Local id of `gid`.
    ///
    /// # Panics
    /// Panics if `gid` is not local.
    pub fn g2l(&self, gid: u64) -> u32 {
        self.global_to_local[&gid]
    }

    /// Global id of `lid`.
    pub fn l2g(&self, lid: u32) -> u64 {
        self.local_to_global[lid as usize]
    }

    /// Owning host of the vertex behind `lid`: this host for masters, the
    /// resolved remote host for ghosts.
    pub fn owner_of(&self, lid: u32) -> u32 {
        if lid < self.num_owned {
            self.topo.host
        } else {
            self.ghost_owner[(lid - self.num_owned) as usize]
        }
    }

    /// Ghost gids mastered by host `h`, ascending.
    pub fn mirror_nodes(&self, h: u32) -> &[u64] {
        &self.mirror_nodes[h as usize]
    }

    /// Running outgoing-edge sum per local id.
    pub fn prefix_sum_edges(&self) -> &[u64] {
        &self.prefix_sum_edges
    }

    /// The local CSR.
    pub fn graph(&self) -> &LocalCsr<E> {
        &self.graph
    }

    /// Masters and ghosts resident here, by local id order.
    pub fn local_total_nodes(&self) -> u64 {
        self.local_to_global.len() as u64
    }

    /// Edge cut keeps edges with their source's master.
    pub fn is_vertex_cut(&self) -> bool {
        false
    }
}
