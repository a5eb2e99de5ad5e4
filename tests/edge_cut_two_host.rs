//! Two-host partitioner scenarios over the in-process cluster transport.
//!
//! Each simulated host runs on its own thread with its own transport
//! endpoint and phase counter, mirroring how real hosts construct the
//! partition simultaneously.

use amorph::comm::{LocalCluster, LocalTransport, PhaseCounter};
use amorph::partition::{CustomEdgeCut, EdgeSource, HostTopology, InMemoryEdgeSource};
use bytemuck::Pod;

/// Run `build` on every host of a cluster and collect the partitions.
fn build_cluster<E: Pod + Default + Send + Sync>(
    num_hosts: u32,
    num_nodes: u64,
    edges: &[(u64, u64, E)],
    assignment: &[i32],
) -> Vec<CustomEdgeCut<E>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let transports = LocalCluster::new(num_hosts);
    let mut out: Vec<Option<CustomEdgeCut<E>>> = (0..num_hosts).map(|_| None).collect();
    std::thread::scope(|s| {
        let handles: Vec<_> = transports
            .into_iter()
            .enumerate()
            .map(|(host, net): (usize, LocalTransport)| {
                let source = InMemoryEdgeSource::from_edges(num_nodes, edges);
                let topo = HostTopology::even_blocks(host as u32, num_hosts, num_nodes);
                let range = topo.local_range();
                let local_assignment: Vec<i32> =
                    assignment[range.start as usize..range.end as usize].to_vec();
                s.spawn(move || {
                    let phase = PhaseCounter::new();
                    CustomEdgeCut::build(&source, &local_assignment, &net, &phase, &topo).unwrap()
                })
            })
            .collect();
        for (slot, h) in out.iter_mut().zip(handles) {
            *slot = Some(h.join().unwrap());
        }
    });
    out.into_iter().map(Option::unwrap).collect()
}

fn ring_edges() -> Vec<(u64, u64, ())> {
    vec![(0, 1, ()), (1, 2, ()), (2, 3, ()), (3, 0, ())]
}

/// Two-host toy: a 4-cycle with the contiguous assignment `[0,0,1,1]`.
#[test]
fn two_host_ring_contiguous_assignment() {
    let cuts = build_cluster(2, 4, &ring_edges(), &[0, 0, 1, 1]);
    let (h0, h1) = (&cuts[0], &cuts[1]);

    // Host 0 masters 0 and 1; its local edges are (0,1) and (1,2), so the
    // only remote endpoint is 2.
    assert_eq!(h0.num_owned(), 2);
    assert!(h0.is_owned(0) && h0.is_owned(1));
    assert_eq!(h0.num_edges(), 2);
    assert_eq!(h0.num_nodes(), 3);
    assert_eq!(h0.mirror_nodes(1), &[2]);
    assert_eq!(h0.mirror_nodes(0), &[] as &[u64]);
    assert_eq!(h0.owner_of(h0.g2l(2)), 1);

    assert_eq!(h1.num_owned(), 2);
    assert!(h1.is_owned(2) && h1.is_owned(3));
    assert_eq!(h1.num_edges(), 2);
    assert_eq!(h1.num_nodes(), 3);
    assert_eq!(h1.mirror_nodes(0), &[0]);
    assert_eq!(h1.owner_of(h1.g2l(0)), 0);

    // Installed rows point at the right local endpoints.
    assert_eq!(
        h0.graph().edges(h0.g2l(0)).collect::<Vec<_>>(),
        vec![(h0.g2l(1), ())]
    );
    assert_eq!(
        h0.graph().edges(h0.g2l(1)).collect::<Vec<_>>(),
        vec![(h0.g2l(2), ())]
    );
    assert_eq!(
        h1.graph().edges(h1.g2l(3)).collect::<Vec<_>>(),
        vec![(h1.g2l(0), ())]
    );
}

/// The assignment may send a vertex away from the host that reads it; its
/// edges then travel over the wire to the owner.
#[test]
fn cross_assignment_ships_edges_to_owners() {
    // Host 0 reads gids {0,1} but owns {0,3}; host 1 reads {2,3}, owns {1,2}.
    let cuts = build_cluster(2, 4, &ring_edges(), &[0, 1, 1, 0]);
    let (h0, h1) = (&cuts[0], &cuts[1]);

    assert_eq!(h0.num_owned(), 2);
    assert!(h0.is_owned(0) && h0.is_owned(3));
    assert_eq!(h1.num_owned(), 2);
    assert!(h1.is_owned(1) && h1.is_owned(2));

    // Edge (3,0) was read by host 1 and installed on host 0; edge (1,2) the
    // other way around.
    assert_eq!(
        h0.graph().edges(h0.g2l(3)).collect::<Vec<_>>(),
        vec![(h0.g2l(0), ())]
    );
    assert_eq!(
        h1.graph().edges(h1.g2l(1)).collect::<Vec<_>>(),
        vec![(h1.g2l(2), ())]
    );

    // Every master's installed degree equals its global outgoing degree.
    let source = InMemoryEdgeSource::from_pairs(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
    for cut in &cuts {
        for lid in 0..cut.num_owned() {
            assert_eq!(cut.graph().degree(lid), source.degree(cut.l2g(lid)));
        }
    }
}

/// Edge weights ride along with their destinations.
#[test]
fn weighted_edges_arrive_with_their_payloads() {
    let edges = vec![
        (0u64, 2u64, 11u32),
        (1, 3, 22),
        (2, 0, 33),
        (3, 1, 44),
    ];
    let cuts = build_cluster(2, 4, &edges, &[1, 0, 0, 1]);
    let (h0, h1) = (&cuts[0], &cuts[1]);

    // Host 0 owns {1,2}: rows (1,3,22) and (2,0,33).
    assert_eq!(
        h0.graph().edges(h0.g2l(1)).collect::<Vec<_>>(),
        vec![(h0.g2l(3), 22)]
    );
    assert_eq!(
        h0.graph().edges(h0.g2l(2)).collect::<Vec<_>>(),
        vec![(h0.g2l(0), 33)]
    );
    // Host 1 owns {0,3}.
    assert_eq!(
        h1.graph().edges(h1.g2l(0)).collect::<Vec<_>>(),
        vec![(h1.g2l(2), 11)]
    );
    assert_eq!(
        h1.graph().edges(h1.g2l(3)).collect::<Vec<_>>(),
        vec![(h1.g2l(1), 44)]
    );
}

/// A vertex with no outgoing edges assigned to its reader is still
/// materialized as a master, contributing zero edges.
#[test]
fn isolated_owned_vertex_stays_resident() {
    // gid 3 has no outgoing edges; assignment keeps it on host 1.
    let edges = vec![(0u64, 1u64, ()), (1, 0, ()), (2, 1, ())];
    let cuts = build_cluster(2, 4, &edges, &[0, 0, 1, 1]);
    let h1 = &cuts[1];

    assert!(h1.is_owned(3));
    let lid = h1.g2l(3);
    assert_eq!(h1.graph().degree(lid), 0);
    assert_eq!(h1.num_owned(), 2);
    assert_eq!(h1.num_edges(), 1); // only (2,1)
}

/// Global invariants across the whole cluster.
#[test]
fn cluster_wide_conservation_laws() {
    let edges: Vec<(u64, u64, ())> = vec![
        (0, 4, ()),
        (1, 4, ()),
        (2, 5, ()),
        (3, 0, ()),
        (4, 1, ()),
        (5, 2, ()),
        (5, 3, ()),
    ];
    let assignment = [0, 1, 2, 0, 1, 2];
    let cuts = build_cluster(3, 6, &edges, &assignment);

    // Edge conservation: every edge lands on exactly one host.
    let total: u64 = cuts.iter().map(|c| c.num_edges()).sum();
    assert_eq!(total, edges.len() as u64);

    // Master conservation: each vertex is mastered exactly once, where the
    // assignment says.
    for gid in 0..6u64 {
        let owners: Vec<u32> = cuts
            .iter()
            .filter(|c| c.is_owned(gid))
            .map(|c| c.host())
            .collect();
        assert_eq!(owners, vec![assignment[gid as usize] as u32]);
    }

    // Ghost uniqueness: every ghost resolves to the host that masters it,
    // and mirror lists agree with ghost ownership.
    for cut in &cuts {
        for lid in cut.num_owned()..cut.num_nodes() {
            let gid = cut.l2g(lid);
            let owner = cut.owner_of(lid);
            assert_eq!(owner, assignment[gid as usize] as u32);
            assert!(cut.mirror_nodes(owner).contains(&gid));
        }
        // CSR consistency: prefix-sum deltas equal installed degrees.
        let prefix = cut.prefix_sum_edges();
        for lid in 0..cut.num_nodes() {
            let row = if lid == 0 {
                prefix[0]
            } else {
                prefix[lid as usize] - prefix[lid as usize - 1]
            };
            assert_eq!(row, cut.graph().degree(lid));
        }
        assert_eq!(prefix.last().copied().unwrap_or(0), cut.num_edges());
        assert!(!cut.is_vertex_cut());
    }
}
