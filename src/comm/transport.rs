//! Tagged-message transport between hosts.
//!
//! The partitioner speaks to its peers exclusively through [`Transport`]:
//! reliable, non-blocking, tagged sends and polled receives. Tags are *phase*
//! numbers issued by a [`PhaseCounter`] so that messages belonging to
//! different all-to-all exchanges can never collide; each exchange advances
//! the counter exactly once.
//!
//! Wire conventions for higher-level protocols live in [`crate::comm::wire`]:
//! all integers are LE fixed width, bulk payloads are Pod slices.

use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Non-blocking, reliable, tagged message passing between a fixed set of
/// hosts.
///
/// Delivery guarantees required of implementors:
/// - buffers arrive intact and in send order per `(src, dest, phase)` triple;
/// - `receive_tagged(phase)` never yields a message sent under another phase;
/// - `flush` pushes pending outbound traffic but does not wait for delivery.
pub trait Transport: Send + Sync {
    /// Rank of this host (`0..num_hosts`).
    fn host(&self) -> u32;
    /// Total number of hosts.
    fn num_hosts(&self) -> u32;

    /// Queue `buf` for delivery to `dest` under `phase`. Non-blocking.
    fn send_tagged(&self, dest: u32, phase: u32, buf: Vec<u8>);

    /// Poll for any message tagged `phase`. Returns the sender and the buffer.
    fn receive_tagged(&self, phase: u32) -> Option<(u32, Vec<u8>)>;

    /// Push pending outbound traffic toward the network.
    fn flush(&self) {}

    /// Synchronization barrier across all hosts.
    fn barrier(&self);
}

/// Issues monotonically increasing phase numbers for all-to-all exchanges.
///
/// Every host constructs its counter at the same point in the protocol and
/// advances it exactly once per exchange, so counters agree across hosts
/// without any communication. Phase 0 is never issued; a zero tag always
/// means "uninitialized" in debugging output.
#[derive(Debug)]
pub struct PhaseCounter {
    cur: AtomicU32,
}

impl PhaseCounter {
    pub fn new() -> Self {
        Self {
            cur: AtomicU32::new(1),
        }
    }

    /// The phase tag for the exchange currently in flight.
    #[inline]
    pub fn current(&self) -> u32 {
        self.cur.load(Ordering::Acquire)
    }

    /// Finish the current exchange and return the tag for the next one.
    #[inline]
    pub fn advance(&self) -> u32 {
        self.cur.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for PhaseCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-host no-op transport for serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoTransport;

impl Transport for NoTransport {
    fn host(&self) -> u32 {
        0
    }
    fn num_hosts(&self) -> u32 {
        1
    }
    fn send_tagged(&self, _dest: u32, _phase: u32, _buf: Vec<u8>) {}
    fn receive_tagged(&self, _phase: u32) -> Option<(u32, Vec<u8>)> {
        None
    }
    fn barrier(&self) {}
}

// --- LocalTransport: intra-process hosts, one thread per host ---

type MailKey = (u32, u32); // (dst, phase)

struct EpochBarrier {
    arrived: u32,
    epoch: u64,
}

struct ClusterShared {
    num_hosts: u32,
    mail: Mutex<HashMap<MailKey, VecDeque<(u32, Vec<u8>)>>>,
    barrier: Mutex<EpochBarrier>,
    barrier_cv: Condvar,
}

/// A set of in-process hosts sharing one mailbox.
///
/// Each cluster owns its mailbox, so independent clusters (for example,
/// concurrently running tests) cannot cross-talk.
pub struct LocalCluster;

impl LocalCluster {
    /// Create `num_hosts` connected transports, one per simulated host.
    pub fn new(num_hosts: u32) -> Vec<LocalTransport> {
        assert!(num_hosts > 0);
        let shared = Arc::new(ClusterShared {
            num_hosts,
            mail: Mutex::new(HashMap::new()),
            barrier: Mutex::new(EpochBarrier {
                arrived: 0,
                epoch: 0,
            }),
            barrier_cv: Condvar::new(),
        });
        (0..num_hosts)
            .map(|host| LocalTransport {
                host,
                shared: shared.clone(),
            })
            .collect()
    }
}

/// One host's endpoint inside a [`LocalCluster`].
pub struct LocalTransport {
    host: u32,
    shared: Arc<ClusterShared>,
}

impl Transport for LocalTransport {
    fn host(&self) -> u32 {
        self.host
    }

    fn num_hosts(&self) -> u32 {
        self.shared.num_hosts
    }

    fn send_tagged(&self, dest: u32, phase: u32, buf: Vec<u8>) {
        debug_assert!(dest < self.shared.num_hosts);
        let mut mail = self.shared.mail.lock();
        mail.entry((dest, phase))
            .or_default()
            .push_back((self.host, buf));
    }

    fn receive_tagged(&self, phase: u32) -> Option<(u32, Vec<u8>)> {
        let mut mail = self.shared.mail.lock();
        let q = mail.get_mut(&(self.host, phase))?;
        let msg = q.pop_front();
        if q.is_empty() {
            mail.remove(&(self.host, phase));
        }
        msg
    }

    fn barrier(&self) {
        let mut b = self.shared.barrier.lock();
        let epoch = b.epoch;
        b.arrived += 1;
        if b.arrived == self.shared.num_hosts {
            b.arrived = 0;
            b.epoch += 1;
            self.shared.barrier_cv.notify_all();
        } else {
            while b.epoch == epoch {
                self.shared.barrier_cv.wait(&mut b);
            }
        }
    }
}
