//! Point-to-point transport of index entries between ranks.
//!
//! Ranks exchange only arrays of [`IndexEntry`]; sizes are never
//! transmitted. A frame on the wire is a 4-byte tag followed by the raw
//! entry bytes — the receiver knows how many entries to expect from the
//! deterministic schedule and posts a buffer of exactly that size. The tag
//! is verified on receipt so a schedule bug surfaces as a protocol error
//! instead of silent corruption.
//!
//! Two transports implement the same trait: [`TcpCluster`] for multi-node
//! runs (one stream per rank pair; the launcher that starts the processes
//! and distributes the address list is an external collaborator) and
//! [`LocalCluster`], an in-memory mesh used by tests and single-host runs.
//!
//! Like the file format, the wire carries host-representation entries; the
//! sorter does no endianness translation, so all ranks must share a byte
//! order.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::errors::{RecsortError, Result};
use crate::index::IndexEntry;

/// Blocking point-to-point messaging between ranks.
pub trait Communicator {
    /// This process's rank in `[0, world_size)`.
    fn rank(&self) -> usize;

    /// Total number of ranks.
    fn world_size(&self) -> usize;

    /// Send an entry array to `to`, labeled with `tag`.
    fn send_entries(&mut self, to: usize, tag: u32, entries: &[IndexEntry]) -> Result<()>;

    /// Receive exactly `buf.len()` entries from `from` with the given tag.
    fn recv_entries(&mut self, from: usize, tag: u32, buf: &mut [IndexEntry]) -> Result<()>;
}

fn comm_error(peer: usize, what: &str, err: &std::io::Error) -> RecsortError {
    RecsortError::Comm { peer, reason: format!("{what}: {err}") }
}

// ---------------------------------------------------------------------------
// TCP transport
// ---------------------------------------------------------------------------

/// How long a rank keeps retrying its outbound mesh connections while the
/// other processes come up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Full TCP mesh over a per-rank address list.
///
/// Rank `r` listens on `addrs[r]`, accepts one connection from every higher
/// rank, and dials every lower rank. Each dialer opens with a 4-byte hello
/// carrying its rank so the acceptor can place the stream.
pub struct TcpCluster {
    rank: usize,
    streams: Vec<Option<TcpStream>>,
}

impl TcpCluster {
    /// Establish the mesh for `rank` over `addrs` (one address per rank).
    pub fn connect(rank: usize, addrs: &[SocketAddr]) -> Result<Self> {
        let world = addrs.len();
        if rank >= world {
            return Err(RecsortError::InvalidParameter {
                parameter: "rank".to_string(),
                reason: format!("rank {rank} outside world of {world}"),
            });
        }

        let mut streams: Vec<Option<TcpStream>> = (0..world).map(|_| None).collect();

        let listener = TcpListener::bind(addrs[rank])
            .map_err(|e| RecsortError::io("bind", addrs[rank].to_string(), e))?;

        // Dial every lower rank, retrying while its listener comes up.
        for (peer, addr) in addrs.iter().enumerate().take(rank) {
            let mut stream = Self::dial(peer, *addr)?;
            stream.set_nodelay(true).map_err(|e| comm_error(peer, "set_nodelay", &e))?;
            stream
                .write_all(&(rank as u32).to_le_bytes())
                .map_err(|e| comm_error(peer, "send hello", &e))?;
            streams[peer] = Some(stream);
        }

        // Accept one connection from every higher rank.
        for _ in rank + 1..world {
            let (mut stream, _) =
                listener.accept().map_err(|e| comm_error(rank, "accept", &e))?;
            stream.set_nodelay(true).map_err(|e| comm_error(rank, "set_nodelay", &e))?;
            let mut hello = [0u8; 4];
            stream.read_exact(&mut hello).map_err(|e| comm_error(rank, "read hello", &e))?;
            let peer = u32::from_le_bytes(hello) as usize;
            if peer <= rank || peer >= world || streams[peer].is_some() {
                return Err(RecsortError::Comm {
                    peer,
                    reason: "unexpected hello during mesh setup".to_string(),
                });
            }
            streams[peer] = Some(stream);
        }

        debug!("rank {rank}: mesh of {world} established");
        Ok(Self { rank, streams })
    }

    fn dial(peer: usize, addr: SocketAddr) -> Result<TcpStream> {
        let deadline = std::time::Instant::now() + CONNECT_TIMEOUT;
        loop {
            match TcpStream::connect(addr) {
                Ok(stream) => return Ok(stream),
                Err(e) if std::time::Instant::now() < deadline => {
                    debug!("rank connect to {addr} not ready ({e}); retrying");
                    std::thread::sleep(CONNECT_RETRY_DELAY);
                }
                Err(e) => return Err(comm_error(peer, "connect", &e)),
            }
        }
    }

    fn stream(&mut self, peer: usize) -> Result<&mut TcpStream> {
        self.streams.get_mut(peer).and_then(Option::as_mut).ok_or(RecsortError::Comm {
            peer,
            reason: "no connection to peer".to_string(),
        })
    }
}

impl Communicator for TcpCluster {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.streams.len()
    }

    fn send_entries(&mut self, to: usize, tag: u32, entries: &[IndexEntry]) -> Result<()> {
        let stream = self.stream(to)?;
        stream.write_all(&tag.to_le_bytes()).map_err(|e| comm_error(to, "send tag", &e))?;
        stream
            .write_all(bytemuck::cast_slice(entries))
            .map_err(|e| comm_error(to, "send payload", &e))?;
        Ok(())
    }

    fn recv_entries(&mut self, from: usize, tag: u32, buf: &mut [IndexEntry]) -> Result<()> {
        let stream = self.stream(from)?;
        let mut got = [0u8; 4];
        stream.read_exact(&mut got).map_err(|e| comm_error(from, "recv tag", &e))?;
        let got = u32::from_le_bytes(got);
        if got != tag {
            return Err(RecsortError::Comm {
                peer: from,
                reason: format!("tag mismatch: expected {tag}, got {got}"),
            });
        }
        stream
            .read_exact(bytemuck::cast_slice_mut(buf))
            .map_err(|e| comm_error(from, "recv payload", &e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

type Frame = (u32, Vec<IndexEntry>);

/// In-memory mesh of channels, one endpoint per simulated rank.
///
/// Sends never block (the channels are unbounded, standing in for the
/// root's non-blocking scatter sends); receives block until the matching
/// frame arrives and verify tag and size against the schedule.
pub struct LocalCluster {
    rank: usize,
    txs: Vec<Option<Sender<Frame>>>,
    rxs: Vec<Option<Receiver<Frame>>>,
}

impl LocalCluster {
    /// Build the endpoints of a `world`-rank mesh.
    #[must_use]
    pub fn mesh(world: usize) -> Vec<LocalCluster> {
        let mut clusters: Vec<LocalCluster> = (0..world)
            .map(|rank| LocalCluster {
                rank,
                txs: (0..world).map(|_| None).collect(),
                rxs: (0..world).map(|_| None).collect(),
            })
            .collect();

        for from in 0..world {
            for to in 0..world {
                if from == to {
                    continue;
                }
                let (tx, rx) = unbounded();
                clusters[from].txs[to] = Some(tx);
                clusters[to].rxs[from] = Some(rx);
            }
        }
        clusters
    }
}

impl Communicator for LocalCluster {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.txs.len()
    }

    fn send_entries(&mut self, to: usize, tag: u32, entries: &[IndexEntry]) -> Result<()> {
        let tx = self.txs.get(to).and_then(Option::as_ref).ok_or(RecsortError::Comm {
            peer: to,
            reason: "no channel to peer".to_string(),
        })?;
        tx.send((tag, entries.to_vec())).map_err(|_| RecsortError::Comm {
            peer: to,
            reason: "peer hung up".to_string(),
        })
    }

    fn recv_entries(&mut self, from: usize, tag: u32, buf: &mut [IndexEntry]) -> Result<()> {
        let rx = self.rxs.get(from).and_then(Option::as_ref).ok_or(RecsortError::Comm {
            peer: from,
            reason: "no channel from peer".to_string(),
        })?;
        let (got, entries) = rx.recv().map_err(|_| RecsortError::Comm {
            peer: from,
            reason: "peer hung up".to_string(),
        })?;
        if got != tag {
            return Err(RecsortError::Comm {
                peer: from,
                reason: format!("tag mismatch: expected {tag}, got {got}"),
            });
        }
        if entries.len() != buf.len() {
            return Err(RecsortError::Comm {
                peer: from,
                reason: format!(
                    "size mismatch: schedule expects {} entries, peer sent {}",
                    buf.len(),
                    entries.len()
                ),
            });
        }
        buf.copy_from_slice(&entries);
        Ok(())
    }
}
