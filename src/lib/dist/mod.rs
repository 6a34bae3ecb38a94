//! Distributed multi-node merging.
//!
//! Stitches locally sorted index shards into one global order across `P`
//! ranks with a `log2(P)` pairwise merge tree. All message sizes derive
//! from `(N, P)` through [`schedule`], so ranks never exchange size
//! metadata: the one-shot scatter from rank 0 and every merge-round payload
//! land in buffers the receiver sized in advance.
//!
//! Transport is pluggable through [`comm::Communicator`]; the launcher that
//! starts one process per rank and hands out the address list is an
//! external collaborator.

pub mod comm;
pub mod merge_tree;
pub mod schedule;

pub use comm::{Communicator, LocalCluster, TcpCluster};
pub use merge_tree::{pairwise_merge, receive_slice, scatter_index, RankDriver};
