//! Longest-edge-bisection tree.
//!
//! - [`node`]: bit-path node ids
//! - [`heap`]: bit field + sum-reduction index, rank decoding
//! - [`codec`]: corner positions and same-depth neighbors from node ids
//! - [`update`]: conforming split/merge and the ping-pong sweeps
//! - [`predicate`]: split decision policies

pub mod codec;
pub mod heap;
pub mod node;
pub mod predicate;
pub mod update;

pub use codec::{
  decode_diamond_parent, decode_node_attribute_array, decode_node_attributes,
  decode_node_transform, decode_same_depth_neighbors, triangle_distance, DiamondParent, Domain,
  NeighborIds,
};
pub use heap::{LebHeap, Leaves, HEAP_MAX_DEPTH};
pub use node::LebNode;
pub use predicate::{AlwaysSplit, NeverSplit, SubdivisionPredicate, TargetPredicate};
pub use update::{
  merge_conforming, split_conforming, update_sweep, LebUpdater, SweepStats, UpdateSweep,
};
