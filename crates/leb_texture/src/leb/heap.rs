//! LebHeap - bit-packed bisection tree with a sum-reduction index.
//!
//! The tree is stored as one bit per node of depth `max_depth`. A leaf sets
//! the bit of its leftmost max-depth descendant (its "ceil" bit), so the set
//! bits partition the bit field into the leaves' ranges.
//!
//! Next to the bit field sits a reduction table: for every node above
//! `max_depth`, indexed by node id, the number of set bits in its range,
//! i.e. the number of leaves under it. A node whose count is 1 is a leaf,
//! which makes rank -> node decoding a walk of at most `max_depth` steps.
//!
//! ```text
//! depth 0            [   4   ]          counts[1]
//! depth 1        [  3  ] [  1  ]        counts[2..4]
//! depth 2      [ 2 ][ 1 ][ 1 ][ 0 ]     counts[4..8]
//! depth 3 bits  1 1  1 0  1 0  0 0      bit field
//! ```
//!
//! Bit edits ([`LebHeap::split_node_fast`], [`LebHeap::merge_node_fast`])
//! leave the table stale until [`LebHeap::compute_sum_reduction`] runs.

use rayon::prelude::*;

use super::LebNode;
use crate::error::TreeError;

/// Deepest tree the heap supports (2^28 leaf bits, 1 GiB of counts).
pub const HEAP_MAX_DEPTH: u32 = 28;

/// Reduction levels narrower than this are summed on the calling thread.
const PAR_MIN_LEN: usize = 1 << 12;

/// Bisection tree heap: leaf bit field plus sum-reduction table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LebHeap {
  min_depth: u32,
  max_depth: u32,
  /// One bit per node of depth `max_depth`.
  bits: Vec<u64>,
  /// Leaf counts for nodes of depth `< max_depth`, indexed by id.
  /// Entry 0 is unused.
  counts: Vec<u32>,
}

impl LebHeap {
  /// Create a heap and reset it to `min_depth`.
  pub fn new(min_depth: u32, max_depth: u32) -> Result<Self, TreeError> {
    if max_depth == 0 || max_depth > HEAP_MAX_DEPTH || min_depth > max_depth {
      return Err(TreeError::InvalidDepth {
        min_depth,
        max_depth,
        limit: HEAP_MAX_DEPTH,
      });
    }

    let leaf_bits = 1usize << max_depth;
    let mut heap = Self {
      min_depth,
      max_depth,
      bits: vec![0; leaf_bits.div_ceil(64)],
      counts: vec![0; leaf_bits],
    };
    heap.reset_to_depth(min_depth);
    Ok(heap)
  }

  /// Shallowest depth merges may reach.
  #[inline]
  pub fn min_depth(&self) -> u32 {
    self.min_depth
  }

  /// Deepest depth splits may reach.
  #[inline]
  pub fn max_depth(&self) -> u32 {
    self.max_depth
  }

  /// Reset to the coarse starting state: every node of `min_depth` a leaf.
  pub fn reset(&mut self) {
    self.reset_to_depth(self.min_depth);
  }

  /// Make every node of `depth` a leaf and rebuild the reduction.
  ///
  /// `depth` must lie in `min_depth..=max_depth`.
  pub fn reset_to_depth(&mut self, depth: u32) {
    assert!(
      depth >= self.min_depth && depth <= self.max_depth,
      "reset depth {depth} outside {}..={}",
      self.min_depth,
      self.max_depth
    );

    self.bits.fill(0);
    let stride = 1u64 << (self.max_depth - depth);
    for k in 0..(1u64 << depth) {
      self.write_bit(k * stride, true);
    }
    self.compute_sum_reduction();
  }

  // ---------------------------------------------------------------------
  // Bit field
  // ---------------------------------------------------------------------

  /// Raw bit field, one bit per max-depth node (the tree-state buffer).
  #[inline]
  pub fn bit_field(&self) -> &[u64] {
    &self.bits
  }

  /// Number of bits in the field (`2^max_depth`).
  #[inline]
  pub fn bit_len(&self) -> u64 {
    1u64 << self.max_depth
  }

  /// Read one bit of the field.
  #[inline]
  pub fn leaf_bit(&self, index: u64) -> bool {
    (self.bits[(index >> 6) as usize] >> (index & 63)) & 1 == 1
  }

  /// Write one bit; returns true if it changed.
  #[inline]
  fn write_bit(&mut self, index: u64, value: bool) -> bool {
    let word = &mut self.bits[(index >> 6) as usize];
    let mask = 1u64 << (index & 63);
    let before = *word & mask != 0;
    if value {
      *word |= mask;
    } else {
      *word &= !mask;
    }
    before != value
  }

  /// Split `node` by setting the ceil bit of its right child.
  ///
  /// Returns true if the bit field changed. Nodes at `max_depth` cannot be
  /// split. The reduction is not updated.
  #[inline]
  pub fn split_node_fast(&mut self, node: LebNode) -> bool {
    if node.depth >= self.max_depth {
      return false;
    }
    let index = node.right_child().ceil_bit_index(self.max_depth);
    self.write_bit(index, true)
  }

  /// Merge `node` with its sibling by clearing the right sibling's ceil bit.
  ///
  /// Returns true if the bit field changed. The reduction is not updated.
  #[inline]
  pub fn merge_node_fast(&mut self, node: LebNode) -> bool {
    if node.depth == 0 {
      return false;
    }
    let right = LebNode::new(node.id | 1, node.depth);
    let index = right.ceil_bit_index(self.max_depth);
    self.write_bit(index, false)
  }

  // ---------------------------------------------------------------------
  // Sum reduction
  // ---------------------------------------------------------------------

  /// Rebuild the reduction table bottom-up from the bit field.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "leb::sum_reduction"))]
  pub fn compute_sum_reduction(&mut self) {
    let max_depth = self.max_depth;

    // Level max_depth - 1: pairs of bits.
    {
      let start = 1usize << (max_depth - 1);
      let bits = &self.bits;
      self.counts[start..]
        .par_iter_mut()
        .with_min_len(PAR_MIN_LEN)
        .enumerate()
        .for_each(|(i, count)| {
          let pair = (bits[i >> 5] >> ((i & 31) << 1)) & 0b11;
          *count = pair.count_ones();
        });
    }

    // Remaining levels: sum of the two children one level below.
    for depth in (0..max_depth - 1).rev() {
      let start = 1usize << depth;
      let (lower, upper) = self.counts.split_at_mut(start << 1);
      let level = &mut lower[start..];
      let children = &upper[..start << 1];
      if level.len() < PAR_MIN_LEN {
        for (i, count) in level.iter_mut().enumerate() {
          *count = children[i << 1] + children[(i << 1) | 1];
        }
      } else {
        level
          .par_iter_mut()
          .with_min_len(PAR_MIN_LEN)
          .enumerate()
          .for_each(|(i, count)| {
            *count = children[i << 1] + children[(i << 1) | 1];
          });
      }
    }
  }

  /// Leaves under `node`, as of the last reduction (bit value at
  /// `max_depth`).
  #[inline]
  pub fn node_counter(&self, node: LebNode) -> u32 {
    assert!(
      node.depth <= self.max_depth,
      "node {} deeper than max depth {}",
      node.id,
      self.max_depth
    );
    if node.depth == self.max_depth {
      self.leaf_bit(node.ceil_bit_index(self.max_depth)) as u32
    } else {
      self.counts[node.id as usize]
    }
  }

  /// Size of the active leaf set.
  #[inline]
  pub fn node_count(&self) -> u64 {
    self.node_counter(LebNode::root()) as u64
  }

  /// True if `node` is currently a leaf of the tree.
  pub fn is_leaf(&self, node: LebNode) -> bool {
    if node.is_null() || node.depth > self.max_depth || self.node_counter(node) != 1 {
      return false;
    }
    match node.parent() {
      Some(parent) => self.node_counter(parent) > 1,
      None => true,
    }
  }

  /// Leaf at `rank` in depth-first, left-to-right order.
  ///
  /// Panics if `rank >= node_count()`.
  pub fn decode_node(&self, rank: u64) -> LebNode {
    assert!(
      rank < self.node_count(),
      "rank {rank} out of range (node count {})",
      self.node_count()
    );

    let mut node = LebNode::root();
    let mut rank = rank;
    while self.node_counter(node) > 1 {
      let left = node.left_child();
      let left_count = self.node_counter(left) as u64;
      if rank < left_count {
        node = left;
      } else {
        rank -= left_count;
        node = node.right_child();
      }
    }
    node
  }

  /// Rank of a leaf: the number of leaves to its left.
  pub fn encode_node(&self, node: LebNode) -> u64 {
    let mut rank = 0u64;
    for bit_id in (0..node.depth).rev() {
      if node.bit(bit_id) == 1 {
        let ancestor = node.ancestor_at(node.depth - bit_id - 1);
        rank += self.node_counter(ancestor.left_child()) as u64;
      }
    }
    rank
  }

  /// Active leaves in rank order.
  pub fn leaves(&self) -> Leaves<'_> {
    Leaves {
      heap: self,
      stack: vec![LebNode::root()],
    }
  }

  /// Active leaves collected into a vector.
  pub fn collect_leaves(&self) -> Vec<LebNode> {
    let mut leaves = Vec::with_capacity(self.node_count() as usize);
    leaves.extend(self.leaves());
    leaves
  }

  /// Approximate heap memory in bytes.
  pub fn memory_bytes(&self) -> usize {
    self.bits.len() * std::mem::size_of::<u64>() + self.counts.len() * std::mem::size_of::<u32>()
  }
}

/// Depth-first iterator over the active leaves, driven by the reduction.
pub struct Leaves<'a> {
  heap: &'a LebHeap,
  stack: Vec<LebNode>,
}

impl Iterator for Leaves<'_> {
  type Item = LebNode;

  fn next(&mut self) -> Option<LebNode> {
    while let Some(node) = self.stack.pop() {
      match self.heap.node_counter(node) {
        0 => continue,
        1 => return Some(node),
        _ => {
          self.stack.push(node.right_child());
          self.stack.push(node.left_child());
        }
      }
    }
    None
  }
}

#[cfg(test)]
#[path = "heap_test.rs"]
mod heap_test;
