//! LebNode - bit-path identifier of a node in the bisection tree.
//!
//! A node id is its root-to-node path read as a binary string with an
//! implicit leading 1 bit: the root is `1`, its children `2` and `3`, their
//! children `4..8`, and so on. Depth is the index of the leading bit; it is
//! stored alongside the id so hot loops never recompute it.
//!
//! Id `0` never names a node. Neighbor decoding uses it as the "no
//! neighbor" sentinel at domain boundaries.

/// Node of the longest-edge-bisection tree - immutable value type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LebNode {
  /// Root-to-node path with an implicit leading 1 bit.
  pub id: u64,
  /// Subdivision depth (0 = root). Always the index of the leading bit.
  pub depth: u32,
}

impl LebNode {
  /// Sentinel returned where no node exists.
  pub const NULL: Self = Self { id: 0, depth: 0 };

  /// Create a node from an id and its (redundant) depth.
  #[inline]
  pub fn new(id: u64, depth: u32) -> Self {
    debug_assert!(
      id == 0 || depth == 63 - id.leading_zeros(),
      "depth {depth} does not match id {id}"
    );
    Self { id, depth }
  }

  /// The root node.
  #[inline]
  pub fn root() -> Self {
    Self { id: 1, depth: 0 }
  }

  /// Create a node from its id alone, deriving the depth.
  #[inline]
  pub fn from_id(id: u64) -> Self {
    if id == 0 {
      return Self::NULL;
    }
    Self {
      id,
      depth: 63 - id.leading_zeros(),
    }
  }

  /// True for the "no node" sentinel.
  #[inline]
  pub fn is_null(&self) -> bool {
    self.id == 0
  }

  #[inline]
  pub fn is_root(&self) -> bool {
    self.id == 1
  }

  /// Parent node, or `None` at the root.
  #[inline]
  pub fn parent(&self) -> Option<Self> {
    if self.depth == 0 {
      return None;
    }
    Some(Self {
      id: self.id >> 1,
      depth: self.depth - 1,
    })
  }

  /// Child selected by path bit 0.
  #[inline]
  pub fn left_child(&self) -> Self {
    Self {
      id: self.id << 1,
      depth: self.depth + 1,
    }
  }

  /// Child selected by path bit 1.
  #[inline]
  pub fn right_child(&self) -> Self {
    Self {
      id: (self.id << 1) | 1,
      depth: self.depth + 1,
    }
  }

  /// The other child of this node's parent.
  #[inline]
  pub fn sibling(&self) -> Self {
    Self {
      id: self.id ^ 1,
      depth: self.depth,
    }
  }

  /// Path bit `bit_id` (0 = the last step taken from the parent).
  #[inline]
  pub fn bit(&self, bit_id: u32) -> u64 {
    (self.id >> bit_id) & 1
  }

  /// Ancestor of this node at `depth` (itself when `depth == self.depth`).
  #[inline]
  pub fn ancestor_at(&self, depth: u32) -> Self {
    debug_assert!(depth <= self.depth);
    Self {
      id: self.id >> (self.depth - depth),
      depth,
    }
  }

  /// True if `self` is `other` or one of its ancestors.
  #[inline]
  pub fn contains(&self, other: &Self) -> bool {
    other.depth >= self.depth && other.ancestor_at(self.depth).id == self.id
  }

  /// Index of this node's leftmost descendant among the `2^max_depth`
  /// nodes of depth `max_depth`.
  ///
  /// This is the bit that marks the node as a leaf in the heap bit field.
  #[inline]
  pub fn ceil_bit_index(&self, max_depth: u32) -> u64 {
    debug_assert!(self.depth <= max_depth);
    (self.id - (1u64 << self.depth)) << (max_depth - self.depth)
  }

  /// Number of depth-`max_depth` descendants (the width of the node's
  /// range in the bit field).
  #[inline]
  pub fn ceil_span(&self, max_depth: u32) -> u64 {
    1u64 << (max_depth - self.depth)
  }
}

impl Default for LebNode {
  fn default() -> Self {
    Self::root()
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
