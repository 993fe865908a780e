//! Geometry and neighbor decoding from node ids.
//!
//! Every node is a right isosceles triangle `(v0, v1, v2)` with its apex
//! (right angle) at `v1` and its longest edge `v0 -> v2`. Bisecting the
//! longest edge at its midpoint `m` gives
//!
//! ```text
//! bit 0: (v0, m, v1)        bit 1: (v1, m, v2)
//! ```
//!
//! which is a fixed linear map on the three corner attributes per bit, so a
//! node's corners are the product of the maps along its path applied to the
//! root corners.
//!
//! Same-depth neighbors are named by the edge they share in the path frame
//! (before the winding fix-up): `left` across `v0 v1`, `right` across
//! `v1 v2`, `edge` across the longest edge `v0 v2`. The winding fix-up only
//! swaps `v0` and `v2`, so `edge` always names the longest-edge neighbor.

use glam::{DMat3, DVec2, DVec3};

use super::LebNode;

/// Normalized domain covered by the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Domain {
  /// A single right isosceles triangle `(0,1), (0,0), (1,0)`.
  Triangle,
  /// The unit square: the root is the square, its children the two
  /// triangles `(0,1), (0,0), (1,0)` and `(1,0), (1,1), (0,1)`.
  #[default]
  Square,
}

impl Domain {
  /// Depth of the first triangle-shaped nodes.
  #[inline]
  pub fn triangle_depth(self) -> u32 {
    match self {
      Domain::Triangle => 0,
      Domain::Square => 1,
    }
  }
}

/// Ids of the same-depth neighbors of `node` (0 = none).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NeighborIds {
  /// Neighbor across the first leg.
  pub left: u64,
  /// Neighbor across the second leg.
  pub right: u64,
  /// Neighbor across the longest edge `v0 v2`.
  pub edge: u64,
  /// The node itself.
  pub node: u64,
}

/// Diamond above a node: its parent and the parent's longest-edge
/// neighbor. On a domain boundary `top == base`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiamondParent {
  pub base: LebNode,
  pub top: LebNode,
}

/// Root triangle corner attributes (x and y per vertex).
const ROOT_X: DVec3 = DVec3::new(0.0, 0.0, 1.0);
const ROOT_Y: DVec3 = DVec3::new(1.0, 0.0, 0.0);

/// Matrix whose rows are the given vectors.
#[inline]
fn from_rows(r0: DVec3, r1: DVec3, r2: DVec3) -> DMat3 {
  DMat3::from_cols(r0, r1, r2).transpose()
}

/// Bisection step for one path bit.
#[inline]
fn splitting_matrix(bit: u64) -> DMat3 {
  let b = bit as f64;
  let c = 1.0 - b;
  from_rows(
    DVec3::new(c, b, 0.0),
    DVec3::new(0.5, 0.0, 0.5),
    DVec3::new(0.0, c, b),
  )
}

/// Picks one half of the unit square, expressed over the root triangle's
/// corners (the upper half's apex `(1,1)` is `v0 - v1 + v2`).
#[inline]
fn square_matrix(bit: u64) -> DMat3 {
  let b = bit as f64;
  let c = 1.0 - b;
  from_rows(
    DVec3::new(c, 0.0, b),
    DVec3::new(b, c - b, b),
    DVec3::new(b, 0.0, c),
  )
}

/// Swaps `v0` and `v2`, flipping the winding.
#[inline]
fn winding_matrix() -> DMat3 {
  from_rows(DVec3::Z, DVec3::Y, DVec3::X)
}

/// Linear map from the root triangle's corner attributes to the node's,
/// with counter-clockwise output winding at every depth.
pub fn decode_node_transform(domain: Domain, node: LebNode) -> DMat3 {
  let mut matrix = DMat3::IDENTITY;
  let mut bisections = node.depth;

  if domain == Domain::Square && node.depth > 0 {
    matrix = square_matrix(node.bit(node.depth - 1));
    bisections -= 1;
  }
  for bit_id in (0..bisections).rev() {
    matrix = splitting_matrix(node.bit(bit_id)) * matrix;
  }
  // Every bisection flips the orientation.
  if bisections & 1 == 1 {
    matrix = winding_matrix() * matrix;
  }
  matrix
}

/// Transform per-vertex scalar attributes of the root triangle into the
/// node's. Each entry holds one attribute's values at `(v0, v1, v2)`.
pub fn decode_node_attribute_array(domain: Domain, node: LebNode, attributes: &mut [DVec3]) {
  let matrix = decode_node_transform(domain, node);
  for attribute in attributes {
    *attribute = matrix * *attribute;
  }
}

/// Corners of the node's triangle in the normalized domain.
///
/// Corner 1 is the apex; the winding is counter-clockwise. The root of a
/// square domain is not a triangle and decodes to its lower-left half.
pub fn decode_node_attributes(domain: Domain, node: LebNode) -> [DVec2; 3] {
  let mut attributes = [ROOT_X, ROOT_Y];
  decode_node_attribute_array(domain, node, &mut attributes);
  let [x, y] = attributes;
  [
    DVec2::new(x.x, y.x),
    DVec2::new(x.y, y.y),
    DVec2::new(x.z, y.z),
  ]
}

/// Neighbor ids of a child, given its parent's and the path bit.
#[inline]
fn split_neighbor_ids(ids: NeighborIds, bit: u64) -> NeighborIds {
  let NeighborIds {
    left,
    right,
    edge,
    node,
  } = ids;
  // `x << 1 | 1` must keep the 0 sentinel at 0.
  let edge_bit = (edge != 0) as u64;
  let left_bit = (left != 0) as u64;

  if bit == 0 {
    NeighborIds {
      left: (edge << 1) | edge_bit,
      right: (node << 1) | 1,
      edge: (left << 1) | left_bit,
      node: node << 1,
    }
  } else {
    NeighborIds {
      left: node << 1,
      right: edge << 1,
      edge: right << 1,
      node: (node << 1) | 1,
    }
  }
}

/// Same-depth neighbors of `node`, derived from its path bits.
pub fn decode_same_depth_neighbors(domain: Domain, node: LebNode) -> NeighborIds {
  let mut ids = NeighborIds {
    left: 0,
    right: 0,
    edge: 0,
    node: 1,
  };
  let mut bisections = node.depth;

  if domain == Domain::Square && node.depth > 0 {
    // The two halves of the square share their longest edge.
    let b = node.bit(node.depth - 1);
    ids = NeighborIds {
      left: 0,
      right: 0,
      edge: 3 - b,
      node: 2 + b,
    };
    bisections -= 1;
  }
  for bit_id in (0..bisections).rev() {
    ids = split_neighbor_ids(ids, node.bit(bit_id));
  }
  ids
}

/// The diamond a node merges into: its parent plus the parent's
/// longest-edge neighbor.
pub fn decode_diamond_parent(domain: Domain, node: LebNode) -> DiamondParent {
  let base = node.parent().unwrap_or_else(LebNode::root);
  let top_id = decode_same_depth_neighbors(domain, base).edge;
  let top = if top_id == 0 {
    base
  } else {
    LebNode::new(top_id, base.depth)
  };
  DiamondParent { base, top }
}

/// Distance from `point` to the triangle (0 inside or on it).
pub fn triangle_distance(corners: &[DVec2; 3], point: DVec2) -> f64 {
  let [a, b, c] = *corners;
  let side = |p: DVec2, q: DVec2| (q - p).perp_dot(point - p);
  let (d0, d1, d2) = (side(a, b), side(b, c), side(c, a));
  let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
  let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
  if !(has_neg && has_pos) {
    return 0.0;
  }
  segment_distance(a, b, point)
    .min(segment_distance(b, c, point))
    .min(segment_distance(c, a, point))
}

#[inline]
fn segment_distance(p: DVec2, q: DVec2, point: DVec2) -> f64 {
  let pq = q - p;
  let t = ((point - p).dot(pq) / pq.length_squared()).clamp(0.0, 1.0);
  point.distance(p + pq * t)
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
