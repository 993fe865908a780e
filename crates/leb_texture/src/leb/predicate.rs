//! Split/merge decision policies.
//!
//! A predicate answers one question per node: should this node be split?
//! Split sweeps split the leaves it accepts; merge sweeps merge a diamond
//! when it rejects both halves.

use glam::DVec2;

use super::codec::{decode_node_attributes, triangle_distance, Domain};
use super::LebNode;

/// Per-node subdivision decision.
pub trait SubdivisionPredicate {
  /// True if `node` should be (or stay) subdivided.
  fn wants_split(&self, domain: Domain, node: LebNode) -> bool;
}

impl<F> SubdivisionPredicate for F
where
  F: Fn(Domain, LebNode) -> bool,
{
  #[inline]
  fn wants_split(&self, domain: Domain, node: LebNode) -> bool {
    self(domain, node)
  }
}

/// Split everything until `max_depth`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysSplit;

impl SubdivisionPredicate for AlwaysSplit {
  #[inline]
  fn wants_split(&self, _domain: Domain, _node: LebNode) -> bool {
    true
  }
}

/// Never split; merge sweeps collapse back to `min_depth`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverSplit;

impl SubdivisionPredicate for NeverSplit {
  #[inline]
  fn wants_split(&self, _domain: Domain, _node: LebNode) -> bool {
    false
  }
}

/// Refine around a point of the normalized domain.
///
/// A node wants to split while its triangle lies within `radius` of
/// `target` and it is shallower than `max_depth`. Coarser triangles contain
/// finer ones, so the predicate is monotone along every path, which makes
/// alternating sweeps converge to a fixed point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetPredicate {
  pub target: DVec2,
  pub radius: f64,
  pub max_depth: u32,
}

impl TargetPredicate {
  pub fn new(target: DVec2, radius: f64, max_depth: u32) -> Self {
    Self {
      target,
      radius: radius.max(0.0),
      max_depth,
    }
  }
}

impl SubdivisionPredicate for TargetPredicate {
  fn wants_split(&self, domain: Domain, node: LebNode) -> bool {
    if node.depth >= self.max_depth {
      return false;
    }
    if node.depth < domain.triangle_depth() {
      return true;
    }
    let corners = decode_node_attributes(domain, node);
    triangle_distance(&corners, self.target) <= self.radius
  }
}
