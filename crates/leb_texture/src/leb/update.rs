//! Conforming split/merge and the ping-pong update sweeps.
//!
//! # Split
//!
//! Splitting a triangle puts a vertex on the middle of its longest edge, so
//! the triangle across that edge must split too. If that neighbor is not a
//! node of the tree yet (its parent is the leaf), the parent is split first
//! and the walk continues across the parent's longest edge. Every second
//! step moves one level up, so the walk ends after at most `2 * depth`
//! steps, at the domain boundary or at `min_depth`.
//!
//! # Merge
//!
//! A diamond (a node's parent plus the parent's longest-edge neighbor)
//! merges only when both halves are split exactly once. Merging clears both
//! halves together, which removes the shared midpoint without leaving a
//! crack.
//!
//! # Sweeps
//!
//! A sweep snapshots the active leaves, evaluates the predicate for all of
//! them in parallel, then applies the edits in rank order. Split and merge
//! sweeps strictly alternate ([`LebUpdater`]); a split sweep never merges
//! and a merge sweep never splits.

use rayon::prelude::*;
use smallvec::SmallVec;

use super::codec::{decode_diamond_parent, decode_same_depth_neighbors, DiamondParent, Domain};
use super::predicate::SubdivisionPredicate;
use super::{LebHeap, LebNode};

/// Longest-edge neighbor of `node`, if any.
#[inline]
fn edge_neighbor(domain: Domain, node: LebNode) -> Option<LebNode> {
  match decode_same_depth_neighbors(domain, node).edge {
    0 => None,
    id => Some(LebNode::new(id, node.depth)),
  }
}

/// Split `node` and every node needed to keep the tree conforming.
///
/// Returns the number of nodes that changed from leaf to split. Nodes at
/// `max_depth` are left untouched. The reduction is not updated.
pub fn split_conforming(heap: &mut LebHeap, domain: Domain, node: LebNode) -> usize {
  if node.depth >= heap.max_depth() {
    return 0;
  }
  let min_depth = heap.min_depth();
  let mut splits = heap.split_node_fast(node) as usize;

  // Pending longest-edge neighbors, one level shallower per pop.
  let mut pending: SmallVec<[LebNode; 8]> = SmallVec::new();
  pending.extend(edge_neighbor(domain, node));

  while let Some(current) = pending.pop() {
    if current.depth < min_depth {
      continue;
    }
    splits += heap.split_node_fast(current) as usize;

    let Some(parent) = current.parent() else {
      continue;
    };
    if parent.depth < min_depth {
      continue;
    }
    splits += heap.split_node_fast(parent) as usize;
    pending.extend(edge_neighbor(domain, parent));
  }
  splits
}

/// Merge the diamond above `node` if both halves allow it.
///
/// `diamond` must be `decode_diamond_parent(domain, node)`. Reads the
/// reduction, which must be current for the two diamond halves. Returns the
/// number of halves merged (0 if the merge was refused).
pub fn merge_conforming(heap: &mut LebHeap, node: LebNode, diamond: DiamondParent) -> usize {
  let DiamondParent { base, top } = diamond;
  if node.depth <= heap.min_depth() {
    return 0;
  }
  // Each half must be split exactly once: two leaves, nothing deeper.
  if heap.node_counter(base) != 2 {
    return 0;
  }
  if top != base && heap.node_counter(top) != 2 {
    return 0;
  }

  let mut merges = heap.merge_node_fast(base.left_child()) as usize;
  if top != base {
    merges += heap.merge_node_fast(top.left_child()) as usize;
  }
  merges
}

/// Which edits a sweep applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateSweep {
  #[default]
  Split,
  Merge,
}

impl UpdateSweep {
  /// The other sweep of the alternation.
  #[inline]
  pub fn opposite(self) -> Self {
    match self {
      UpdateSweep::Split => UpdateSweep::Merge,
      UpdateSweep::Merge => UpdateSweep::Split,
    }
  }
}

/// Statistics from one sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepStats {
  pub sweep: UpdateSweep,
  /// Active leaves before the sweep.
  pub leaves_before: u64,
  /// Active leaves after the sweep.
  pub leaves_after: u64,
  /// Leaves the predicate selected.
  pub candidates: usize,
  /// Nodes split, including conformity splits.
  pub splits: usize,
  /// Diamond halves merged.
  pub merges: usize,
}

impl SweepStats {
  /// True if the sweep did not change the tree.
  #[inline]
  pub fn is_noop(&self) -> bool {
    self.splits == 0 && self.merges == 0
  }
}

/// Run one full sweep over the active leaves and recompute the reduction.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "leb::update_sweep"))]
pub fn update_sweep<P>(
  heap: &mut LebHeap,
  domain: Domain,
  sweep: UpdateSweep,
  predicate: &P,
) -> SweepStats
where
  P: SubdivisionPredicate + Sync + ?Sized,
{
  let leaves = heap.collect_leaves();
  let leaves_before = leaves.len() as u64;
  let mut stats = SweepStats {
    sweep,
    leaves_before,
    leaves_after: leaves_before,
    candidates: 0,
    splits: 0,
    merges: 0,
  };

  match sweep {
    UpdateSweep::Split => {
      let max_depth = heap.max_depth();
      let selected: Vec<LebNode> = leaves
        .par_iter()
        .copied()
        .filter(|node| node.depth < max_depth && predicate.wants_split(domain, *node))
        .collect();
      stats.candidates = selected.len();
      for node in selected {
        stats.splits += split_conforming(heap, domain, node);
      }
    }
    UpdateSweep::Merge => {
      let min_depth = heap.min_depth();
      let selected: Vec<(LebNode, DiamondParent)> = leaves
        .par_iter()
        .copied()
        .filter(|node| node.depth > min_depth)
        .filter_map(|node| {
          let diamond = decode_diamond_parent(domain, node);
          let keep = predicate.wants_split(domain, diamond.base)
            || predicate.wants_split(domain, diamond.top);
          (!keep).then_some((node, diamond))
        })
        .collect();
      stats.candidates = selected.len();
      // Counts stay at their pre-sweep values until the reduction below;
      // a diamond already merged this sweep reports zero changed bits.
      for (node, diamond) in selected {
        stats.merges += merge_conforming(heap, node, diamond);
      }
    }
  }

  heap.compute_sum_reduction();
  stats.leaves_after = heap.node_count();
  tracing::trace!(
    ?sweep,
    leaves_before = stats.leaves_before,
    leaves_after = stats.leaves_after,
    splits = stats.splits,
    merges = stats.merges,
    "update sweep"
  );
  stats
}

/// Drives the split/merge alternation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LebUpdater {
  domain: Domain,
  next: UpdateSweep,
}

impl LebUpdater {
  /// Start with a split sweep.
  pub fn new(domain: Domain) -> Self {
    Self {
      domain,
      next: UpdateSweep::Split,
    }
  }

  #[inline]
  pub fn domain(&self) -> Domain {
    self.domain
  }

  /// The sweep the next [`LebUpdater::step`] will run.
  #[inline]
  pub fn next_sweep(&self) -> UpdateSweep {
    self.next
  }

  /// Claim the next sweep and advance the alternation without running it,
  /// for sweeps executed elsewhere (see the decision domains).
  pub fn advance(&mut self) -> UpdateSweep {
    let sweep = self.next;
    self.next = sweep.opposite();
    sweep
  }

  /// Run the next sweep of the alternation on `heap`.
  pub fn step<P>(&mut self, heap: &mut LebHeap, predicate: &P) -> SweepStats
  where
    P: SubdivisionPredicate + Sync + ?Sized,
  {
    let sweep = self.advance();
    update_sweep(heap, self.domain, sweep, predicate)
  }
}

#[cfg(test)]
#[path = "update_test.rs"]
mod update_test;
