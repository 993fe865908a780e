use std::collections::{HashMap, HashSet};

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::leb::codec::decode_node_attributes;
use crate::leb::predicate::{AlwaysSplit, NeverSplit, TargetPredicate};

/// Exact integer coordinates (corners are dyadic rationals).
fn quantize(p: DVec2) -> (i64, i64) {
  let scale = (1u64 << 30) as f64;
  ((p.x * scale).round() as i64, (p.y * scale).round() as i64)
}

fn on_boundary(domain: Domain, a: (i64, i64), b: (i64, i64)) -> bool {
  let one = 1i64 << 30;
  let both = |f: &dyn Fn((i64, i64)) -> bool| f(a) && f(b);
  let sides = both(&|p| p.0 == 0) || both(&|p| p.1 == 0);
  match domain {
    Domain::Triangle => sides || both(&|p| p.0 + p.1 == one),
    Domain::Square => sides || both(&|p| p.0 == one) || both(&|p| p.1 == one),
  }
}

/// The leaf triangulation has no T-junctions: every leaf edge is either on
/// the domain boundary or shared with exactly one other leaf.
fn assert_crack_free(heap: &LebHeap, domain: Domain) {
  let mut edges: HashMap<((i64, i64), (i64, i64)), u32> = HashMap::new();
  for leaf in heap.leaves() {
    let c = decode_node_attributes(domain, leaf).map(quantize);
    for (a, b) in [(c[0], c[1]), (c[1], c[2]), (c[2], c[0])] {
      let key = if a < b { (a, b) } else { (b, a) };
      *edges.entry(key).or_default() += 1;
    }
  }
  for ((a, b), count) in edges {
    let expected = if on_boundary(domain, a, b) { 1 } else { 2 };
    assert_eq!(count, expected, "edge {a:?}-{b:?} used {count} times");
  }
}

/// Same-depth neighbor regions are covered by leaves at most one level
/// apart, and no longest edge is split from the other side.
fn assert_depth_gradation(heap: &LebHeap, domain: Domain) {
  let leaves: HashSet<u64> = heap.leaves().map(|n| n.id).collect();
  for leaf in heap.leaves() {
    let ids = decode_same_depth_neighbors(domain, leaf);
    for id in [ids.left, ids.right, ids.edge] {
      if id == 0 {
        continue;
      }
      let neighbor = LebNode::new(id, leaf.depth);
      let covering = leaves.contains(&id)
        || neighbor.parent().is_some_and(|p| leaves.contains(&p.id))
        || heap.node_counter(neighbor) > 1;
      assert!(covering, "neighbor {id} of {} is too coarse", leaf.id);
    }
    if ids.edge != 0 {
      let edge = LebNode::new(ids.edge, leaf.depth);
      assert!(
        heap.node_counter(edge) <= 1,
        "longest-edge neighbor {} of {} is split",
        ids.edge,
        leaf.id
      );
    }
  }
}

fn assert_conforming(heap: &LebHeap, domain: Domain) {
  assert_crack_free(heap, domain);
  assert_depth_gradation(heap, domain);
}

/// Every reduction entry matches a prefix-sum recount of the bit field.
fn assert_reduction_matches(heap: &LebHeap) {
  let max_depth = heap.max_depth();
  let mut prefix = vec![0u32; heap.bit_len() as usize + 1];
  for i in 0..heap.bit_len() {
    prefix[i as usize + 1] = prefix[i as usize] + heap.leaf_bit(i) as u32;
  }
  for depth in 0..=max_depth {
    for id in (1u64 << depth)..(2u64 << depth) {
      let node = LebNode::new(id, depth);
      let start = node.ceil_bit_index(max_depth) as usize;
      let end = start + node.ceil_span(max_depth) as usize;
      assert_eq!(heap.node_counter(node), prefix[end] - prefix[start], "node {id}");
    }
  }
}

#[test]
fn test_uniform_trees_conform() {
  let mut heap = LebHeap::new(1, 8).unwrap();
  for depth in 1..=8 {
    heap.reset_to_depth(depth);
    assert_conforming(&heap, Domain::Square);
  }
  let mut heap = LebHeap::new(0, 8).unwrap();
  for depth in 0..=8 {
    heap.reset_to_depth(depth);
    assert_conforming(&heap, Domain::Triangle);
  }
}

#[test]
fn test_split_conforming_propagates() {
  let domain = Domain::Square;
  let mut heap = LebHeap::new(1, 10).unwrap();
  heap.reset_to_depth(2);

  // Split a single deep chain; every step must pull its neighbors along.
  let mut node = LebNode::from_id(4);
  for _ in 0..8 {
    let splits = split_conforming(&mut heap, domain, node);
    assert!(splits >= 1);
    heap.compute_sum_reduction();
    assert_conforming(&heap, domain);
    node = node.right_child();
  }
  assert!(heap.node_count() > 4 + 8);
}

#[test]
fn test_split_at_max_depth_is_noop() {
  let mut heap = LebHeap::new(1, 3).unwrap();
  heap.reset_to_depth(3);
  let before = heap.clone();
  assert_eq!(split_conforming(&mut heap, Domain::Square, LebNode::from_id(8)), 0);
  assert_eq!(heap, before);
}

#[test]
fn test_merge_requires_both_halves() {
  let domain = Domain::Square;
  let mut heap = LebHeap::new(1, 8).unwrap();
  heap.reset_to_depth(3);

  // Refine one corner so a diamond half is split twice.
  let corner = LebNode::from_id(8);
  split_conforming(&mut heap, domain, corner);
  heap.compute_sum_reduction();
  split_conforming(&mut heap, domain, corner.left_child());
  heap.compute_sum_reduction();
  assert_conforming(&heap, domain);

  let sibling = LebNode::from_id(9);
  let diamond = decode_diamond_parent(domain, sibling);
  assert_eq!(merge_conforming(&mut heap, sibling, diamond), 0);

  // A diamond far away from the refinement merges as a whole.
  let far = LebNode::from_id(11);
  let diamond = decode_diamond_parent(domain, far);
  let merged = merge_conforming(&mut heap, far, diamond);
  assert_eq!(merged, if diamond.top == diamond.base { 1 } else { 2 });
  heap.compute_sum_reduction();
  assert!(heap.is_leaf(diamond.base));
  assert!(heap.is_leaf(diamond.top));
  assert_conforming(&heap, domain);
}

#[test]
fn test_merge_stops_at_min_depth() {
  let domain = Domain::Square;
  let mut heap = LebHeap::new(2, 6).unwrap();
  let node = LebNode::from_id(4);
  let diamond = decode_diamond_parent(domain, node);
  assert_eq!(merge_conforming(&mut heap, node, diamond), 0);
  assert_eq!(heap.node_count(), 4);
}

/// Always-true predicate: after `max_depth` split sweeps the tree is fully
/// split, and it conforms after every sweep.
#[test]
fn test_always_split_fills_tree() {
  for (domain, min_depth) in [(Domain::Square, 1), (Domain::Triangle, 0)] {
    let max_depth = 10;
    let mut heap = LebHeap::new(min_depth, max_depth).unwrap();
    for _ in 0..max_depth {
      update_sweep(&mut heap, domain, UpdateSweep::Split, &AlwaysSplit);
      assert_conforming(&heap, domain);
      assert_reduction_matches(&heap);
    }
    assert_eq!(heap.node_count(), 1 << max_depth);

    let stats = update_sweep(&mut heap, domain, UpdateSweep::Split, &AlwaysSplit);
    assert!(stats.is_noop());
  }
}

#[test]
fn test_never_split_collapses_to_min_depth() {
  let domain = Domain::Square;
  let mut heap = LebHeap::new(1, 8).unwrap();
  heap.reset_to_depth(8);
  let mut updater = LebUpdater::new(domain);
  for _ in 0..32 {
    updater.step(&mut heap, &NeverSplit);
    assert_conforming(&heap, domain);
  }
  assert_eq!(heap.node_count(), 2);
}

/// Alternating sweeps around a fixed target reach a fixed point.
#[test]
fn test_target_converges_to_fixed_point() {
  let domain = Domain::Square;
  let max_depth = 14;
  let mut heap = LebHeap::new(1, max_depth).unwrap();
  let predicate = TargetPredicate::new(DVec2::new(0.3, 0.7), 0.01, 12);
  let mut updater = LebUpdater::new(domain);

  for _ in 0..(6 * max_depth) {
    updater.step(&mut heap, &predicate);
    assert_conforming(&heap, domain);
  }
  let converged = heap.node_count();
  let leaves = heap.collect_leaves();
  assert!(leaves.iter().any(|n| n.depth == 12));

  for _ in 0..8 {
    let stats = updater.step(&mut heap, &predicate);
    assert!(stats.is_noop(), "{stats:?}");
    assert_eq!(heap.node_count(), converged);
  }
  assert_eq!(heap.collect_leaves(), leaves);
}

/// Moving the target refines the new area and releases the old one.
#[test]
fn test_target_moves() {
  let domain = Domain::Square;
  let mut heap = LebHeap::new(1, 12).unwrap();
  let mut updater = LebUpdater::new(domain);
  let first = TargetPredicate::new(DVec2::new(0.1, 0.1), 0.0, 10);
  let second = TargetPredicate::new(DVec2::new(0.9, 0.9), 0.0, 10);

  for _ in 0..40 {
    updater.step(&mut heap, &first);
  }
  let deepest_near = |heap: &LebHeap, p: DVec2| {
    heap
      .leaves()
      .filter(|n| triangle_distance_to(domain, *n, p) == 0.0)
      .map(|n| n.depth)
      .max()
      .unwrap()
  };
  assert_eq!(deepest_near(&heap, DVec2::new(0.1, 0.1)), 10);

  for _ in 0..40 {
    updater.step(&mut heap, &second);
    assert_conforming(&heap, domain);
  }
  assert_eq!(deepest_near(&heap, DVec2::new(0.9, 0.9)), 10);
  assert!(deepest_near(&heap, DVec2::new(0.1, 0.1)) < 10);
}

fn triangle_distance_to(domain: Domain, node: LebNode, p: DVec2) -> f64 {
  crate::leb::codec::triangle_distance(&decode_node_attributes(domain, node), p)
}

#[test]
fn test_closure_predicate_and_alternation() {
  let domain = Domain::Triangle;
  let mut heap = LebHeap::new(0, 6).unwrap();
  let mut updater = LebUpdater::new(domain);
  assert_eq!(updater.next_sweep(), UpdateSweep::Split);

  let left_half = |_: Domain, node: LebNode| node.depth == 0 || (node.depth < 4 && node.id & 1 == 0);
  let stats = updater.step(&mut heap, &left_half);
  assert_eq!(stats.sweep, UpdateSweep::Split);
  assert_eq!(updater.next_sweep(), UpdateSweep::Merge);
  let stats = updater.step(&mut heap, &left_half);
  assert_eq!(stats.sweep, UpdateSweep::Merge);
  assert_eq!(stats.leaves_after, heap.node_count());
  assert_reduction_matches(&heap);
  assert_conforming(&heap, domain);
}

/// Random conforming edits on random leaves keep the tree crack-free and
/// the reduction exact after every single edit.
#[test]
fn test_random_conforming_edits() {
  let cases = [
    (Domain::Triangle, 0),
    (Domain::Triangle, 3),
    (Domain::Square, 1),
    (Domain::Square, 3),
  ];
  for (seed, (domain, min_depth)) in cases.into_iter().enumerate() {
    let mut rng = StdRng::seed_from_u64(0x5eed + seed as u64);
    let mut heap = LebHeap::new(min_depth, 8).unwrap();

    for _ in 0..300 {
      let rank = rng.random_range(0..heap.node_count());
      let leaf = heap.decode_node(rank);
      if rng.random_bool(0.55) {
        split_conforming(&mut heap, domain, leaf);
      } else {
        let diamond = decode_diamond_parent(domain, leaf);
        merge_conforming(&mut heap, leaf, diamond);
      }
      heap.compute_sum_reduction();
      assert_reduction_matches(&heap);
      assert_conforming(&heap, domain);
      assert!(heap.leaves().all(|n| n.depth >= min_depth && n.depth <= 8));
    }
  }
}
