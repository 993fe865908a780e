use super::*;

#[test]
fn test_sample_window_average_tracks_recent_samples() {
  let mut window = SampleWindow::new(3);
  assert!(window.is_empty());
  assert_eq!(window.average(), 0.0);

  window.push(10);
  window.push(20);
  window.push(30);
  assert_eq!(window.len(), 3);
  assert_eq!(window.average(), 20.0);

  // 10 falls out.
  window.push(60);
  assert_eq!(window.len(), 3);
  assert_eq!(window.average(), 110.0 / 3.0);

  window.clear();
  assert!(window.is_empty());
  window.push(7);
  assert_eq!(window.average(), 7.0);
}

#[test]
fn test_zero_capacity_window_stays_empty() {
  let mut window = SampleWindow::new(0);
  window.push(5);
  assert!(window.is_empty());
  assert_eq!(window.average(), 0.0);
}

#[cfg(feature = "metrics")]
mod enabled {
  use super::*;
  use crate::leb::LebHeap;

  #[test]
  fn test_depth_histogram() {
    let mut heap = LebHeap::new(2, 8).unwrap();
    heap.split_node_fast(LebNode::new(4, 2));
    heap.compute_sum_reduction();

    let mut metrics = TextureMetrics::new();
    metrics.update_from_leaves(heap.leaves());
    assert_eq!(metrics.leaves_per_depth[2], 3);
    assert_eq!(metrics.leaves_per_depth[3], 2);
    assert_eq!(metrics.total_leaves(), 5);
    assert_eq!(metrics.max_leaf_depth(), Some(3));
    assert_eq!(metrics.cycles_adopted, 1);

    metrics.reset();
    assert_eq!(metrics.total_leaves(), 0);
    assert_eq!(metrics.cycles_adopted, 1);
  }

  #[test]
  fn test_timing_recording() {
    let mut metrics = TextureMetrics::new();
    metrics.record_sweep_timing(1000);
    metrics.record_sweep_timing(2000);
    metrics.record_sweep_timing(3000);
    assert_eq!(metrics.sweep_timings.len(), 3);
    assert_eq!(metrics.avg_sweep_timing_us(), 2000.0);
    assert_eq!(metrics.last_sweep_us, 3000);

    metrics.record_rebuild_timing(50);
    assert_eq!(metrics.last_rebuild_us, 50);

    metrics.record_upload(1024);
    metrics.record_upload(3072);
    assert_eq!(metrics.avg_upload_bytes(), 2048.0);
  }

  #[test]
  fn test_counters() {
    let mut metrics = TextureMetrics::new();
    metrics.record_capacity_skip();
    metrics.record_deferred_uploads(3);
    metrics.record_memory(4, 2 * 1_048_576, 128);
    assert_eq!(metrics.capacity_skips, 1);
    assert_eq!(metrics.deferred_uploads, 3);
    assert_eq!(metrics.resident_pages, 4);
    assert_eq!(metrics.cache_memory_mb(), 2.0);
  }
}
