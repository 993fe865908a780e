//! Engine-agnostic statistics for a virtual texture session.
//!
//! Feature-gated and runtime-toggled: without the `metrics` feature every
//! `record_*` call is a no-op.
//!
//! ```ignore
//! use leb_texture::metrics::{TextureMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! metrics.update_from_leaves(heap.leaves());
//! metrics.record_sweep_timing(output.elapsed_us);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::leb::LebNode;

/// Histogram buckets; deeper leaves land in the last one.
pub const DEPTH_BUCKETS: usize = 32;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// True when compiled with `metrics` and the runtime toggle is on.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// The last `capacity` samples with a running total.
#[derive(Debug, Clone)]
pub struct SampleWindow {
  samples: VecDeque<u64>,
  capacity: usize,
  total: u64,
}

impl SampleWindow {
  pub fn new(capacity: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(capacity),
      capacity,
      total: 0,
    }
  }

  /// Record a sample, evicting the oldest once full.
  pub fn push(&mut self, sample: u64) {
    if self.capacity == 0 {
      return;
    }
    if self.samples.len() == self.capacity {
      if let Some(oldest) = self.samples.pop_front() {
        self.total -= oldest;
      }
    }
    self.samples.push_back(sample);
    self.total += sample;
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.samples.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn clear(&mut self) {
    self.samples.clear();
    self.total = 0;
  }

  /// Mean of the held samples, 0 when empty.
  pub fn average(&self) -> f64 {
    if self.samples.is_empty() {
      return 0.0;
    }
    self.total as f64 / self.samples.len() as f64
  }
}

/// Session statistics, refreshed each time a tree state is adopted.
#[derive(Debug, Clone)]
pub struct TextureMetrics {
  // Level of detail
  /// Active leaves per depth (index = depth).
  pub leaves_per_depth: [u32; DEPTH_BUCKETS],

  // Cache
  pub resident_pages: u32,
  /// Slot pool size.
  pub cache_memory_bytes: u64,
  /// Bit field plus reduction table.
  pub tree_memory_bytes: u64,

  // Timing (microseconds)
  pub sweep_timings: SampleWindow,
  pub rebuild_timings: SampleWindow,
  pub last_sweep_us: u64,
  pub last_rebuild_us: u64,

  // Streaming
  pub upload_bytes: SampleWindow,

  // Cumulative
  pub cycles_adopted: u64,
  pub capacity_skips: u64,
  pub deferred_uploads: u64,
}

impl Default for TextureMetrics {
  fn default() -> Self {
    Self {
      leaves_per_depth: [0; DEPTH_BUCKETS],
      resident_pages: 0,
      cache_memory_bytes: 0,
      tree_memory_bytes: 0,
      sweep_timings: SampleWindow::new(128),
      rebuild_timings: SampleWindow::new(128),
      last_sweep_us: 0,
      last_rebuild_us: 0,
      upload_bytes: SampleWindow::new(128),
      cycles_adopted: 0,
      capacity_skips: 0,
      deferred_uploads: 0,
    }
  }
}

impl TextureMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear gauges and histories; cumulative counters survive.
  pub fn reset(&mut self) {
    self.leaves_per_depth.fill(0);
    self.resident_pages = 0;
    self.cache_memory_bytes = 0;
    self.tree_memory_bytes = 0;
    self.sweep_timings.clear();
    self.rebuild_timings.clear();
    self.upload_bytes.clear();
    self.last_sweep_us = 0;
    self.last_rebuild_us = 0;
  }

  /// Rebuild the depth histogram from the active leaf set.
  pub fn update_from_leaves<I: IntoIterator<Item = LebNode>>(&mut self, leaves: I) {
    if !is_enabled() {
      return;
    }
    self.leaves_per_depth.fill(0);
    for leaf in leaves {
      let bucket = (leaf.depth as usize).min(DEPTH_BUCKETS - 1);
      self.leaves_per_depth[bucket] += 1;
    }
    self.cycles_adopted += 1;
  }

  pub fn record_memory(&mut self, resident_pages: usize, cache_bytes: usize, tree_bytes: usize) {
    if is_enabled() {
      self.resident_pages = resident_pages as u32;
      self.cache_memory_bytes = cache_bytes as u64;
      self.tree_memory_bytes = tree_bytes as u64;
    }
  }

  pub fn record_sweep_timing(&mut self, timing_us: u64) {
    if is_enabled() {
      self.sweep_timings.push(timing_us);
      self.last_sweep_us = timing_us;
    }
  }

  pub fn record_rebuild_timing(&mut self, timing_us: u64) {
    if is_enabled() {
      self.rebuild_timings.push(timing_us);
      self.last_rebuild_us = timing_us;
    }
  }

  /// Bytes pushed into the streaming ring in one cycle.
  pub fn record_upload(&mut self, bytes: u64) {
    if is_enabled() {
      self.upload_bytes.push(bytes);
    }
  }

  pub fn record_capacity_skip(&mut self) {
    if is_enabled() {
      self.capacity_skips += 1;
    }
  }

  pub fn record_deferred_uploads(&mut self, count: usize) {
    if is_enabled() {
      self.deferred_uploads += count as u64;
    }
  }

  pub fn total_leaves(&self) -> u32 {
    self.leaves_per_depth.iter().sum()
  }

  /// Deepest populated bucket.
  pub fn max_leaf_depth(&self) -> Option<usize> {
    self.leaves_per_depth.iter().rposition(|count| *count > 0)
  }

  pub fn avg_sweep_timing_us(&self) -> f64 {
    self.sweep_timings.average()
  }

  pub fn avg_rebuild_timing_us(&self) -> f64 {
    self.rebuild_timings.average()
  }

  /// Mean bytes uploaded per cycle with uploads.
  pub fn avg_upload_bytes(&self) -> f64 {
    self.upload_bytes.average()
  }

  pub fn cache_memory_mb(&self) -> f64 {
    self.cache_memory_bytes as f64 / 1_048_576.0
  }
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;
