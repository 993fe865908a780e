//! VirtualTexture - the session context a renderer drives once per frame.
//!
//! Owns the canonical tree, the page cache and its indirection table, the
//! upload ring, and the update pipeline. One [`VirtualTexture::update`]
//! call is one controller step:
//!
//! 1. poll the pipeline (never blocks)
//! 2. on Ready: adopt the swept tree, rebuild the indirection table once,
//!    queue the freshly fetched pages for upload
//! 3. push queued pages into the streaming ring until it reports Busy
//! 4. dispatch the next sweep of the split/merge alternation if idle
//!
//! Until a sweep is observed Ready the previous tree and table stay in use.
//! A tree whose active leaf set does not fit the cache is dropped with a
//! warning; the previous tree and table remain authoritative.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use web_time::Instant;

use super::decision::{DecisionDomain, DecisionOutput, SweepRequest};
use super::state::{PipelineState, UpdatePipeline};
use crate::cache::{build_indirection, IndirectionTable, PageCache};
use crate::config::TextureConfig;
use crate::error::{CacheError, RingError, TextureError};
use crate::leb::{LebHeap, LebNode, LebUpdater, SubdivisionPredicate, SweepStats, UpdateSweep};
use crate::lod::{LodInputs, LodPredicate};
use crate::metrics::TextureMetrics;
use crate::page::{PageSource, PageStore};
use crate::streaming::{RingRegion, StreamingRing};

/// A page copied into the streaming ring, waiting for the renderer to move
/// it into its cache slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageUpload {
  pub node: u64,
  pub slot: u32,
  pub region: RingRegion,
}

/// Fetched page not yet written to the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueuedUpload {
  node: u64,
  slot: u32,
}

/// What one controller step did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
  /// Pipeline state at the end of the step.
  pub state: PipelineState,
  /// Stats of the sweep adopted this step.
  pub adopted: Option<SweepStats>,
  /// Indirection table rebuilt against the adopted tree.
  pub rebuilt: bool,
  /// Adopted tree dropped because its leaves exceed the cache capacity.
  pub capacity_skipped: bool,
  /// Pages loaded by the rebuild.
  pub fetched: usize,
  /// Pages evicted by the rebuild, listed in `cache().evictions()`.
  pub evicted: usize,
  /// Pages written to the ring this step.
  pub uploaded: usize,
  /// Pages still waiting for ring space.
  pub deferred: usize,
  /// Sweep dispatched this step.
  pub dispatched: Option<UpdateSweep>,
  /// Generation of the current indirection table.
  pub generation: u64,
}

/// Virtual texture session over a page source and a decision domain.
pub struct VirtualTexture<S, D> {
  config: TextureConfig,
  /// Tree the current indirection table was built for.
  heap: LebHeap,
  updater: LebUpdater,
  cache: PageCache<S>,
  pipeline: UpdatePipeline<D>,
  indirection: IndirectionTable,
  ring: StreamingRing,
  generation: u64,
  queued: VecDeque<QueuedUpload>,
  uploads: Vec<PageUpload>,
  metrics: TextureMetrics,
}

impl<D: DecisionDomain> VirtualTexture<PageStore, D> {
  /// Open a page file read-only and start a session over it.
  pub fn open(path: impl AsRef<Path>, domain: D, config: &TextureConfig) -> Result<Self, TextureError> {
    let store = PageStore::open(path)?;
    Self::from_store(store, domain, config)
  }

  /// Start a session over an open page file whose layout must match
  /// `config`.
  pub fn from_store(store: PageStore, domain: D, config: &TextureConfig) -> Result<Self, TextureError> {
    if store.layers() != config.layers.as_slice() {
      return Err(TextureError::LayerMismatch);
    }
    let tree = config.validate()?;
    if tree > store.depth() {
      return Err(TextureError::DepthMismatch {
        tree,
        file: store.depth(),
      });
    }
    Self::new(store, domain, config)
  }
}

impl<S: PageSource, D: DecisionDomain> VirtualTexture<S, D> {
  /// Build a session: reset the tree to its minimum depth and make every
  /// starting leaf resident.
  pub fn new(source: S, domain: D, config: &TextureConfig) -> Result<Self, TextureError> {
    let max_depth = config.validate()?;
    let bytes_per_page = config.bytes_per_page();
    if source.bytes_per_page() as u64 != bytes_per_page {
      return Err(TextureError::PageSizeMismatch {
        source_bytes: source.bytes_per_page(),
        config_bytes: bytes_per_page,
      });
    }

    let heap = LebHeap::new(config.min_depth, max_depth)?;
    let mut cache = PageCache::new(source, config.cache_capacity)?;
    let leaves = heap.collect_leaves();
    let indirection = build_indirection(&mut cache, &leaves, 0)?;

    let mut texture = Self {
      config: config.clone(),
      heap,
      updater: LebUpdater::new(config.domain),
      cache,
      pipeline: UpdatePipeline::new(domain),
      indirection,
      ring: StreamingRing::new(config.ring_capacity_pages * bytes_per_page as usize),
      generation: 0,
      queued: VecDeque::new(),
      uploads: Vec::new(),
      metrics: TextureMetrics::new(),
    };
    texture.queue_fetched(&leaves);
    texture.flush_uploads();
    texture.record_tree_metrics(&leaves);

    tracing::debug!(
      max_depth,
      min_depth = config.min_depth,
      capacity = config.cache_capacity,
      leaves = leaves.len(),
      "virtual texture session started"
    );
    Ok(texture)
  }

  /// One controller step driven by camera inputs.
  pub fn update(&mut self, inputs: &LodInputs) -> Result<CycleReport, TextureError> {
    let predicate = LodPredicate::new(inputs, self.config.page_texels(), self.heap.max_depth());
    self.update_with(Arc::new(predicate))
  }

  /// One controller step with an arbitrary split policy.
  ///
  /// A lost ticket resets the pipeline and is returned; the next step
  /// dispatches again.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "texture::update"))]
  pub fn update_with(
    &mut self,
    predicate: Arc<dyn SubdivisionPredicate + Send + Sync>,
  ) -> Result<CycleReport, TextureError> {
    let mut report = CycleReport::default();

    if self.pipeline.poll()? == PipelineState::Ready {
      if let Some(output) = self.pipeline.take_ready() {
        self.adopt(output, &mut report);
      }
    }

    report.uploaded = self.flush_uploads();
    report.deferred = self.queued.len();

    if self.pipeline.is_idle() {
      let sweep = self.updater.advance();
      let request = SweepRequest {
        domain: self.updater.domain(),
        sweep,
        predicate,
      };
      if self.pipeline.dispatch(self.heap.clone(), request) {
        report.dispatched = Some(sweep);
      }
    }

    report.state = self.pipeline.state();
    report.generation = self.generation;
    Ok(report)
  }

  /// Make a finished sweep canonical and rebuild the indirection table.
  fn adopt(&mut self, output: DecisionOutput, report: &mut CycleReport) {
    self.metrics.record_sweep_timing(output.elapsed_us);
    report.adopted = Some(output.stats);

    let leaves = output.heap.collect_leaves();
    let generation = self.generation + 1;
    let start = Instant::now();
    match build_indirection(&mut self.cache, &leaves, generation) {
      Ok(table) => {
        self.metrics.record_rebuild_timing(start.elapsed().as_micros() as u64);
        report.rebuilt = true;
        report.fetched = table.fetched.len();
        report.evicted = self.cache.evictions().len();
        self.indirection = table;
        self.heap = output.heap;
        self.generation = generation;
        self.queue_fetched(&leaves);
        self.record_tree_metrics(&leaves);
        tracing::debug!(
          generation,
          leaves = leaves.len(),
          fetched = report.fetched,
          evicted = report.evicted,
          missing = self.indirection.missing,
          "tree state adopted"
        );
      }
      Err(CacheError::CapacityExceeded { required, capacity }) => {
        self.metrics.record_capacity_skip();
        report.capacity_skipped = true;
        tracing::warn!(
          required,
          capacity,
          generation = self.generation,
          "active leaves exceed the page cache, keeping the previous tree"
        );
      }
      Err(err) => {
        tracing::warn!(error = %err, "indirection rebuild failed, keeping the previous tree");
      }
    }
  }

  fn queue_fetched(&mut self, leaves: &[LebNode]) {
    for &rank in &self.indirection.fetched {
      self.queued.push_back(QueuedUpload {
        node: leaves[rank].id,
        slot: self.indirection.slots[rank],
      });
    }
  }

  /// Copy queued pages into the ring under the current generation.
  /// Returns the number written; stops at the first busy region.
  fn flush_uploads(&mut self) -> usize {
    let mut written = 0;
    let mut bytes = 0u64;
    while let Some(upload) = self.queued.front().copied() {
      // The slot was handed to another page since the fetch.
      if self.cache.slot_of(upload.node) != Some(upload.slot) {
        self.queued.pop_front();
        continue;
      }
      let data = self.cache.slot_data(upload.slot);
      match self.ring.write(data, self.generation) {
        Ok(region) => {
          bytes += region.len as u64;
          self.uploads.push(PageUpload {
            node: upload.node,
            slot: upload.slot,
            region,
          });
          self.queued.pop_front();
          written += 1;
        }
        Err(RingError::Busy { fence }) => {
          tracing::trace!(fence, queued = self.queued.len(), "streaming ring busy");
          self.metrics.record_deferred_uploads(self.queued.len());
          break;
        }
        Err(err @ RingError::TooLarge { .. }) => {
          tracing::warn!(node = upload.node, error = %err, "page does not fit the streaming ring");
          self.queued.pop_front();
        }
      }
    }
    if written > 0 {
      self.metrics.record_upload(bytes);
    }
    written
  }

  fn record_tree_metrics(&mut self, leaves: &[LebNode]) {
    self.metrics.update_from_leaves(leaves.iter().copied());
    self.metrics.record_memory(
      self.cache.resident_count(),
      self.cache.slot_pool().len(),
      self.heap.memory_bytes(),
    );
  }

  /// Tree state the current indirection table was built for.
  #[inline]
  pub fn tree_state(&self) -> &LebHeap {
    &self.heap
  }

  /// Rank -> slot table for the current tree state.
  #[inline]
  pub fn indirection(&self) -> &IndirectionTable {
    &self.indirection
  }

  /// Number of tree states adopted.
  #[inline]
  pub fn generation(&self) -> u64 {
    self.generation
  }

  #[inline]
  pub fn config(&self) -> &TextureConfig {
    &self.config
  }

  #[inline]
  pub fn cache(&self) -> &PageCache<S> {
    &self.cache
  }

  #[inline]
  pub fn pipeline_state(&self) -> PipelineState {
    self.pipeline.state()
  }

  #[inline]
  pub fn ring(&self) -> &StreamingRing {
    &self.ring
  }

  #[inline]
  pub fn metrics(&self) -> &TextureMetrics {
    &self.metrics
  }

  /// Uploads written since the last call, in write order.
  pub fn take_uploads(&mut self) -> Vec<PageUpload> {
    std::mem::take(&mut self.uploads)
  }

  /// Page bytes of an upload; valid until its fence is retired.
  pub fn upload_bytes(&self, upload: &PageUpload) -> &[u8] {
    self.ring.region(&upload.region)
  }

  /// Pages fetched but not yet written to the ring.
  #[inline]
  pub fn queued_uploads(&self) -> usize {
    self.queued.len()
  }

  /// Release ring regions up to `fence` once the renderer consumed them.
  /// Queued pages are pushed into the freed space right away.
  pub fn retire_uploads(&mut self, fence: u64) -> usize {
    let released = self.ring.retire(fence);
    if released > 0 {
      self.flush_uploads();
    }
    released
  }
}

#[cfg(test)]
#[path = "texture_test.rs"]
mod texture_test;
