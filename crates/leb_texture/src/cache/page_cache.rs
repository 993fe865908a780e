//! Bounded page cache: an [`LruIndex`] over a pool of page-sized slots,
//! filled from a [`PageSource`] on miss.
//!
//! A miss fetches into a staging buffer first and only then picks (and
//! overwrites) a slot, so a failed fetch changes nothing: no key is
//! evicted, no slot holds a partial page, and the recency order is intact.

use super::lru::LruIndex;
use crate::error::CacheError;
use crate::page::PageSource;

/// How a lookup was served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
  Hit,
  /// Fetched from the source; `evicted` lost its slot to make room.
  Miss { evicted: Option<u64> },
}

/// Slot holding the requested page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup {
  pub slot: u32,
  pub outcome: LookupOutcome,
}

impl Lookup {
  #[inline]
  pub fn is_hit(&self) -> bool {
    self.outcome == LookupOutcome::Hit
  }
}

/// Running counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub hits: u64,
  pub misses: u64,
  pub evictions: u64,
  pub fetch_failures: u64,
}

impl CacheStats {
  /// Fraction of lookups served without a fetch.
  pub fn hit_rate(&self) -> f64 {
    let total = self.hits + self.misses;
    if total == 0 {
      0.0
    } else {
      self.hits as f64 / total as f64
    }
  }
}

/// Page cache with exact LRU eviction.
pub struct PageCache<S> {
  source: S,
  index: LruIndex<u64>,
  slots: Vec<u8>,
  staging: Vec<u8>,
  bytes_per_page: usize,
  stats: CacheStats,
  /// Keys evicted by the current lookup batch.
  evictions: Vec<u64>,
}

impl<S: PageSource> PageCache<S> {
  /// Cache of `capacity` pages backed by `source`.
  pub fn new(source: S, capacity: usize) -> Result<Self, CacheError> {
    if capacity == 0 {
      return Err(CacheError::ZeroCapacity);
    }
    let bytes_per_page = source.bytes_per_page();
    Ok(Self {
      source,
      index: LruIndex::new(capacity),
      slots: vec![0; capacity * bytes_per_page],
      staging: vec![0; bytes_per_page],
      bytes_per_page,
      stats: CacheStats::default(),
      evictions: Vec::new(),
    })
  }

  /// Resident slot for page `id`, fetching it on miss.
  pub fn lookup(&mut self, id: u64) -> Result<Lookup, CacheError> {
    if let Some(slot) = self.index.get(&id) {
      self.stats.hits += 1;
      return Ok(Lookup {
        slot,
        outcome: LookupOutcome::Hit,
      });
    }

    self.stats.misses += 1;
    if let Err(source) = self.source.fetch_page(id, &mut self.staging) {
      self.stats.fetch_failures += 1;
      return Err(CacheError::Fetch { id, source });
    }

    let insertion = self.index.insert(id);
    let range = self.slot_range(insertion.slot);
    self.slots[range].copy_from_slice(&self.staging);

    if let Some(evicted) = insertion.evicted {
      self.stats.evictions += 1;
      self.evictions.push(evicted);
    }
    Ok(Lookup {
      slot: insertion.slot,
      outcome: LookupOutcome::Miss {
        evicted: insertion.evicted,
      },
    })
  }

  #[inline]
  fn slot_range(&self, slot: u32) -> std::ops::Range<usize> {
    let start = slot as usize * self.bytes_per_page;
    start..start + self.bytes_per_page
  }

  /// Page bytes held by `slot`.
  pub fn slot_data(&self, slot: u32) -> &[u8] {
    &self.slots[self.slot_range(slot)]
  }

  /// The whole slot pool, `capacity * bytes_per_page` bytes.
  #[inline]
  pub fn slot_pool(&self) -> &[u8] {
    &self.slots
  }

  #[inline]
  pub fn contains(&self, id: u64) -> bool {
    self.index.contains(&id)
  }

  /// Slot of a resident page, without touching the recency order.
  #[inline]
  pub fn slot_of(&self, id: u64) -> Option<u32> {
    self.index.peek(&id)
  }

  #[inline]
  pub fn resident_count(&self) -> usize {
    self.index.len()
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.index.capacity()
  }

  #[inline]
  pub fn bytes_per_page(&self) -> usize {
    self.bytes_per_page
  }

  #[inline]
  pub fn stats(&self) -> CacheStats {
    self.stats
  }

  #[inline]
  pub fn index(&self) -> &LruIndex<u64> {
    &self.index
  }

  /// Keys evicted since the batch started (see [`PageCache::begin_batch`]).
  pub fn evictions(&self) -> &[u64] {
    &self.evictions
  }

  /// Start a new lookup batch: forget the previous batch's evictions.
  pub fn begin_batch(&mut self) {
    self.evictions.clear();
  }

  /// Drain the eviction log.
  pub fn take_evictions(&mut self) -> Vec<u64> {
    std::mem::take(&mut self.evictions)
  }

  #[inline]
  pub fn source(&self) -> &S {
    &self.source
  }

  #[inline]
  pub fn source_mut(&mut self) -> &mut S {
    &mut self.source
  }
}

#[cfg(test)]
#[path = "page_cache_test.rs"]
mod page_cache_test;
