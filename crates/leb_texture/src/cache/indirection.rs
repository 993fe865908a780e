//! Rank -> slot table consumed by the renderer.

use super::page_cache::PageCache;
use crate::error::CacheError;
use crate::leb::LebNode;
use crate::page::PageSource;

/// Slot value for a leaf whose page could not be fetched.
pub const NO_SLOT: u32 = u32::MAX;

/// One cache slot per active leaf, in rank order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndirectionTable {
  pub slots: Vec<u32>,
  /// Tree generation the table was built for.
  pub generation: u64,
  /// Entries set to [`NO_SLOT`].
  pub missing: usize,
  /// Ranks whose page was fetched into its slot by this build.
  pub fetched: Vec<usize>,
}

impl IndirectionTable {
  #[inline]
  pub fn len(&self) -> usize {
    self.slots.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  /// Slot of the leaf at `rank`, `None` past the end or for a missing page.
  #[inline]
  pub fn slot(&self, rank: usize) -> Option<u32> {
    self.slots.get(rank).copied().filter(|slot| *slot != NO_SLOT)
  }

  /// True if every leaf has a resident page.
  #[inline]
  pub fn is_complete(&self) -> bool {
    self.missing == 0
  }
}

/// Look up every active leaf, in rank order, and record its slot. The
/// cache's eviction log afterwards holds this build's evictions only.
///
/// Refuses (without touching the cache) when there are more leaves than
/// slots: the table could not be resident all at once. A failed fetch only
/// affects its own entry, which becomes [`NO_SLOT`].
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "cache::build_indirection"))]
pub fn build_indirection<S: PageSource>(
  cache: &mut PageCache<S>,
  leaves: &[LebNode],
  generation: u64,
) -> Result<IndirectionTable, CacheError> {
  if leaves.len() > cache.capacity() {
    return Err(CacheError::CapacityExceeded {
      required: leaves.len(),
      capacity: cache.capacity(),
    });
  }

  cache.begin_batch();
  let mut table = IndirectionTable {
    slots: Vec::with_capacity(leaves.len()),
    generation,
    missing: 0,
    fetched: Vec::new(),
  };
  for (rank, leaf) in leaves.iter().enumerate() {
    match cache.lookup(leaf.id) {
      Ok(lookup) => {
        if !lookup.is_hit() {
          table.fetched.push(rank);
        }
        table.slots.push(lookup.slot);
      }
      Err(err) => {
        tracing::warn!(node = leaf.id, error = %err, "page fetch failed");
        table.slots.push(NO_SLOT);
        table.missing += 1;
      }
    }
  }
  Ok(table)
}
