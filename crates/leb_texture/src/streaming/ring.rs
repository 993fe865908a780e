//! Upload ring for page bytes on their way into cache slots.
//!
//! Writes go to a monotonically advancing offset. A write that does not fit
//! in the rest of the buffer starts over at offset 0 ("orphaning" the tail).
//! Every write carries a fence; its region stays in flight until the
//! consumer retires that fence. A write that would land on an in-flight
//! region fails with [`RingError::Busy`] instead of overwriting bytes a
//! consumer may still be reading.
//!
//! ```text
//! capacity 8, writes a(3) b(3) c(3):
//!   [a a a b b b . .]   head 6
//!   c does not fit the tail -> wrap to 0, but a is in flight -> Busy
//!   retire(a) -> [c c c b b b . .]   head 3, wraps 1
//! ```

use std::collections::VecDeque;

use crate::error::RingError;

/// Bytes of one write, valid until its fence retires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingRegion {
  pub offset: usize,
  pub len: usize,
  pub fence: u64,
}

impl RingRegion {
  #[inline]
  fn end(&self) -> usize {
    self.offset + self.len
  }

  #[inline]
  fn overlaps(&self, offset: usize, len: usize) -> bool {
    len > 0 && self.len > 0 && offset < self.end() && self.offset < offset + len
  }
}

/// Fixed-size byte ring with fence-tracked regions.
#[derive(Debug)]
pub struct StreamingRing {
  buffer: Vec<u8>,
  head: usize,
  /// Unretired regions in write order.
  in_flight: VecDeque<RingRegion>,
  wraps: u64,
}

impl StreamingRing {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: vec![0; capacity],
      head: 0,
      in_flight: VecDeque::new(),
      wraps: 0,
    }
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.buffer.len()
  }

  /// Offset of the next write (before any wrap).
  #[inline]
  pub fn head(&self) -> usize {
    self.head
  }

  /// Number of unretired regions.
  #[inline]
  pub fn in_flight(&self) -> usize {
    self.in_flight.len()
  }

  pub fn in_flight_bytes(&self) -> usize {
    self.in_flight.iter().map(|r| r.len).sum()
  }

  /// Times the write offset wrapped to zero.
  #[inline]
  pub fn wrap_count(&self) -> u64 {
    self.wraps
  }

  /// Copy `bytes` into the ring under `fence`.
  pub fn write(&mut self, bytes: &[u8], fence: u64) -> Result<RingRegion, RingError> {
    let len = bytes.len();
    if len > self.capacity() {
      return Err(RingError::TooLarge {
        len,
        capacity: self.capacity(),
      });
    }

    let wraps = self.head + len > self.capacity();
    let offset = if wraps { 0 } else { self.head };
    if let Some(busy) = self.in_flight.iter().find(|r| r.overlaps(offset, len)) {
      return Err(RingError::Busy { fence: busy.fence });
    }

    self.buffer[offset..offset + len].copy_from_slice(bytes);
    if wraps {
      self.wraps += 1;
      tracing::trace!(wraps = self.wraps, "streaming ring wrapped");
    }
    self.head = offset + len;

    let region = RingRegion { offset, len, fence };
    if len > 0 {
      self.in_flight.push_back(region);
    }
    Ok(region)
  }

  /// Mark every region with a fence `<= fence` as consumed. Returns the
  /// number of regions released.
  pub fn retire(&mut self, fence: u64) -> usize {
    let before = self.in_flight.len();
    self.in_flight.retain(|r| r.fence > fence);
    before - self.in_flight.len()
  }

  /// Bytes of a region returned by [`StreamingRing::write`].
  pub fn region(&self, region: &RingRegion) -> &[u8] {
    &self.buffer[region.offset..region.end()]
  }
}

#[cfg(test)]
#[path = "ring_test.rs"]
mod ring_test;
