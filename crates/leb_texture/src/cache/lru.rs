//! Exact LRU index over a fixed pool of slots.
//!
//! Slots live in an arena; the recency list is threaded through the arena
//! by slot index (`prev`/`next`, [`NIL`] terminated), and a hash map finds
//! the slot of a key. Every operation is O(1) and eviction always picks
//! the globally least-recently-used key.
//!
//! ```text
//! head (MRU) -> [slot 3] <-> [slot 0] <-> [slot 5] <- tail (LRU)
//! map: { key_a: 3, key_b: 0, key_c: 5 }
//! ```

use std::collections::HashMap;
use std::hash::Hash;

/// End of the recency list.
const NIL: u32 = u32::MAX;

#[derive(Clone, Debug)]
struct Entry<K> {
  key: Option<K>,
  prev: u32,
  next: u32,
}

/// Result of [`LruIndex::insert`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insertion<K> {
  /// Slot now holding the key.
  pub slot: u32,
  /// Key whose slot was reused, if the index was full.
  pub evicted: Option<K>,
}

/// Key -> slot map with exact least-recently-used eviction.
#[derive(Clone, Debug)]
pub struct LruIndex<K> {
  entries: Vec<Entry<K>>,
  map: HashMap<K, u32>,
  /// Slots released by `remove`, reused before fresh ones.
  free: Vec<u32>,
  head: u32,
  tail: u32,
  capacity: usize,
}

impl<K: Clone + Eq + Hash> LruIndex<K> {
  /// Index over `capacity` slots (`0..capacity`).
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "LRU capacity must be at least 1");
    assert!(capacity < NIL as usize, "LRU capacity {capacity} too large");
    Self {
      entries: Vec::with_capacity(capacity),
      map: HashMap::with_capacity(capacity),
      free: Vec::new(),
      head: NIL,
      tail: NIL,
      capacity,
    }
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.map.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  #[inline]
  pub fn is_full(&self) -> bool {
    self.map.len() == self.capacity
  }

  #[inline]
  pub fn contains(&self, key: &K) -> bool {
    self.map.contains_key(key)
  }

  /// Slot of `key` without touching the recency order.
  #[inline]
  pub fn peek(&self, key: &K) -> Option<u32> {
    self.map.get(key).copied()
  }

  /// Slot of `key`, promoting it to most recently used.
  pub fn get(&mut self, key: &K) -> Option<u32> {
    let slot = *self.map.get(key)?;
    self.promote(slot);
    Some(slot)
  }

  /// Insert `key` as most recently used.
  ///
  /// Takes a released slot, then a fresh one while below capacity, and
  /// only then re-keys the least-recently-used slot. Inserting a present
  /// key just promotes it.
  pub fn insert(&mut self, key: K) -> Insertion<K> {
    if let Some(slot) = self.get(&key) {
      return Insertion {
        slot,
        evicted: None,
      };
    }

    let (slot, evicted) = if let Some(slot) = self.free.pop() {
      (slot, None)
    } else if self.entries.len() < self.capacity {
      self.entries.push(Entry {
        key: None,
        prev: NIL,
        next: NIL,
      });
      ((self.entries.len() - 1) as u32, None)
    } else {
      let slot = self.tail;
      self.unlink(slot);
      let old = self.entries[slot as usize].key.take();
      if let Some(old) = &old {
        self.map.remove(old);
      }
      (slot, old)
    };

    self.entries[slot as usize].key = Some(key.clone());
    self.push_front(slot);
    self.map.insert(key, slot);
    Insertion { slot, evicted }
  }

  /// Remove `key`, releasing its slot.
  pub fn remove(&mut self, key: &K) -> Option<u32> {
    let slot = self.map.remove(key)?;
    self.unlink(slot);
    self.entries[slot as usize].key = None;
    self.free.push(slot);
    Some(slot)
  }

  /// Least recently used key and its slot (the next eviction when full).
  pub fn lru(&self) -> Option<(&K, u32)> {
    self.entry_at(self.tail)
  }

  /// Most recently used key and its slot.
  pub fn mru(&self) -> Option<(&K, u32)> {
    self.entry_at(self.head)
  }

  /// Keys and slots from most to least recently used.
  pub fn iter_mru(&self) -> IterMru<'_, K> {
    IterMru {
      entries: &self.entries,
      cursor: self.head,
    }
  }

  /// Drop every key; slots are handed out from 0 again.
  pub fn clear(&mut self) {
    self.entries.clear();
    self.map.clear();
    self.free.clear();
    self.head = NIL;
    self.tail = NIL;
  }

  fn entry_at(&self, slot: u32) -> Option<(&K, u32)> {
    if slot == NIL {
      return None;
    }
    self.entries[slot as usize].key.as_ref().map(|key| (key, slot))
  }

  fn promote(&mut self, slot: u32) {
    if self.head != slot {
      self.unlink(slot);
      self.push_front(slot);
    }
  }

  fn unlink(&mut self, slot: u32) {
    let Entry { prev, next, .. } = self.entries[slot as usize];
    if prev == NIL {
      self.head = next;
    } else {
      self.entries[prev as usize].next = next;
    }
    if next == NIL {
      self.tail = prev;
    } else {
      self.entries[next as usize].prev = prev;
    }
    let entry = &mut self.entries[slot as usize];
    entry.prev = NIL;
    entry.next = NIL;
  }

  fn push_front(&mut self, slot: u32) {
    let old_head = self.head;
    {
      let entry = &mut self.entries[slot as usize];
      entry.prev = NIL;
      entry.next = old_head;
    }
    if old_head == NIL {
      self.tail = slot;
    } else {
      self.entries[old_head as usize].prev = slot;
    }
    self.head = slot;
  }
}

/// Iterator from most to least recently used.
pub struct IterMru<'a, K> {
  entries: &'a [Entry<K>],
  cursor: u32,
}

impl<'a, K> Iterator for IterMru<'a, K> {
  type Item = (&'a K, u32);

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor == NIL {
      return None;
    }
    let slot = self.cursor;
    let entry = &self.entries[slot as usize];
    self.cursor = entry.next;
    entry.key.as_ref().map(|key| (key, slot))
  }
}

#[cfg(test)]
#[path = "lru_test.rs"]
mod lru_test;
