//! Page residency: LRU index, page cache, and the indirection table.

pub mod indirection;
pub mod lru;
pub mod page_cache;

pub use indirection::{build_indirection, IndirectionTable, NO_SLOT};
pub use lru::{Insertion, IterMru, LruIndex};
pub use page_cache::{CacheStats, Lookup, LookupOutcome, PageCache};
