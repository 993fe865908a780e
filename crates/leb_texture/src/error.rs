//! Error types for the tree, page store, cache, streaming ring, and update
//! pipeline.
//!
//! Programming errors (ranks out of range, malformed node ids) are asserts
//! and never show up here.

use std::io;

use crate::config::ConfigError;
use crate::page::PixelFormatTag;

/// Invalid tree construction parameters.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
  #[error("invalid depth range {min_depth}..={max_depth} (supported max depth is {limit})")]
  InvalidDepth {
    min_depth: u32,
    max_depth: u32,
    limit: u32,
  },

  #[error("square domains need a minimum depth of at least 1")]
  SquareRootLeaf,
}

/// Page store failures: configuration, validation, and I/O.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("bad magic {found:?}, not a page file")]
  BadMagic { found: [u8; 8] },

  #[error("file truncated: expected at least {expected} bytes, found {actual}")]
  Truncated { expected: u64, actual: u64 },

  #[error("unsupported tree depth {0} (must be in 1..28)")]
  UnsupportedDepth(i64),

  #[error("page resolution 2^{page} must be below texture resolution 2^{texture}")]
  InvalidResolution { texture: u8, page: u8 },

  #[error("layer resolution 2^{0} is above the supported 2^15")]
  LayerTooLarge(u8),

  #[error("depth {depth} with {bytes_per_page}-byte pages exceeds the largest page file")]
  FileTooLarge { depth: u32, bytes_per_page: u64 },

  #[error("a page needs at least one layer")]
  NoLayers,

  #[error("{0} layers requested, at most 8 are supported")]
  TooManyLayers(usize),

  #[error("unknown pixel format tag {0}")]
  InvalidFormat(PixelFormatTag),

  #[error("page {id} out of range (page count {page_count})")]
  PageOutOfRange { id: u64, page_count: u64 },

  #[error("page buffer holds {actual} bytes, a page is {expected}")]
  BufferSize { expected: usize, actual: usize },
}

/// Page cache failures.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  #[error("cache capacity must be at least one page")]
  ZeroCapacity,

  #[error("{required} active pages exceed the cache capacity of {capacity}")]
  CapacityExceeded { required: usize, capacity: usize },

  #[error("failed to fetch page {id}: {source}")]
  Fetch {
    id: u64,
    #[source]
    source: StoreError,
  },
}

/// Streaming ring failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RingError {
  #[error("write of {len} bytes exceeds the ring capacity of {capacity}")]
  TooLarge { len: usize, capacity: usize },

  #[error("ring region still in flight until fence {fence} retires")]
  Busy { fence: u64 },
}

/// Update pipeline failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
  #[error("decision domain dropped ticket {0} before completing it")]
  DomainLost(u64),
}

/// Errors surfaced by the virtual texture session object.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
  #[error(transparent)]
  Tree(#[from] TreeError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("tree depth {tree} exceeds the page file depth {file}")]
  DepthMismatch { tree: u32, file: u32 },

  #[error("page source serves {source_bytes}-byte pages, the layers describe {config_bytes}")]
  PageSizeMismatch {
    source_bytes: usize,
    config_bytes: u64,
  },

  #[error("page file layers do not match the configured layers")]
  LayerMismatch,
}
