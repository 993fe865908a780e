//! TextureConfig - session parameters for a virtual texture.

use crate::error::StoreError;
use crate::leb::{Domain, HEAP_MAX_DEPTH};
use crate::page::{LayerDesc, PageHeader, PixelFormat};

/// Invalid session configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("cache capacity must be at least one page")]
  ZeroCacheCapacity,

  #[error("the streaming ring must hold at least one page")]
  ZeroRingCapacity,

  #[error("min depth {min_depth} is above max depth {max_depth}")]
  MinDepthAboveMax { min_depth: u32, max_depth: u32 },

  #[error("max depth {max_depth} is above the page file depth {file_depth}")]
  MaxDepthAboveFile { max_depth: u32, file_depth: u32 },

  #[error("square domains need a minimum depth of at least 1")]
  SquareMinDepth,

  #[error(transparent)]
  Layout(#[from] StoreError),
}

/// Configuration of a virtual texture session.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureConfig {
  /// Full texture resolution is `2^texture_size_log2` texels per side.
  pub texture_size_log2: u8,

  /// Page layers; `layers[0]` sets the page resolution.
  pub layers: Vec<LayerDesc>,

  /// Pages resident at once.
  pub cache_capacity: usize,

  /// Coarsest level; merges stop here.
  pub min_depth: u32,

  /// Finest level. `None` uses the page file depth.
  pub max_depth: Option<u32>,

  pub domain: Domain,

  /// Streaming ring size, in pages.
  pub ring_capacity_pages: usize,
}

impl TextureConfig {
  /// Page file header implied by the resolutions.
  pub fn page_header(&self) -> Result<PageHeader, StoreError> {
    PageHeader::for_texture(self.texture_size_log2, &self.layers)
  }

  /// Depth of the page file, `2 * (texture - page) + 1`.
  pub fn file_depth(&self) -> Result<u32, StoreError> {
    Ok(self.page_header()?.depth)
  }

  /// Tree depth used by the session.
  pub fn tree_depth(&self) -> Result<u32, ConfigError> {
    let file_depth = self.file_depth()?;
    match self.max_depth {
      Some(max_depth) if max_depth > file_depth => Err(ConfigError::MaxDepthAboveFile {
        max_depth,
        file_depth,
      }),
      Some(max_depth) => Ok(max_depth.min(HEAP_MAX_DEPTH)),
      None => Ok(file_depth),
    }
  }

  /// Texels per page side.
  pub fn page_texels(&self) -> u64 {
    self.layers.first().map_or(1, LayerDesc::resolution)
  }

  pub fn bytes_per_page(&self) -> u64 {
    crate::page::bytes_per_page(&self.layers)
  }

  /// Check every field; returns the tree depth on success.
  pub fn validate(&self) -> Result<u32, ConfigError> {
    if self.cache_capacity == 0 {
      return Err(ConfigError::ZeroCacheCapacity);
    }
    if self.ring_capacity_pages == 0 {
      return Err(ConfigError::ZeroRingCapacity);
    }
    let max_depth = self.tree_depth()?;
    if self.min_depth > max_depth {
      return Err(ConfigError::MinDepthAboveMax {
        min_depth: self.min_depth,
        max_depth,
      });
    }
    if self.domain == Domain::Square && self.min_depth == 0 {
      return Err(ConfigError::SquareMinDepth);
    }
    Ok(max_depth)
  }
}

impl Default for TextureConfig {
  fn default() -> Self {
    Self {
      texture_size_log2: 12,
      layers: vec![LayerDesc::new(8, PixelFormat::Bc1)],
      cache_capacity: 256,
      min_depth: 1,
      max_depth: None,
      domain: Domain::Square,
      ring_capacity_pages: 64,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
