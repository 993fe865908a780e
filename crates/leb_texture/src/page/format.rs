//! Pixel formats and page sizing.
//!
//! Page size is a pure function of the layer list: no content, no
//! alignment padding. Block-compressed layers are sized in 4x4 blocks.

use std::fmt;
use std::str::FromStr;

/// On-disk pixel format tag.
pub type PixelFormatTag = u8;

/// Pixel format of one page layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelFormat {
  R8 = 0,
  Rg8 = 1,
  Rgba8 = 2,
  R16 = 3,
  Rg16 = 4,
  Rgba16 = 5,
  R16F = 6,
  Rg16F = 7,
  Rgba16F = 8,
  R32F = 9,
  Rg32F = 10,
  Rgba32F = 11,
  /// 4 bits per texel, RGB + 1-bit alpha.
  Bc1 = 12,
  /// 4 bits per texel, single channel.
  Bc4 = 13,
  /// 8 bits per texel, two channels.
  Bc5 = 14,
  /// 8 bits per texel, RGBA.
  Bc7 = 15,
}

impl PixelFormat {
  /// Every format, in tag order.
  pub const ALL: [PixelFormat; 16] = [
    PixelFormat::R8,
    PixelFormat::Rg8,
    PixelFormat::Rgba8,
    PixelFormat::R16,
    PixelFormat::Rg16,
    PixelFormat::Rgba16,
    PixelFormat::R16F,
    PixelFormat::Rg16F,
    PixelFormat::Rgba16F,
    PixelFormat::R32F,
    PixelFormat::Rg32F,
    PixelFormat::Rgba32F,
    PixelFormat::Bc1,
    PixelFormat::Bc4,
    PixelFormat::Bc5,
    PixelFormat::Bc7,
  ];

  /// Storage bits per texel.
  pub const fn bits_per_texel(self) -> u32 {
    use PixelFormat::*;
    match self {
      Bc1 | Bc4 => 4,
      R8 | Bc5 | Bc7 => 8,
      Rg8 | R16 | R16F => 16,
      Rgba8 | Rg16 | Rg16F | R32F => 32,
      Rgba16 | Rgba16F | Rg32F => 64,
      Rgba32F => 128,
    }
  }

  pub const fn channel_count(self) -> u32 {
    use PixelFormat::*;
    match self {
      R8 | R16 | R16F | R32F | Bc4 => 1,
      Rg8 | Rg16 | Rg16F | Rg32F | Bc5 => 2,
      Rgba8 | Rgba16 | Rgba16F | Rgba32F | Bc1 | Bc7 => 4,
    }
  }

  pub const fn is_compressed(self) -> bool {
    matches!(
      self,
      PixelFormat::Bc1 | PixelFormat::Bc4 | PixelFormat::Bc5 | PixelFormat::Bc7
    )
  }

  /// Edge length of a storage block in texels (4 for block codecs).
  pub const fn block_size(self) -> u32 {
    if self.is_compressed() {
      4
    } else {
      1
    }
  }

  /// Bytes per storage block.
  pub const fn bytes_per_block(self) -> u64 {
    let texels = (self.block_size() * self.block_size()) as u64;
    texels * self.bits_per_texel() as u64 / 8
  }

  #[inline]
  pub const fn as_tag(self) -> PixelFormatTag {
    self as PixelFormatTag
  }

  /// Lowercase name, as used in configuration files.
  pub const fn name(self) -> &'static str {
    use PixelFormat::*;
    match self {
      R8 => "r8",
      Rg8 => "rg8",
      Rgba8 => "rgba8",
      R16 => "r16",
      Rg16 => "rg16",
      Rgba16 => "rgba16",
      R16F => "r16f",
      Rg16F => "rg16f",
      Rgba16F => "rgba16f",
      R32F => "r32f",
      Rg32F => "rg32f",
      Rgba32F => "rgba32f",
      Bc1 => "bc1",
      Bc4 => "bc4",
      Bc5 => "bc5",
      Bc7 => "bc7",
    }
  }
}

impl TryFrom<PixelFormatTag> for PixelFormat {
  type Error = PixelFormatTag;

  fn try_from(tag: PixelFormatTag) -> Result<Self, Self::Error> {
    PixelFormat::ALL.get(tag as usize).copied().ok_or(tag)
  }
}

impl fmt::Display for PixelFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Unknown pixel format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pixel format {0:?}")]
pub struct ParseFormatError(pub String);

impl FromStr for PixelFormat {
  type Err = ParseFormatError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lower = s.trim().to_ascii_lowercase();
    PixelFormat::ALL
      .iter()
      .copied()
      .find(|format| format.name() == lower)
      .ok_or_else(|| ParseFormatError(s.to_string()))
  }
}

/// One sub-texture of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerDesc {
  /// Layer resolution is `2^size_log2` texels per side.
  pub size_log2: u8,
  pub format: PixelFormat,
}

impl LayerDesc {
  pub const fn new(size_log2: u8, format: PixelFormat) -> Self {
    Self { size_log2, format }
  }

  /// Texels per side.
  #[inline]
  pub const fn resolution(&self) -> u64 {
    1u64 << self.size_log2
  }

  /// Bytes of one layer. A compressed layer smaller than a block still
  /// occupies one block.
  pub const fn bytes_per_layer(&self) -> u64 {
    let block = self.format.block_size() as u64;
    let side = self.resolution();
    let blocks = if side > block { side / block } else { 1 };
    blocks * blocks * self.format.bytes_per_block()
  }
}

/// Bytes of one page: the layers stored back to back.
pub fn bytes_per_page(layers: &[LayerDesc]) -> u64 {
  layers.iter().map(LayerDesc::bytes_per_layer).sum()
}

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;
