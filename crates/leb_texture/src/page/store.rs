//! Flat page file: a fixed 32-byte header followed by every page, stored
//! back to back in node-id order.
//!
//! ```text
//! offset  size  field
//!      0     8  magic "LEBVTEX1"
//!      8     4  depth        (i32, little endian)
//!     12     4  layer_count  (i32, little endian)
//!     16    16  8 x { size_log2: i8, format: i8 }  (unused records zero)
//!     32     .  page[0 .. 2 << depth], bytes_per_page each
//! ```
//!
//! Page `id` lives at `HEADER_SIZE + id * bytes_per_page`, so a node's page
//! is one seek and one read away, and nothing else is ever read with it.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};

use super::format::{bytes_per_page, LayerDesc, PixelFormat};
use crate::error::StoreError;
use crate::leb::HEAP_MAX_DEPTH;

/// File signature.
pub const MAGIC: [u8; 8] = *b"LEBVTEX1";
/// Encoded header size in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<RawHeader>();
/// Layer records in the header.
pub const MAX_LAYERS: usize = 8;
/// Largest layer resolution (`2^15` texels per side).
pub const MAX_LAYER_SIZE_LOG2: u8 = 15;
/// Largest page file; offsets must fit a signed 64-bit seek.
pub const MAX_FILE_LEN: u64 = i64::MAX as u64;

/// Header as laid out on disk.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct RawHeader {
  magic: [u8; 8],
  depth: [u8; 4],
  layer_count: [u8; 4],
  layers: [[i8; 2]; MAX_LAYERS],
}

/// Decoded page file header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageHeader {
  /// Tree depth the file was built for.
  pub depth: u32,
  /// Layers of every page; `layers[0]` sets the page resolution.
  pub layers: Vec<LayerDesc>,
}

impl PageHeader {
  /// Header for a texture of `2^texture_size_log2` texels per side.
  ///
  /// The depth is `2 * (texture_size_log2 - page_size_log2) + 1`: halving
  /// the page resolution against the texture quadruples the page count,
  /// which takes two bisections.
  pub fn for_texture(texture_size_log2: u8, layers: &[LayerDesc]) -> Result<Self, StoreError> {
    validate_layers(layers)?;
    let page = layers[0].size_log2;
    if page >= texture_size_log2 {
      return Err(StoreError::InvalidResolution {
        texture: texture_size_log2,
        page,
      });
    }
    let depth = 2 * (texture_size_log2 as i64 - page as i64) + 1;
    if depth >= HEAP_MAX_DEPTH as i64 {
      return Err(StoreError::UnsupportedDepth(depth));
    }
    let header = Self {
      depth: depth as u32,
      layers: layers.to_vec(),
    };
    header.checked_file_len()?;
    Ok(header)
  }

  /// Number of page records: every node id of depth `<= depth`, plus the
  /// unused id 0.
  #[inline]
  pub fn page_count(&self) -> u64 {
    2u64 << self.depth
  }

  #[inline]
  pub fn bytes_per_page(&self) -> u64 {
    bytes_per_page(&self.layers)
  }

  /// Resolution of the whole texture at the deepest level.
  pub fn texture_size_log2(&self) -> u8 {
    self.layers[0].size_log2 + ((self.depth - 1) / 2) as u8
  }

  /// Total file size in bytes. Saturates for headers that were not built
  /// through [`PageHeader::for_texture`] or [`PageHeader::decode`].
  pub fn file_len(&self) -> u64 {
    self
      .page_count()
      .saturating_mul(self.bytes_per_page())
      .saturating_add(HEADER_SIZE as u64)
  }

  /// File size, or `FileTooLarge` when it exceeds the largest file offset.
  fn checked_file_len(&self) -> Result<u64, StoreError> {
    self
      .page_count()
      .checked_mul(self.bytes_per_page())
      .and_then(|pages| pages.checked_add(HEADER_SIZE as u64))
      .filter(|&len| len <= MAX_FILE_LEN)
      .ok_or(StoreError::FileTooLarge {
        depth: self.depth,
        bytes_per_page: self.bytes_per_page(),
      })
  }

  pub fn encode(&self) -> [u8; HEADER_SIZE] {
    let mut raw = RawHeader::zeroed();
    raw.magic = MAGIC;
    raw.depth = (self.depth as i32).to_le_bytes();
    raw.layer_count = (self.layers.len() as i32).to_le_bytes();
    for (record, layer) in raw.layers.iter_mut().zip(&self.layers) {
      *record = [layer.size_log2 as i8, layer.format.as_tag() as i8];
    }
    let mut bytes = [0u8; HEADER_SIZE];
    bytes.copy_from_slice(bytemuck::bytes_of(&raw));
    bytes
  }

  pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, StoreError> {
    let raw: RawHeader = bytemuck::pod_read_unaligned(bytes);
    if raw.magic != MAGIC {
      return Err(StoreError::BadMagic { found: raw.magic });
    }

    let depth = i32::from_le_bytes(raw.depth);
    if depth < 1 || depth >= HEAP_MAX_DEPTH as i32 {
      return Err(StoreError::UnsupportedDepth(depth as i64));
    }
    let layer_count = i32::from_le_bytes(raw.layer_count);
    if layer_count < 1 {
      return Err(StoreError::NoLayers);
    }
    if layer_count as usize > MAX_LAYERS {
      return Err(StoreError::TooManyLayers(layer_count as usize));
    }

    let layers = raw.layers[..layer_count as usize]
      .iter()
      .map(|&[size_log2, tag]| {
        let format = PixelFormat::try_from(tag as u8).map_err(StoreError::InvalidFormat)?;
        Ok(LayerDesc::new(size_log2 as u8, format))
      })
      .collect::<Result<Vec<_>, StoreError>>()?;
    validate_layers(&layers)?;

    let header = Self {
      depth: depth as u32,
      layers,
    };
    header.checked_file_len()?;
    Ok(header)
  }
}

fn validate_layers(layers: &[LayerDesc]) -> Result<(), StoreError> {
  if layers.is_empty() {
    return Err(StoreError::NoLayers);
  }
  if layers.len() > MAX_LAYERS {
    return Err(StoreError::TooManyLayers(layers.len()));
  }
  if let Some(layer) = layers.iter().find(|l| l.size_log2 > MAX_LAYER_SIZE_LOG2) {
    return Err(StoreError::LayerTooLarge(layer.size_log2));
  }
  Ok(())
}

/// Anything that can fill a page buffer for a node id.
pub trait PageSource {
  /// Size of one page in bytes.
  fn bytes_per_page(&self) -> usize;

  /// Fill `out` (exactly one page) with the page of node `id`.
  fn fetch_page(&mut self, id: u64, out: &mut [u8]) -> Result<(), StoreError>;
}

/// Open page file.
#[derive(Debug)]
pub struct PageStore {
  file: File,
  path: PathBuf,
  header: PageHeader,
  bytes_per_page: u64,
}

impl PageStore {
  /// Create a page file with zeroed pages.
  ///
  /// All-or-nothing: on any failure after the file was opened it is
  /// removed again.
  pub fn create(
    path: impl AsRef<Path>,
    texture_size_log2: u8,
    layers: &[LayerDesc],
  ) -> Result<Self, StoreError> {
    let path = path.as_ref();
    let header = PageHeader::for_texture(texture_size_log2, layers)?;

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(true)
      .open(path)?;

    match Self::write_new(file, path, header) {
      Ok(store) => {
        tracing::debug!(
          path = %path.display(),
          depth = store.depth(),
          pages = store.page_count(),
          bytes_per_page = store.bytes_per_page,
          "created page file"
        );
        Ok(store)
      }
      Err(err) => {
        if let Err(remove_err) = fs::remove_file(path) {
          tracing::warn!(path = %path.display(), %remove_err, "failed to remove partial page file");
        }
        Err(err)
      }
    }
  }

  fn write_new(mut file: File, path: &Path, header: PageHeader) -> Result<Self, StoreError> {
    file.write_all(&header.encode())?;
    // Extending the file zero-fills every page.
    file.set_len(header.checked_file_len()?)?;
    file.sync_all()?;
    Ok(Self {
      file,
      path: path.to_path_buf(),
      bytes_per_page: header.bytes_per_page(),
      header,
    })
  }

  /// Open an existing page file for reading.
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref();
    Self::load(File::open(path)?, path)
  }

  /// Open an existing page file for reading and writing.
  pub fn open_mut(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref();
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    Self::load(file, path)
  }

  fn load(mut file: File, path: &Path) -> Result<Self, StoreError> {
    let actual = file.metadata()?.len();
    if actual < HEADER_SIZE as u64 {
      return Err(StoreError::Truncated {
        expected: HEADER_SIZE as u64,
        actual,
      });
    }

    let mut bytes = [0u8; HEADER_SIZE];
    file.read_exact(&mut bytes)?;
    let header = PageHeader::decode(&bytes)?;

    let expected = header.checked_file_len()?;
    if actual < expected {
      return Err(StoreError::Truncated { expected, actual });
    }

    Ok(Self {
      file,
      path: path.to_path_buf(),
      bytes_per_page: header.bytes_per_page(),
      header,
    })
  }

  #[inline]
  pub fn header(&self) -> &PageHeader {
    &self.header
  }

  #[inline]
  pub fn path(&self) -> &Path {
    &self.path
  }

  #[inline]
  pub fn depth(&self) -> u32 {
    self.header.depth
  }

  #[inline]
  pub fn layers(&self) -> &[LayerDesc] {
    &self.header.layers
  }

  #[inline]
  pub fn page_count(&self) -> u64 {
    self.header.page_count()
  }

  #[inline]
  pub fn bytes_per_page(&self) -> u64 {
    self.bytes_per_page
  }

  /// Byte offset of page `id`.
  #[inline]
  pub fn page_offset(&self, id: u64) -> u64 {
    id.saturating_mul(self.bytes_per_page)
      .saturating_add(HEADER_SIZE as u64)
  }

  fn check_page(&self, id: u64, len: usize) -> Result<(), StoreError> {
    if id >= self.page_count() {
      return Err(StoreError::PageOutOfRange {
        id,
        page_count: self.page_count(),
      });
    }
    if len as u64 != self.bytes_per_page {
      return Err(StoreError::BufferSize {
        expected: self.bytes_per_page as usize,
        actual: len,
      });
    }
    Ok(())
  }

  /// Read page `id` into `out`, which must be exactly one page long.
  pub fn read_page(&mut self, id: u64, out: &mut [u8]) -> Result<(), StoreError> {
    self.check_page(id, out.len())?;
    self.file.seek(SeekFrom::Start(self.page_offset(id)))?;
    self.file.read_exact(out)?;
    Ok(())
  }

  /// Read page `id` into a new buffer.
  pub fn read_page_vec(&mut self, id: u64) -> Result<Vec<u8>, StoreError> {
    let mut page = vec![0u8; self.bytes_per_page as usize];
    self.read_page(id, &mut page)?;
    Ok(page)
  }

  /// Overwrite page `id`. Needs a store from [`PageStore::create`] or
  /// [`PageStore::open_mut`].
  pub fn write_page(&mut self, id: u64, data: &[u8]) -> Result<(), StoreError> {
    self.check_page(id, data.len())?;
    self.file.seek(SeekFrom::Start(self.page_offset(id)))?;
    self.file.write_all(data)?;
    Ok(())
  }

  /// Flush written pages to disk.
  pub fn sync(&mut self) -> Result<(), StoreError> {
    self.file.sync_data()?;
    Ok(())
  }
}

impl PageSource for PageStore {
  #[inline]
  fn bytes_per_page(&self) -> usize {
    self.bytes_per_page as usize
  }

  fn fetch_page(&mut self, id: u64, out: &mut [u8]) -> Result<(), StoreError> {
    self.read_page(id, out)
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
