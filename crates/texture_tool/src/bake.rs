//! Fill a page file from a source image.
//!
//! Every node id gets a page covering the bounding box of its triangle in
//! the normalized domain, point-sampled from the image. Only 8-bit
//! uncompressed layers can be baked; the image's channels are truncated
//! to the layer's channel count.

use anyhow::{Context, Result};
use glam::DVec2;
use image::RgbaImage;

use leb_texture::leb::decode_node_attributes;
use leb_texture::{Domain, LayerDesc, LebNode, PageStore, PixelFormat};

/// Bounding box of a node's region in the normalized domain.
pub fn node_bounds(domain: Domain, node: LebNode) -> (DVec2, DVec2) {
  if domain == Domain::Square && node.is_root() {
    return (DVec2::ZERO, DVec2::ONE);
  }
  let corners = decode_node_attributes(domain, node);
  let min = corners[0].min(corners[1]).min(corners[2]);
  let max = corners[0].max(corners[1]).max(corners[2]);
  (min, max)
}

/// Sample one layer of a node's page into `out`.
fn bake_layer(image: &RgbaImage, layer: LayerDesc, (min, max): (DVec2, DVec2), out: &mut [u8]) {
  let resolution = layer.resolution() as usize;
  let channels = layer.format.channel_count() as usize;
  let (width, height) = image.dimensions();
  let extent = max - min;

  for y in 0..resolution {
    for x in 0..resolution {
      let u = (x as f64 + 0.5) / resolution as f64;
      let v = (y as f64 + 0.5) / resolution as f64;
      let uv = min + extent * DVec2::new(u, v);
      let px = ((uv.x * width as f64) as u32).min(width - 1);
      let py = ((uv.y * height as f64) as u32).min(height - 1);
      let pixel = image.get_pixel(px, py);
      let texel = (y * resolution + x) * channels;
      out[texel..texel + channels].copy_from_slice(&pixel.0[..channels]);
    }
  }
}

/// Bake every page of `store` from `image`. Returns the number of pages
/// written.
pub fn bake_image(store: &mut PageStore, image: &RgbaImage, domain: Domain) -> Result<u64> {
  if image.width() == 0 || image.height() == 0 {
    anyhow::bail!("Source image is empty");
  }
  let layers = store.layers().to_vec();
  for layer in &layers {
    if !matches!(layer.format, PixelFormat::R8 | PixelFormat::Rg8 | PixelFormat::Rgba8) {
      anyhow::bail!(
        "Cannot bake layer format {}, only r8, rg8 and rgba8 are supported",
        layer.format
      );
    }
  }

  let mut page = vec![0u8; store.bytes_per_page() as usize];
  let mut written = 0;
  for id in 1..store.page_count() {
    let node = LebNode::from_id(id);
    let bounds = node_bounds(domain, node);
    let mut offset = 0;
    for layer in &layers {
      let len = layer.bytes_per_layer() as usize;
      bake_layer(image, *layer, bounds, &mut page[offset..offset + len]);
      offset += len;
    }
    store
      .write_page(id, &page)
      .with_context(|| format!("Failed to write page {id}"))?;
    written += 1;
    if id.is_power_of_two() {
      log::debug!("baking depth {}", node.depth);
    }
  }
  store.sync().context("Failed to sync page file")?;
  Ok(written)
}

/// Bake a freshly created page file. On failure the file is removed so no
/// half-baked file is left behind.
pub fn bake_new_file(mut store: PageStore, image: &RgbaImage, domain: Domain) -> Result<u64> {
  match bake_image(&mut store, image, domain) {
    Ok(written) => Ok(written),
    Err(err) => {
      let path = store.path().to_path_buf();
      drop(store);
      if let Err(remove_err) = std::fs::remove_file(&path) {
        log::warn!(
          "Failed to remove partial page file {}: {remove_err}",
          path.display()
        );
      }
      Err(err)
    }
  }
}

#[cfg(test)]
#[path = "bake_test.rs"]
mod bake_test;
