//! Headless streaming simulation: fly a camera over the texture plane and
//! drive a virtual texture once per simulated frame, consuming every upload
//! the way a renderer would.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{DMat4, DVec3};

use leb_texture::cache::CacheStats;
use leb_texture::{
  DecisionDomain, ImmediateDecisionDomain, LodInputs, PageSource, PageStore, Projection,
  StoreError, ThreadedDecisionDomain, VirtualTexture,
};

use crate::config::{Config, SimulationConfig};

/// Pages filled with their node id, for runs without a page file.
pub struct SyntheticSource {
  bytes_per_page: usize,
}

impl SyntheticSource {
  pub fn new(bytes_per_page: usize) -> Self {
    Self { bytes_per_page }
  }
}

impl PageSource for SyntheticSource {
  fn bytes_per_page(&self) -> usize {
    self.bytes_per_page
  }

  fn fetch_page(&mut self, id: u64, out: &mut [u8]) -> Result<(), StoreError> {
    let bytes = id.to_le_bytes();
    for (i, byte) in out.iter_mut().enumerate() {
      *byte = bytes[i % bytes.len()];
    }
    Ok(())
  }
}

/// Totals of a simulation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationSummary {
  pub cycles: u32,
  /// Tree states adopted.
  pub adopted: u64,
  /// Tree states dropped for exceeding the cache.
  pub capacity_skips: u32,
  pub uploads: u64,
  pub upload_bytes: u64,
  pub final_leaves: u64,
  pub deepest_leaf: u32,
  pub cache: CacheStats,
}

/// Camera looking straight down at `t` in `[0, 1]` along the path.
pub fn camera_inputs(sim: &SimulationConfig, t: f64) -> LodInputs {
  let [x0, y0] = sim.path_start;
  let [x1, y1] = sim.path_end;
  let x = x0 + (x1 - x0) * t;
  let y = y0 + (y1 - y0) * t;
  let eye = DVec3::new(x, y, sim.altitude);
  let view = DMat4::look_at_rh(eye, DVec3::new(x, y, 0.0), DVec3::Y);

  let projection = match sim.orthographic_height {
    Some(height) => Projection::Orthographic { height },
    None => Projection::Perspective {
      fov_y: sim.fov_y_degrees.to_radians(),
    },
  };
  LodInputs {
    view,
    viewport_height: sim.viewport_height,
    pixels_per_texel: sim.pixels_per_texel,
    projection,
  }
}

/// Drive `texture` along the camera path for `sim.cycles` frames.
pub fn run<S: PageSource, D: DecisionDomain>(
  texture: &mut VirtualTexture<S, D>,
  sim: &SimulationConfig,
) -> Result<SimulationSummary> {
  let mut summary = SimulationSummary {
    cycles: sim.cycles,
    ..SimulationSummary::default()
  };

  for cycle in 0..sim.cycles {
    let t = if sim.cycles > 1 {
      cycle as f64 / (sim.cycles - 1) as f64
    } else {
      0.0
    };
    let report = texture
      .update(&camera_inputs(sim, t))
      .with_context(|| format!("Update cycle {cycle} failed"))?;

    if report.rebuilt {
      summary.adopted += 1;
      log::debug!(
        "cycle {cycle}: generation {} with {} leaves, {} pages fetched",
        report.generation,
        texture.indirection().len(),
        report.fetched
      );
    }
    if report.capacity_skipped {
      summary.capacity_skips += 1;
    }

    for upload in texture.take_uploads() {
      summary.uploads += 1;
      summary.upload_bytes += upload.region.len as u64;
    }
    texture.retire_uploads(report.generation);
  }

  let tree = texture.tree_state();
  summary.final_leaves = tree.node_count();
  summary.deepest_leaf = tree.leaves().map(|leaf| leaf.depth).max().unwrap_or(0);
  summary.cache = texture.cache().stats();
  Ok(summary)
}

/// Simulate over a page file, or over synthetic pages when `file` is None.
pub fn simulate(config: &Config, file: Option<&Path>) -> Result<SimulationSummary> {
  let texture_config = config.texture_config()?;
  let sim = &config.simulation;
  match file {
    Some(path) => {
      let store = PageStore::open(path)
        .with_context(|| format!("Failed to open page file: {}", path.display()))?;
      if sim.threaded {
        let mut texture =
          VirtualTexture::from_store(store, ThreadedDecisionDomain::new(), &texture_config)?;
        run(&mut texture, sim)
      } else {
        let mut texture =
          VirtualTexture::from_store(store, ImmediateDecisionDomain::new(), &texture_config)?;
        run(&mut texture, sim)
      }
    }
    None => {
      let source = SyntheticSource::new(texture_config.bytes_per_page() as usize);
      if sim.threaded {
        let mut texture =
          VirtualTexture::new(source, ThreadedDecisionDomain::new(), &texture_config)?;
        run(&mut texture, sim)
      } else {
        let mut texture =
          VirtualTexture::new(source, ImmediateDecisionDomain::new(), &texture_config)?;
        run(&mut texture, sim)
      }
    }
  }
}

#[cfg(test)]
#[path = "simulate_test.rs"]
mod simulate_test;
