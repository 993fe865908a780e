//! TOML configuration for page file authoring and streaming simulation.
//!
//! ```toml
//! texture_size_log2 = 12
//!
//! [[layers]]
//! size_log2 = 8
//! format = "rgba8"
//!
//! [cache]
//! capacity = 256
//!
//! [tree]
//! min_depth = 1
//! domain = "square"
//!
//! [simulation]
//! cycles = 240
//! altitude = 0.05
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use leb_texture::{Domain, LayerDesc, PixelFormat, TextureConfig};

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
  /// Full texture resolution is `2^texture_size_log2` texels per side.
  pub texture_size_log2: u8,
  /// Page layers; the first one sets the page resolution.
  pub layers: Vec<LayerConfig>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub tree: TreeConfig,
  #[serde(default)]
  pub simulation: SimulationConfig,
}

/// One page layer.
#[derive(Debug, Deserialize)]
pub struct LayerConfig {
  pub size_log2: u8,
  /// Pixel format name, e.g. `"rgba8"` or `"bc1"`.
  pub format: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Pages resident at once.
  pub capacity: usize,
  /// Streaming ring size in pages.
  pub ring_pages: usize,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      capacity: 256,
      ring_pages: 64,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainName {
  Triangle,
  #[default]
  Square,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
  pub min_depth: u32,
  /// Defaults to the page file depth.
  pub max_depth: Option<u32>,
  pub domain: DomainName,
}

impl Default for TreeConfig {
  fn default() -> Self {
    Self {
      min_depth: 1,
      max_depth: None,
      domain: DomainName::Square,
    }
  }
}

/// Headless camera flight over the texture plane.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
  pub cycles: u32,
  pub viewport_height: f64,
  pub pixels_per_texel: f64,
  /// Vertical field of view of the perspective camera.
  pub fov_y_degrees: f64,
  /// Use an orthographic camera with this view height instead.
  pub orthographic_height: Option<f64>,
  /// Camera height above the texture plane, in texture widths.
  pub altitude: f64,
  /// Camera path in normalized texture coordinates.
  pub path_start: [f64; 2],
  pub path_end: [f64; 2],
  /// Run sweeps on the rayon pool instead of inline.
  pub threaded: bool,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      cycles: 240,
      viewport_height: 1080.0,
      pixels_per_texel: 1.0,
      fov_y_degrees: 60.0,
      orthographic_height: None,
      altitude: 0.05,
      path_start: [0.1, 0.1],
      path_end: [0.9, 0.9],
      threaded: true,
    }
  }
}

impl Config {
  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    Self::parse(&content)
  }

  /// Parse and validate configuration text.
  pub fn parse(content: &str) -> Result<Self> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

    if config.layers.is_empty() {
      anyhow::bail!("Config must have at least one layer");
    }
    if config.simulation.cycles == 0 {
      anyhow::bail!("simulation.cycles must be at least 1");
    }
    if config.simulation.altitude <= 0.0 {
      anyhow::bail!(
        "simulation.altitude must be positive, got {}",
        config.simulation.altitude
      );
    }
    config
      .texture_config()?
      .validate()
      .context("Invalid texture configuration")?;

    Ok(config)
  }

  /// Page layers with parsed formats.
  pub fn layer_descs(&self) -> Result<Vec<LayerDesc>> {
    self
      .layers
      .iter()
      .map(|layer| {
        let format: PixelFormat = layer
          .format
          .parse()
          .with_context(|| format!("Invalid format for layer of size 2^{}", layer.size_log2))?;
        Ok(LayerDesc::new(layer.size_log2, format))
      })
      .collect()
  }

  /// Session configuration for the core library.
  pub fn texture_config(&self) -> Result<TextureConfig> {
    Ok(TextureConfig {
      texture_size_log2: self.texture_size_log2,
      layers: self.layer_descs()?,
      cache_capacity: self.cache.capacity,
      min_depth: self.tree.min_depth,
      max_depth: self.tree.max_depth,
      domain: self.domain(),
      ring_capacity_pages: self.cache.ring_pages,
    })
  }

  pub fn domain(&self) -> Domain {
    match self.tree.domain {
      DomainName::Triangle => Domain::Triangle,
      DomainName::Square => Domain::Square,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
