//! Virtual texture page file tool.
//!
//! - `create`: write a zeroed page file for a config, optionally baked from
//!   an image
//! - `info`: print a page file's header
//! - `simulate`: fly a camera over the texture and report streaming totals

mod bake;
mod config;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use config::Config;
use leb_texture::{PageHeader, PageStore};

/// Authoring and inspection tool for LEB virtual texture page files.
#[derive(Parser, Debug)]
#[command(name = "vtexture")]
#[command(about = "Creates, inspects and simulates LEB virtual texture page files")]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a page file from a configuration.
  Create {
    /// Path to configuration TOML file.
    #[arg(short, long)]
    config: PathBuf,

    /// Output page file.
    #[arg(short, long)]
    output: PathBuf,

    /// Source image to bake into the pages.
    #[arg(short, long)]
    image: Option<PathBuf>,
  },

  /// Print the header of a page file.
  Info {
    /// Page file to inspect.
    file: PathBuf,
  },

  /// Run a headless streaming simulation.
  Simulate {
    /// Path to configuration TOML file.
    #[arg(short, long)]
    config: PathBuf,

    /// Page file to stream from (synthetic pages when omitted).
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Override the configured cycle count.
    #[arg(long)]
    cycles: Option<u32>,
  },
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  match args.command {
    Command::Create {
      config,
      output,
      image,
    } => create(&config, &output, image.as_deref()),
    Command::Info { file } => info(&file),
    Command::Simulate {
      config,
      file,
      cycles,
    } => {
      let mut config = Config::load(&config)?;
      if let Some(cycles) = cycles {
        config.simulation.cycles = cycles.max(1);
      }
      let summary = simulate::simulate(&config, file.as_deref())?;
      println!("Simulated {} cycles", summary.cycles);
      println!("  tree states adopted: {}", summary.adopted);
      println!("  capacity skips:      {}", summary.capacity_skips);
      println!(
        "  final leaves:        {} (deepest {})",
        summary.final_leaves, summary.deepest_leaf
      );
      println!(
        "  uploads:             {} pages, {} bytes",
        summary.uploads, summary.upload_bytes
      );
      println!(
        "  cache:               {} hits, {} misses, {} evictions, {:.1}% hit rate",
        summary.cache.hits,
        summary.cache.misses,
        summary.cache.evictions,
        summary.cache.hit_rate() * 100.0
      );
      Ok(())
    }
  }
}

fn create(config_path: &Path, output: &Path, image_path: Option<&Path>) -> Result<()> {
  println!("Loading config from: {}", config_path.display());
  let config = Config::load(config_path)?;
  let layers = config.layer_descs()?;

  // Decode the image first so a bad image leaves no file behind.
  let source = image_path
    .map(|path| {
      image::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))
        .map(|img| img.to_rgba8())
    })
    .transpose()?;

  let store = PageStore::create(output, config.texture_size_log2, &layers)
    .with_context(|| format!("Failed to create page file: {}", output.display()))?;
  print_header(store.header());

  if let Some(source) = source {
    println!("Baking {} pages...", store.page_count() - 1);
    let written = bake::bake_new_file(store, &source, config.domain())?;
    println!("  ✓ {written} pages baked");
  }

  println!("\nDone! Output written to: {}", output.display());
  Ok(())
}

fn info(file: &Path) -> Result<()> {
  let store =
    PageStore::open(file).with_context(|| format!("Failed to open page file: {}", file.display()))?;
  println!("{}", file.display());
  print_header(store.header());
  Ok(())
}

fn print_header(header: &PageHeader) {
  let size = 1u64 << header.texture_size_log2();
  println!("  texture:        {size}x{size}");
  println!("  tree depth:     {}", header.depth);
  println!("  pages:          {}", header.page_count());
  println!("  bytes per page: {}", header.bytes_per_page());
  println!("  file size:      {} bytes", header.file_len());
  for (index, layer) in header.layers.iter().enumerate() {
    let resolution = layer.resolution();
    println!(
      "  layer {index}:        {resolution}x{resolution} {} ({} bytes)",
      layer.format,
      layer.bytes_per_layer()
    );
  }
}
