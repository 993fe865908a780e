use super::*;

#[test]
fn test_default_is_valid() {
  let config = TextureConfig::default();
  // 4096^2 texture, 256^2 pages.
  assert_eq!(config.validate().unwrap(), 9);
  assert_eq!(config.page_texels(), 256);
  assert_eq!(config.bytes_per_page(), 256 * 256 / 2);
}

#[test]
fn test_max_depth_override() {
  let config = TextureConfig {
    max_depth: Some(5),
    ..Default::default()
  };
  assert_eq!(config.validate().unwrap(), 5);

  let config = TextureConfig {
    max_depth: Some(10),
    ..Default::default()
  };
  assert!(matches!(
    config.validate(),
    Err(ConfigError::MaxDepthAboveFile {
      max_depth: 10,
      file_depth: 9
    })
  ));
}

#[test]
fn test_rejects_invalid_fields() {
  let base = TextureConfig::default();

  let config = TextureConfig {
    cache_capacity: 0,
    ..base.clone()
  };
  assert!(matches!(config.validate(), Err(ConfigError::ZeroCacheCapacity)));

  let config = TextureConfig {
    ring_capacity_pages: 0,
    ..base.clone()
  };
  assert!(matches!(config.validate(), Err(ConfigError::ZeroRingCapacity)));

  let config = TextureConfig {
    min_depth: 0,
    ..base.clone()
  };
  assert!(matches!(config.validate(), Err(ConfigError::SquareMinDepth)));

  let config = TextureConfig {
    min_depth: 0,
    domain: Domain::Triangle,
    ..base.clone()
  };
  assert!(config.validate().is_ok());

  let config = TextureConfig {
    min_depth: 12,
    ..base.clone()
  };
  assert!(matches!(config.validate(), Err(ConfigError::MinDepthAboveMax { .. })));

  let config = TextureConfig {
    texture_size_log2: 8,
    ..base
  };
  assert!(matches!(
    config.validate(),
    Err(ConfigError::Layout(StoreError::InvalidResolution { .. }))
  ));
}
