use std::fs;

use tempfile::TempDir;

use super::*;

fn layers() -> Vec<LayerDesc> {
  vec![
    LayerDesc::new(5, PixelFormat::Rgba8),
    LayerDesc::new(4, PixelFormat::Bc1),
  ]
}

#[test]
fn test_header_is_32_bytes() {
  assert_eq!(HEADER_SIZE, 32);
}

#[test]
fn test_header_layout() {
  let header = PageHeader::for_texture(8, &layers()).unwrap();
  let bytes = header.encode();
  assert_eq!(&bytes[0..8], b"LEBVTEX1");
  assert_eq!(&bytes[8..12], &7i32.to_le_bytes());
  assert_eq!(&bytes[12..16], &2i32.to_le_bytes());
  assert_eq!(&bytes[16..20], &[5, 2, 4, 12]);
  assert!(bytes[20..].iter().all(|b| *b == 0));
  assert_eq!(PageHeader::decode(&bytes).unwrap(), header);
}

#[test]
fn test_depth_from_resolutions() {
  // 4096^2 texture of 512^2 pages.
  let header = PageHeader::for_texture(12, &[LayerDesc::new(9, PixelFormat::Bc1)]).unwrap();
  assert_eq!(header.depth, 7);
  assert_eq!(header.page_count(), 256);
  assert_eq!(header.texture_size_log2(), 12);
}

#[test]
fn test_create_rejects_bad_configuration() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("bad.vtex");

  let err = PageStore::create(&path, 9, &[LayerDesc::new(9, PixelFormat::R8)]).unwrap_err();
  assert!(matches!(err, StoreError::InvalidResolution { texture: 9, page: 9 }));

  // depth 2 * 14 + 1 = 29
  let err = PageStore::create(&path, 14, &[LayerDesc::new(0, PixelFormat::R8)]).unwrap_err();
  assert!(matches!(err, StoreError::UnsupportedDepth(29)));

  let err = PageStore::create(&path, 12, &[]).unwrap_err();
  assert!(matches!(err, StoreError::NoLayers));

  let nine = vec![LayerDesc::new(2, PixelFormat::R8); 9];
  let err = PageStore::create(&path, 12, &nine).unwrap_err();
  assert!(matches!(err, StoreError::TooManyLayers(9)));

  // Nothing is left behind.
  assert!(!path.exists());
}

#[test]
fn test_failed_create_leaves_no_file() {
  let dir = TempDir::new().unwrap();
  let missing_dir = dir.path().join("missing").join("page.vtex");
  let err = PageStore::create(&missing_dir, 8, &layers()).unwrap_err();
  assert!(matches!(err, StoreError::Io(_)));
  assert!(!missing_dir.exists());
}

#[test]
fn test_create_then_open_round_trip() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("page.vtex");

  let created = PageStore::create(&path, 8, &layers()).unwrap();
  let expected_len = HEADER_SIZE as u64 + created.page_count() * created.bytes_per_page();
  assert_eq!(fs::metadata(&path).unwrap().len(), expected_len);
  let header = created.header().clone();
  drop(created);

  let mut store = PageStore::open(&path).unwrap();
  assert_eq!(store.header(), &header);
  assert_eq!(store.depth(), 7);
  assert_eq!(store.page_count(), 256);
  assert_eq!(store.bytes_per_page(), 32 * 32 * 4 + 16 * 16 / 2);
  assert_eq!(store.layers(), &layers()[..]);

  // Fresh pages read back as zeros.
  let page = store.read_page_vec(255).unwrap();
  assert!(page.iter().all(|b| *b == 0));
}

#[test]
fn test_write_read_page() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("page.vtex");
  let mut store = PageStore::create(&path, 8, &layers()).unwrap();
  let len = store.bytes_per_page() as usize;

  let page_a: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
  let page_b = vec![0xAB; len];
  store.write_page(17, &page_a).unwrap();
  store.write_page(18, &page_b).unwrap();
  store.sync().unwrap();
  drop(store);

  let mut store = PageStore::open(&path).unwrap();
  assert_eq!(store.read_page_vec(17).unwrap(), page_a);
  assert_eq!(store.read_page_vec(18).unwrap(), page_b);
  // Neighbors of the written pages are untouched.
  assert!(store.read_page_vec(16).unwrap().iter().all(|b| *b == 0));
  assert!(store.read_page_vec(19).unwrap().iter().all(|b| *b == 0));

  let raw = fs::read(&path).unwrap();
  let offset = store.page_offset(17) as usize;
  assert_eq!(&raw[offset..offset + len], &page_a[..]);
}

#[test]
fn test_page_bounds_and_sizes() {
  let dir = TempDir::new().unwrap();
  let mut store = PageStore::create(dir.path().join("page.vtex"), 8, &layers()).unwrap();
  let len = store.bytes_per_page() as usize;

  let err = store.read_page_vec(256).unwrap_err();
  assert!(matches!(err, StoreError::PageOutOfRange { id: 256, page_count: 256 }));

  let err = store.write_page(3, &vec![0; len - 1]).unwrap_err();
  assert!(matches!(err, StoreError::BufferSize { .. }));
}

#[test]
fn test_read_only_store_rejects_writes() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("page.vtex");
  drop(PageStore::create(&path, 8, &layers()).unwrap());

  let mut store = PageStore::open(&path).unwrap();
  let page = vec![1; store.bytes_per_page() as usize];
  assert!(matches!(store.write_page(3, &page), Err(StoreError::Io(_))));

  let mut store = PageStore::open_mut(&path).unwrap();
  store.write_page(3, &page).unwrap();
  assert_eq!(store.read_page_vec(3).unwrap(), page);
}

#[test]
fn test_open_rejects_bad_files() {
  let dir = TempDir::new().unwrap();

  let missing = dir.path().join("missing.vtex");
  assert!(matches!(PageStore::open(&missing), Err(StoreError::Io(_))));

  let short = dir.path().join("short.vtex");
  fs::write(&short, b"LEBV").unwrap();
  assert!(matches!(
    PageStore::open(&short),
    Err(StoreError::Truncated { expected: 32, actual: 4 })
  ));

  let path = dir.path().join("page.vtex");
  let store = PageStore::create(&path, 8, &layers()).unwrap();
  let full_len = store.header().file_len();
  drop(store);

  let mut bytes = fs::read(&path).unwrap();
  bytes[0] = b'X';
  let bad_magic = dir.path().join("magic.vtex");
  fs::write(&bad_magic, &bytes).unwrap();
  assert!(matches!(PageStore::open(&bad_magic), Err(StoreError::BadMagic { .. })));

  let truncated = dir.path().join("truncated.vtex");
  let bytes = fs::read(&path).unwrap();
  fs::write(&truncated, &bytes[..bytes.len() - 1]).unwrap();
  match PageStore::open(&truncated) {
    Err(StoreError::Truncated { expected, actual }) => {
      assert_eq!(expected, full_len);
      assert_eq!(actual, full_len - 1);
    }
    other => panic!("expected truncation error, got {other:?}"),
  }

  let mut bytes = fs::read(&path).unwrap();
  bytes[8..12].copy_from_slice(&40i32.to_le_bytes());
  let deep = dir.path().join("deep.vtex");
  fs::write(&deep, &bytes).unwrap();
  assert!(matches!(PageStore::open(&deep), Err(StoreError::UnsupportedDepth(40))));

  let mut bytes = fs::read(&path).unwrap();
  bytes[17] = 99;
  let format = dir.path().join("format.vtex");
  fs::write(&format, &bytes).unwrap();
  assert!(matches!(PageStore::open(&format), Err(StoreError::InvalidFormat(99))));
}

/// Header-only file claiming depth 27 with `layers` huge float layers.
fn oversized_header(layer_count: usize) -> [u8; HEADER_SIZE] {
  let mut bytes = [0u8; HEADER_SIZE];
  bytes[0..8].copy_from_slice(&MAGIC);
  bytes[8..12].copy_from_slice(&27i32.to_le_bytes());
  bytes[12..16].copy_from_slice(&(layer_count as i32).to_le_bytes());
  for record in bytes[16..16 + 2 * layer_count].chunks_exact_mut(2) {
    record[0] = MAX_LAYER_SIZE_LOG2;
    record[1] = PixelFormat::Rgba32F.as_tag();
  }
  bytes
}

#[test]
fn test_open_rejects_unrepresentable_file_size() {
  let dir = TempDir::new().unwrap();

  // 2^28 pages of 2^37 bytes overflow u64.
  let overflow = dir.path().join("overflow.vtex");
  fs::write(&overflow, oversized_header(8)).unwrap();
  match PageStore::open(&overflow) {
    Err(StoreError::FileTooLarge {
      depth,
      bytes_per_page,
    }) => {
      assert_eq!(depth, 27);
      assert_eq!(bytes_per_page, 8 << 34);
    }
    other => panic!("expected file size error, got {other:?}"),
  }

  // 2^28 pages of 2^35 bytes fit u64 but not a file offset.
  let offset = dir.path().join("offset.vtex");
  fs::write(&offset, oversized_header(2)).unwrap();
  assert!(matches!(
    PageStore::open(&offset),
    Err(StoreError::FileTooLarge { depth: 27, .. })
  ));

  // One layer fits and is reported as a plain truncation.
  let single = dir.path().join("single.vtex");
  fs::write(&single, oversized_header(1)).unwrap();
  assert!(matches!(
    PageStore::open(&single),
    Err(StoreError::Truncated { expected, actual: 32 }) if expected == (1u64 << 62) + 32
  ));
}

#[test]
fn test_create_rejects_unrepresentable_file_size() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("huge.vtex");
  let layers = vec![LayerDesc::new(MAX_LAYER_SIZE_LOG2, PixelFormat::Rgba32F); 8];
  let err = PageStore::create(&path, 28, &layers).unwrap_err();
  assert!(matches!(err, StoreError::FileTooLarge { depth: 27, .. }));
  assert!(!path.exists());

  let header = PageHeader {
    depth: 27,
    layers,
  };
  assert_eq!(header.file_len(), u64::MAX);
}

#[test]
fn test_store_as_page_source() {
  let dir = TempDir::new().unwrap();
  let mut store = PageStore::create(dir.path().join("page.vtex"), 8, &layers()).unwrap();
  let page = vec![7u8; store.bytes_per_page() as usize];
  store.write_page(42, &page).unwrap();

  let source: &mut dyn PageSource = &mut store;
  let mut out = vec![0u8; source.bytes_per_page()];
  source.fetch_page(42, &mut out).unwrap();
  assert_eq!(out, page);
}
