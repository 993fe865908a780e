use image::Rgba;
use tempfile::TempDir;

use super::*;

/// Left half red, right half blue.
fn split_image() -> RgbaImage {
  RgbaImage::from_fn(64, 64, |x, _| {
    if x < 32 {
      Rgba([255, 0, 0, 255])
    } else {
      Rgba([0, 0, 255, 255])
    }
  })
}

#[test]
fn test_node_bounds() {
  let (min, max) = node_bounds(Domain::Square, LebNode::root());
  assert_eq!((min, max), (DVec2::ZERO, DVec2::ONE));

  // Lower-left half of the square.
  let (min, max) = node_bounds(Domain::Square, LebNode::new(2, 1));
  assert_eq!((min, max), (DVec2::ZERO, DVec2::ONE));

  // First half of the root triangle: (0,1), (0.5,0.5), (0,0).
  let (min, max) = node_bounds(Domain::Triangle, LebNode::new(2, 1));
  assert_eq!(min, DVec2::ZERO);
  assert_eq!(max, DVec2::new(0.5, 1.0));
}

#[test]
fn test_bake_fills_every_page() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("baked.vtex");
  let layers = [LayerDesc::new(2, PixelFormat::Rgba8), LayerDesc::new(1, PixelFormat::R8)];
  let mut store = PageStore::create(&path, 4, &layers).unwrap();

  let written = bake_image(&mut store, &split_image(), Domain::Square).unwrap();
  assert_eq!(written, store.page_count() - 1);

  let mut reopened = PageStore::open(&path).unwrap();
  // Page 0 is the null node and stays zeroed.
  assert!(reopened.read_page_vec(0).unwrap().iter().all(|b| *b == 0));

  for id in 1..reopened.page_count() {
    let node = LebNode::from_id(id);
    let (min, max) = node_bounds(Domain::Square, node);
    let page = reopened.read_page_vec(id).unwrap();
    // Rgba8 4x4 layer, then the R8 2x2 layer.
    assert_eq!(page.len(), 64 + 4);
    if max.x <= 0.5 {
      assert!(page[..64].chunks(4).all(|t| t == [255, 0, 0, 255]), "page {id}");
      assert!(page[64..].iter().all(|b| *b == 255), "page {id}");
    } else if min.x >= 0.5 {
      assert!(page[..64].chunks(4).all(|t| t == [0, 0, 255, 255]), "page {id}");
      assert!(page[64..].iter().all(|b| *b == 0), "page {id}");
    }
  }
}

#[test]
fn test_bake_rejects_compressed_layers() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("bc.vtex");
  let mut store = PageStore::create(&path, 4, &[LayerDesc::new(2, PixelFormat::Bc1)]).unwrap();
  let err = bake_image(&mut store, &split_image(), Domain::Square).unwrap_err();
  assert!(err.to_string().contains("bc1"));
}

#[test]
fn test_failed_bake_removes_new_file() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("bc.vtex");
  let store = PageStore::create(&path, 4, &[LayerDesc::new(2, PixelFormat::Bc1)]).unwrap();
  assert!(path.exists());
  assert!(bake_new_file(store, &split_image(), Domain::Square).is_err());
  assert!(!path.exists());

  let path = dir.path().join("rgba.vtex");
  let store = PageStore::create(&path, 4, &[LayerDesc::new(2, PixelFormat::Rgba8)]).unwrap();
  assert_eq!(bake_new_file(store, &split_image(), Domain::Square).unwrap(), 63);
  assert!(path.exists());
}
