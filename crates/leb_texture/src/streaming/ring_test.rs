use super::*;

#[test]
fn test_writes_advance_then_wrap() {
  let mut ring = StreamingRing::new(8);
  let a = ring.write(&[1, 1, 1], 1).unwrap();
  let b = ring.write(&[2, 2, 2], 1).unwrap();
  assert_eq!((a.offset, b.offset), (0, 3));
  assert_eq!(ring.head(), 6);
  assert_eq!(ring.region(&b), &[2, 2, 2]);

  ring.retire(1);
  assert_eq!(ring.in_flight(), 0);

  // Does not fit the tail: orphan it and start over at zero.
  let c = ring.write(&[3, 3, 3], 2).unwrap();
  assert_eq!(c.offset, 0);
  assert_eq!(ring.wrap_count(), 1);
  assert_eq!(ring.head(), 3);
  assert_eq!(ring.region(&c), &[3, 3, 3]);
}

#[test]
fn test_exact_fit_does_not_wrap() {
  let mut ring = StreamingRing::new(6);
  ring.write(&[0; 3], 1).unwrap();
  let b = ring.write(&[0; 3], 1).unwrap();
  assert_eq!(b.offset, 3);
  assert_eq!(ring.wrap_count(), 0);
  assert_eq!(ring.head(), 6);
}

#[test]
fn test_wrap_onto_in_flight_region_is_busy() {
  let mut ring = StreamingRing::new(8);
  ring.write(&[1; 3], 10).unwrap();
  ring.write(&[2; 3], 11).unwrap();

  assert_eq!(ring.write(&[3; 3], 12), Err(RingError::Busy { fence: 10 }));
  // The failed write changed nothing.
  assert_eq!(ring.head(), 6);
  assert_eq!(ring.wrap_count(), 0);
  assert_eq!(ring.in_flight(), 2);

  assert_eq!(ring.retire(10), 1);
  let c = ring.write(&[3; 3], 12).unwrap();
  assert_eq!(c.offset, 0);

  // Region b is still readable and intact after the wrap.
  let b = RingRegion {
    offset: 3,
    len: 3,
    fence: 11,
  };
  assert_eq!(ring.region(&b), &[2, 2, 2]);
  assert_eq!(ring.write(&[4; 2], 13), Err(RingError::Busy { fence: 11 }));
}

#[test]
fn test_too_large() {
  let mut ring = StreamingRing::new(4);
  assert_eq!(
    ring.write(&[0; 5], 1),
    Err(RingError::TooLarge {
      len: 5,
      capacity: 4
    })
  );
  assert!(ring.write(&[0; 4], 1).is_ok());
}

#[test]
fn test_retire_releases_older_fences() {
  let mut ring = StreamingRing::new(64);
  for fence in 1..=5 {
    ring.write(&[fence as u8; 4], fence).unwrap();
  }
  assert_eq!(ring.in_flight_bytes(), 20);
  assert_eq!(ring.retire(3), 3);
  assert_eq!(ring.in_flight(), 2);
  assert_eq!(ring.retire(3), 0);
  assert_eq!(ring.retire(u64::MAX), 2);
}

#[test]
fn test_empty_write_is_free() {
  let mut ring = StreamingRing::new(4);
  ring.write(&[1; 4], 1).unwrap();
  let empty = ring.write(&[], 2).unwrap();
  assert_eq!(empty.len, 0);
  assert_eq!(ring.in_flight(), 1);
}
