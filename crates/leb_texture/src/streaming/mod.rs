//! Page upload streaming.

pub mod ring;

pub use ring::{RingRegion, StreamingRing};
