//! Level-of-detail inputs and the projected-density predicate.
//!
//! The renderer hands over a model-view transform, a projection kind, the
//! viewport height and the wanted pixels per texel. They collapse into one
//! scalar threshold `T`, compared against each node's longest edge in view
//! space:
//!
//! ```text
//! perspective:   split when  edge / distance > T,  T = ppt * page * 2 tan(fov_y / 2) / viewport_h
//! orthographic:  split when  edge > T,             T = ppt * page * height / viewport_h
//! ```
//!
//! where `page` is the page resolution in texels. A node whose page would
//! be magnified past the target density wants to split.

use glam::{DMat4, DVec3};

use crate::leb::{decode_node_attributes, Domain, LebNode, SubdivisionPredicate};

/// Camera projection kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
  /// View volume `height` units tall.
  Orthographic { height: f64 },
  /// Vertical field of view in radians.
  Perspective { fov_y: f64 },
}

/// Per-cycle inputs from the rendering surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodInputs {
  /// Maps the normalized domain (`x, y` in `[0, 1]`, `z = 0`) to view space.
  pub view: DMat4,
  pub viewport_height: f64,
  /// Target screen pixels per texel.
  pub pixels_per_texel: f64,
  pub projection: Projection,
}

impl LodInputs {
  /// The comparison threshold for pages of `page_texels` texels per side.
  pub fn threshold(&self, page_texels: u64) -> f64 {
    let density = self.pixels_per_texel * page_texels as f64 / self.viewport_height.max(1.0);
    match self.projection {
      Projection::Perspective { fov_y } => density * 2.0 * (fov_y * 0.5).tan(),
      Projection::Orthographic { height } => density * height,
    }
  }
}

impl Default for LodInputs {
  fn default() -> Self {
    Self {
      view: DMat4::IDENTITY,
      viewport_height: 1080.0,
      pixels_per_texel: 1.0,
      projection: Projection::Perspective {
        fov_y: 60f64.to_radians(),
      },
    }
  }
}

/// Splits nodes whose page would be magnified beyond the target density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodPredicate {
  view: DMat4,
  perspective: bool,
  threshold: f64,
  max_depth: u32,
}

impl LodPredicate {
  pub fn new(inputs: &LodInputs, page_texels: u64, max_depth: u32) -> Self {
    Self {
      view: inputs.view,
      perspective: matches!(inputs.projection, Projection::Perspective { .. }),
      threshold: inputs.threshold(page_texels),
      max_depth,
    }
  }

  #[inline]
  pub fn threshold(&self) -> f64 {
    self.threshold
  }

  /// Longest edge length and distance to its nearest point (zero when the
  /// viewer is within the edge's circumscribed sphere), in view space.
  fn edge_metrics(&self, domain: Domain, node: LebNode) -> (f64, f64) {
    let [c0, _, c2] = decode_node_attributes(domain, node);
    let v0 = self.view.transform_point3(DVec3::new(c0.x, c0.y, 0.0));
    let v2 = self.view.transform_point3(DVec3::new(c2.x, c2.y, 0.0));
    let edge = v0.distance(v2);
    let center = (v0 + v2) * 0.5;
    let distance = (center.length() - edge * 0.5).max(0.0);
    (edge, distance)
  }
}

impl SubdivisionPredicate for LodPredicate {
  fn wants_split(&self, domain: Domain, node: LebNode) -> bool {
    if node.depth >= self.max_depth {
      return false;
    }
    if node.depth < domain.triangle_depth() {
      return true;
    }
    let (edge, distance) = self.edge_metrics(domain, node);
    if self.perspective {
      // Inside the edge's sphere the projected size is unbounded.
      distance <= 0.0 || edge > self.threshold * distance
    } else {
      edge > self.threshold
    }
  }
}

#[cfg(test)]
#[path = "lod_test.rs"]
mod lod_test;
