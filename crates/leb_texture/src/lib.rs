//! leb_texture - Virtual texture streaming over a longest-edge-bisection tree
//!
//! A virtual texture is tiled by an adaptive bisection tree: every active
//! leaf owns one fixed-size page. A bounded LRU cache keeps the pages of
//! the current leaf set resident, fed from a flat page file, and an
//! asynchronous two-phase pipeline decides the next leaf set off the
//! controlling thread.
//!
//! # Features
//!
//! - **LEB tree**: bit-packed heap with a sum-reduction index for
//!   O(max depth) rank -> node decoding, conforming split/merge
//! - **Page store**: versioned on-disk format addressed by node id
//! - **Page cache**: exact LRU over a slot pool, rebuilt into a rank -> slot
//!   indirection table every cycle
//! - **Update pipeline**: Idle -> Dispatched -> Pending -> Ready handoff that
//!   never blocks; stale tables stay in use until a sweep is ready
//! - **Streaming ring**: fenced upload ring for freshly fetched pages
//!
//! # Example
//!
//! ```ignore
//! use leb_texture::{LodInputs, TextureConfig, ThreadedDecisionDomain, VirtualTexture};
//!
//! let config = TextureConfig::default();
//! let mut texture = VirtualTexture::open("terrain.vtex", ThreadedDecisionDomain::new(), &config)?;
//!
//! // Once per frame:
//! let report = texture.update(&LodInputs::default())?;
//! for upload in texture.take_uploads() {
//!   copy_to_slot(upload.slot, texture.upload_bytes(&upload));
//! }
//! texture.retire_uploads(report.generation);
//! draw(texture.tree_state(), texture.indirection());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod leb;
pub mod lod;
pub mod metrics;
pub mod page;
pub mod pipeline;
pub mod streaming;

pub use cache::{build_indirection, IndirectionTable, LruIndex, PageCache, NO_SLOT};
pub use config::{ConfigError, TextureConfig};
pub use error::{CacheError, PipelineError, RingError, StoreError, TextureError, TreeError};
pub use leb::{
  Domain, LebHeap, LebNode, LebUpdater, SubdivisionPredicate, TargetPredicate, UpdateSweep,
};
pub use lod::{LodInputs, LodPredicate, Projection};
pub use metrics::TextureMetrics;
pub use page::{LayerDesc, PageHeader, PageSource, PageStore, PixelFormat};
pub use pipeline::{
  CycleReport, DecisionDomain, ImmediateDecisionDomain, PageUpload, PipelineState,
  ThreadedDecisionDomain, UpdatePipeline, VirtualTexture,
};
pub use streaming::StreamingRing;
