//! Asynchronous two-phase update: decision domains, the handoff state
//! machine, and the session object that ties tree, cache and ring together.

pub mod decision;
pub mod state;
pub mod texture;

pub use decision::{
  run_sweep, DecisionDomain, DecisionOutput, ImmediateDecisionDomain, SweepRequest,
  ThreadedDecisionDomain, Ticket,
};
pub use state::{PipelineState, UpdatePipeline};
pub use texture::{CycleReport, PageUpload, VirtualTexture};
