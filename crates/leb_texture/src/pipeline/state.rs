//! UpdatePipeline - the two-phase handoff state machine.
//!
//! ```text
//!        dispatch            poll               poll (token ready)
//! Idle ----------> Dispatched ----> Pending ------------------> Ready
//!  ^                                 |  ^                          |
//!  |                                 +--+ poll (not ready)         |
//!  +--------------------------- take_ready ------------------------+
//! ```
//!
//! The first poll after a dispatch requests the tree-state copy; readiness
//! is checked from `Pending` on. Nothing here blocks: while a sweep is in
//! flight the controller keeps using the last adopted tree.

use std::task::Poll;

use web_time::Instant;

use super::decision::{DecisionDomain, DecisionOutput, SweepRequest, Ticket};
use crate::error::PipelineError;
use crate::leb::LebHeap;

/// Handoff state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PipelineState {
  #[default]
  Idle,
  /// Sweep issued, copy not yet requested.
  Dispatched,
  /// Copy requested, readiness not yet observed.
  Pending,
  /// Output available through `take_ready`.
  Ready,
}

/// Drives one decision domain through dispatch / poll / adopt.
pub struct UpdatePipeline<D> {
  domain: D,
  state: PipelineState,
  ticket: Option<Ticket>,
  ready: Option<DecisionOutput>,
  dispatched_at: Option<Instant>,
  /// Polls spent on the current ticket.
  polls: u32,
  completed: u64,
}

impl<D: DecisionDomain> UpdatePipeline<D> {
  pub fn new(domain: D) -> Self {
    Self {
      domain,
      state: PipelineState::Idle,
      ticket: None,
      ready: None,
      dispatched_at: None,
      polls: 0,
      completed: 0,
    }
  }

  #[inline]
  pub fn state(&self) -> PipelineState {
    self.state
  }

  #[inline]
  pub fn is_idle(&self) -> bool {
    self.state == PipelineState::Idle
  }

  /// Ticket of the sweep in flight.
  #[inline]
  pub fn ticket(&self) -> Option<Ticket> {
    self.ticket
  }

  /// Sweeps adopted so far.
  #[inline]
  pub fn completed(&self) -> u64 {
    self.completed
  }

  #[inline]
  pub fn domain(&self) -> &D {
    &self.domain
  }

  /// Issue a sweep on `heap`. Refused (returns false) unless idle.
  pub fn dispatch(&mut self, heap: LebHeap, request: SweepRequest) -> bool {
    if !self.is_idle() {
      return false;
    }
    let ticket = self.domain.dispatch(heap, request);
    tracing::trace!(ticket = ticket.0, "sweep dispatched");
    self.ticket = Some(ticket);
    self.dispatched_at = Some(Instant::now());
    self.polls = 0;
    self.state = PipelineState::Dispatched;
    true
  }

  /// Advance without blocking and return the new state.
  ///
  /// A lost ticket resets the pipeline to `Idle` and is reported once.
  pub fn poll(&mut self) -> Result<PipelineState, PipelineError> {
    match self.state {
      PipelineState::Idle | PipelineState::Ready => {}
      PipelineState::Dispatched => {
        self.polls += 1;
        self.state = PipelineState::Pending;
      }
      PipelineState::Pending => {
        self.polls += 1;
        let Some(ticket) = self.ticket else {
          self.state = PipelineState::Idle;
          return Ok(self.state);
        };
        match self.domain.poll(ticket) {
          Ok(Poll::Ready(output)) => {
            tracing::trace!(
              ticket = ticket.0,
              polls = self.polls,
              sweep_us = output.elapsed_us,
              "sweep ready"
            );
            self.ready = Some(output);
            self.state = PipelineState::Ready;
          }
          Ok(Poll::Pending) => {}
          Err(err) => {
            self.reset();
            return Err(err);
          }
        }
      }
    }
    Ok(self.state)
  }

  /// Take the finished output (Ready -> Idle).
  pub fn take_ready(&mut self) -> Option<DecisionOutput> {
    if self.state != PipelineState::Ready {
      return None;
    }
    let output = self.ready.take();
    self.ticket = None;
    self.dispatched_at = None;
    self.state = PipelineState::Idle;
    self.completed += 1;
    output
  }

  /// Microseconds since the sweep in flight was dispatched.
  pub fn in_flight_us(&self) -> Option<u64> {
    self
      .dispatched_at
      .map(|start| start.elapsed().as_micros() as u64)
  }

  /// Polls spent on the sweep in flight (or the last one).
  #[inline]
  pub fn polls(&self) -> u32 {
    self.polls
  }

  fn reset(&mut self) {
    self.state = PipelineState::Idle;
    self.ticket = None;
    self.ready = None;
    self.dispatched_at = None;
  }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;
