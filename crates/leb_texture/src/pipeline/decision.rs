//! Decision domains: where split/merge sweeps run.
//!
//! The controller hands a domain a copy of the tree and a sweep request and
//! gets back a [`Ticket`]. Completion is observed with a non-blocking
//! [`DecisionDomain::poll`]; the controller never waits on a domain.
//!
//! ```text
//! controller                         domain
//! dispatch(heap, request) ---------> sweep + sum reduction
//!      <----- Ticket                      |
//! poll(ticket) -> Pending                 |
//! poll(ticket) -> Pending                 v
//! poll(ticket) -> Ready(output) <--- tree state copy
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::task::Poll;

use crossbeam_channel::{self as channel, Receiver, TryRecvError};
use web_time::Instant;

use crate::error::PipelineError;
use crate::leb::{update_sweep, Domain, LebHeap, SubdivisionPredicate, SweepStats, UpdateSweep};

/// Readiness token of a dispatched sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// One sweep to run against a copy of the tree.
#[derive(Clone)]
pub struct SweepRequest {
  pub domain: Domain,
  pub sweep: UpdateSweep,
  pub predicate: Arc<dyn SubdivisionPredicate + Send + Sync>,
}

impl std::fmt::Debug for SweepRequest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SweepRequest")
      .field("domain", &self.domain)
      .field("sweep", &self.sweep)
      .finish_non_exhaustive()
  }
}

/// Tree state produced by a completed sweep.
#[derive(Debug)]
pub struct DecisionOutput {
  /// Updated tree with a current reduction.
  pub heap: LebHeap,
  pub stats: SweepStats,
  /// Time spent in the sweep.
  pub elapsed_us: u64,
}

/// Run a sweep to completion (called on the domain's side).
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pipeline::run_sweep"))]
pub fn run_sweep(mut heap: LebHeap, request: SweepRequest) -> DecisionOutput {
  let start = Instant::now();
  let stats = update_sweep(&mut heap, request.domain, request.sweep, request.predicate.as_ref());
  DecisionOutput {
    heap,
    stats,
    elapsed_us: start.elapsed().as_micros() as u64,
  }
}

/// Asynchronous executor of sweeps.
pub trait DecisionDomain {
  /// Start a sweep on `heap`. Never blocks.
  fn dispatch(&mut self, heap: LebHeap, request: SweepRequest) -> Ticket;

  /// Check a ticket without blocking. `Ready` is returned once per ticket;
  /// the ticket is unknown afterwards.
  fn poll(&mut self, ticket: Ticket) -> Result<Poll<DecisionOutput>, PipelineError>;
}

/// Runs sweeps on the rayon pool; each ticket is backed by a bounded
/// channel that the worker sends the result through.
#[derive(Default)]
pub struct ThreadedDecisionDomain {
  next_ticket: u64,
  pending: HashMap<Ticket, Receiver<DecisionOutput>>,
}

impl ThreadedDecisionDomain {
  pub fn new() -> Self {
    Self::default()
  }

  /// Sweeps dispatched and not yet observed.
  pub fn in_flight(&self) -> usize {
    self.pending.len()
  }
}

impl DecisionDomain for ThreadedDecisionDomain {
  fn dispatch(&mut self, heap: LebHeap, request: SweepRequest) -> Ticket {
    let ticket = Ticket(self.next_ticket);
    self.next_ticket += 1;

    let (sender, receiver) = channel::bounded(1);
    self.pending.insert(ticket, receiver);

    rayon::spawn(move || {
      let output = run_sweep(heap, request);
      // Receiver dropped = controller gone.
      let _ = sender.send(output);
    });
    ticket
  }

  fn poll(&mut self, ticket: Ticket) -> Result<Poll<DecisionOutput>, PipelineError> {
    let receiver = self
      .pending
      .get(&ticket)
      .ok_or(PipelineError::DomainLost(ticket.0))?;

    match receiver.try_recv() {
      Ok(output) => {
        self.pending.remove(&ticket);
        Ok(Poll::Ready(output))
      }
      Err(TryRecvError::Empty) => Ok(Poll::Pending),
      Err(TryRecvError::Disconnected) => {
        self.pending.remove(&ticket);
        Err(PipelineError::DomainLost(ticket.0))
      }
    }
  }
}

/// Runs sweeps synchronously on dispatch and reports them ready after a
/// fixed number of pending polls. Deterministic, for tests and headless
/// tools.
#[derive(Debug, Default)]
pub struct ImmediateDecisionDomain {
  latency: u32,
  next_ticket: u64,
  pending: HashMap<Ticket, (DecisionOutput, u32)>,
}

impl ImmediateDecisionDomain {
  /// Ready on the first poll.
  pub fn new() -> Self {
    Self::default()
  }

  /// Report `Pending` for the first `latency` polls of every ticket.
  pub fn with_latency(latency: u32) -> Self {
    Self {
      latency,
      ..Self::default()
    }
  }
}

impl DecisionDomain for ImmediateDecisionDomain {
  fn dispatch(&mut self, heap: LebHeap, request: SweepRequest) -> Ticket {
    let ticket = Ticket(self.next_ticket);
    self.next_ticket += 1;
    self.pending.insert(ticket, (run_sweep(heap, request), self.latency));
    ticket
  }

  fn poll(&mut self, ticket: Ticket) -> Result<Poll<DecisionOutput>, PipelineError> {
    let (_, remaining) = self
      .pending
      .get_mut(&ticket)
      .ok_or(PipelineError::DomainLost(ticket.0))?;
    if *remaining > 0 {
      *remaining -= 1;
      return Ok(Poll::Pending);
    }
    let (output, _) = self
      .pending
      .remove(&ticket)
      .ok_or(PipelineError::DomainLost(ticket.0))?;
    Ok(Poll::Ready(output))
  }
}

#[cfg(test)]
#[path = "decision_test.rs"]
mod decision_test;
