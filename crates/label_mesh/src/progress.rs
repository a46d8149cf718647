//! Weighted progress aggregation across heterogeneous sources.
//!
//! Mesh builds report progress through callback mechanisms belonging to
//! different underlying frameworks. This module unifies any number of
//! independent sources - each possibly emitting multiple sequential runs -
//! into one monotonic overall signal with Start/Progress/End notifications.
//!
//! # State machine (per run)
//!
//! ```text
//! NotStarted ──start──► Started ──progress(p)──► InProgress ──p >= 1──► Ended
//!     │                                              ▲    │
//!     └────────── progress(p) implies start ─────────┘    └─ repeat ok
//! ```
//!
//! Signals are tolerated leniently, matching the behavior of the external
//! frameworks this was built against:
//! - `progress` before `start` implies the start
//! - duplicate starts, duplicate ends, and starts after the end are ignored
//! - `progress(p >= 1)` ends the run; repeated end signals are no-ops
//!
//! Overall progress is the weight-normalized sum over every run of every
//! source, recomputed after each accepted transition. Aggregator state sits
//! behind a single mutex and events are dispatched to listeners after the
//! lock is released, so a multi-threaded port firing callbacks concurrently
//! stays safe.

use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// How a source delivers its progress signals. Purely informational - every
/// kind reports through the same [`ProgressSender`] handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressSourceKind {
  /// A mesh build driven by this crate's own pipeline.
  Native,
  /// Callbacks originating from an external framework.
  External,
  /// Manually driven spans of fixed-cost work.
  Synthetic,
}

/// Opaque handle for a registered progress source.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SourceId(u64);

/// Unified notification emitted to listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressEvent {
  /// The first run across all sources has started.
  Started,
  /// Overall weighted progress after an accepted transition.
  Progress(f64),
  /// Every registered run has ended. Fired exactly once.
  Ended,
}

/// Receives unified progress notifications.
pub trait ProgressListener: Send {
  fn on_progress(&self, event: ProgressEvent);
}

/// Listener that forwards events into a crossbeam channel.
///
/// Useful for moving progress off the building thread, e.g. into a UI loop.
/// A disconnected receiver is tolerated silently.
pub struct ChannelListener {
  tx: Sender<ProgressEvent>,
}

impl ChannelListener {
  pub fn new(tx: Sender<ProgressEvent>) -> Self {
    Self { tx }
  }
}

impl ProgressListener for ChannelListener {
  fn on_progress(&self, event: ProgressEvent) {
    let _ = self.tx.send(event);
  }
}

/// One sequential unit of work within a source.
#[derive(Clone, Copy, Debug)]
struct RunState {
  weight: f64,
  progress: f64,
  started: bool,
  ended: bool,
}

impl RunState {
  fn new(weight: f64) -> Self {
    Self {
      weight,
      progress: 0.0,
      started: false,
      ended: false,
    }
  }
}

/// Bookkeeping for one registered source.
struct SourceState {
  kind: ProgressSourceKind,
  runs: Vec<RunState>,
  /// Index of the run currently receiving signals.
  cursor: usize,
  /// Span for synthetic delta reporting ([`ProgressSender::add`]).
  span: f64,
}

/// Events produced by a single accepted transition (an implicit start can
/// precede the signal that caused it).
type Events = SmallVec<[ProgressEvent; 2]>;

struct AccumState {
  sources: IndexMap<u64, SourceState>,
  next_id: u64,
  progress: f64,
  started: bool,
  ended: bool,
  start_fired: bool,
  end_fired: bool,
}

impl AccumState {
  fn new() -> Self {
    Self {
      sources: IndexMap::new(),
      next_id: 0,
      progress: 0.0,
      started: false,
      ended: false,
      start_fired: false,
      end_fired: false,
    }
  }

  /// Recompute overall progress and the started/ended flags from scratch.
  fn recompute(&mut self) {
    let mut total_weight = 0.0;
    let mut total_progress = 0.0;
    let mut any_run = false;
    self.started = false;
    self.ended = true;

    for source in self.sources.values() {
      for run in &source.runs {
        any_run = true;
        total_weight += run.weight;
        total_progress += run.weight * run.progress;
        if run.started {
          self.started = true;
        }
        if !run.ended {
          self.ended = false;
        }
      }
    }

    if !any_run {
      self.ended = false;
    }
    self.progress = if total_weight > 0.0 {
      total_progress / total_weight
    } else {
      0.0
    };
  }

  fn current_run(&mut self, id: u64) -> Option<&mut RunState> {
    let source = self.sources.get_mut(&id)?;
    debug_assert!(
      source.cursor < source.runs.len(),
      "progress signal past the source's last run"
    );
    source.runs.get_mut(source.cursor)
  }

  /// Start signal for the source's current run.
  fn handle_start(&mut self, id: u64) -> Events {
    let mut events = Events::new();
    let Some(run) = self.current_run(id) else {
      // Unregistered source or exhausted runs: late signal, drop it.
      return events;
    };
    // Starts after the end happen in the wild; so do duplicate starts.
    if run.ended || run.started {
      return events;
    }
    run.started = true;
    self.recompute();

    if !self.start_fired {
      self.start_fired = true;
      events.push(ProgressEvent::Started);
    } else {
      events.push(ProgressEvent::Progress(self.progress));
    }
    events
  }

  /// Fractional progress signal with `0 < p < 1`.
  fn handle_progress(&mut self, id: u64, p: f64) -> Events {
    let mut events = Events::new();
    let Some(run) = self.current_run(id) else {
      return events;
    };
    if run.ended {
      return events;
    }
    if !run.started {
      // Lenient mode: progress before start implies the start.
      events = self.handle_start(id);
    }
    if p <= 0.0 {
      return events;
    }

    let Some(run) = self.current_run(id) else {
      return events;
    };
    run.progress = p;
    self.recompute();
    events.push(ProgressEvent::Progress(self.progress));
    events
  }

  /// Terminal signal: sets the run's progress to 1 and ends it, idempotently.
  fn handle_end(&mut self, id: u64) -> Events {
    let mut events = Events::new();
    let Some(run) = self.current_run(id) else {
      return events;
    };
    if run.ended {
      return events;
    }
    if !run.started {
      events = self.handle_start(id);
    }

    let Some(run) = self.current_run(id) else {
      return events;
    };
    run.ended = true;
    run.progress = 1.0;
    self.recompute();

    if self.ended && !self.end_fired {
      self.end_fired = true;
      events.push(ProgressEvent::Ended);
    } else {
      events.push(ProgressEvent::Progress(self.progress));
    }
    events
  }
}

struct Shared {
  state: Mutex<AccumState>,
  listeners: Mutex<Vec<Box<dyn ProgressListener>>>,
}

impl Shared {
  fn dispatch(&self, events: Events) {
    if events.is_empty() {
      return;
    }
    let listeners = self.listeners.lock().unwrap();
    for event in events {
      for listener in listeners.iter() {
        listener.on_progress(event);
      }
    }
  }
}

/// Registers progress sources and combines their per-run fractional progress
/// into one weighted overall value.
pub struct ProgressAccumulator {
  shared: Arc<Shared>,
}

impl Default for ProgressAccumulator {
  fn default() -> Self {
    Self::new()
  }
}

impl ProgressAccumulator {
  pub fn new() -> Self {
    Self {
      shared: Arc::new(Shared {
        state: Mutex::new(AccumState::new()),
        listeners: Mutex::new(Vec::new()),
      }),
    }
  }

  /// Attach a listener for unified Start/Progress/End notifications.
  pub fn add_listener<L: ProgressListener + 'static>(&self, listener: L) {
    self.shared.listeners.lock().unwrap().push(Box::new(listener));
  }

  /// Register a new source with no runs yet.
  pub fn register_source(&self, kind: ProgressSourceKind) -> SourceId {
    let mut state = self.shared.state.lock().unwrap();
    let id = state.next_id;
    state.next_id += 1;
    state.sources.insert(
      id,
      SourceState {
        kind,
        runs: Vec::new(),
        cursor: 0,
        span: 1.0,
      },
    );
    tracing::trace!(id, ?kind, "progress source registered");
    SourceId(id)
  }

  /// Append one run with the given weight to a source.
  ///
  /// Registering a source repeatedly with one run per unit of work is the
  /// normal way to weave sequential builds into one aggregate.
  pub fn add_run(&self, id: SourceId, weight: f64) {
    let mut state = self.shared.state.lock().unwrap();
    let source = state
      .sources
      .get_mut(&id.0)
      .expect("add_run on unregistered progress source");
    source.runs.push(RunState::new(weight));
    state.recompute();
  }

  /// Append `n_runs` runs splitting `total_weight` evenly between them.
  pub fn register_runs(&self, id: SourceId, n_runs: usize, total_weight: f64) {
    assert!(n_runs > 0, "a source needs at least one run");
    let weight = total_weight / n_runs as f64;
    for _ in 0..n_runs {
      self.add_run(id, weight);
    }
  }

  /// The kind a source was registered with, or `None` after unregistration.
  pub fn source_kind(&self, id: SourceId) -> Option<ProgressSourceKind> {
    let state = self.shared.state.lock().unwrap();
    state.sources.get(&id.0).map(|s| s.kind)
  }

  /// A reporting handle for the source's runs.
  ///
  /// Handles stay valid across [`start_next_run`](Self::start_next_run);
  /// signals arriving after the source was unregistered are dropped.
  pub fn sender(&self, id: SourceId) -> ProgressSender {
    ProgressSender {
      source: id,
      shared: Arc::clone(&self.shared),
    }
  }

  /// Advance a source to its next run, resetting that run's own state
  /// without affecting other sources.
  pub fn start_next_run(&self, id: SourceId) {
    let mut state = self.shared.state.lock().unwrap();
    if let Some(source) = state.sources.get_mut(&id.0) {
      debug_assert!(
        source.cursor < source.runs.len(),
        "start_next_run past the source's last run"
      );
      source.cursor += 1;
      source.span = 1.0;
    }
  }

  /// Remove a source, dropping its runs from both the weight and progress
  /// accumulation. Outstanding senders for the source become inert.
  pub fn unregister_source(&self, id: SourceId) {
    let mut state = self.shared.state.lock().unwrap();
    state.sources.shift_remove(&id.0);
    state.recompute();
  }

  /// Remove every source and reset overall state.
  pub fn unregister_all(&self) {
    let mut state = self.shared.state.lock().unwrap();
    state.sources.clear();
    state.progress = 0.0;
    state.started = false;
    state.ended = false;
    state.start_fired = false;
    state.end_fired = false;
  }

  /// Rewind every run of every source to its initial state.
  pub fn reset(&self) {
    let mut state = self.shared.state.lock().unwrap();
    for source in state.sources.values_mut() {
      for run in &mut source.runs {
        run.progress = 0.0;
        run.started = false;
        run.ended = false;
      }
      source.cursor = 0;
      source.span = 1.0;
    }
    state.progress = 0.0;
    state.started = false;
    state.ended = false;
    state.start_fired = false;
    state.end_fired = false;
  }

  /// Current overall weighted progress in `[0, 1]`.
  pub fn progress(&self) -> f64 {
    self.shared.state.lock().unwrap().progress
  }

  /// True once any run has started.
  pub fn is_started(&self) -> bool {
    self.shared.state.lock().unwrap().started
  }

  /// True once every registered run has ended.
  pub fn is_ended(&self) -> bool {
    self.shared.state.lock().unwrap().ended
  }
}

/// Cheap cloneable handle through which a source reports its progress.
///
/// All source kinds report through this one type; signals address the
/// source's current run.
#[derive(Clone)]
pub struct ProgressSender {
  source: SourceId,
  shared: Arc<Shared>,
}

impl ProgressSender {
  /// Explicit start signal for the current run.
  pub fn start(&self) {
    let events = {
      let mut state = self.shared.state.lock().unwrap();
      state.handle_start(self.source.0)
    };
    self.shared.dispatch(events);
  }

  /// Report fractional progress.
  ///
  /// `p <= 0` only implies the start; `p >= 1` ends the run.
  pub fn report(&self, p: f64) {
    let events = {
      let mut state = self.shared.state.lock().unwrap();
      if p >= 1.0 {
        state.handle_end(self.source.0)
      } else {
        state.handle_progress(self.source.0, p)
      }
    };
    self.shared.dispatch(events);
  }

  /// End the current run, setting its progress to 1. Idempotent.
  pub fn finish(&self) {
    let events = {
      let mut state = self.shared.state.lock().unwrap();
      state.handle_end(self.source.0)
    };
    self.shared.dispatch(events);
  }

  /// Start the current run as a synthetic span of `span` work units,
  /// to be advanced with [`add`](Self::add).
  pub fn start_span(&self, span: f64) {
    assert!(span > 0.0, "synthetic span must be positive");
    {
      let mut state = self.shared.state.lock().unwrap();
      if let Some(source) = state.sources.get_mut(&self.source.0) {
        source.span = span;
      }
    }
    self.start();
  }

  /// Advance a synthetic run by `delta` work units out of its span.
  pub fn add(&self, delta: f64) {
    let p = {
      let mut state = self.shared.state.lock().unwrap();
      let span = state
        .sources
        .get(&self.source.0)
        .map(|s| s.span)
        .unwrap_or(1.0);
      match state.current_run(self.source.0) {
        Some(run) => Some(run.progress + delta / span),
        None => None,
      }
    };
    if let Some(p) = p {
      self.report(p);
    }
  }
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod progress_test;
