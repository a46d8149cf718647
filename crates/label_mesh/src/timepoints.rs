//! Per-time-point pipeline table with a soft memory budget.
//!
//! A time-varying (4D) segmentation keeps one [`MeshPipeline`] per loaded
//! time point. Total mesh memory across time points is bounded by evicting
//! the oldest-inserted entry (FIFO, not LRU) whenever the budget is
//! exceeded - except that the last surviving entry is never evicted, because
//! at least one fully built mesh set must always be available.

use indexmap::IndexMap;

use crate::builder::{MeshBuilder, MeshFootprint};
use crate::constants::DEFAULT_MEMORY_BUDGET;
use crate::pipeline::MeshPipeline;

/// Table of mesh pipelines keyed by time-point index.
pub struct TimepointTable<B: MeshBuilder> {
  table: IndexMap<u32, MeshPipeline<B>>,
  /// Running total of reported mesh memory, maintained incrementally.
  memory_bytes: u64,
  budget_bytes: u64,
}

impl<B: MeshBuilder> Default for TimepointTable<B> {
  fn default() -> Self {
    Self::new()
  }
}

impl<B: MeshBuilder> TimepointTable<B> {
  pub fn new() -> Self {
    Self::with_budget(DEFAULT_MEMORY_BUDGET)
  }

  /// Create a table with a custom memory budget in bytes.
  pub fn with_budget(budget_bytes: u64) -> Self {
    Self {
      table: IndexMap::new(),
      memory_bytes: 0,
      budget_bytes,
    }
  }

  /// The pipeline for a time point, if one is cached.
  pub fn pipeline(&self, timepoint: u32) -> Option<&MeshPipeline<B>> {
    self.table.get(&timepoint)
  }

  /// Mutable access to a cached pipeline.
  pub fn pipeline_mut(&mut self, timepoint: u32) -> Option<&mut MeshPipeline<B>> {
    self.table.get_mut(&timepoint)
  }

  /// Store the pipeline for a time point, evicting older time points while
  /// the total reported memory exceeds the budget.
  ///
  /// An existing entry for the same time point is replaced (its memory is
  /// subtracted first). The last remaining entry survives even over budget:
  /// a single huge mesh set still has to render.
  pub fn set_pipeline(&mut self, timepoint: u32, pipeline: MeshPipeline<B>) {
    if let Some(old) = self.table.get(&timepoint) {
      self.memory_bytes = self.memory_bytes.saturating_sub(old.memory_bytes());
    }
    self.memory_bytes += pipeline.memory_bytes();
    self.table.insert(timepoint, pipeline);

    while self.memory_bytes > self.budget_bytes && self.table.len() > 1 {
      // IndexMap preserves insertion order, so index 0 is the oldest entry.
      let (evicted_tp, evicted) = self
        .table
        .shift_remove_index(0)
        .expect("table has more than one entry");
      self.memory_bytes = self.memory_bytes.saturating_sub(evicted.memory_bytes());
      tracing::debug!(
        timepoint = evicted_tp,
        memory_bytes = self.memory_bytes,
        "evicted oldest time point over memory budget"
      );
    }
  }

  /// Number of cached time points.
  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  /// Running total of reported mesh memory across time points.
  pub fn memory_bytes(&self) -> u64 {
    self.memory_bytes
  }

  /// The configured soft budget in bytes.
  pub fn budget_bytes(&self) -> u64 {
    self.budget_bytes
  }

  /// Drop every cached time point.
  pub fn clear(&mut self) {
    self.table.clear();
    self.memory_bytes = 0;
  }

  /// Log a per-time-point, per-label memory breakdown.
  pub fn memory_report(&self) {
    for (timepoint, pipeline) in &self.table {
      let mut total = 0u64;
      for (label, mesh) in pipeline.valid_meshes() {
        let bytes = mesh.memory_bytes();
        tracing::debug!(timepoint, label, bytes, "cached mesh");
        total += bytes;
      }
      tracing::debug!(timepoint, total_bytes = total, "time point memory");
    }
  }
}

#[cfg(test)]
#[path = "timepoints_test.rs"]
mod timepoints_test;
