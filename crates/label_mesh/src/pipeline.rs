//! Update orchestration: scan, diff, rebuild, commit.
//!
//! [`MeshPipeline`] ties the pieces together for one volume:
//!
//! ```text
//! update_meshes(volume):
//!   scan_volume ──► MeshCache::diff ──► evictions
//!        │                                  │
//!        └──► for each label in rebuild ────┴──► MeshBuilder::build
//!                    │                                  │
//!             weighted progress run              commit on success,
//!             (weight = voxel count)             keep old entry on failure
//! ```
//!
//! Builds run synchronously, one label at a time, within one call. There is
//! no cancellation primitive; callers wanting it must add a cooperative
//! check between labels.

use std::collections::BTreeMap;

use web_time::Instant;

use crate::builder::{BuildError, MeshBuilder};
use crate::cache::{CacheEntry, MeshCache};
use crate::progress::{ProgressAccumulator, ProgressSourceKind};
use crate::scan::scan_volume;
use crate::types::{Extent3, LabelId, LabelRegion, LabelStats, MeshOptions};
use crate::volume::LabelVolume;

/// Result of one [`MeshPipeline::update_meshes`] call.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
  /// Labels whose meshes were rebuilt.
  pub rebuilt: Vec<LabelId>,
  /// Labels evicted because they disappeared from the volume.
  pub evicted: Vec<LabelId>,
  /// Labels whose builds failed; their previous entries were retained.
  pub failed: Vec<(LabelId, BuildError)>,
  /// Labels present and untouched (no rebuild cost paid).
  pub unchanged: usize,
  /// Wall time spent inside the builder, in microseconds.
  pub build_time_us: u64,
}

impl UpdateOutcome {
  /// True when the volume matched the cache exactly.
  pub fn is_noop(&self) -> bool {
    self.rebuilt.is_empty() && self.evicted.is_empty() && self.failed.is_empty()
  }
}

/// Snapshot of the most recent scan, backing the O(1) queries.
struct ScanState {
  stats: BTreeMap<LabelId, LabelStats>,
  extent: Extent3,
}

/// Converts a multi-label volume into a collection of per-label meshes,
/// recomputing a mesh only when the underlying voxels actually changed.
pub struct MeshPipeline<B: MeshBuilder> {
  builder: B,
  /// Options the cache content was built with.
  options: MeshOptions,
  /// Options to apply on the next update.
  pending_options: MeshOptions,
  cache: MeshCache<B::Mesh>,
  last_scan: Option<ScanState>,
}

impl<B: MeshBuilder> MeshPipeline<B> {
  pub fn new(builder: B) -> Self {
    Self::with_options(builder, MeshOptions::default())
  }

  pub fn with_options(builder: B, options: MeshOptions) -> Self {
    Self {
      builder,
      pending_options: options.clone(),
      options,
      cache: MeshCache::new(),
      last_scan: None,
    }
  }

  /// Set the mesh options to apply on the next update.
  ///
  /// A change is never an error; it is a signal that every cached mesh is
  /// invalid. Invalidation happens inside the next [`update_meshes`]
  /// (Self::update_meshes) call as a pure function of old and new options.
  pub fn set_mesh_options(&mut self, options: MeshOptions) {
    if options != self.pending_options {
      tracing::debug!("mesh options updated, next update will rebuild all labels");
    }
    self.pending_options = options;
  }

  /// The options that will apply on the next update.
  pub fn mesh_options(&self) -> &MeshOptions {
    &self.pending_options
  }

  /// Synchronize cached meshes with the volume.
  ///
  /// Runs the scan, diffs against the cache, evicts disappeared labels and
  /// rebuilds changed ones sequentially. Every build is registered as a
  /// weighted run on `progress` (weight = the label's voxel count). A failed
  /// build retains the previous entry for that label and is reported in the
  /// outcome; remaining labels continue unaffected.
  pub fn update_meshes<V: LabelVolume>(
    &mut self,
    volume: &V,
    progress: &ProgressAccumulator,
  ) -> UpdateOutcome {
    let _span = tracing::info_span!("update_meshes").entered();
    let mut outcome = UpdateOutcome::default();

    let new_stats = scan_volume(volume);
    let diff = self
      .cache
      .diff(&new_stats, &self.options, &self.pending_options);

    if diff.full_invalidation {
      self.cache.clear();
    } else {
      self.cache.apply_evictions(&diff);
    }
    self.options = self.pending_options.clone();
    outcome.evicted = diff.evict.iter().copied().collect();
    outcome.unchanged = new_stats.len() - diff.rebuild.len();

    tracing::debug!(
      rebuild = diff.rebuild.len(),
      evict = diff.evict.len(),
      unchanged = outcome.unchanged,
      "cache diff complete"
    );

    // One progress source, one run per dirty label, weighted by voxel count
    // so big structures dominate the aggregate.
    let source = progress.register_source(ProgressSourceKind::Native);
    for label in &diff.rebuild {
      progress.add_run(source, new_stats[label].voxel_count as f64);
    }
    let sender = progress.sender(source);

    for &label in &diff.rebuild {
      let stats = new_stats[&label];
      let region = LabelRegion::from_bounds(&stats.bounds, self.options.pad_radius, volume.extent());

      let start = Instant::now();
      let result = self
        .builder
        .build(label, &region, &self.options, &sender);
      outcome.build_time_us += start.elapsed().as_micros() as u64;

      match result {
        Ok(mesh) => {
          sender.finish();
          self.cache.commit(stats, mesh);
          outcome.rebuilt.push(label);
        }
        Err(err) => {
          tracing::warn!(label, %err, "mesh build failed, keeping previous mesh");
          // End the run regardless so the aggregate still converges to 1.
          sender.finish();
          // A first-time label still gets a (mesh-less) entry; diff retries
          // it on the next update. Existing entries are left untouched.
          self.cache.insert_stale(stats);
          outcome.failed.push((label, err));
        }
      }
      progress.start_next_run(source);
    }

    progress.unregister_source(source);
    self.last_scan = Some(ScanState {
      stats: new_stats,
      extent: volume.extent(),
    });
    outcome
  }

  /// Build a single label's mesh on demand, outside the normal update flow.
  ///
  /// Returns `Ok(None)` when the label is absent from the most recent scan -
  /// a normal "no mesh available" result, not an error.
  pub fn compute_mesh<V: LabelVolume>(
    &mut self,
    label: LabelId,
    volume: &V,
  ) -> Result<Option<&B::Mesh>, BuildError> {
    let (stats, extent) = {
      let scan = self.scanned("compute_mesh");
      match scan.stats.get(&label).copied() {
        Some(stats) => (stats, scan.extent),
        None => return Ok(None),
      }
    };
    debug_assert_eq!(extent, volume.extent(), "volume changed since last scan");
    let region = LabelRegion::from_bounds(&stats.bounds, self.options.pad_radius, extent);

    let progress = ProgressAccumulator::new();
    let source = progress.register_source(ProgressSourceKind::Native);
    progress.add_run(source, stats.voxel_count as f64);
    let sender = progress.sender(source);

    let mesh = self.builder.build(label, &region, &self.options, &sender)?;
    sender.finish();
    self.cache.commit(stats, mesh);
    Ok(self.cache.entry(label).and_then(|e| e.mesh.as_ref()))
  }

  /// True if `label` was present in the most recent scan. O(1).
  pub fn is_label_present(&self, label: LabelId) -> bool {
    self.scanned("is_label_present").stats.contains_key(&label)
  }

  /// Voxel count of the label's padded, clipped bounding region. O(1).
  ///
  /// `None` for labels absent from the most recent scan.
  pub fn voxels_in_bounding_region(&self, label: LabelId) -> Option<u64> {
    let scan = self.scanned("voxels_in_bounding_region");
    let stats = scan.stats.get(&label)?;
    Some(LabelRegion::from_bounds(&stats.bounds, self.options.pad_radius, scan.extent).num_voxels())
  }

  /// Statistics from the most recent scan, in label order.
  pub fn label_stats(&self) -> &BTreeMap<LabelId, LabelStats> {
    &self.scanned("label_stats").stats
  }

  /// Currently valid meshes (never stale relative to their stats).
  pub fn valid_meshes(&self) -> BTreeMap<LabelId, &B::Mesh> {
    self.cache.valid_meshes()
  }

  /// Cached per-label entries, in label order.
  pub fn mesh_info(&self) -> impl Iterator<Item = (LabelId, &CacheEntry<B::Mesh>)> {
    self.cache.entries()
  }

  /// The underlying cache.
  pub fn cache(&self) -> &MeshCache<B::Mesh> {
    &self.cache
  }

  /// Total reported memory of all cached meshes.
  pub fn memory_bytes(&self) -> u64 {
    self.cache.memory_bytes()
  }

  fn scanned(&self, op: &str) -> &ScanState {
    self
      .last_scan
      .as_ref()
      .unwrap_or_else(|| panic!("{op} called before the first update_meshes"))
  }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
