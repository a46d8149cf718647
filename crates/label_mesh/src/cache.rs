//! Per-label mesh cache and diffing.
//!
//! The cache holds one entry per label present in the most recent scan:
//! the label's last-known statistics plus an optional mesh handle. Diffing
//! fresh statistics against the cache yields the minimal rebuild set and the
//! labels to evict.
//!
//! Invariant: an entry's mesh is never observably stale relative to its
//! stats. Stats and mesh are only ever replaced together ([`MeshCache::commit`]);
//! a failed build leaves the previous entry untouched.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::MeshFootprint;
use crate::types::{LabelId, LabelStats, MeshOptions};

/// Cached state for one label.
#[derive(Clone, Debug)]
pub struct CacheEntry<M> {
  /// Statistics from the scan that produced `mesh`.
  pub stats: LabelStats,
  /// The mesh, or `None` while a rebuild is outstanding.
  pub mesh: Option<M>,
}

/// Result of diffing fresh statistics against the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheDiff {
  /// Labels that are new or whose voxels changed since the cached build.
  pub rebuild: BTreeSet<LabelId>,
  /// Labels no longer present in the volume.
  pub evict: BTreeSet<LabelId>,
  /// True when an options change invalidated every cached mesh.
  pub full_invalidation: bool,
}

impl CacheDiff {
  /// True when nothing needs rebuilding or evicting.
  pub fn is_clean(&self) -> bool {
    self.rebuild.is_empty() && self.evict.is_empty()
  }
}

/// Table of per-label cache entries.
pub struct MeshCache<M> {
  entries: BTreeMap<LabelId, CacheEntry<M>>,
}

impl<M> Default for MeshCache<M> {
  fn default() -> Self {
    Self::new()
  }
}

impl<M> MeshCache<M> {
  pub fn new() -> Self {
    Self {
      entries: BTreeMap::new(),
    }
  }

  /// Diff fresh statistics against the cached entries.
  ///
  /// Pure function of the cache content, the new statistics, and the two
  /// option values: a label is evicted iff it left the volume, rebuilt iff
  /// it is new or its stats changed, and every label is rebuilt when the
  /// options differ (the meaning of "same voxels -> same mesh" no longer
  /// holds). Unchanged labels are left untouched and pay no rebuild cost.
  pub fn diff(
    &self,
    new_stats: &BTreeMap<LabelId, LabelStats>,
    old_options: &MeshOptions,
    new_options: &MeshOptions,
  ) -> CacheDiff {
    let mut diff = CacheDiff::default();

    for label in self.entries.keys() {
      if !new_stats.contains_key(label) {
        diff.evict.insert(*label);
      }
    }

    if old_options != new_options {
      tracing::debug!("mesh options changed, invalidating all cached meshes");
      diff.full_invalidation = true;
      diff.rebuild.extend(new_stats.keys().copied());
      return diff;
    }

    for (label, stats) in new_stats {
      match self.entries.get(label) {
        // Entries without a mesh (a previously failed build) always retry.
        Some(entry) if entry.mesh.is_some() && !entry.stats.differs_from(stats) => {}
        _ => {
          diff.rebuild.insert(*label);
        }
      }
    }

    diff
  }

  /// Drop the entries named in the eviction set.
  pub fn apply_evictions(&mut self, diff: &CacheDiff) {
    for label in &diff.evict {
      self.entries.remove(label);
      tracing::trace!(label, "evicted mesh for disappeared label");
    }
  }

  /// Replace a label's stats and mesh together.
  ///
  /// This is the only way mesh content enters the cache, which keeps the
  /// never-stale invariant even when a build fails midway through an update:
  /// nothing is written until the builder has succeeded.
  pub fn commit(&mut self, stats: LabelStats, mesh: M) {
    self.entries.insert(
      stats.label,
      CacheEntry {
        stats,
        mesh: Some(mesh),
      },
    );
  }

  /// Record a label that is present in the volume but has no mesh yet
  /// (its first build failed). Existing entries are left untouched - a
  /// previously valid mesh is always retained over a failure.
  pub fn insert_stale(&mut self, stats: LabelStats) {
    self.entries.entry(stats.label).or_insert(CacheEntry {
      stats,
      mesh: None,
    });
  }

  /// Discard every entry (options change, volume swap).
  pub fn clear(&mut self) {
    self.entries.clear();
  }

  /// True if the cache has an entry for `label`.
  pub fn contains_label(&self, label: LabelId) -> bool {
    self.entries.contains_key(&label)
  }

  /// Cached statistics for `label`, if present.
  pub fn stats(&self, label: LabelId) -> Option<&LabelStats> {
    self.entries.get(&label).map(|e| &e.stats)
  }

  /// Full entry for `label`, if present.
  pub fn entry(&self, label: LabelId) -> Option<&CacheEntry<M>> {
    self.entries.get(&label)
  }

  /// All cached entries in label order.
  pub fn entries(&self) -> impl Iterator<Item = (LabelId, &CacheEntry<M>)> {
    self.entries.iter().map(|(label, entry)| (*label, entry))
  }

  /// Labels with a built (non-stale) mesh, in label order.
  pub fn valid_meshes(&self) -> BTreeMap<LabelId, &M> {
    self
      .entries
      .iter()
      .filter_map(|(label, entry)| entry.mesh.as_ref().map(|mesh| (*label, mesh)))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<M: MeshFootprint> MeshCache<M> {
  /// Total reported memory of all built meshes.
  pub fn memory_bytes(&self) -> u64 {
    self
      .entries
      .values()
      .filter_map(|entry| entry.mesh.as_ref())
      .map(|mesh| mesh.memory_bytes())
      .sum()
  }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
