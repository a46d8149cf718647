//! Core data types: runs, extents, per-label statistics and mesh options.

use glam::{IVec3, UVec3};

use crate::constants::DEFAULT_PAD_RADIUS;

/// Integer identifier for a segmented structure. `0` is background.
pub type LabelId = u16;

/// One run of identical voxels inside a scanline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
  /// Number of consecutive voxels covered by this run (always >= 1).
  pub len: u32,
  /// Label shared by every voxel of the run.
  pub label: LabelId,
}

impl Run {
  pub fn new(len: u32, label: LabelId) -> Self {
    debug_assert!(len >= 1, "zero-length runs are illegal input");
    Self { len, label }
  }
}

/// Volume dimensions in voxels. `x` is the fast (scanline) axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent3 {
  pub x: u32,
  pub y: u32,
  pub z: u32,
}

impl Extent3 {
  pub fn new(x: u32, y: u32, z: u32) -> Self {
    Self { x, y, z }
  }

  /// Total number of voxels in the volume.
  pub fn num_voxels(&self) -> u64 {
    self.x as u64 * self.y as u64 * self.z as u64
  }

  /// Number of scanlines (one per `(y, z)` pair).
  pub fn num_scanlines(&self) -> u64 {
    self.y as u64 * self.z as u64
  }
}

/// Inclusive axis-aligned voxel bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelBounds {
  pub min: IVec3,
  pub max: IVec3,
}

impl LabelBounds {
  /// Bounds covering a single run from `start` to `end` (both inclusive).
  pub fn from_run(start: IVec3, end: IVec3) -> Self {
    Self {
      min: start,
      max: end,
    }
  }

  /// Expand to include a run. Bounds only ever grow during a scan.
  #[inline]
  pub fn encapsulate_run(&mut self, start: IVec3, end: IVec3) {
    self.min = self.min.min(start);
    self.max = self.max.max(end);
  }

  /// Number of voxels inside the tight box.
  pub fn num_voxels(&self) -> u64 {
    let size = self.max - self.min + IVec3::ONE;
    size.x as u64 * size.y as u64 * size.z as u64
  }
}

/// Region of the volume handed to the mesh builder: a label's bounding box
/// padded by a margin and clipped to the volume extents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelRegion {
  /// First voxel of the region.
  pub index: IVec3,
  /// Region size in voxels along each axis.
  pub size: UVec3,
}

impl LabelRegion {
  /// Pad `bounds` by `pad` voxels on every side and clip against `extent`.
  pub fn from_bounds(bounds: &LabelBounds, pad: i32, extent: Extent3) -> Self {
    debug_assert!(pad >= 0, "padding must be non-negative");
    let lo = (bounds.min - IVec3::splat(pad)).max(IVec3::ZERO);
    let hi = (bounds.max + IVec3::splat(pad)).min(IVec3::new(
      extent.x as i32 - 1,
      extent.y as i32 - 1,
      extent.z as i32 - 1,
    ));
    let size = hi - lo + IVec3::ONE;
    Self {
      index: lo,
      size: UVec3::new(size.x as u32, size.y as u32, size.z as u32),
    }
  }

  /// Number of voxels in the region.
  pub fn num_voxels(&self) -> u64 {
    self.size.x as u64 * self.size.y as u64 * self.size.z as u64
  }

  /// True if the voxel at `index` lies inside the region.
  pub fn contains(&self, index: IVec3) -> bool {
    let hi = self.index
      + IVec3::new(
        self.size.x as i32,
        self.size.y as i32,
        self.size.z as i32,
      );
    index.cmpge(self.index).all() && index.cmplt(hi).all()
  }
}

/// Per-label statistics from one scan pass.
///
/// Transient: recomputed on every update and discarded after diffing against
/// the cache. The checksum is a cheap proxy for "did this label's voxels
/// change" - any moved run boundary changes it with overwhelming probability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelStats {
  /// The label these statistics describe.
  pub label: LabelId,
  /// Order-sensitive rolling hash over run boundary coordinates.
  pub checksum: u32,
  /// Total voxels carrying this label.
  pub voxel_count: u64,
  /// Tight bounding box of the label.
  pub bounds: LabelBounds,
}

impl LabelStats {
  /// True if the two records disagree on any field that affects geometry.
  ///
  /// Bounds are compared as well as count and checksum, guarding against a
  /// checksum collision that only moves geometry.
  pub fn differs_from(&self, other: &LabelStats) -> bool {
    self.voxel_count != other.voxel_count
      || self.checksum != other.checksum
      || self.bounds != other.bounds
  }
}

/// Mesh construction configuration.
///
/// Compared by value: any difference invalidates every cached mesh, because
/// "same voxels -> same mesh" no longer holds once the builder is configured
/// differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshOptions {
  /// Gaussian pre-smoothing of the binary label mask.
  pub gaussian_smoothing: bool,
  /// Mesh smoothing iterations applied by the builder (0 = off).
  pub smoothing_iterations: u32,
  /// Target triangle reduction in percent (0 = no decimation).
  pub decimation_percent: u8,
  /// Padding applied around a label's bounding box before building.
  pub pad_radius: i32,
}

impl Default for MeshOptions {
  fn default() -> Self {
    Self {
      gaussian_smoothing: true,
      smoothing_iterations: 20,
      decimation_percent: 0,
      pad_radius: DEFAULT_PAD_RADIUS,
    }
  }
}

impl MeshOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_gaussian_smoothing(mut self, enabled: bool) -> Self {
    self.gaussian_smoothing = enabled;
    self
  }

  pub fn with_smoothing_iterations(mut self, iterations: u32) -> Self {
    self.smoothing_iterations = iterations;
    self
  }

  pub fn with_decimation_percent(mut self, percent: u8) -> Self {
    self.decimation_percent = percent;
    self
  }

  pub fn with_pad_radius(mut self, radius: i32) -> Self {
    self.pad_radius = radius;
    self
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
