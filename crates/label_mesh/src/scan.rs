//! Streaming change detection over a run-length label volume.
//!
//! One forward pass over all scanlines produces a [`LabelStats`] record per
//! non-background label: voxel count, tight bounding box, and an
//! order-sensitive rolling checksum over run boundary coordinates. The pass
//! is O(number of runs) and never touches individual voxels.

use std::collections::BTreeMap;

use glam::IVec3;

use crate::constants::BACKGROUND_LABEL;
use crate::types::{LabelBounds, LabelId, LabelStats};
use crate::volume::LabelVolume;

/// Adler-32 rolling checksum (software implementation).
///
/// Order-sensitive: folding the same coordinates in a different order yields
/// a different sum, so a run that merely moved still flips the checksum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32(u32);

const ADLER_MOD: u32 = 65521;

impl Adler32 {
  /// Checksum of the empty byte sequence.
  pub fn new() -> Self {
    Self(1)
  }

  /// Fold `bytes` into the running sum.
  #[inline]
  pub fn update(&mut self, bytes: &[u8]) {
    let mut a = self.0 & 0xffff;
    let mut b = self.0 >> 16;
    for &byte in bytes {
      a = (a + byte as u32) % ADLER_MOD;
      b = (b + a) % ADLER_MOD;
    }
    self.0 = (b << 16) | a;
  }

  /// Current checksum value.
  pub fn value(&self) -> u32 {
    self.0
  }
}

impl Default for Adler32 {
  fn default() -> Self {
    Self::new()
  }
}

/// Per-label accumulator state during a scan.
struct LabelAccum {
  checksum: Adler32,
  voxel_count: u64,
  bounds: LabelBounds,
}

impl LabelAccum {
  fn new() -> Self {
    Self {
      checksum: Adler32::new(),
      voxel_count: 0,
      // Overwritten by the first run; never observed empty.
      bounds: LabelBounds::from_run(IVec3::ZERO, IVec3::ZERO),
    }
  }

  /// Fold one run into the accumulator.
  ///
  /// Start and end index are hashed per axis (start, then end) as
  /// little-endian `i64` bytes, so a changed run position changes the
  /// checksum with overwhelming probability.
  fn push_run(&mut self, start: IVec3, end: IVec3) {
    for d in 0..3 {
      self.checksum.update(&(start[d] as i64).to_le_bytes());
      self.checksum.update(&(end[d] as i64).to_le_bytes());
    }

    if self.voxel_count == 0 {
      self.bounds = LabelBounds::from_run(start, end);
    } else {
      self.bounds.encapsulate_run(start, end);
    }

    self.voxel_count += (end.x - start.x + 1) as u64;
  }
}

/// Scan a volume and compute statistics for every non-background label.
///
/// Labels with zero voxels are simply absent from the result - a degenerate
/// stats record is never emitted. Statistics are deterministic for identical
/// volume content.
pub fn scan_volume<V: LabelVolume>(volume: &V) -> BTreeMap<LabelId, LabelStats> {
  let _span = tracing::info_span!("scan_volume").entered();

  let extent = volume.extent();
  let mut accum: BTreeMap<LabelId, LabelAccum> = BTreeMap::new();

  for z in 0..extent.z {
    for y in 0..extent.y {
      let mut x = 0u32;
      for run in volume.scanline(y, z) {
        debug_assert!(run.len >= 1, "zero-length runs are illegal input");
        let start = IVec3::new(x as i32, y as i32, z as i32);
        x += run.len;
        if run.label != BACKGROUND_LABEL {
          let end = IVec3::new(x as i32 - 1, y as i32, z as i32);
          accum
            .entry(run.label)
            .or_insert_with(LabelAccum::new)
            .push_run(start, end);
        }
      }
      debug_assert_eq!(
        x, extent.x,
        "scanline ({y}, {z}) does not sum to the volume x extent"
      );
    }
  }

  let stats: BTreeMap<LabelId, LabelStats> = accum
    .into_iter()
    .map(|(label, acc)| {
      (
        label,
        LabelStats {
          label,
          checksum: acc.checksum.value(),
          voxel_count: acc.voxel_count,
          bounds: acc.bounds,
        },
      )
    })
    .collect();

  tracing::debug!(labels = stats.len(), "volume scan complete");
  stats
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod scan_test;
