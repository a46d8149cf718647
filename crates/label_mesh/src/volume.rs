//! Run-length label volume input.
//!
//! The core consumes a volume as an ordered sequence of scanlines, each a
//! sequence of `(run_length, label)` pairs. How the encoding is produced
//! (codec, file format) is out of scope; [`RunLengthVolume`] is an in-memory
//! producer of that shape, built from dense label arrays.
//!
//! Storage order: x is the fast axis (one scanline per `(y, z)` pair),
//! scanlines ordered y-fastest, then z.

use smallvec::SmallVec;

use crate::constants::BACKGROUND_LABEL;
use crate::types::{Extent3, LabelId, Run};

/// Per-scanline run storage. Segmentations are dominated by short lines with
/// a handful of runs, so small lines stay inline.
pub type RunLine = SmallVec<[Run; 8]>;

/// Read-only source of run-length-encoded scanlines.
///
/// Invariant: run lengths in every scanline sum to `extent().x`.
pub trait LabelVolume {
  /// Volume dimensions.
  fn extent(&self) -> Extent3;

  /// The scanline at `(y, z)`.
  fn scanline(&self, y: u32, z: u32) -> &[Run];
}

/// In-memory run-length-encoded label volume.
#[derive(Clone, Debug)]
pub struct RunLengthVolume {
  extent: Extent3,
  lines: Vec<RunLine>,
}

impl RunLengthVolume {
  /// Create a volume filled with background.
  pub fn new(extent: Extent3) -> Self {
    let line: RunLine = if extent.x > 0 {
      SmallVec::from_slice(&[Run::new(extent.x, BACKGROUND_LABEL)])
    } else {
      SmallVec::new()
    };
    Self {
      extent,
      lines: vec![line; extent.num_scanlines() as usize],
    }
  }

  /// Encode a dense label array laid out x-fastest, then y, then z.
  pub fn from_dense(extent: Extent3, labels: &[LabelId]) -> Self {
    assert_eq!(
      labels.len() as u64,
      extent.num_voxels(),
      "dense label array does not match extent"
    );
    let width = extent.x as usize;
    let lines = labels
      .chunks_exact(width.max(1))
      .map(encode_line)
      .collect();
    Self { extent, lines }
  }

  /// Set one voxel, re-encoding the affected scanline.
  pub fn set_voxel(&mut self, x: u32, y: u32, z: u32, label: LabelId) {
    assert!(
      x < self.extent.x && y < self.extent.y && z < self.extent.z,
      "voxel ({x}, {y}, {z}) outside volume extent"
    );
    let idx = self.line_index(y, z);
    let mut dense = decode_line(&self.lines[idx], self.extent.x as usize);
    dense[x as usize] = label;
    self.lines[idx] = encode_line(&dense);
  }

  /// Label of one voxel.
  pub fn voxel(&self, x: u32, y: u32, z: u32) -> LabelId {
    let mut t = 0;
    for run in self.scanline(y, z) {
      t += run.len;
      if x < t {
        return run.label;
      }
    }
    unreachable!("scanline shorter than volume x extent")
  }

  #[inline]
  fn line_index(&self, y: u32, z: u32) -> usize {
    (z as u64 * self.extent.y as u64 + y as u64) as usize
  }
}

impl LabelVolume for RunLengthVolume {
  fn extent(&self) -> Extent3 {
    self.extent
  }

  fn scanline(&self, y: u32, z: u32) -> &[Run] {
    &self.lines[self.line_index(y, z)]
  }
}

/// Collapse a dense line into runs of equal labels.
fn encode_line(dense: &[LabelId]) -> RunLine {
  let mut runs = RunLine::new();
  let mut iter = dense.iter().copied();
  let Some(first) = iter.next() else {
    return runs;
  };
  let mut current = Run::new(1, first);
  for label in iter {
    if label == current.label {
      current.len += 1;
    } else {
      runs.push(current);
      current = Run::new(1, label);
    }
  }
  runs.push(current);
  runs
}

/// Expand runs back into a dense line.
fn decode_line(runs: &[Run], width: usize) -> Vec<LabelId> {
  let mut dense = Vec::with_capacity(width);
  for run in runs {
    dense.extend(std::iter::repeat(run.label).take(run.len as usize));
  }
  debug_assert_eq!(dense.len(), width, "run lengths do not sum to line width");
  dense
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod volume_test;
