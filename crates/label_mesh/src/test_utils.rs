//! Shared fixtures for module tests.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::builder::{BuildError, MeshBuilder, MeshFootprint};
use crate::progress::ProgressSender;
use crate::types::{Extent3, LabelId, LabelRegion, MeshOptions};
use crate::volume::RunLengthVolume;

/// Mesh stand-in carrying only what the cache layers observe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestMesh {
  pub label: LabelId,
  pub bytes: u64,
  /// Bumped per build so tests can tell rebuilds from cached handles.
  pub generation: u64,
}

impl MeshFootprint for TestMesh {
  fn memory_bytes(&self) -> u64 {
    self.bytes
  }
}

/// Shared log of build invocations, inspectable while the pipeline owns the
/// builder.
pub type BuildLog = Arc<Mutex<Vec<LabelId>>>;

/// Labels the builder should fail on, togglable while the pipeline owns the
/// builder.
pub type FailSet = Arc<Mutex<BTreeSet<LabelId>>>;

/// Builder that records every invocation and fabricates [`TestMesh`] handles.
pub struct RecordingBuilder {
  log: BuildLog,
  pub mesh_bytes: u64,
  fail_labels: FailSet,
  /// Report fractional progress mid-build when set.
  pub report_progress: bool,
  generation: u64,
}

impl RecordingBuilder {
  pub fn new() -> (Self, BuildLog) {
    let log: BuildLog = Arc::new(Mutex::new(Vec::new()));
    (
      Self {
        log: Arc::clone(&log),
        mesh_bytes: 1024,
        fail_labels: Arc::new(Mutex::new(BTreeSet::new())),
        report_progress: false,
        generation: 0,
      },
      log,
    )
  }

  pub fn with_mesh_bytes(mut self, bytes: u64) -> Self {
    self.mesh_bytes = bytes;
    self
  }

  pub fn failing_on(self, label: LabelId) -> Self {
    self.fail_labels.lock().unwrap().insert(label);
    self
  }

  /// Handle to the failure set, kept by the test to flip failures mid-run.
  pub fn failure_switch(&self) -> FailSet {
    Arc::clone(&self.fail_labels)
  }
}

impl MeshBuilder for RecordingBuilder {
  type Mesh = TestMesh;

  fn build(
    &mut self,
    label: LabelId,
    _region: &LabelRegion,
    _options: &MeshOptions,
    progress: &ProgressSender,
  ) -> Result<TestMesh, BuildError> {
    self.log.lock().unwrap().push(label);
    if self.report_progress {
      progress.report(0.5);
    }
    if self.fail_labels.lock().unwrap().contains(&label) {
      return Err(BuildError::Failed(format!("induced failure for label {label}")));
    }
    self.generation += 1;
    Ok(TestMesh {
      label,
      bytes: self.mesh_bytes,
      generation: self.generation,
    })
  }
}

/// Fill an inclusive box of voxels with `label`.
pub fn fill_box(volume: &mut RunLengthVolume, min: [u32; 3], max: [u32; 3], label: LabelId) {
  for z in min[2]..=max[2] {
    for y in min[1]..=max[1] {
      for x in min[0]..=max[0] {
        volume.set_voxel(x, y, z, label);
      }
    }
  }
}

/// 16x16x16 volume with a 4-cube of label 1 and a 4-cube of label 2.
pub fn two_label_volume() -> RunLengthVolume {
  let mut volume = RunLengthVolume::new(Extent3::new(16, 16, 16));
  fill_box(&mut volume, [2, 2, 2], [5, 5, 5], 1);
  fill_box(&mut volume, [9, 9, 9], [12, 12, 12], 2);
  volume
}
