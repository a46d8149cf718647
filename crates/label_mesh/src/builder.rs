//! External mesh construction boundary.
//!
//! The surface-extraction algorithm lives outside this crate. The core only
//! requires that a builder, given a label and a padded bounding region, is
//! deterministic for identical `(label, region, volume content, options)`
//! inputs, reports fractional progress through the supplied sender, and
//! returns either a mesh or a recoverable error.

use thiserror::Error;

use crate::progress::ProgressSender;
use crate::types::{LabelId, LabelRegion, MeshOptions};

/// Recoverable mesh construction failure.
///
/// A build failure never corrupts the cache: the previous valid entry for
/// the label, if any, is retained, and other labels' rebuilds continue.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Surface extraction exhausted memory.
  #[error("surface extraction ran out of memory")]
  OutOfMemory,

  /// Any other builder-specific failure.
  #[error("mesh construction failed: {0}")]
  Failed(String),
}

/// Memory accounting hook for opaque mesh handles.
///
/// The time-point table derives its running total by summing each cached
/// mesh's own reported footprint.
pub trait MeshFootprint {
  /// Memory consumed by this mesh, in bytes.
  fn memory_bytes(&self) -> u64;
}

/// Constructs a surface mesh for one label within a bounding region.
pub trait MeshBuilder {
  /// Opaque mesh handle produced by this builder.
  type Mesh: MeshFootprint;

  /// Build a mesh for exactly `label` within `region`.
  ///
  /// Continuous fractional progress in `(0, 1)` should be reported through
  /// `progress`; the pipeline terminates the run itself, so a builder that
  /// never reports still participates correctly in aggregation.
  fn build(
    &mut self,
    label: LabelId,
    region: &LabelRegion,
    options: &MeshOptions,
    progress: &ProgressSender,
  ) -> Result<Self::Mesh, BuildError>;
}
