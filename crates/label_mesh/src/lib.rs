//! label_mesh - incremental meshing for multi-label segmentation volumes
//!
//! This crate keeps a collection of per-label surface meshes synchronized with
//! a run-length-encoded label volume, rebuilding a mesh only when the voxels
//! of its label actually changed.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────┐     ┌─────────────┐
//! │ LabelVolume ├────►│ scan_volume  ├────►│ MeshCache ├────►│ MeshBuilder │
//! │ (RLE lines) │     │ (LabelStats) │     │   .diff   │     │ (external)  │
//! └─────────────┘     └──────────────┘     └───────────┘     └──────┬──────┘
//!                                                                  │
//!                        ProgressAccumulator ◄── weighted runs ────┘
//! ```
//!
//! # Pipeline
//!
//! 1. **Scan**: one streaming pass over the volume's scanlines produces a
//!    per-label checksum, voxel count and bounding box
//! 2. **Diff**: new statistics are compared against the cache to find the
//!    minimal set of labels that need rebuilding and the labels to evict
//! 3. **Build**: the external [`MeshBuilder`] is invoked once per dirty
//!    label, each invocation registered as a weighted progress run
//! 4. **Commit**: stats and mesh are replaced together, so a cached mesh is
//!    never observably stale relative to its stats
//!
//! [`TimepointTable`] holds one [`MeshPipeline`] per time point of a 4D
//! segmentation under a soft memory budget with FIFO eviction.

pub mod constants;
pub mod types;

// Re-export commonly used items
pub use constants::{BACKGROUND_LABEL, DEFAULT_MEMORY_BUDGET, DEFAULT_PAD_RADIUS};
pub use types::{Extent3, LabelBounds, LabelId, LabelRegion, LabelStats, MeshOptions, Run};

// Run-length label volume input
pub mod volume;
pub use volume::{LabelVolume, RunLengthVolume};

// Streaming change detection
pub mod scan;
pub use scan::scan_volume;

// Per-label mesh cache and diffing
pub mod cache;
pub use cache::{CacheDiff, CacheEntry, MeshCache};

// External mesh construction boundary
pub mod builder;
pub use builder::{BuildError, MeshBuilder, MeshFootprint};

// Weighted progress aggregation
pub mod progress;
pub use progress::{
  ChannelListener, ProgressAccumulator, ProgressEvent, ProgressListener, ProgressSender,
  ProgressSourceKind, SourceId,
};

// Update orchestration
pub mod pipeline;
pub use pipeline::{MeshPipeline, UpdateOutcome};

// Per-time-point pipeline table
pub mod timepoints;
pub use timepoints::TimepointTable;

// Test fixtures shared between module tests
#[cfg(test)]
pub mod test_utils;
