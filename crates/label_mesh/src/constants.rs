//! Crate-wide constants.

use crate::types::LabelId;

/// Label value reserved for background/unsegmented voxels.
///
/// Background runs never contribute statistics and never get a mesh.
pub const BACKGROUND_LABEL: LabelId = 0;

/// Default padding (in voxels) applied to a label's bounding box before it is
/// handed to the mesh builder.
///
/// The margin gives surface extraction room to close the iso-surface at the
/// region boundary instead of clipping it against the label's tight box.
pub const DEFAULT_PAD_RADIUS: i32 = 5;

/// Default soft memory budget for [`TimepointTable`](crate::TimepointTable),
/// in bytes (1 GiB).
pub const DEFAULT_MEMORY_BUDGET: u64 = 1024 * 1024 * 1024;
