//! Tests for core data types.

use glam::IVec3;

use super::*;

#[test]
fn test_extent_voxel_and_scanline_counts() {
  let extent = Extent3::new(16, 8, 4);
  assert_eq!(extent.num_voxels(), 16 * 8 * 4);
  assert_eq!(extent.num_scanlines(), 8 * 4);
}

#[test]
fn test_bounds_encapsulate_only_grows() {
  let mut bounds = LabelBounds::from_run(IVec3::new(4, 4, 4), IVec3::new(6, 4, 4));
  bounds.encapsulate_run(IVec3::new(2, 5, 4), IVec3::new(3, 5, 4));
  assert_eq!(bounds.min, IVec3::new(2, 4, 4));
  assert_eq!(bounds.max, IVec3::new(6, 5, 4));

  // A run strictly inside changes nothing.
  bounds.encapsulate_run(IVec3::new(4, 4, 4), IVec3::new(5, 4, 4));
  assert_eq!(bounds.min, IVec3::new(2, 4, 4));
  assert_eq!(bounds.max, IVec3::new(6, 5, 4));
}

#[test]
fn test_bounds_num_voxels_inclusive() {
  let bounds = LabelBounds::from_run(IVec3::new(1, 2, 3), IVec3::new(3, 4, 5));
  assert_eq!(bounds.num_voxels(), 3 * 3 * 3);

  let single = LabelBounds::from_run(IVec3::ZERO, IVec3::ZERO);
  assert_eq!(single.num_voxels(), 1);
}

#[test]
fn test_region_padding_clips_to_extent() {
  let bounds = LabelBounds::from_run(IVec3::new(1, 1, 1), IVec3::new(3, 3, 3));
  let region = LabelRegion::from_bounds(&bounds, 5, Extent3::new(16, 16, 16));

  // Padding clips at the low corner, extends at the high corner.
  assert_eq!(region.index, IVec3::ZERO);
  assert_eq!(region.size.x, 9);
  assert_eq!(region.size.y, 9);
  assert_eq!(region.size.z, 9);
}

#[test]
fn test_region_clips_at_far_boundary() {
  let bounds = LabelBounds::from_run(IVec3::new(14, 14, 14), IVec3::new(15, 15, 15));
  let region = LabelRegion::from_bounds(&bounds, 5, Extent3::new(16, 16, 16));

  assert_eq!(region.index, IVec3::new(9, 9, 9));
  assert_eq!(region.size.x, 7, "region must not extend past the volume");
  assert_eq!(region.num_voxels(), 7 * 7 * 7);
}

#[test]
fn test_region_without_padding_matches_bounds() {
  let bounds = LabelBounds::from_run(IVec3::new(2, 3, 4), IVec3::new(5, 6, 7));
  let region = LabelRegion::from_bounds(&bounds, 0, Extent3::new(16, 16, 16));

  assert_eq!(region.index, bounds.min);
  assert_eq!(region.num_voxels(), bounds.num_voxels());
}

#[test]
fn test_region_contains() {
  let bounds = LabelBounds::from_run(IVec3::new(4, 4, 4), IVec3::new(6, 6, 6));
  let region = LabelRegion::from_bounds(&bounds, 1, Extent3::new(16, 16, 16));

  assert!(region.contains(IVec3::new(3, 3, 3)));
  assert!(region.contains(IVec3::new(7, 7, 7)));
  assert!(!region.contains(IVec3::new(8, 7, 7)));
  assert!(!region.contains(IVec3::new(2, 4, 4)));
}

#[test]
fn test_stats_differ_on_any_geometry_field() {
  let bounds = LabelBounds::from_run(IVec3::ZERO, IVec3::ONE);
  let base = LabelStats {
    label: 1,
    checksum: 42,
    voxel_count: 8,
    bounds,
  };

  assert!(!base.differs_from(&base));
  assert!(base.differs_from(&LabelStats {
    voxel_count: 9,
    ..base
  }));
  assert!(base.differs_from(&LabelStats {
    checksum: 43,
    ..base
  }));
  // Bounds alone trigger a rebuild, guarding against checksum collisions.
  assert!(base.differs_from(&LabelStats {
    bounds: LabelBounds::from_run(IVec3::ZERO, IVec3::splat(2)),
    ..base
  }));
}

#[test]
fn test_mesh_options_equality_drives_invalidation() {
  let a = MeshOptions::default();
  let b = MeshOptions::default();
  assert_eq!(a, b);

  let c = b.clone().with_smoothing_iterations(5);
  assert_ne!(a, c);

  let d = a.clone().with_decimation_percent(50);
  assert_ne!(a, d);
}

#[test]
fn test_mesh_options_builders() {
  let options = MeshOptions::new()
    .with_gaussian_smoothing(false)
    .with_smoothing_iterations(3)
    .with_decimation_percent(80)
    .with_pad_radius(2);

  assert!(!options.gaussian_smoothing);
  assert_eq!(options.smoothing_iterations, 3);
  assert_eq!(options.decimation_percent, 80);
  assert_eq!(options.pad_radius, 2);
}
