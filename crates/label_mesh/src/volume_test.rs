//! Tests for run-length volume encoding.

use super::*;

#[test]
fn test_new_volume_is_all_background() {
  let volume = RunLengthVolume::new(Extent3::new(8, 4, 2));
  for z in 0..2 {
    for y in 0..4 {
      let runs = volume.scanline(y, z);
      assert_eq!(runs.len(), 1);
      assert_eq!(runs[0], Run::new(8, BACKGROUND_LABEL));
    }
  }
}

#[test]
fn test_from_dense_collapses_runs() {
  let labels: Vec<LabelId> = vec![0, 0, 1, 1, 1, 2, 0, 0];
  let volume = RunLengthVolume::from_dense(Extent3::new(8, 1, 1), &labels);

  let runs = volume.scanline(0, 0);
  assert_eq!(
    runs,
    &[Run::new(2, 0), Run::new(3, 1), Run::new(1, 2), Run::new(2, 0)]
  );
}

#[test]
fn test_scanline_runs_sum_to_extent() {
  let mut labels = vec![0u16; 8 * 4 * 2];
  labels[3] = 7;
  labels[8] = 7;
  let volume = RunLengthVolume::from_dense(Extent3::new(8, 4, 2), &labels);

  for z in 0..2 {
    for y in 0..4 {
      let total: u32 = volume.scanline(y, z).iter().map(|r| r.len).sum();
      assert_eq!(total, 8, "scanline ({y}, {z}) must cover the x extent");
    }
  }
}

#[test]
fn test_set_voxel_reencodes_line() {
  let mut volume = RunLengthVolume::new(Extent3::new(8, 2, 2));
  volume.set_voxel(3, 1, 1, 5);

  assert_eq!(volume.voxel(3, 1, 1), 5);
  assert_eq!(volume.voxel(2, 1, 1), BACKGROUND_LABEL);
  assert_eq!(
    volume.scanline(1, 1),
    &[Run::new(3, 0), Run::new(1, 5), Run::new(4, 0)]
  );
  // Other scanlines untouched.
  assert_eq!(volume.scanline(1, 0), &[Run::new(8, 0)]);
}

#[test]
fn test_set_voxel_merges_adjacent_runs() {
  let mut volume = RunLengthVolume::new(Extent3::new(4, 1, 1));
  volume.set_voxel(0, 0, 0, 3);
  volume.set_voxel(2, 0, 0, 3);
  volume.set_voxel(1, 0, 0, 3);

  assert_eq!(volume.scanline(0, 0), &[Run::new(3, 3), Run::new(1, 0)]);
}

#[test]
fn test_voxel_lookup_across_runs() {
  let labels: Vec<LabelId> = vec![1, 1, 2, 2, 2, 3];
  let volume = RunLengthVolume::from_dense(Extent3::new(6, 1, 1), &labels);

  for (x, expected) in labels.iter().enumerate() {
    assert_eq!(volume.voxel(x as u32, 0, 0), *expected);
  }
}

#[test]
#[should_panic(expected = "dense label array does not match extent")]
fn test_from_dense_rejects_wrong_length() {
  let _ = RunLengthVolume::from_dense(Extent3::new(4, 2, 2), &[0; 10]);
}

#[test]
#[should_panic(expected = "outside volume extent")]
fn test_set_voxel_rejects_out_of_bounds() {
  let mut volume = RunLengthVolume::new(Extent3::new(4, 4, 4));
  volume.set_voxel(4, 0, 0, 1);
}
