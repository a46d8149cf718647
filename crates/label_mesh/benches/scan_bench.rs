//! Benchmark for the label statistics scan.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use label_mesh::{scan_volume, Extent3, LabelId, RunLengthVolume};

/// Volume with `labels` nested cubes, the outermost spanning most of the
/// extent. Every scanline through the stack carries several runs, which is
/// the shape segmentations actually have.
fn nested_cubes(side: u32, labels: u16) -> RunLengthVolume {
  let mut volume = RunLengthVolume::new(Extent3::new(side, side, side));
  for label in 1..=labels {
    let inset = label as u32 * (side / (2 * labels as u32 + 2));
    let lo = inset;
    let hi = side - 1 - inset;
    for z in lo..=hi {
      for y in lo..=hi {
        for x in lo..=hi {
          volume.set_voxel(x, y, z, label as LabelId);
        }
      }
    }
  }
  volume
}

fn bench_scan(c: &mut Criterion) {
  let mut group = c.benchmark_group("scan_volume");

  for side in [32u32, 64, 128] {
    let volume = nested_cubes(side, 4);
    group.bench_with_input(BenchmarkId::new("nested_cubes", side), &side, |b, _| {
      b.iter(|| scan_volume(black_box(&volume)))
    });
  }

  group.finish();
}

fn bench_scan_label_count(c: &mut Criterion) {
  let mut group = c.benchmark_group("scan_label_count");

  for labels in [1u16, 4, 16] {
    let volume = nested_cubes(64, labels);
    group.bench_with_input(
      BenchmarkId::new("labels", labels),
      &labels,
      |b, _| b.iter(|| scan_volume(black_box(&volume))),
    );
  }

  group.finish();
}

criterion_group!(benches, bench_scan, bench_scan_label_count);
criterion_main!(benches);
