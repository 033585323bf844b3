//! Benchmarks for face and tile reads.
//!
//! Run with: cargo bench --package llc-reader
//! Or: cargo bench --package llc-reader --bench read_benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

use llc_grid::{GridLayout, Levels, TileIndex, TileShape};
use llc_reader::{DataPaths, FaceReader, LlcModel};
use test_utils::{temp_test_dir, write_llc_file, LlcDims, SampleFormat};

// =============================================================================
// TILE INDEX BENCHMARKS
// =============================================================================

fn bench_tile_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_index");
    let layout = Arc::new(GridLayout::llc4320().unwrap());

    group.bench_function("build_llc4320_540", |b| {
        b.iter(|| TileIndex::new(black_box(layout.clone()), TileShape::new(540, 540)).unwrap())
    });

    let index = TileIndex::new(layout, TileShape::new(540, 540)).unwrap();
    group.throughput(Throughput::Elements(index.total_tiles() as u64));
    group.bench_function("enumerate_llc4320_540", |b| {
        b.iter(|| index.iter().map(|spec| spec.nx()).sum::<usize>())
    });
    group.bench_function("resolve_llc4320_last", |b| {
        b.iter(|| index.resolve(black_box(831)).unwrap())
    });

    group.finish();
}

// =============================================================================
// FACE READ BENCHMARKS
// =============================================================================

fn bench_face_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("face_reads");
    let dir = temp_test_dir();
    let dims = LlcDims::new(240, 80, 1);
    let path = write_llc_file(dir.path(), "field.data", &dims, 1, SampleFormat::F32Be).unwrap();
    let layout = Arc::new(GridLayout::new(5, dims.side, dims.top, dims.levels).unwrap());

    let uncached = FaceReader::new(layout.clone());
    group.bench_function("read_face_map_each_time", |b| {
        b.iter(|| uncached.read_face(black_box(&path), 2, Levels::All).unwrap())
    });

    let cached = FaceReader::new(layout.clone()).with_map_cache(4);
    group.bench_function("read_face_cached_map", |b| {
        b.iter(|| cached.read_face(black_box(&path), 2, Levels::All).unwrap())
    });

    let face = cached.read_face(&path, 2, Levels::All).unwrap();
    group.throughput(Throughput::Elements((dims.side * dims.top) as u64));
    group.bench_function("decode_reshaped_face", |b| b.iter(|| face.to_array()));

    let face = cached.read_face(&path, 0, Levels::All).unwrap();
    group.bench_function("decode_transposed_face", |b| b.iter(|| face.to_array()));

    group.finish();
}

fn bench_tile_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_reads");
    let dir = temp_test_dir();
    let dims = LlcDims::new(240, 80, 1);
    write_llc_file(dir.path(), "field.data", &dims, 1, SampleFormat::F32Be).unwrap();
    let layout = Arc::new(GridLayout::new(5, dims.side, dims.top, dims.levels).unwrap());
    let reader = FaceReader::new(layout).with_map_cache(4);
    let model = LlcModel::with_reader(reader, DataPaths::new(dir.path(), dir.path()));
    let index = model.tile_index(TileShape::new(40, 40)).unwrap();

    group.throughput(Throughput::Elements(index.total_tiles() as u64));
    group.bench_function("load_every_tile", |b| {
        b.iter(|| {
            for tile in model.tiles(&index) {
                black_box(tile.load_field("field.data", Levels::All).unwrap().to_array());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tile_index, bench_face_reads, bench_tile_reads);
criterion_main!(benches);
