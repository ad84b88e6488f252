//! Criterion benchmarks for the delay estimators
//!
//! Run with: cargo bench -p attune-sync

use attune_pcm::{Format, PcmFormat};
use attune_sync::{StreamSyncer, Syncer, SyncerConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn f64_bytes(data: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 8);
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn f32_bytes(data: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 4);
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn bench_oneshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oneshot");
    let syncer = Syncer::new(Format::new(1, 44100, PcmFormat::F32Le)).unwrap();

    for &size in &[1_000usize, 10_000, 100_000] {
        let reference: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut comparison = vec![0.0f32; size];
        comparison[..size - size / 10].copy_from_slice(&reference[size / 10..]);

        let ref_bytes = f32_bytes(&reference);
        let comp_bytes = f32_bytes(&comparison);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let results = syncer
                    .calculate_shift_between(black_box(&ref_bytes), &[black_box(&comp_bytes)])
                    .unwrap();
                black_box(results)
            })
        });
    }

    group.finish();
}

fn bench_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("Streaming");
    group.sample_size(20);

    let format = Format::new(1, 44100, PcmFormat::F64Le);
    let window_sizes = [4096usize, 8192, 16384];
    let track_counts = [1usize, 2, 4];
    let max_lags = [0usize, 44100 * 3]; // 0 means max_lag = window

    for &window_size in &window_sizes {
        for &max_lag in &max_lags {
            if max_lag > 0 && window_size > 4096 {
                continue; // skip the slowest combinations
            }
            for &tracks in &track_counts {
                let lag_label = if max_lag > 0 { "3sLag" } else { "SmallLag" };
                let id = format!("Window-{window_size}/Lag-{lag_label}/Tracks-{tracks}");

                group.bench_with_input(BenchmarkId::from_parameter(id), &tracks, |b, &tracks| {
                    let hop_size = window_size / 2;
                    let used_max_lag = if max_lag == 0 { window_size } else { max_lag };

                    let n = window_size + hop_size;
                    let reference: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin()).collect();
                    let comparison: Vec<f64> =
                        (0..n).map(|i| ((i as f64 - 10.0) * 0.1).sin()).collect();
                    let ref_bytes = f64_bytes(&reference);
                    let comp_bytes = f64_bytes(&comparison);

                    b.iter(|| {
                        let mut syncer = StreamSyncer::new(
                            format,
                            SyncerConfig {
                                window_size,
                                hop_size,
                                max_lag: used_max_lag,
                                ..Default::default()
                            },
                        )
                        .unwrap();
                        syncer.push_reference(&ref_bytes).unwrap();
                        for track in 0..tracks as u32 {
                            let results = syncer.push_comparison(track, &comp_bytes).unwrap();
                            black_box(results);
                        }
                    })
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_oneshot, bench_streaming);
criterion_main!(benches);
