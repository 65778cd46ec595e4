//! Benchmarks for the per-buffer capture path.
//!
//! The capture callback runs `convert_frame` and `rms` inline on the audio
//! thread for every buffer, so both must stay comfortably under the buffer
//! period (~10ms at typical device buffer sizes).

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use crosstalk::audio::convert_frame;
use crosstalk::audio::energy::rms;
use crosstalk::audio::frame::{NativeFormat, Source};
use std::hint::black_box;

/// Synthetic speech-like signal: a 200Hz tone at moderate amplitude.
fn tone(len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.3 * (2.0 * std::f32::consts::PI * 200.0 * t).sin()
        })
        .collect()
}

fn bench_rms(c: &mut Criterion) {
    let mut group = c.benchmark_group("rms");
    for &len in &[160usize, 1600, 16000] {
        let samples = tone(len, 16000);
        group.bench_with_input(BenchmarkId::from_parameter(len), &samples, |b, samples| {
            b.iter(|| rms(black_box(samples)));
        });
    }
    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_frame");

    // Identity: mono 16kHz, 100ms
    let mono_16k = tone(1600, 16000);
    group.bench_function("mono_16k_identity", |b| {
        b.iter(|| {
            convert_frame(
                black_box(&mono_16k),
                NativeFormat::new(16000, 1),
                Source::Local,
                16000,
            )
        });
    });

    // Typical device format: stereo 48kHz, 100ms
    let stereo_48k = tone(9600, 48000);
    group.bench_function("stereo_48k_to_mono_16k", |b| {
        b.iter(|| {
            convert_frame(
                black_box(&stereo_48k),
                NativeFormat::new(48000, 2),
                Source::Ambient,
                16000,
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rms, bench_convert);
criterion_main!(benches);
