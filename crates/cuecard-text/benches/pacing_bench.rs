//! Benchmarks for cue parsing and per-frame projection.
//!
//! Run with: cargo bench -p cuecard-text

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use cuecard_core::{PacingConfig, PlaybackState};
use cuecard_text::{LayoutMap, highlight_progress, parse, project_tokens, scroll_target};
use std::hint::black_box;

// =============================================================================
// Test Data
// =============================================================================

/// Presenter notes with a time marker every `every` lines.
fn script(lines: usize, every: usize) -> String {
    let mut out = String::new();
    for i in 0..lines {
        if every > 0 && i % every == 0 {
            out.push_str(&format!("[time {}]\n", i * 4));
        }
        if i % 7 == 3 {
            out.push_str("[note slow down here] ");
        }
        out.push_str("The quick brown fox jumps over the lazy dog.\n");
        if i % 5 == 4 {
            out.push('\n');
        }
    }
    out
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let pacing = PacingConfig::default();
    for lines in [10usize, 100, 1000] {
        let src = script(lines, 4);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &src, |b, src| {
            b.iter(|| parse(black_box(src), &pacing))
        });
    }
    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    let pacing = PacingConfig::default();
    for lines in [100usize, 1000] {
        let doc = parse(&script(lines, 4), &pacing);
        let layout = LayoutMap::estimate(&doc, 16.0, 360.0);
        let state = PlaybackState {
            elapsed_seconds: (lines * 2) as f64,
            is_playing: true,
            ..PlaybackState::default()
        };
        group.throughput(Throughput::Elements(doc.total_words() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &doc, |b, doc| {
            b.iter(|| {
                let progress = highlight_progress(doc, black_box(&state), &pacing);
                let tokens = project_tokens(doc, progress);
                let index = progress.max(0.0) as usize;
                black_box((tokens.len(), scroll_target(&layout, index, 480.0)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_frame);
criterion_main!(benches);
