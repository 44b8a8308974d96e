//! Benchmarks for the shaped-text cache and the layout passes built on it.
//!
//! Run with: `cargo bench -p glyphflow --bench shaped_cache_bench`
//!
//! | Group            | Hot path                                            |
//! |------------------|-----------------------------------------------------|
//! | shaped_cache     | `find_or_add_shaped_text` hits, misses, sub-ranges  |
//! | layout/flow      | full relayout of a paragraph at several widths      |
//! | layout/edit      | one insertion followed by `update_if_needed`        |

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use glyphflow::shaped_util::measure_shaped_text;
use glyphflow::{
    FontId, FontInfo, LayoutConfig, MonospaceShaper, ShapedTextCache, ShapedTextCacheKey,
    ShapedTextContext, TextDirection, TextLayout, TextLocation, TextRange, TextStyle,
};
use std::hint::black_box;
use std::rc::Rc;

// ── Inputs ──────────────────────────────────────────────────────────────

const WORDS: &[&str] = &[
    "layout", "glyph", "cache", "wrap", "line", "run", "block", "shape", "kerning", "baseline",
];

fn paragraph(words: usize) -> String {
    (0..words)
        .map(|i| WORDS[(i * 7 + i / 3) % WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn font() -> FontInfo {
    FontInfo::new(FontId(0), 16.0)
}

fn key(range: TextRange) -> ShapedTextCacheKey {
    ShapedTextCacheKey::new(range, 1.0, ShapedTextContext::default(), font())
}

fn layout(text: &str, wrapping_width: f32) -> TextLayout {
    let config = LayoutConfig::default()
        .with_default_style(TextStyle::new(font()))
        .with_wrapping_width(wrapping_width);
    let mut layout = match TextLayout::with_config(Rc::new(MonospaceShaper::new()), config) {
        Ok(layout) => layout,
        Err(err) => panic!("bench config rejected: {err}"),
    };
    for line in text.split('\n') {
        layout.add_text_line(line);
    }
    layout
}

// ── Benchmark Functions ─────────────────────────────────────────────────

fn bench_shaped_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("shaped_cache");
    let text = paragraph(200);
    let whole = TextRange::new(0, text.len());
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("hit", |b| {
        let mut cache = ShapedTextCache::new(Rc::new(MonospaceShaper::new()));
        cache.find_or_add_shaped_text(&key(whole), &text, Some(TextDirection::LeftToRight));
        b.iter(|| {
            black_box(cache.find_or_add_shaped_text(
                &key(whole),
                &text,
                Some(TextDirection::LeftToRight),
            ))
        });
    });

    group.bench_function("miss", |b| {
        b.iter(|| {
            let mut cache = ShapedTextCache::new(Rc::new(MonospaceShaper::new()));
            black_box(cache.find_or_add_shaped_text(
                &key(whole),
                &text,
                Some(TextDirection::LeftToRight),
            ))
        });
    });

    group.bench_function("measure_sub_ranges", |b| {
        let mut cache = ShapedTextCache::new(Rc::new(MonospaceShaper::new()));
        cache.find_or_add_shaped_text(&key(whole), &text, Some(TextDirection::LeftToRight));
        let ranges: Vec<TextRange> = (0..text.len())
            .step_by(37)
            .map(|begin| TextRange::new(begin, (begin + 20).min(text.len())))
            .filter(|r| text.is_char_boundary(r.begin) && text.is_char_boundary(r.end))
            .collect();
        b.iter(|| {
            for &range in &ranges {
                black_box(measure_shaped_text(&mut cache, &key(whole), range, &text));
            }
        });
    });

    group.finish();
}

fn bench_layout_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/flow");
    let text = [paragraph(120), paragraph(80), paragraph(160)].join("\n");
    group.throughput(Throughput::Bytes(text.len() as u64));

    for width in [0.0f32, 160.0, 480.0] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let mut layout = layout(&text, width);
            layout.update_if_needed();
            b.iter(|| {
                layout.dirty_layout();
                layout.update_if_needed();
                black_box(layout.line_views().len())
            });
        });
    }

    group.finish();
}

fn bench_layout_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/edit");
    let text = paragraph(300);

    group.bench_function("insert_and_update", |b| {
        let mut layout = layout(&text, 320.0);
        layout.update_if_needed();
        b.iter(|| {
            let at = TextLocation::new(0, 0);
            layout.insert_at(at, "x").ok();
            layout.update_if_needed();
            layout.remove_at(at, 1).ok();
            layout.update_if_needed();
            black_box(layout.layout_size())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_shaped_cache, bench_layout_flow, bench_layout_edit);
criterion_main!(benches);
