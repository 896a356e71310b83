use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use rail_layout_editor::core::Pose;
use rail_layout_editor::{
    parse_layout, write_block_groups, Endpoint, GroupingPolicy, Layout, SegmentKind,
};
use std::hint::black_box;

/// Baut eine Strecke mit einer Weiche nach jeweils `section_len` Segmenten.
fn build_synthetic_layout(segment_count: usize, section_len: usize) -> Layout {
    let mut layout = Layout::new();
    let mut previous = None;

    for index in 0..segment_count {
        let kind = if index % section_len == section_len - 1 {
            SegmentKind::SwitchLeft
        } else {
            SegmentKind::Straight
        };
        let x = index as f32 * 100.0;
        let id = layout.add_segment(kind, Pose::at(Vec2::new(x, 0.0)));
        if let Some(prev) = previous {
            layout
                .connect(prev, Endpoint::End, id, Endpoint::Start)
                .expect("Verbindung erwartet");
        }
        previous = Some(id);
    }

    layout
}

fn bench_commit_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_groups");
    let policy = GroupingPolicy::default();

    for &segment_count in &[200usize, 1_000usize] {
        let layout = build_synthetic_layout(segment_count, 25);

        group.bench_with_input(
            BenchmarkId::new("regroup", segment_count),
            &layout,
            |b, layout| {
                b.iter(|| {
                    let mut working = layout.clone();
                    let grouping = working
                        .commit_groups(black_box(&policy))
                        .expect("Commit erwartet");
                    black_box(grouping.groups.len())
                })
            },
        );
    }

    group.finish();
}

fn bench_json_roundtrip(c: &mut Criterion) {
    let mut layout = build_synthetic_layout(500, 25);
    layout
        .commit_groups(&GroupingPolicy::default())
        .expect("Commit erwartet");
    let json = write_block_groups(&layout, 100.0).expect("Export erwartet");

    c.bench_function("json_parse_block_groups", |b| {
        b.iter(|| {
            let parsed = parse_layout(black_box(&json)).expect("Parsen erwartet");
            black_box(parsed.layout.segment_count())
        })
    });
}

criterion_group!(core_benches, bench_commit_groups, bench_json_roundtrip);
criterion_main!(core_benches);
