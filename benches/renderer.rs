use archgrid::{
    InputFormat, LayoutConfig, RenderOptions, auto_layout, parse_input, render, render_tree,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn chain_source(boxes: usize, extra_edges: usize) -> String {
    let mut out = String::from("flowchart LR\n");
    if boxes == 0 {
        return out;
    }
    for i in 0..boxes {
        out.push_str(&format!("  N{}[Service {}]\n", i, i));
    }
    for i in 0..boxes.saturating_sub(1) {
        out.push_str(&format!("  N{} --> N{}\n", i, i + 1));
    }
    let mut count = 0usize;
    for i in 0..boxes {
        for j in (i + 2)..boxes {
            if count >= extra_edges {
                break;
            }
            out.push_str(&format!("  N{} -->|hop| N{}\n", i, j));
            count += 1;
        }
        if count >= extra_edges {
            break;
        }
    }
    out
}

/// Nested groups of four boxes each, wired group to group.
fn nested_source(groups: usize) -> String {
    let mut out = String::from("flowchart LR\n");
    for g in 0..groups {
        out.push_str(&format!("  subgraph G{g} [Group {g}]\n    direction TB\n"));
        for b in 0..4 {
            out.push_str(&format!("    G{g}B{b}[Box {g}.{b}]\n"));
        }
        out.push_str(&format!("    G{g}B0 --> G{g}B1 --> G{g}B2\n  end\n"));
    }
    for g in 1..groups {
        out.push_str(&format!("  G{}B2 --> G{}B0\n", g - 1, g));
    }
    out
}

fn fixture(name: &str) -> &'static str {
    match name {
        "web_stack" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/web_stack.json"
        )),
        "pipeline" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/pipeline.yaml"
        )),
        "platform" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/platform.mmd"
        )),
        "grid" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/grid.json"
        )),
        _ => panic!("unknown fixture"),
    }
}

const FIXTURES: [(&str, InputFormat); 4] = [
    ("web_stack", InputFormat::Json),
    ("pipeline", InputFormat::Yaml),
    ("platform", InputFormat::Mermaid),
    ("grid", InputFormat::Json),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, format) in FIXTURES {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| {
                let tree = parse_input(black_box(data), format).expect("parse failed");
                black_box(tree.children().len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for (name, format) in FIXTURES {
        let tree = parse_input(fixture(name), format).expect("parse failed");
        group.bench_with_input(BenchmarkId::from_parameter(name), &tree, |b, tree| {
            b.iter(|| {
                let laid_out = auto_layout(black_box(tree), &config);
                black_box(laid_out.width);
            });
        });
    }
    for groups in [4usize, 12, 24] {
        let tree = parse_input(&nested_source(groups), InputFormat::Mermaid).expect("parse failed");
        group.bench_with_input(
            BenchmarkId::new("nested", groups),
            &tree,
            |b, tree| {
                b.iter(|| {
                    let laid_out = auto_layout(black_box(tree), &config);
                    black_box(laid_out.width);
                });
            },
        );
    }
    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw");
    let config = LayoutConfig::default();
    for (boxes, extra_edges) in [(10usize, 10usize), (30, 60), (60, 180)] {
        let name = format!("chain_{}_{}", boxes, extra_edges);
        let tree = parse_input(&chain_source(boxes, extra_edges), InputFormat::Mermaid)
            .expect("parse failed");
        let laid_out = auto_layout(&tree, &config);
        group.bench_with_input(BenchmarkId::from_parameter(name), &laid_out, |b, tree| {
            b.iter(|| {
                let text = render_tree(black_box(tree));
                black_box(text.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let text = RenderOptions::default();
    let svg = RenderOptions {
        as_svg: true,
        ..RenderOptions::default()
    };
    for (name, _) in FIXTURES {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::new("text", name), input, |b, data| {
            b.iter(|| {
                let out = render(black_box(data), &text).expect("render failed");
                black_box(out.len());
            });
        });
        group.bench_with_input(BenchmarkId::new("svg", name), input, |b, data| {
            b.iter(|| {
                let out = render(black_box(data), &svg).expect("render failed");
                black_box(out.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_layout,
    bench_routing,
    bench_end_to_end
);
criterion_main!(benches);
