//! Benchmarks for md2ansi rendering, with pulldown-cmark as a baseline
//!
//! Run with: cargo bench -p md2ansi-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use md2ansi_core::{colorize, RenderOptions, Renderer, Width};
use pulldown_cmark::{Options, Parser as MdParser};

const SAMPLE: &str = r#"# Introduction

This is a paragraph with *emphasis*, **strong text**, and `inline code`.
It demonstrates the basic capabilities of the renderer[^perf].

## Lists

- First item with some content
- Second item with more content
  - Nested item under the second
- Third item concluding the list

1. Step one of the process
2. Step two continues
3. Step three completes

- [ ] Open task
- [x] Finished task

## Code Example

```rust
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
```

```python
def greet(name):
    """Say hello."""
    return f"Hello, {name}!"  # friendly
```

## Table

| Name    | Speed   | Memory |
| :------ | ------: | :----: |
| Fast    | 100ms   | 10MB   |
| Medium  | 500ms   | 50MB   |
| Slow    | 1000ms  | 100MB  |

## Quote

> The best code is no code at all.
> > Every line of code you write is a liability.

See [the docs](https://example.com/docs) and ![diagram](diagram.png).

---

[^perf]: Rendering is linear in the size of the input.
"#;

fn renderer() -> Renderer {
    Renderer::new(RenderOptions::default().with_width(Width::Fixed(100)))
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));

    let styled = renderer();
    group.bench_function("md2ansi", |b| {
        b.iter(|| {
            let result = styled.render_str(black_box(SAMPLE));
            black_box(result.lines.len())
        })
    });

    let plain = Renderer::new(RenderOptions::plain().with_width(Width::Fixed(100)));
    group.bench_function("md2ansi_plain", |b| {
        b.iter(|| {
            let result = plain.render_str(black_box(SAMPLE));
            black_box(result.lines.len())
        })
    });

    group.bench_function("markdown_pulldown", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(SAMPLE), Options::all());
            let events: Vec<_> = parser.collect();
            black_box(events.len())
        })
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let renderer = renderer();

    for size in [1, 5, 10, 20].iter() {
        let content: String = SAMPLE.repeat(*size);
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("md2ansi", size), &content, |b, content| {
            b.iter(|| {
                let result = renderer.render_str(black_box(content));
                black_box(result.lines.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("markdown", size), &content, |b, content| {
            b.iter(|| {
                let parser = MdParser::new_ext(black_box(content), Options::all());
                let events: Vec<_> = parser.collect();
                black_box(events.len())
            })
        });
    }

    group.finish();
}

fn bench_inline(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline");
    let options = RenderOptions::default();

    let line =
        "This has *emphasis*, **strong**, `code`, [link](https://example.com), and ~~strike~~.";

    group.bench_function("md2ansi_inline", |b| {
        b.iter(|| {
            let spans = colorize(black_box(line), &options);
            black_box(spans.len())
        })
    });

    group.bench_function("markdown_inline", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(line), Options::all());
            let events: Vec<_> = parser.collect();
            black_box(events.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_render, bench_scaling, bench_inline);
criterion_main!(benches);
