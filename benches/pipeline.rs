extern crate jsdeob;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use jsdeob::{
    deobfuscation::{DeobfuscationEngine, EngineConfig},
    syntax::{parse, print},
};
use std::{fmt::Write, hint::black_box};

/// Builds a synthetic payload with `blocks` repetitions of the sandbox-free layers:
/// char-code aliases, global aliases, wild numbers, static branches and dispatchers.
fn synthetic_payload(blocks: usize) -> String {
    let mut source = String::from("var c = String[\"fromCharCode\"];\nvar w = window;\n");
    for i in 0..blocks {
        let _ = write!(
            source,
            r#"
function f{i}(a) {{
  var s = 3;
  for (;;) {{
    switch (s) {{
      case 3: w["console"]["log"](c(104) + c(105)); s = 7; continue;
      case 7: if (!0) {{ a = (1, 2, a + {i}); }} else {{ a = 0; }} s = 1; continue;
      case 1: return (a || 0) && 1 ? 1 : 0;
    }}
  }}
}}
"#
        );
    }
    source
}

/// Benchmark the front end and the full pipeline on the same payload.
fn bench_pipeline(c: &mut Criterion) {
    let source = synthetic_payload(50);

    let mut group = c.benchmark_group("front_end");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("parse_print", |b| {
        b.iter(|| {
            let ast = parse(black_box(&source)).unwrap();
            black_box(print(&ast))
        });
    });
    group.finish();

    let engine = DeobfuscationEngine::new(EngineConfig::default());
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("process", |b| {
        b.iter(|| {
            let (code, result) = engine.process(black_box(&source)).unwrap();
            black_box((code, result))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
