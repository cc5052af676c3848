//! Dispatch-path hot spots: registry lookups, router construction, and
//! secret masking.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use inference_router::backends::{generation, transcription};
use inference_router::config::{mask_secret, AdapterConfig};

fn bench_descriptor_lookup(c: &mut Criterion) {
    c.bench_function("descriptor_lookup", |b| {
        b.iter(|| {
            for name in ["ollama", "OpenAI", "  gemini ", "grok"] {
                black_box(generation::describe(black_box(name)));
            }
            black_box(transcription::describe(black_box("whisper")));
        });
    });
}

fn bench_router_construction(c: &mut Criterion) {
    // api_key override keeps the resolver out of the measurement
    c.bench_function("resolve_remote_backend", |b| {
        b.iter(|| {
            let overrides = AdapterConfig::new()
                .with("api_key", "sk-bench-0123456789")
                .with("temperature", 0.2);
            black_box(generation::resolve(black_box("openai"), overrides).unwrap())
        });
    });

    c.bench_function("resolve_local_backend", |b| {
        b.iter(|| {
            black_box(generation::resolve(black_box("ollama"), AdapterConfig::new()).unwrap())
        });
    });
}

fn bench_mask_secret(c: &mut Criterion) {
    let values = [
        "sk-0123456789abcdef0123456789abcdef",
        "short",
        "exactly8",
        "just-over-eight",
    ];
    c.bench_function("mask_secret", |b| {
        b.iter(|| {
            for value in values {
                black_box(mask_secret(black_box(value)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_descriptor_lookup,
    bench_router_construction,
    bench_mask_secret
);
criterion_main!(benches);
