use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iq_slurper::{exfil, unpack};
use rand::prelude::*;

fn benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    // A full default-sized capture window of random samples
    let mut dummy_window = vec![0u32; 16384 * 2];
    rng.fill(&mut dummy_window[..]);
    let words = &dummy_window[..];

    c.bench_function("deinterleave window", |b| {
        b.iter(|| unpack::records(black_box(words), black_box(words.len())).count())
    });

    let records: Vec<_> = unpack::records(words, words.len()).collect();
    c.bench_function("exfil csv", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(records.len() * 24);
            exfil::write_records(&mut out, records.iter().copied()).unwrap();
            out
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
