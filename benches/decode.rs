use criterion::{black_box, criterion_group, criterion_main, Criterion};
use bcur::ur::{decode, encode};
use bcur::Decoder;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("decode single part", |b| {
        b.iter(|| decode(black_box(&["UR:BYTES/GN02M0H002KGC7"][..]), "bytes"))
    });

    let parts = encode(&"deadbeef".repeat(500), 200).unwrap();
    c.bench_function("decode parts incrementally", |b| {
        b.iter(|| {
            let mut decoder = Decoder::default();
            for part in parts.iter().rev() {
                decoder.receive_part(black_box(part));
            }
            decoder.is_success()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
