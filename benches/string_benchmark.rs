use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use utilkit::stringops::{self, SplitOptions};

const WORDS: [&str; 5] = [
    "My pretty pretty pretty string 1",
    "My pretty pretty pretty string 2",
    "My pretty pretty pretty string 3",
    "My pretty pretty pretty string 4",
    "My pretty pretty pretty string 5",
];

fn generate_csv_line(fields: usize) -> String {
    let mut rng = rand::thread_rng();
    let values: Vec<String> = (0..fields)
        .map(|_| {
            let len = rng.gen_range(0..12);
            (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect()
        })
        .collect();
    values.join(",")
}

fn split_benchmark(c: &mut Criterion) {
    let line = generate_csv_line(64);
    let mut group = c.benchmark_group("split");

    group.bench_function("split_char", |b| {
        b.iter(|| {
            stringops::split(black_box(&line), ',', SplitOptions::empty())
        });
    });
    group.bench_function("splitted_view_char", |b| {
        b.iter(|| {
            stringops::splitted_view(
                black_box(&line),
                ',',
                SplitOptions::empty(),
            )
        });
    });
    group.bench_function("splitted_view_str_no_empty", |b| {
        b.iter(|| {
            stringops::splitted_view(
                black_box(&line),
                ",",
                SplitOptions::NO_EMPTY,
            )
        });
    });

    group.finish();
}

fn trim_benchmark(c: &mut Criterion) {
    let padded = format!(" \t\r\n {} \t\r\n ", WORDS.join(" "));
    let mut group = c.benchmark_group("trim");

    group.bench_function("trim", |b| {
        b.iter(|| stringops::trim(black_box(&padded)));
    });
    group.bench_function("trimmed_view", |b| {
        b.iter(|| stringops::trimmed_view(black_box(&padded)));
    });
    group.bench_function("trim_in_place", |b| {
        b.iter(|| {
            let mut s = padded.clone();
            stringops::trim_in_place(black_box(&mut s));
            s
        });
    });

    group.finish();
}

fn join_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");

    group.bench_function("join", |b| {
        b.iter(|| {
            let joined = stringops::join(black_box(WORDS.iter()), ", ");
            assert_eq!(joined.len(), 32 * 5 + 2 * 4);
            joined
        });
    });

    group.finish();
}

criterion_group!(benches, split_benchmark, trim_benchmark, join_benchmark);
criterion_main!(benches);
