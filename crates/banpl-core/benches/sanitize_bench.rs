use std::fs;

use banpl_core::{clean_text, sanitize, DatasetVersion};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_clean_text(c: &mut Criterion) {
    let inputs = [
        "Ale z ciebie idiota\n  ",
        "  Dzień dobry, jak się masz?\nWszystko w porządku.\n",
        "krótki",
    ];

    c.bench_function("clean_text_batch_3", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(clean_text(black_box(input)));
            }
        });
    });
}

fn bench_sanitize_file(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("BAN-PL_2.csv");
    let mut raw = String::from("Unnamed: 0,id,Text,Class,Reason\n");
    for i in 0..2_000 {
        raw.push_str(&format!(
            "{i},{i},\"wiersz numer {i}\nz nową linią  \",{},{}\n",
            i % 2,
            i % 4
        ));
    }

    c.bench_function("sanitize_2000_rows", |b| {
        b.iter(|| {
            fs::write(&path, &raw).unwrap();
            sanitize(black_box(&path), DatasetVersion::Ban2).unwrap()
        });
    });
}

criterion_group!(benches, bench_clean_text, bench_sanitize_file);
criterion_main!(benches);
