use ac_rules::{pattern_covers, sort_rules};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic_rules(groups: usize) -> String {
    let mut lines = Vec::with_capacity(groups * 5 + 2);
    for i in 0..groups {
        lines.push(format!("*.site{i}.com, Group{i}"));
        lines.push(format!("site{i}.com/app/*, App{i}"));
        lines.push(format!("shop.site{i}.com, Shop{i}"));
        lines.push(format!("site{i}.com/app/settings, Settings{i}"));
        lines.push(format!("site{i}.*, Family{i}"));
    }
    lines.push("*.com, AllCom".to_string());
    lines.push("*, Default".to_string());
    lines.reverse();
    lines.join("\n")
}

fn bench_sort(c: &mut Criterion) {
    let small = synthetic_rules(10);
    let large = synthetic_rules(200);

    c.bench_function("sort_rules/50", |b| b.iter(|| sort_rules(black_box(&small))));
    c.bench_function("sort_rules/1000", |b| b.iter(|| sort_rules(black_box(&large))));
}

fn bench_covers(c: &mut Criterion) {
    c.bench_function("pattern_covers/subdomain", |b| {
        b.iter(|| pattern_covers(black_box("*.example.com"), black_box("shop.example.com")))
    });
    c.bench_function("pattern_covers/wildcards", |b| {
        b.iter(|| pattern_covers(black_box("*.example.*/*"), black_box("*.example.*/a/*/b")))
    });
}

criterion_group!(benches, bench_sort, bench_covers);
criterion_main!(benches);
