use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgtable::{CompareOp, Mode, QueryBuilder, Record, Where};

/// `n` equality predicates joined alternately by AND / OR.
fn build_where(n: usize) -> Where {
    let mut filter = Where::new();
    for i in 0..n {
        if i > 0 {
            filter = if i % 2 == 0 { filter.and() } else { filter.or() };
        }
        filter = filter.compare(format!("col{i}"), CompareOp::Eq, i as i64);
    }
    filter
}

fn build_record(n: usize) -> Record {
    (0..n).map(|i| (format!("col{i}"), i as i64)).collect()
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_build/select");

    for n in [1, 5, 10, 50] {
        let filter = build_where(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &filter, |b, filter| {
            b.iter(|| {
                let stmt = QueryBuilder::new("users")
                    .mode(Mode::Select)
                    .columns("*")
                    .filter(filter)
                    .map(|qb| qb.build());
                black_box(stmt)
            });
        });
    }

    group.finish();
}

fn bench_update_to_positional(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_build/update_to_positional");

    for n in [1, 5, 10, 50] {
        let data = build_record(n);
        let filter = build_where(n);
        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            &(data, filter),
            |b, (data, filter)| {
                b.iter(|| {
                    let query = QueryBuilder::new("users")
                        .mode(Mode::Update)
                        .data(data)
                        .filter(filter)
                        .and_then(|qb| qb.build().to_positional());
                    black_box(query)
                });
            },
        );
    }

    group.finish();
}

fn bench_to_positional(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_build/to_positional");

    for n in [5, 20, 100] {
        let stmt = QueryBuilder::new("users")
            .mode(Mode::Insert)
            .columns(build_record(n).columns().collect::<Vec<_>>())
            .values(build_record(n).columns().collect::<Vec<_>>())
            .build()
            .bind_record(&build_record(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &stmt, |b, stmt| {
            b.iter(|| black_box(stmt.to_positional()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_select,
    bench_update_to_positional,
    bench_to_positional
);
criterion_main!(benches);
