//! Benchmarks for metrics-sql query construction
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use metrics_sql::expr;
use metrics_sql::query::*;

fn create_filters(count: usize) -> FilterSet {
    FilterSet::and(
        (0..count)
            .map(|i| FilterItem::eq(format!("label_{}", i), format!("value_{}", i)))
            .collect(),
    )
}

fn create_params(queries: usize) -> QueryRangeParams {
    let mut composite = CompositeMetricQuery::default();
    let mut formula = Vec::new();

    for i in 0..queries {
        let name = format!("q{}", i);
        composite = composite.query(
            name.clone(),
            MetricQuery::new(format!("metric_{}", i), AggregateOperator::RateSum)
                .filters(create_filters(4))
                .group_by(&["service", "host"]),
        );
        formula.push(name);
    }

    let composite = composite.formula("q0").formula(formula.join(" + "));
    QueryRangeParams::new(1_650_000_000_000, 1_650_086_400_000, 60, composite)
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let schema = StoreSchema::default();

    for size in [1, 10, 100] {
        let filters = create_filters(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("subquery_{}", size), |b| {
            b.iter(|| build_filter_subquery(black_box(&filters), &schema).unwrap())
        });
    }

    group.finish();
}

fn bench_metric(c: &mut Criterion) {
    let mut group = c.benchmark_group("metric");
    let schema = StoreSchema::default();
    let params = create_params(1);

    for op in [
        AggregateOperator::Avg,
        AggregateOperator::P95,
        AggregateOperator::RateSum,
    ] {
        let query = MetricQuery::new("http_requests_total", op)
            .filters(create_filters(4))
            .group_by(&["service"]);

        group.bench_function(format!("build_{}", op), |b| {
            b.iter(|| build_metric_query(&params, black_box(&query), &schema).unwrap())
        });
    }

    group.finish();
}

fn bench_formula(c: &mut Criterion) {
    let mut group = c.benchmark_group("formula");

    group.bench_function("parse", |b| {
        b.iter(|| expr::parse(black_box("(A + B) / sqrt(C) * 100 - -D ** 2")).unwrap())
    });

    for size in [2, 8, 32] {
        let params = create_params(size);
        let builder = QueryBuilder::default();

        group.bench_function(format!("build_queries_{}", size), |b| {
            b.iter(|| builder.build_queries(black_box(&params)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_metric, bench_formula);
criterion_main!(benches);
