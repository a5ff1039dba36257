//! Criterion benchmarks for sensitivity_core sweeps
//!
//! Run with: cargo bench -p sensitivity_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sensitivity_core::{
    Aggregation, EvaluateOptions, ExpressionModel, FixedArgs, HexBins, Params, SensitivityValues,
    TableStyle, evaluate_table,
};
use sensitivity_core::style::StyledTables;

fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    (0..steps)
        .map(|i| min + (max - min) * i as f64 / (steps - 1) as f64)
        .collect()
}

fn create_values(params: usize, steps: usize) -> SensitivityValues {
    (0..params).fold(SensitivityValues::new(), |values, i| {
        values.with(format!("x{i}"), linspace(0.0, 1.0, steps))
    })
}

fn polynomial(p: &Params) -> f64 {
    p.swept()
        .enumerate()
        .map(|(i, (_, v))| (i as f64 + 1.0) * v * v)
        .sum()
}

fn bench_closure_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("closure_sweep");
    let values = create_values(3, 20);

    group.bench_function("sequential", |b| {
        b.iter(|| {
            evaluate_table(
                black_box(&values),
                &polynomial,
                &FixedArgs::new(),
                "Result",
                &EvaluateOptions::sequential(),
                None,
            )
        })
    });
    group.bench_function("default", |b| {
        b.iter(|| {
            evaluate_table(
                black_box(&values),
                &polynomial,
                &FixedArgs::new(),
                "Result",
                &EvaluateOptions::default(),
                None,
            )
        })
    });

    group.finish();
}

fn bench_expression_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_sweep");
    let values = create_values(2, 30);

    for repeats in [1usize, 10, 100].iter() {
        let model = ExpressionModel::parse("x0 * normal(1, 0.1) + x1 ^ 2")
            .map(|m| m.with_repeats(*repeats));
        let Ok(model) = model else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("repeats", repeats), repeats, |b, _| {
            b.iter(|| {
                evaluate_table(
                    black_box(&values),
                    &model,
                    &FixedArgs::new(),
                    "Result",
                    &EvaluateOptions::default(),
                    None,
                )
            })
        });
    }

    group.finish();
}

fn bench_rendering(c: &mut Criterion) {
    let values = create_values(4, 10);
    let Ok(table) = evaluate_table(
        &values,
        &polynomial,
        &FixedArgs::new(),
        "Result",
        &EvaluateOptions::default(),
        None,
    ) else {
        return;
    };
    let style = TableStyle::default();

    c.bench_function("styled_tables_4x10", |b| {
        b.iter(|| StyledTables::build(black_box(&table), black_box(&style)))
    });
    c.bench_function("hexbin_4x10", |b| {
        b.iter(|| HexBins::from_table(black_box(&table), "x0", "x1", 8, &Aggregation::Mean))
    });
}

criterion_group!(
    benches,
    bench_closure_sweep,
    bench_expression_sweep,
    bench_rendering,
);
criterion_main!(benches);
