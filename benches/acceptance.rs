//! Benchmarks for the acceptance condition engine.
//!
//! Run with:
//! ```bash
//! cargo bench --bench acceptance
//! ```

use automata_acceptance::prelude::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic random formulas, so that runs are comparable.
fn random_formulas(seed: u64, sets: usize, count: usize) -> Vec<AcceptanceFormula> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| AcceptanceFormula::random(sets, 0.1, &mut rng))
        .collect()
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let inputs = [
        ("rabin", AcceptanceFormula::rabin(6).to_text()),
        ("parity", AcceptanceFormula::parity(true, false, 12).to_text()),
        (
            "generalized_rabin",
            AcceptanceFormula::generalized_rabin(&[2, 3, 1, 4]).to_text(),
        ),
    ];
    for (name, text) in &inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| text.parse::<AcceptanceCondition>())
        });
    }
    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("accepting");
    for sets in [4usize, 8, 12] {
        let formulas = random_formulas(7, sets, 16);
        group.bench_with_input(BenchmarkId::from_parameter(sets), &formulas, |b, formulas| {
            b.iter(|| {
                let mut accepted = 0usize;
                for formula in formulas {
                    for bits in 0..(1u32 << sets.min(8)) {
                        accepted += usize::from(formula.accepting(MarkSet::from_bits(bits)));
                    }
                }
                accepted
            })
        });
    }
    group.finish();
}

fn bench_normal_forms(c: &mut Criterion) {
    let mut group = c.benchmark_group("normal_form");
    group.sample_size(20);
    for sets in [4usize, 6, 8] {
        let formulas = random_formulas(11, sets, 8);
        group.bench_with_input(BenchmarkId::new("dnf", sets), &formulas, |b, formulas| {
            let mut oracle = BddOracle::new();
            b.iter(|| {
                formulas
                    .iter()
                    .map(|f| f.to_dnf(&mut oracle).map(|dnf| dnf.len()).unwrap_or(0))
                    .sum::<usize>()
            })
        });
        group.bench_with_input(BenchmarkId::new("cnf", sets), &formulas, |b, formulas| {
            let mut oracle = BddOracle::new();
            b.iter(|| {
                formulas
                    .iter()
                    .map(|f| f.to_cnf(&mut oracle).map(|cnf| cnf.len()).unwrap_or(0))
                    .sum::<usize>()
            })
        });
    }
    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let conditions = [
        AcceptanceCondition::rabin(8),
        AcceptanceCondition::streett(8),
        AcceptanceCondition::parity(false, true, 16),
        AcceptanceCondition::generalized_rabin(&[3, 2, 4, 1]),
    ];
    c.bench_function("classify", |b| {
        b.iter(|| {
            conditions
                .iter()
                .filter(|cond| {
                    cond.is_rabin().is_some()
                        || cond.is_streett().is_some()
                        || cond.is_parity().is_some()
                        || cond.is_generalized_rabin().is_some()
                })
                .count()
        })
    });

    let mut oracle = BddOracle::new();
    let equivalent = AcceptanceCondition::with_formula(
        6,
        AcceptanceFormula::parity(true, false, 6)
            .to_dnf(&mut oracle)
            .unwrap_or_default(),
    );
    c.bench_function("classify_parity_equiv", |b| {
        b.iter(|| equivalent.is_parity_equiv(&mut oracle))
    });
}

criterion_group!(
    benches,
    bench_parsing,
    bench_evaluation,
    bench_normal_forms,
    bench_classification
);
criterion_main!(benches);
