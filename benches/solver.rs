use criterion::{black_box, criterion_group, criterion_main, Criterion};

use putnam_relu::ast::{nnf, Prop};
use putnam_relu::cnf::tseitin_cnf;
use putnam_relu::solver::dpll::solve;
use putnam_relu::solver::orchestrator::{dpll_t, OrchestratorConfig};

fn var(name: &str) -> Prop {
    Prop::Var(name.to_string())
}

fn simple_sat() -> Prop {
    // (x0 v x1) ^ (~x0 v x2) ^ (~x1 v ~x2)
    var("x0")
        .or(var("x1"))
        .and(var("x0").not().or(var("x2")))
        .and(var("x1").not().or(var("x2").not()))
}

/// n+1 pigeons, n holes - classically UNSAT.
fn pigeonhole(n: usize) -> Prop {
    let cell = |p: usize, h: usize| var(&format!("p{}_h{}", p, h));

    let mut formula = Prop::True;
    for p in 0..=n {
        let mut clause = cell(p, 0);
        for h in 1..n {
            clause = clause.or(cell(p, h));
        }
        formula = formula.and(clause);
    }
    for h in 0..n {
        for p1 in 0..=n {
            for p2 in (p1 + 1)..=n {
                formula = formula.and(cell(p1, h).not().or(cell(p2, h).not()));
            }
        }
    }
    formula
}

/// A chain of implications: (x0 v x1) ^ (~xi v x(i+2)) ^ (~x(i+1) v x(i+2)) ...
fn chain_sat(n: usize) -> Prop {
    let x = |i: usize| var(&format!("x{}", i));
    let mut formula = x(0).or(x(1));
    for i in 0..(n - 2) {
        formula = formula.and(x(i).not().or(x(i + 2)));
        formula = formula.and(x(i + 1).not().or(x(i + 2)));
    }
    formula
}

fn bench_simple_sat(c: &mut Criterion) {
    let encoding = tseitin_cnf(&nnf(&simple_sat()));
    c.bench_function("simple_3var_sat", |b| {
        b.iter(|| solve(black_box(&encoding.cnf)))
    });
}

fn bench_pigeonhole(c: &mut Criterion) {
    let mut group = c.benchmark_group("pigeonhole");
    for n in [3, 4, 5].iter() {
        let encoding = tseitin_cnf(&nnf(&pigeonhole(*n)));
        group.bench_with_input(format!("php_{}_{}", n + 1, n), n, |b, _| {
            b.iter(|| solve(black_box(&encoding.cnf)))
        });
    }
    group.finish();
}

fn bench_chain_sat(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for n in [10, 20, 30].iter() {
        let encoding = tseitin_cnf(&nnf(&chain_sat(*n)));
        group.bench_with_input(format!("chain_{}", n), n, |b, _| {
            b.iter(|| solve(black_box(&encoding.cnf)))
        });
    }
    group.finish();
}

fn bench_dpll_t_relu(c: &mut Criterion) {
    use putnam_relu::ast::Ineq;
    let formula = Prop::Ineq(Ineq::new(
        [("x".to_string(), 1.0), ("y".to_string(), 1.0)],
        5.0,
    ))
    .and(Prop::Relu("x".to_string(), "y".to_string()));

    c.bench_function("dpll_t_single_relu", |b| {
        b.iter(|| dpll_t(black_box(&formula), black_box(&OrchestratorConfig::default())))
    });
}

criterion_group!(
    benches,
    bench_simple_sat,
    bench_pigeonhole,
    bench_chain_sat,
    bench_dpll_t_relu
);
criterion_main!(benches);
