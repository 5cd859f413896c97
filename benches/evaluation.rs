use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use truss_fitness::{
    batch_evaluate, parse_config, ClosedFormEvaluator, FitnessFunction, Genotype, LinearSolver,
    SolverOptions, TrussEvaluator,
};

const BRIDGE: &str = include_str!("../demos/bridge.cfg");

fn random_genotypes(len: usize, count: usize) -> Vec<Genotype> {
    let mut rng = StdRng::seed_from_u64(2024);
    (0..count).map(|_| Genotype::random(len, &mut rng)).collect()
}

fn bench_single_evaluation(c: &mut Criterion) {
    let parsed = parse_config(BRIDGE).expect("bundled bridge configuration parses");
    let genotype = parsed.genotypes[0].clone();

    let mut group = c.benchmark_group("single_evaluation");
    for solver in [LinearSolver::Sparse, LinearSolver::Dense] {
        let config = parsed.config.clone().with_solver(SolverOptions {
            solver,
            ..Default::default()
        });
        let evaluator = TrussEvaluator::new(&config);
        group.bench_function(BenchmarkId::from_parameter(format!("{solver:?}")), |b| {
            b.iter(|| evaluator.fitness(black_box(&genotype)))
        });
    }

    let closed_form = ClosedFormEvaluator::new();
    let genotype = Genotype::zeros(closed_form.genotype_len());
    group.bench_function("closed_form", |b| {
        b.iter(|| closed_form.fitness(black_box(&genotype)))
    });
    group.finish();
}

fn bench_batch_evaluation(c: &mut Criterion) {
    let parsed = parse_config(BRIDGE).expect("bundled bridge configuration parses");
    let evaluator = TrussEvaluator::new(&parsed.config);

    let mut group = c.benchmark_group("batch_evaluation");
    for size in [100usize, 1500] {
        let genotypes = random_genotypes(evaluator.genotype_len(), size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &genotypes, |b, genotypes| {
            b.iter(|| batch_evaluate(&evaluator, black_box(genotypes)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_evaluation, bench_batch_evaluation);
criterion_main!(benches);
