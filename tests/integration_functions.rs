use rand::rngs::StdRng;
use rand::SeedableRng;

use truss_fitness::genotype::decode_free_nodes;
use truss_fitness::{
    batch_evaluate, parse_config, replay, FitnessFunction, FixedNode, Genotype, Interval,
    LinearSolver, Point, SolverOptions, SpanBounds, Supports, Topology, TrussConfig,
    TrussEvaluator,
};

const BRIDGE: &str = include_str!("../demos/bridge.cfg");
const RESIDUAL_TOL: f64 = 1e-6;

/// 14-unit deck with both supports carried by free nodes.
fn free_support_deck() -> TrussConfig {
    let fixed = [0.0, 3.0, 6.0, 8.0, 11.0, 14.0]
        .iter()
        .map(|&x| FixedNode::new(x, 0.0))
        .collect();
    let topology = Topology::new(
        8,
        &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (0, 6), (6, 1), (7, 4), (7, 5)],
    )
    .unwrap();
    TrussConfig::new(
        14.0,
        fixed,
        2,
        SpanBounds::new(Interval::new(0.0, 14.0), Interval::new(0.0, 5.0)),
        topology,
        Supports::new(6, 7),
    )
    .unwrap()
}

/// Deck of three fixed nodes with one free apex; statically determinate.
fn apex_config() -> TrussConfig {
    let fixed = vec![
        FixedNode::new(0.0, 0.0),
        FixedNode::new(2.0, 0.0),
        FixedNode::new(4.0, 0.0),
    ];
    let topology = Topology::new(4, &[(0, 1), (1, 2), (0, 3), (3, 2), (1, 3)]).unwrap();
    TrussConfig::new(
        4.0,
        fixed,
        1,
        SpanBounds::new(Interval::new(0.5, 3.5), Interval::new(1.0, 3.0)),
        topology,
        Supports::new(0, 2),
    )
    .unwrap()
}

#[test]
fn all_zero_genotype_on_fourteen_unit_deck_is_finite() {
    let config = free_support_deck();
    let genotype = Genotype::zeros(config.genotype_len());

    let free = decode_free_nodes(genotype.as_bits(), &config).unwrap();
    assert_eq!(free, vec![Point::new(0.0, 0.0), Point::new(0.0, 0.0)]);

    let evaluation = TrussEvaluator::new(&config).try_evaluate(&genotype).unwrap();
    assert_eq!(evaluation.nodes[6], Point::new(0.0, 0.0));
    assert_eq!(evaluation.nodes[7], Point::new(14.0, 0.0));
    assert!(evaluation.fitness.is_finite());
    assert!(evaluation.scores.iter().all(|s| s.force.is_finite()));
    // node 6 coincides with node 0 and node 7 with node 5
    assert!((evaluation.penalties.member_length - 2.0).abs() < 1e-12);
}

#[test]
fn residual_vanishes_for_determinate_layouts() {
    let config = apex_config();
    let evaluator = TrussEvaluator::new(&config);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let genotype = Genotype::random(evaluator.genotype_len(), &mut rng);
        let evaluation = evaluator.try_evaluate(&genotype).unwrap();
        assert!(
            evaluation.penalties.nonzero_sum < RESIDUAL_TOL,
            "residual {} for {genotype}",
            evaluation.penalties.nonzero_sum
        );
    }
}

#[test]
fn fitness_is_bit_identical_across_threads() {
    let config = free_support_deck();
    let evaluator = TrussEvaluator::new(&config);
    let mut rng = StdRng::seed_from_u64(5);
    let genotypes: Vec<Genotype> = (0..16)
        .map(|_| Genotype::random(evaluator.genotype_len(), &mut rng))
        .collect();
    let reference: Vec<u64> = genotypes
        .iter()
        .map(|g| evaluator.fitness(g).to_bits())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| batch_evaluate(&evaluator, &genotypes)))
            .collect();
        for handle in handles {
            let values: Vec<u64> = handle.join().unwrap().iter().map(|v| v.to_bits()).collect();
            assert_eq!(values, reference);
        }
    });
}

#[test]
fn stored_bridge_designs_replay_in_equilibrium() {
    let parsed = parse_config(BRIDGE).unwrap();
    assert_eq!(parsed.config.genotype_len(), 96);
    assert_eq!(parsed.genotypes.len(), 2);

    let results = replay(&parsed.config, &parsed.genotypes);
    assert_eq!(results.len(), 2);
    for (_, evaluation) in &results {
        assert!(evaluation.fitness.is_finite());
        assert!(evaluation.penalties.nonzero_sum < 1e-3);
        assert_eq!(evaluation.penalties.fixed_spacing, 0.0);
        // apex of the first top-chord panel sits near x = 3 or 2.5
        assert!(evaluation.nodes[6].x > 2.0 && evaluation.nodes[6].x < 3.5);
    }
}

#[test]
fn dense_and_iterative_solves_agree() {
    let parsed = parse_config(BRIDGE).unwrap();
    let dense_config = parsed.config.clone().with_solver(SolverOptions {
        solver: LinearSolver::Dense,
        ..Default::default()
    });

    let iterative = TrussEvaluator::new(&parsed.config);
    let dense = TrussEvaluator::new(&dense_config);
    for genotype in &parsed.genotypes {
        let a = iterative.try_evaluate(genotype).unwrap();
        let b = dense.try_evaluate(genotype).unwrap();
        assert!(b.penalties.nonzero_sum < 1e-8);
        for (sa, sb) in a.scores.iter().zip(&b.scores) {
            assert!((sa.force - sb.force).abs() < 1e-4);
        }
    }
}
