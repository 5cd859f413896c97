//! End-to-end truss evaluation: genotype in, fitness out.
//!
//! [`TrussEvaluator`] runs the whole pipeline for one configuration:
//! decode the layout, build the loads, assemble and solve the equilibrium
//! system, then score cost and penalties. Every call allocates its own
//! system and shares nothing mutable, so evaluations may run on any number
//! of threads against the same `&TrussConfig`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::TrussConfig;
use crate::error::Result;
use crate::genotype::{decode_layout, Genotype};
use crate::loads::compute_loads;
use crate::objective::{
    force_residual, heuristic_fitness, score_struts, PenaltyBreakdown, StrutScore,
};
use crate::solver::solve_equilibrium;
use crate::types::{Point, Sense};

/// A scalar fitness over fixed-length genotypes.
///
/// This is the single capability a search framework needs: hand it a
/// genotype of [`genotype_len`](FitnessFunction::genotype_len) bits and
/// rank by the returned value in the direction given by
/// [`sense`](FitnessFunction::sense).
pub trait FitnessFunction: Sync {
    fn genotype_len(&self) -> usize;

    fn sense(&self) -> Sense;

    /// # Panics
    /// Panics if the genotype length does not match `genotype_len()`.
    fn fitness(&self, genotype: &Genotype) -> f64;
}

/// Convergence record of the force solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverStats {
    pub iterations: usize,
    pub converged: bool,
    pub residual_norm: f64,
}

/// Everything computed while evaluating one genotype.
#[derive(Debug, Clone)]
pub struct TrussEvaluation {
    /// Node positions after support overrides.
    pub nodes: Vec<Point>,
    pub loads: Vec<f64>,
    /// Node pairs in strut index order.
    pub struts: Vec<[usize; 2]>,
    pub scores: Vec<StrutScore>,
    pub total_cost: f64,
    pub penalties: PenaltyBreakdown,
    pub fitness: f64,
    pub solver: SolverStats,
}

impl TrussEvaluation {
    /// Number of struts outside the allowable force band.
    pub fn over_limit_count(&self) -> usize {
        self.scores.iter().filter(|s| s.band.is_over_limit()).count()
    }

    pub fn to_serializable(&self) -> SerializableEvaluation {
        SerializableEvaluation {
            nodes: self.nodes.iter().map(|p| [p.x, p.y]).collect(),
            loads: self.loads.clone(),
            struts: self
                .struts
                .iter()
                .zip(&self.scores)
                .map(|(&nodes, score)| SerializableStrut {
                    nodes,
                    force: score.force,
                    length: score.length,
                    over_limit: score.band.is_over_limit(),
                })
                .collect(),
            total_cost: self.total_cost,
            penalties: self.penalties,
            fitness: self.fitness,
            solver: self.solver,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_serializable())
    }
}

impl fmt::Display for TrussEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.nodes {
            writeln!(f, "({:.6}, {:.6})", p.x, p.y)?;
        }
        for load in &self.loads {
            writeln!(f, "({load:.6})")?;
        }
        for (&[i, j], score) in self.struts.iter().zip(&self.scores) {
            writeln!(f, "({i}, {j}) : {:.6}, {:.6}", score.force, score.length)?;
            if score.band.is_over_limit() {
                writeln!(f, "OVER")?;
            }
        }
        writeln!(f, "Cost: ${:.2}", self.total_cost)?;
        let p = &self.penalties;
        writeln!(
            f,
            "Excess: {:.5}, Nonzero: {:.5}, Spacing: {:.5}, {:.5}",
            p.excess_force, p.nonzero_sum, p.fixed_spacing, p.member_length
        )?;
        write!(f, "Fitness: {:.3}", self.fitness)
    }
}

/// Serializable strut record for JSON consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableStrut {
    pub nodes: [usize; 2],
    pub force: f64,
    pub length: f64,
    pub over_limit: bool,
}

/// Serializable evaluation snapshot (points flattened to `[x, y]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableEvaluation {
    pub nodes: Vec<[f64; 2]>,
    pub loads: Vec<f64>,
    pub struts: Vec<SerializableStrut>,
    pub total_cost: f64,
    pub penalties: PenaltyBreakdown,
    pub fitness: f64,
    pub solver: SolverStats,
}

/// Maximizing fitness of a solved pin-jointed truss.
#[derive(Debug, Clone, Copy)]
pub struct TrussEvaluator<'a> {
    config: &'a TrussConfig,
}

impl<'a> TrussEvaluator<'a> {
    pub fn new(config: &'a TrussConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a TrussConfig {
        self.config
    }

    /// Run the full pipeline and keep every intermediate result.
    pub fn try_evaluate(&self, genotype: &Genotype) -> Result<TrussEvaluation> {
        let config = self.config;
        let snap = config.tolerances().snap;

        let nodes = decode_layout(genotype.as_bits(), config)?;
        let load_case = compute_loads(&nodes, config);
        let topology = config.topology();

        let solution = solve_equilibrium(&nodes, &load_case.loads, topology, config.solver(), snap);

        let summary = score_struts(
            &nodes,
            topology,
            &solution.forces,
            config.cost(),
            config.tolerances().force,
        );
        let penalties = PenaltyBreakdown {
            excess_force: summary.excess_force,
            nonzero_sum: force_residual(&nodes, &load_case.loads, topology, &solution.forces, snap),
            fixed_spacing: load_case.spacing_penalty,
            member_length: summary.member_length,
        };
        let fitness =
            heuristic_fitness(summary.total_cost, &penalties, config.weights(), Sense::Maximize);

        Ok(TrussEvaluation {
            nodes,
            loads: load_case.loads,
            struts: topology.struts().to_vec(),
            scores: summary.struts,
            total_cost: summary.total_cost,
            penalties,
            fitness,
            solver: SolverStats {
                iterations: solution.iterations,
                converged: solution.converged,
                residual_norm: solution.residual_norm,
            },
        })
    }
}

impl FitnessFunction for TrussEvaluator<'_> {
    fn genotype_len(&self) -> usize {
        self.config.genotype_len()
    }

    fn sense(&self) -> Sense {
        Sense::Maximize
    }

    fn fitness(&self, genotype: &Genotype) -> f64 {
        match self.try_evaluate(genotype) {
            Ok(evaluation) => evaluation.fitness,
            Err(err) => panic!("truss evaluation failed: {err}"),
        }
    }
}

/// Evaluate many genotypes, in parallel when the `parallel` feature is enabled.
#[cfg(feature = "parallel")]
pub fn batch_evaluate<F: FitnessFunction + ?Sized>(
    function: &F,
    genotypes: &[Genotype],
) -> Vec<f64> {
    genotypes
        .par_iter()
        .map(|genotype| function.fitness(genotype))
        .collect()
}

/// Evaluate many genotypes (sequential, for WASM).
#[cfg(not(feature = "parallel"))]
pub fn batch_evaluate<F: FitnessFunction + ?Sized>(
    function: &F,
    genotypes: &[Genotype],
) -> Vec<f64> {
    genotypes
        .iter()
        .map(|genotype| function.fitness(genotype))
        .collect()
}

/// Detailed evaluation of stored genotypes, e.g. the ones listed in a
/// configuration file. Genotypes of the wrong length are skipped with a
/// warning.
pub fn replay(config: &TrussConfig, genotypes: &[Genotype]) -> Vec<(Genotype, TrussEvaluation)> {
    let evaluator = TrussEvaluator::new(config);
    genotypes
        .iter()
        .filter_map(|genotype| match evaluator.try_evaluate(genotype) {
            Ok(evaluation) => Some((genotype.clone(), evaluation)),
            Err(err) => {
                log::warn!("skipping genotype {genotype}: {err}");
                None
            }
        })
        .collect()
}
